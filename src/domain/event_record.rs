//! Event record combining the attendee set with opaque metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{EventId, UserId};

/// Insertion-ordered set of attendee ids.
///
/// Uniqueness is enforced on insert; order is exposed to clients but is not
/// significant for correctness.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttendeeSet(Vec<UserId>);

impl AttendeeSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `user_id`, returning `false` if it was already present.
    pub fn insert(&mut self, user_id: UserId) -> bool {
        if self.contains(user_id) {
            return false;
        }
        self.0.push(user_id);
        true
    }

    /// Removes `user_id`, returning `false` if it was absent.
    pub fn remove(&mut self, user_id: UserId) -> bool {
        let before = self.0.len();
        self.0.retain(|id| *id != user_id);
        self.0.len() != before
    }

    /// Returns `true` if `user_id` is an attendee.
    #[must_use]
    pub fn contains(&self, user_id: UserId) -> bool {
        self.0.contains(&user_id)
    }

    /// Number of attendees.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if nobody has joined.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates attendees in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &UserId> {
        self.0.iter()
    }
}

impl FromIterator<UserId> for AttendeeSet {
    fn from_iter<I: IntoIterator<Item = UserId>>(iter: I) -> Self {
        let mut set = Self::new();
        for id in iter {
            set.insert(id);
        }
        set
    }
}

/// Descriptive fields of an event. Opaque to the attendance core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDetails {
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Scheduled date.
    pub date: DateTime<Utc>,
    /// Venue.
    pub location: String,
    /// Category used by the listing filter.
    pub category: String,
    /// Reference to an externally stored image, if any.
    pub image_url: Option<String>,
}

/// A stored event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    /// Stable identifier.
    pub id: EventId,
    /// Descriptive metadata.
    pub details: EventDetails,
    /// User who created the event.
    pub created_by: UserId,
    /// Current attendees.
    pub attendees: AttendeeSet,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl EventRecord {
    /// Creates a record with a fresh id and an empty attendee set.
    #[must_use]
    pub fn new(details: EventDetails, created_by: UserId) -> Self {
        Self {
            id: EventId::generate(),
            details,
            created_by,
            attendees: AttendeeSet::new(),
            created_at: Utc::now(),
        }
    }

    /// Returns `true` if `user_id` may edit or delete this event: its
    /// creator, or any privileged caller.
    #[must_use]
    pub fn is_managed_by(&self, user_id: UserId, privileged: bool) -> bool {
        privileged || self.created_by == user_id
    }
}

/// Partial metadata update. `None` leaves a field untouched.
///
/// The attendee set is not patchable; it changes only through join/leave.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventPatch {
    /// New name.
    pub name: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New date.
    pub date: Option<DateTime<Utc>>,
    /// New venue.
    pub location: Option<String>,
    /// New category.
    pub category: Option<String>,
    /// New image reference.
    pub image_url: Option<String>,
}

impl EventPatch {
    /// Applies the patch to `details` in place.
    pub fn apply_to(self, details: &mut EventDetails) {
        if let Some(name) = self.name {
            details.name = name;
        }
        if let Some(description) = self.description {
            details.description = description;
        }
        if let Some(date) = self.date {
            details.date = date;
        }
        if let Some(location) = self.location {
            details.location = location;
        }
        if let Some(category) = self.category {
            details.category = category;
        }
        if let Some(image_url) = self.image_url {
            details.image_url = Some(image_url);
        }
    }
}

/// Listing filter. Only exact category matching is supported.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    /// Restrict results to this category.
    pub category: Option<String>,
}

impl EventFilter {
    /// Returns `true` if `record` passes the filter.
    #[must_use]
    pub fn matches(&self, record: &EventRecord) -> bool {
        self.category
            .as_deref()
            .is_none_or(|category| record.details.category == category)
    }
}
