//! Event DTOs for create, update, get and list operations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::{EventDetails, EventFilter, EventPatch, EventRecord};
use crate::error::GatewayError;

/// Event as returned by every event and attendance route.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EventDto {
    /// 24-character hex event id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Scheduled date.
    pub date: DateTime<Utc>,
    /// Venue.
    pub location: String,
    /// Category.
    pub category: String,
    /// Externally stored image reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Creator's user id.
    pub created_by: String,
    /// Current attendee ids.
    pub attendees: Vec<String>,
    /// Number of attendees.
    pub attendee_count: usize,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<EventRecord> for EventDto {
    fn from(record: EventRecord) -> Self {
        let attendees: Vec<String> = record.attendees.iter().map(ToString::to_string).collect();
        Self {
            id: record.id.to_string(),
            name: record.details.name,
            description: record.details.description,
            date: record.details.date,
            location: record.details.location,
            category: record.details.category,
            image_url: record.details.image_url,
            created_by: record.created_by.to_string(),
            attendee_count: attendees.len(),
            attendees,
            created_at: record.created_at,
        }
    }
}

/// Request body for `POST /event/add`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    /// Display name.
    pub name: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Scheduled date (RFC 3339).
    pub date: DateTime<Utc>,
    /// Venue.
    pub location: String,
    /// Category.
    pub category: String,
    /// Optional image reference, stored verbatim.
    #[serde(default)]
    pub image_url: Option<String>,
}

impl CreateEventRequest {
    /// Validates the request and converts it into event details.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] if `name`, `location` or
    /// `category` is blank.
    pub fn into_details(self) -> Result<EventDetails, GatewayError> {
        Ok(EventDetails {
            name: required("name", self.name)?,
            description: self.description,
            date: self.date,
            location: required("location", self.location)?,
            category: required("category", self.category)?,
            image_url: self.image_url,
        })
    }
}

/// Request body for `PUT /event/{id}`. Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventRequest {
    /// New display name.
    #[serde(default)]
    pub name: Option<String>,
    /// New description.
    #[serde(default)]
    pub description: Option<String>,
    /// New date.
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
    /// New venue.
    #[serde(default)]
    pub location: Option<String>,
    /// New category.
    #[serde(default)]
    pub category: Option<String>,
    /// New image reference.
    #[serde(default)]
    pub image_url: Option<String>,
}

impl UpdateEventRequest {
    /// Validates the request and converts it into a patch.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] if a supplied `name`,
    /// `location` or `category` is blank.
    pub fn into_patch(self) -> Result<EventPatch, GatewayError> {
        Ok(EventPatch {
            name: self.name.map(|v| required("name", v)).transpose()?,
            description: self.description,
            date: self.date,
            location: self.location.map(|v| required("location", v)).transpose()?,
            category: self.category.map(|v| required("category", v)).transpose()?,
            image_url: self.image_url,
        })
    }
}

/// Query parameters for `GET /event/get`.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListEventsQuery {
    /// Exact category to filter by.
    #[serde(default)]
    pub category: Option<String>,
}

impl From<ListEventsQuery> for EventFilter {
    fn from(query: ListEventsQuery) -> Self {
        Self {
            category: query.category.filter(|c| !c.trim().is_empty()),
        }
    }
}

/// Acknowledgement for `DELETE /event/{id}`.
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    /// Human-readable outcome.
    pub message: String,
}

fn required(field: &str, value: String) -> Result<String, GatewayError> {
    if value.trim().is_empty() {
        return Err(GatewayError::InvalidRequest(format!("{field} must not be empty")));
    }
    Ok(value)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::UserId;
    use crate::domain::event_record::fixtures;

    #[test]
    fn dto_carries_attendee_count() {
        let mut record = EventRecord::new(fixtures::details("tech"), UserId::generate());
        record.attendees.insert(UserId::generate());
        record.attendees.insert(UserId::generate());

        let dto = EventDto::from(record);
        assert_eq!(dto.attendee_count, 2);
        assert_eq!(dto.attendees.len(), 2);

        let Ok(json) = serde_json::to_value(&dto) else {
            panic!("serialize failed");
        };
        assert_eq!(json.get("attendeeCount"), Some(&serde_json::json!(2)));
        assert!(json.get("createdBy").is_some());
    }

    #[test]
    fn blank_name_is_rejected() {
        let req = CreateEventRequest {
            name: "  ".to_string(),
            description: String::new(),
            date: Utc::now(),
            location: "Hall".to_string(),
            category: "tech".to_string(),
            image_url: None,
        };
        assert!(matches!(
            req.into_details(),
            Err(GatewayError::InvalidRequest(_))
        ));
    }

    #[test]
    fn update_ignores_attendees_field() {
        let Ok(req) = serde_json::from_str::<UpdateEventRequest>(
            r#"{"location":"Annex","attendees":["65f1a2b3c4d5e6f708192a3b"]}"#,
        ) else {
            panic!("parse failed");
        };
        let Ok(patch) = req.into_patch() else {
            panic!("patch rejected");
        };
        assert_eq!(patch.location.as_deref(), Some("Annex"));
        assert!(patch.name.is_none());
    }

    #[test]
    fn blank_category_query_means_no_filter() {
        let filter = EventFilter::from(ListEventsQuery {
            category: Some(String::new()),
        });
        assert!(filter.category.is_none());
    }
}
