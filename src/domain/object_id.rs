//! Type-safe 12-byte object identifiers for events and users.
//!
//! Both event and user identifiers travel as 24-character hexadecimal
//! strings. [`ObjectId`] holds the decoded bytes; [`EventId`] and
//! [`UserId`] are newtypes over it so that the two cannot be confused.
//! Parsing is the well-formedness check applied at every ingress boundary:
//! a value that does not parse never reaches the store.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Number of raw bytes in an object id.
pub const OBJECT_ID_LEN: usize = 12;

/// Number of hex characters in the textual form of an object id.
pub const OBJECT_ID_HEX_LEN: usize = OBJECT_ID_LEN * 2;

/// Error returned when a string is not a 24-character hex identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("expected {OBJECT_ID_HEX_LEN} hexadecimal characters")]
pub struct MalformedObjectId;

/// Raw 12-byte identifier rendered as lowercase hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; OBJECT_ID_LEN]);

impl ObjectId {
    /// Generates a fresh id: 4 bytes of big-endian unix seconds followed by
    /// 8 random bytes.
    #[must_use]
    pub fn generate() -> Self {
        let secs = u32::try_from(chrono::Utc::now().timestamp()).unwrap_or(u32::MAX);
        let entropy = uuid::Uuid::new_v4();
        let mut bytes = [0u8; OBJECT_ID_LEN];
        for (dst, src) in bytes
            .iter_mut()
            .zip(secs.to_be_bytes().iter().chain(entropy.as_bytes().iter()))
        {
            *dst = *src;
        }
        Self(bytes)
    }
}

impl FromStr for ObjectId {
    type Err = MalformedObjectId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != OBJECT_ID_HEX_LEN || !s.is_ascii() {
            return Err(MalformedObjectId);
        }
        let mut bytes = [0u8; OBJECT_ID_LEN];
        for (dst, pair) in bytes.iter_mut().zip(s.as_bytes().chunks_exact(2)) {
            let [hi, lo] = pair else {
                return Err(MalformedObjectId);
            };
            *dst = (hex_value(*hi)? << 4) | hex_value(*lo)?;
        }
        Ok(Self(bytes))
    }
}

fn hex_value(c: u8) -> Result<u8, MalformedObjectId> {
    match c {
        b'0'..=b'9' => Ok(c - b'0'),
        b'a'..=b'f' => Ok(c - b'a' + 10),
        b'A'..=b'F' => Ok(c - b'A' + 10),
        _ => Err(MalformedObjectId),
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Unique identifier of an event record.
///
/// Used as the key in the attendance store, the room key in the
/// [`crate::broadcast::RoomRegistry`] and the
/// `eventId` field of every broadcast frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(ObjectId);

impl EventId {
    /// Generates a new event id.
    #[must_use]
    pub fn generate() -> Self {
        Self(ObjectId::generate())
    }
}

impl FromStr for EventId {
    type Err = MalformedObjectId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Unique identifier of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(ObjectId);

impl UserId {
    /// Generates a new user id. Mostly useful in tests; user ids are
    /// normally issued by the identity provider.
    #[must_use]
    pub fn generate() -> Self {
        Self(ObjectId::generate())
    }
}

impl FromStr for UserId {
    type Err = MalformedObjectId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Names the identifier field that failed validation, using the wire
/// spelling clients send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierField {
    /// The `eventId` field.
    EventId,
    /// The `userId` field.
    UserId,
}

impl fmt::Display for IdentifierField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EventId => f.write_str("eventId"),
            Self::UserId => f.write_str("userId"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    const SAMPLE: &str = "65f1a2b3c4d5e6f708192a3b";

    #[test]
    fn parses_lowercase_hex() {
        let Ok(id) = SAMPLE.parse::<ObjectId>() else {
            panic!("valid id rejected");
        };
        assert_eq!(id.to_string(), SAMPLE);
    }

    #[test]
    fn uppercase_is_normalized() {
        let Ok(id) = SAMPLE.to_uppercase().parse::<EventId>() else {
            panic!("uppercase id rejected");
        };
        assert_eq!(id.to_string(), SAMPLE);
    }

    #[test]
    fn rejects_wrong_length() {
        assert!("65f1a2b3".parse::<ObjectId>().is_err());
        assert!(format!("{SAMPLE}00").parse::<ObjectId>().is_err());
        assert!("".parse::<ObjectId>().is_err());
    }

    #[test]
    fn rejects_non_hex() {
        assert!("not-a-valid-id-at-all!!!".parse::<UserId>().is_err());
        assert!("zzf1a2b3c4d5e6f708192a3b".parse::<UserId>().is_err());
    }

    #[test]
    fn rejects_multibyte_input_of_matching_length() {
        // 22 ASCII chars + one 2-byte char = 24 bytes
        assert!("65f1a2b3c4d5e6f708192aé".parse::<ObjectId>().is_err());
    }

    #[test]
    fn generated_ids_are_unique_and_round_trip() {
        let a = EventId::generate();
        let b = EventId::generate();
        assert_ne!(a, b);
        assert_eq!(a.to_string().parse::<EventId>().ok(), Some(a));
    }

    #[test]
    fn serde_uses_hex_string() {
        let Ok(id) = SAMPLE.parse::<UserId>() else {
            panic!("valid id rejected");
        };
        let json = serde_json::to_string(&id).unwrap_or_default();
        assert_eq!(json, format!("\"{SAMPLE}\""));

        let bad = serde_json::from_str::<UserId>("\"xyz\"");
        assert!(bad.is_err());
    }

    #[test]
    fn field_names_match_wire_spelling() {
        assert_eq!(IdentifierField::EventId.to_string(), "eventId");
        assert_eq!(IdentifierField::UserId.to_string(), "userId");
    }
}
