//! Association types.
//!
//! An association is a shared secret negotiated with one provider. It is
//! identified by an opaque handle and is valid between `issued` and
//! `expires`. Associations never change after construction; storing a new
//! association under an existing handle is the only form of update.

use crate::constants::MAX_HANDLE_LENGTH;
use crate::error::{RelyingPartyError, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque association handle.
///
/// Handles are 1 to 255 printable ASCII characters (`0x21..=0x7E`).
///
/// # Examples
///
/// ```
/// # use openid_relying_party::AssociationHandle;
/// assert!(AssociationHandle::new("{HMAC-SHA256}{abc}").is_ok());
/// assert!(AssociationHandle::new("has space").is_err());
/// assert!(AssociationHandle::new("").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AssociationHandle(String);

impl AssociationHandle {
    /// Validate and wrap a handle.
    ///
    /// # Errors
    ///
    /// Returns [`RelyingPartyError::InvalidAssociationHandle`] if the handle is
    /// empty, longer than 255 characters, or contains non-printable or
    /// non-ASCII characters.
    pub fn new(handle: impl Into<String>) -> Result<Self> {
        let handle = handle.into();
        if handle.is_empty() {
            return Err(RelyingPartyError::InvalidAssociationHandle {
                reason: "handle is empty".to_string(),
            });
        }
        if handle.len() > MAX_HANDLE_LENGTH {
            return Err(RelyingPartyError::InvalidAssociationHandle {
                reason: format!("handle exceeds {MAX_HANDLE_LENGTH} characters"),
            });
        }
        if !handle.bytes().all(|b| (0x21..=0x7E).contains(&b)) {
            return Err(RelyingPartyError::InvalidAssociationHandle {
                reason: "handle must be printable ASCII without spaces".to_string(),
            });
        }
        Ok(Self(handle))
    }

    /// Borrow the handle string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssociationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for AssociationHandle {
    type Error = RelyingPartyError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<AssociationHandle> for String {
    fn from(handle: AssociationHandle) -> Self {
        handle.0
    }
}

/// Shared secret negotiated with a provider.
///
/// The secret is only handed to the signing collaborator; `Debug` output
/// redacts it. Serialization encodes it as standard base64 so durable
/// backing stores can persist associations as JSON.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Association {
    handle: AssociationHandle,

    #[serde(with = "secret_base64")]
    secret: Vec<u8>,

    issued: DateTime<Utc>,

    expires: DateTime<Utc>,
}

impl Association {
    /// Create an association issued at `issued` and valid for `lifetime`.
    #[must_use]
    pub fn new(
        handle: AssociationHandle,
        secret: Vec<u8>,
        issued: DateTime<Utc>,
        lifetime: Duration,
    ) -> Self {
        Self {
            handle,
            secret,
            issued,
            expires: issued + lifetime,
        }
    }

    /// Association handle.
    #[must_use]
    pub const fn handle(&self) -> &AssociationHandle {
        &self.handle
    }

    /// Shared secret bytes.
    #[must_use]
    pub fn secret(&self) -> &[u8] {
        &self.secret
    }

    /// When the association was issued.
    #[must_use]
    pub const fn issued(&self) -> DateTime<Utc> {
        self.issued
    }

    /// When the association stops being usable.
    #[must_use]
    pub const fn expires(&self) -> DateTime<Utc> {
        self.expires
    }

    /// Whether the association has expired according to the system clock.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Whether the association has expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires
    }

    /// Remaining lifetime at `now` (negative once expired).
    #[must_use]
    pub fn time_until_expiry(&self, now: DateTime<Utc>) -> Duration {
        self.expires - now
    }
}

impl fmt::Debug for Association {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Association")
            .field("handle", &self.handle)
            .field("secret", &"<redacted>")
            .field("issued", &self.issued)
            .field("expires", &self.expires)
            .finish()
    }
}

mod secret_base64 {
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(secret: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(secret))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn at(rfc3339: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(rfc3339)
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_handle_length_limit() {
        assert!(AssociationHandle::new("a".repeat(255)).is_ok());
        let err = AssociationHandle::new("a".repeat(256)).unwrap_err();
        assert!(matches!(err, RelyingPartyError::InvalidAssociationHandle { .. }));
    }

    #[test]
    fn test_handle_rejects_non_ascii() {
        assert!(AssociationHandle::new("handle\u{e9}").is_err());
        assert!(AssociationHandle::new("tab\there").is_err());
    }

    #[test]
    fn test_expiry_boundary_is_inclusive() {
        let issued = at("2025-01-01T00:00:00Z");
        let assoc = Association::new(
            AssociationHandle::new("h1").unwrap(),
            vec![1, 2, 3],
            issued,
            Duration::seconds(60),
        );

        assert!(!assoc.is_expired_at(issued + Duration::seconds(59)));
        assert!(assoc.is_expired_at(issued + Duration::seconds(60)));
        assert_eq!(assoc.time_until_expiry(issued), Duration::seconds(60));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let assoc = Association::new(
            AssociationHandle::new("h1").unwrap(),
            b"super-secret".to_vec(),
            at("2025-01-01T00:00:00Z"),
            Duration::hours(1),
        );

        let debug = format!("{assoc:?}");
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("115, 117"));
    }

    #[test]
    fn test_json_persistence_encodes_secret_as_base64() {
        let assoc = Association::new(
            AssociationHandle::new("h1").unwrap(),
            vec![0xde, 0xad, 0xbe, 0xef],
            at("2025-01-01T00:00:00Z"),
            Duration::hours(1),
        );

        let json = serde_json::to_value(&assoc).unwrap();
        assert_eq!(json["secret"], "3q2+7w==");
        assert_eq!(json["handle"], "h1");

        let restored: Association = serde_json::from_value(json).unwrap();
        assert_eq!(restored, assoc);
    }

    #[test]
    fn test_deserialize_rejects_invalid_handle() {
        let json = serde_json::json!({
            "handle": "bad handle",
            "secret": "",
            "issued": "2025-01-01T00:00:00Z",
            "expires": "2025-01-01T01:00:00Z",
        });
        assert!(serde_json::from_value::<Association>(json).is_err());
    }
}
