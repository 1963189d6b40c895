//! Dedup-ledger anchor resolution
//!
//! Every gateway event must map to exactly one stable anchor key so that
//! repeated deliveries converge on the same ledger row. Resolution order
//! is fixed: purchase id, else gateway event id, else intent id.

use crate::error::{AppError, ErrorCode};
use serde::{Deserialize, Serialize};

/// Typed dedup-ledger key, carrying which identifier won resolution
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnchorKey {
    Purchase(String),
    Event(String),
    Intent(String),
}

impl AnchorKey {
    /// Resolve the anchor for an event: first available identifier wins
    pub fn resolve(
        purchase_id: Option<&str>,
        event_id: Option<&str>,
        intent_id: Option<&str>,
    ) -> Result<Self, AppError> {
        if let Some(id) = purchase_id.filter(|s| !s.is_empty()) {
            Ok(Self::Purchase(id.to_string()))
        } else if let Some(id) = event_id.filter(|s| !s.is_empty()) {
            Ok(Self::Event(id.to_string()))
        } else if let Some(id) = intent_id.filter(|s| !s.is_empty()) {
            Ok(Self::Intent(id.to_string()))
        } else {
            Err(AppError::new(ErrorCode::AnchorUnresolved))
        }
    }

    /// The stored key string (the ledger's primary key)
    pub fn as_str(&self) -> &str {
        match self {
            Self::Purchase(id) | Self::Event(id) | Self::Intent(id) => id,
        }
    }

    /// Purchase-level anchors refer to a logical purchase; event/intent
    /// anchors are fallbacks for events that never carried one
    pub fn is_purchase(&self) -> bool {
        matches!(self, Self::Purchase(_))
    }
}

impl std::fmt::Display for AnchorKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_purchase_id_wins() {
        let key =
            AnchorKey::resolve(Some("pu_1"), Some("evt_1"), Some("pi_1")).unwrap();
        assert_eq!(key, AnchorKey::Purchase("pu_1".into()));
        assert!(key.is_purchase());
    }

    #[test]
    fn test_event_id_second() {
        let key = AnchorKey::resolve(None, Some("evt_1"), Some("pi_1")).unwrap();
        assert_eq!(key, AnchorKey::Event("evt_1".into()));
        assert!(!key.is_purchase());
    }

    #[test]
    fn test_intent_id_last() {
        let key = AnchorKey::resolve(None, None, Some("pi_1")).unwrap();
        assert_eq!(key, AnchorKey::Intent("pi_1".into()));
    }

    #[test]
    fn test_empty_strings_skipped() {
        let key = AnchorKey::resolve(Some(""), Some("evt_1"), None).unwrap();
        assert_eq!(key, AnchorKey::Event("evt_1".into()));
    }

    #[test]
    fn test_no_identifier_is_an_error() {
        let err = AnchorKey::resolve(None, None, None).unwrap_err();
        assert_eq!(err.code, ErrorCode::AnchorUnresolved);

        let err = AnchorKey::resolve(Some(""), Some(""), Some("")).unwrap_err();
        assert_eq!(err.code, ErrorCode::AnchorUnresolved);
    }

    #[test]
    fn test_as_str_and_display() {
        let key = AnchorKey::Purchase("pu_9".into());
        assert_eq!(key.as_str(), "pu_9");
        assert_eq!(format!("{key}"), "pu_9");
    }
}
