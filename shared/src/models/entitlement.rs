//! Entitlement (access grant) model

use serde::{Deserialize, Serialize};

/// What kind of access a sale line grants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntitlementKind {
    EventEntry,
    TournamentEntry,
}

impl EntitlementKind {
    pub fn as_db(&self) -> &'static str {
        match self {
            Self::EventEntry => "EVENT_ENTRY",
            Self::TournamentEntry => "TOURNAMENT_ENTRY",
        }
    }

    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "EVENT_ENTRY" => Some(Self::EventEntry),
            "TOURNAMENT_ENTRY" => Some(Self::TournamentEntry),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntitlementStatus {
    Active,
    Revoked,
}

impl EntitlementStatus {
    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Revoked => "REVOKED",
        }
    }

    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "ACTIVE" => Some(Self::Active),
            "REVOKED" => Some(Self::Revoked),
            _ => None,
        }
    }
}

/// Stable owner key for entitlement deduplication
///
/// Precedence on derivation: identity > user > email > unknown. The
/// string form is part of the entitlement's composite unique key, so it
/// must be stable across retries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OwnerKey {
    Identity(String),
    User(String),
    Email(String),
    Unknown,
}

impl OwnerKey {
    /// Derive the owner key from whatever identifiers the event carried
    pub fn derive(
        identity_id: Option<&str>,
        user_id: Option<&str>,
        email: Option<&str>,
    ) -> Self {
        if let Some(id) = identity_id.filter(|s| !s.is_empty()) {
            Self::Identity(id.to_string())
        } else if let Some(id) = user_id.filter(|s| !s.is_empty()) {
            Self::User(id.to_string())
        } else if let Some(e) = email.filter(|s| !s.is_empty()) {
            Self::Email(e.to_lowercase())
        } else {
            Self::Unknown
        }
    }

    pub fn as_key(&self) -> String {
        match self {
            Self::Identity(id) => format!("identity:{id}"),
            Self::User(id) => format!("user:{id}"),
            Self::Email(e) => format!("email:{e}"),
            Self::Unknown => "unknown".to_string(),
        }
    }
}

/// Access grant derived from a paid sale line
///
/// Unique by `(purchase_id, sale_line_id, line_index, owner_key, kind)`,
/// so upserting per seat is safe to run on every fulfillment pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entitlement {
    pub id: String,
    pub purchase_id: String,
    pub sale_line_id: String,
    pub line_index: i32,
    pub owner_key: String,
    pub kind: EntitlementKind,
    pub status: EntitlementStatus,
    pub created_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_key_precedence() {
        let key = OwnerKey::derive(Some("idn_1"), Some("us_1"), Some("a@b.c"));
        assert_eq!(key, OwnerKey::Identity("idn_1".into()));

        let key = OwnerKey::derive(None, Some("us_1"), Some("a@b.c"));
        assert_eq!(key, OwnerKey::User("us_1".into()));

        let key = OwnerKey::derive(None, None, Some("a@b.c"));
        assert_eq!(key, OwnerKey::Email("a@b.c".into()));

        let key = OwnerKey::derive(None, None, None);
        assert_eq!(key, OwnerKey::Unknown);
    }

    #[test]
    fn test_owner_key_empty_strings_skipped() {
        let key = OwnerKey::derive(Some(""), Some("us_1"), None);
        assert_eq!(key, OwnerKey::User("us_1".into()));
    }

    #[test]
    fn test_owner_key_email_lowercased() {
        let key = OwnerKey::derive(None, None, Some("Jane@Example.COM"));
        assert_eq!(key.as_key(), "email:jane@example.com");
    }

    #[test]
    fn test_owner_key_string_form() {
        assert_eq!(OwnerKey::Identity("x".into()).as_key(), "identity:x");
        assert_eq!(OwnerKey::User("y".into()).as_key(), "user:y");
        assert_eq!(OwnerKey::Unknown.as_key(), "unknown");
    }

    #[test]
    fn test_kind_roundtrip() {
        assert_eq!(
            EntitlementKind::from_db("EVENT_ENTRY"),
            Some(EntitlementKind::EventEntry)
        );
        assert_eq!(
            EntitlementKind::from_db("TOURNAMENT_ENTRY"),
            Some(EntitlementKind::TournamentEntry)
        );
        assert_eq!(EntitlementKind::from_db("OTHER"), None);
    }
}
