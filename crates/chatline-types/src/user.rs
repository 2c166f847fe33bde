//! User identity and the per-request authentication context.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;

/// Prefix of the reserved handle pattern for ephemeral guest accounts.
pub const GUEST_HANDLE_PREFIX: &str = "guest-";

/// Whether an account is persistent or an ephemeral guest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserKind {
    Regular,
    Guest,
}

impl UserKind {
    /// Classify a handle: `guest-<digits>` is a guest, anything else is regular.
    pub fn from_email(email: &str) -> Self {
        if is_guest_handle(email) {
            UserKind::Guest
        } else {
            UserKind::Regular
        }
    }
}

impl fmt::Display for UserKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserKind::Regular => write!(f, "regular"),
            UserKind::Guest => write!(f, "guest"),
        }
    }
}

/// Returns true when `email` matches the reserved guest pattern `guest-<digits>`.
pub fn is_guest_handle(email: &str) -> bool {
    email
        .strip_prefix(GUEST_HANDLE_PREFIX)
        .is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
}

/// A registered (or guest) account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    /// Unique email-like handle.
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn kind(&self) -> UserKind {
        UserKind::from_email(&self.email)
    }
}

/// Verified caller identity, produced by the transport's authentication step
/// and passed explicitly into every chat operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub kind: UserKind,
}

impl AuthContext {
    pub fn new(user_id: Uuid, kind: UserKind) -> Self {
        Self { user_id, kind }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guest_handle_detection() {
        assert!(is_guest_handle("guest-1700000000000"));
        assert!(is_guest_handle("guest-7"));
        assert!(!is_guest_handle("guest-"));
        assert!(!is_guest_handle("guest-abc"));
        assert!(!is_guest_handle("guest_123"));
        assert!(!is_guest_handle("alice@example.com"));
    }

    #[test]
    fn test_user_kind_from_email() {
        assert_eq!(UserKind::from_email("guest-42"), UserKind::Guest);
        assert_eq!(UserKind::from_email("bob@example.com"), UserKind::Regular);
    }

    #[test]
    fn test_user_kind_serde() {
        let json = serde_json::to_string(&UserKind::Guest).unwrap();
        assert_eq!(json, "\"guest\"");
    }
}
