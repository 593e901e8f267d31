//! The signed-in user and the session issued to them by the auth provider.

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// A newtype wrapper for the auth provider's user IDs.
///
/// This helps disambiguate user IDs from other string values, e.g. access
/// tokens, leading to better compile time errors.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Create a new user ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A user as known by the auth provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    #[serde(default)]
    pub email: Option<String>,
}

/// An authenticated identity issued by the auth provider.
///
/// The auth provider owns the session, this application only mirrors it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// The bearer token sent with every data request.
    pub access_token: String,
    /// The token used to obtain a new access token once this one expires.
    pub refresh_token: String,
    /// The instant after which `access_token` is no longer accepted.
    pub expires_at: OffsetDateTime,
    pub user: User,
}

impl Session {
    /// Whether the session has expired at `now`.
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        now >= self.expires_at
    }

    pub fn user_id(&self) -> &UserId {
        &self.user.id
    }
}
