//! Loads the signed-in user's display name for the page layout.

use std::sync::{Arc, Mutex, PoisonError};

use axum::extract::FromRef;
use serde::Deserialize;
use tokio::sync::watch;

use crate::{
    AppState,
    auth::{Session, SessionContext, SessionState, UserId},
    backend::{AuthProvider, DataApi},
};

/// A row of the `profiles` table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Profile {
    pub full_name: Option<String>,
}

/// Remembers the display name of the signed-in user until the session
/// changes.
pub struct ProfileCache {
    inner: Mutex<CacheEntry>,
}

struct CacheEntry {
    session_changes: watch::Receiver<SessionState>,
    display_name: Option<(UserId, Option<String>)>,
}

impl ProfileCache {
    pub fn new(session: &SessionContext) -> Self {
        Self {
            inner: Mutex::new(CacheEntry {
                session_changes: session.subscribe(),
                display_name: None,
            }),
        }
    }

    /// The cached display name for `user_id`.
    ///
    /// The outer `Option` is `None` on a cache miss.
    fn get(&self, user_id: &UserId) -> Option<Option<String>> {
        let mut entry = self.inner.lock().unwrap_or_else(PoisonError::into_inner);

        // A closed channel means the session can no longer change.
        if entry.session_changes.has_changed().unwrap_or(false) {
            entry.session_changes.borrow_and_update();
            entry.display_name = None;
        }

        entry
            .display_name
            .as_ref()
            .filter(|(cached_user, _)| cached_user == user_id)
            .map(|(_, display_name)| display_name.clone())
    }

    fn insert(&self, user_id: UserId, display_name: Option<String>) {
        let mut entry = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        entry.display_name = Some((user_id, display_name));
    }
}

/// The state needed to load a profile.
#[derive(Clone)]
pub struct ProfileState {
    pub auth: Arc<dyn AuthProvider>,
    pub data: Arc<dyn DataApi>,
    pub profiles: Arc<ProfileCache>,
}

impl FromRef<AppState> for ProfileState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            auth: state.auth.clone(),
            data: state.data.clone(),
            profiles: state.profiles.clone(),
        }
    }
}

/// Get the display name of the signed-in user.
///
/// Asks the auth provider for the user and then reads their profile row.
/// Failures are logged and yield no name, the page renders without it.
pub async fn load_display_name(state: &ProfileState, session: &Session) -> Option<String> {
    if let Some(display_name) = state.profiles.get(session.user_id()) {
        return display_name;
    }

    let user = state
        .auth
        .get_user()
        .await
        .inspect_err(|error| tracing::warn!("Could not get the signed-in user: {error}"))
        .ok()?;

    let profile = state
        .data
        .get_profile(session, &user.id)
        .await
        .inspect_err(|error| {
            tracing::warn!("Could not load the profile for user {}: {error}", user.id)
        })
        .ok()?;

    let display_name = match profile {
        Some(profile) => profile
            .full_name
            .map(|name| name.trim().to_owned())
            .filter(|name| !name.is_empty()),
        None => {
            tracing::warn!("User {} has no profile row", user.id);
            None
        }
    };

    state.profiles.insert(user.id, display_name.clone());

    display_name
}
