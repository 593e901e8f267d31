//! Implements a struct that holds the state of the web server.

use std::sync::Arc;

use crate::{
    Error,
    auth::SessionContext,
    backend::{AuthProvider, DataApi},
    profile::ProfileCache,
    timezone::get_local_offset,
    transaction::TransactionsPageSlot,
};

/// The state of the web server.
#[derive(Clone)]
pub struct AppState {
    /// The auth provider's session lifecycle.
    pub auth: Arc<dyn AuthProvider>,

    /// Tables and RPCs of the remote backend.
    pub data: Arc<dyn DataApi>,

    /// The process-wide mirror of the auth provider's session.
    pub session: SessionContext,

    /// The signed-in user's display name.
    pub profiles: Arc<ProfileCache>,

    /// The currently mounted transactions page.
    pub transactions_page: Arc<TransactionsPageSlot>,

    /// The local timezone as a canonical timezone name, e.g. "America/Sao_Paulo".
    pub local_timezone: String,
}

impl AppState {
    /// Create a new [AppState] over the given backend.
    ///
    /// `session` should be the context mounted on `auth`. `local_timezone`
    /// should be a valid, canonical timezone name, e.g. "America/Sao_Paulo".
    ///
    /// # Errors
    /// Returns [Error::InvalidTimezoneError] if the timezone is not known.
    pub fn new(
        auth: Arc<dyn AuthProvider>,
        data: Arc<dyn DataApi>,
        session: SessionContext,
        local_timezone: &str,
    ) -> Result<Self, Error> {
        if get_local_offset(local_timezone).is_none() {
            return Err(Error::InvalidTimezoneError(local_timezone.to_owned()));
        }

        Ok(Self {
            auth,
            data,
            profiles: Arc::new(ProfileCache::new(&session)),
            transactions_page: Arc::new(TransactionsPageSlot::new(&session)),
            session,
            local_timezone: local_timezone.to_owned(),
        })
    }
}
