//! The process-wide mirror of the auth provider's session.
//!
//! The context is mounted once at start up. A background listener resolves
//! the initial session, follows the provider's auth events and refreshes the
//! access token shortly before it expires. Views read the context instead of
//! asking the provider themselves.

use std::{future, sync::Arc, time::Duration};

use time::OffsetDateTime;
use tokio::{
    sync::{broadcast, watch},
    task::JoinHandle,
};

use crate::{
    auth::Session,
    backend::{AuthEvent, AuthProvider},
};

/// How long before expiry the listener asks the provider for a fresh token.
const REFRESH_LEAD: time::Duration = time::Duration::seconds(90);

/// What the context currently knows about the session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// The initial lookup has not finished yet.
    Resolving,
    Resolved(Option<Session>),
}

/// The session as seen by views.
#[derive(Debug, Clone, PartialEq)]
pub enum CurrentSession {
    Resolving,
    SignedOut,
    SignedIn(Session),
}

/// Shared handle to the session state. Cloning is cheap.
#[derive(Clone)]
pub struct SessionContext {
    state: Arc<watch::Sender<SessionState>>,
}

impl SessionContext {
    /// Start mirroring `auth`.
    ///
    /// The context starts out [SessionState::Resolving]. The returned
    /// subscription owns the listener task, dropping it stops the mirroring.
    pub fn mount(auth: Arc<dyn AuthProvider>) -> (Self, SessionSubscription) {
        let (state, _) = watch::channel(SessionState::Resolving);
        let context = Self {
            state: Arc::new(state),
        };
        // Subscribe before the initial lookup so that no event is missed.
        let events = auth.subscribe();
        let handle = tokio::spawn(listen(auth, context.clone(), events));

        (context, SessionSubscription { handle })
    }

    /// A context that has already resolved to `session` and has no listener.
    pub fn resolved(session: Option<Session>) -> Self {
        let (state, _) = watch::channel(SessionState::Resolved(session));

        Self {
            state: Arc::new(state),
        }
    }

    /// A context that never resolves.
    #[cfg(test)]
    pub fn resolving() -> Self {
        let (state, _) = watch::channel(SessionState::Resolving);

        Self {
            state: Arc::new(state),
        }
    }

    /// The current session. Expired sessions read as signed out.
    pub fn current(&self) -> CurrentSession {
        match &*self.state.borrow() {
            SessionState::Resolving => CurrentSession::Resolving,
            SessionState::Resolved(Some(session))
                if !session.is_expired(OffsetDateTime::now_utc()) =>
            {
                CurrentSession::SignedIn(session.clone())
            }
            SessionState::Resolved(_) => CurrentSession::SignedOut,
        }
    }

    /// The current session if the user is signed in.
    pub fn session(&self) -> Option<Session> {
        match self.current() {
            CurrentSession::SignedIn(session) => Some(session),
            CurrentSession::Resolving | CurrentSession::SignedOut => None,
        }
    }

    /// Observe every change to the session.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Wait until the context reports `session`'s user as signed in.
    ///
    /// Returns `false` if that did not happen within `timeout`.
    pub async fn wait_for_sign_in(&self, session: &Session, timeout: Duration) -> bool {
        let user_id = session.user_id().clone();

        self.wait_until(timeout, |state| {
            matches!(state, SessionState::Resolved(Some(current)) if *current.user_id() == user_id)
        })
        .await
    }

    /// Wait until the context reports that nobody is signed in.
    pub async fn wait_for_sign_out(&self, timeout: Duration) -> bool {
        self.wait_until(timeout, |state| *state == SessionState::Resolved(None))
            .await
    }

    async fn wait_until(
        &self,
        timeout: Duration,
        predicate: impl FnMut(&SessionState) -> bool,
    ) -> bool {
        let mut receiver = self.state.subscribe();

        matches!(
            tokio::time::timeout(timeout, receiver.wait_for(predicate)).await,
            Ok(Ok(_))
        )
    }

    /// Publish `session`. Observers are only notified if it differs from
    /// what they last saw.
    fn set(&self, session: Option<Session>) {
        let resolved = SessionState::Resolved(session);

        self.state.send_if_modified(|state| {
            if *state == resolved {
                false
            } else {
                *state = resolved;
                true
            }
        });
    }

    fn apply(&self, event: AuthEvent) {
        match event {
            AuthEvent::SignedIn(session) => {
                tracing::info!("Auth event: signed in as user {}", session.user_id());
                self.set(Some(session));
            }
            AuthEvent::TokenRefreshed(session) => {
                tracing::info!("Auth event: token refreshed for user {}", session.user_id());
                self.set(Some(session));
            }
            AuthEvent::SignedOut => {
                tracing::info!("Auth event: signed out");
                self.set(None);
            }
        }
    }

    /// The raw stored session, ignoring expiry.
    fn stored_session(&self) -> Option<Session> {
        match &*self.state.borrow() {
            SessionState::Resolved(session) => session.clone(),
            SessionState::Resolving => None,
        }
    }
}

/// Keeps the session listener alive. Dropping it stops the listener.
pub struct SessionSubscription {
    handle: JoinHandle<()>,
}

impl SessionSubscription {
    /// Stop following the auth provider.
    pub fn unsubscribe(self) {
        drop(self);
    }

    /// Whether the listener has stopped.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for SessionSubscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn listen(
    auth: Arc<dyn AuthProvider>,
    context: SessionContext,
    mut events: broadcast::Receiver<AuthEvent>,
) {
    resync(auth.as_ref(), &context).await;

    // The access token whose refresh last failed. It is not retried, the
    // session simply expires.
    let mut failed_refresh: Option<String> = None;

    loop {
        let refresh_in = context
            .stored_session()
            .filter(|session| failed_refresh.as_deref() != Some(session.access_token.as_str()))
            .map(|session| time_until(session.expires_at - REFRESH_LEAD));

        let refresh_due = async {
            match refresh_in {
                Some(delay) => tokio::time::sleep(delay).await,
                None => future::pending().await,
            }
        };

        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => context.apply(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!("Missed {skipped} auth events, looking up the session again");
                    resync(auth.as_ref(), &context).await;
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::debug!("Auth event channel closed, stopping the session listener");
                    break;
                }
            },
            _ = refresh_due => {
                let stale_token = context.stored_session().map(|session| session.access_token);

                match auth.refresh_session().await {
                    Ok(Some(session)) if Some(&session.access_token) == stale_token.as_ref() => {
                        tracing::warn!("The auth provider handed back the same access token");
                        failed_refresh = stale_token;
                    }
                    Ok(session) => context.set(session),
                    Err(error) => {
                        tracing::warn!("Could not refresh the session: {error}");
                        failed_refresh = stale_token;
                    }
                }
            }
        }
    }
}

async fn resync(auth: &dyn AuthProvider, context: &SessionContext) {
    match auth.get_session().await {
        Ok(session) => context.set(session),
        Err(error) => {
            tracing::error!("Could not get the current session, treating it as signed out: {error}");
            context.set(None);
        }
    }
}

fn time_until(instant: OffsetDateTime) -> Duration {
    Duration::try_from(instant - OffsetDateTime::now_utc()).unwrap_or_default()
}
