//! The client side of the remote backend: authentication, tables and RPCs.
//!
//! The rest of the application talks to the backend through two traits,
//! [AuthProvider] for the session lifecycle and [DataApi] for data access.
//! [SupabaseClient] implements both over HTTP.

use std::ops::Range;

use async_trait::async_trait;
use time::{Date, Month};
use tokio::sync::broadcast;

use crate::{
    auth::{Session, User, UserId},
    category::{Category, CategoryId, NewCategory},
    profile::Profile,
    summary::{MonthSummary, MonthlySummary, MonthlyTotals},
    transaction::{NewTransaction, Transaction},
};

mod error;
#[cfg(test)]
mod fake;
mod supabase;
pub mod wire;

pub use error::{BackendError, BackendErrorKind};
#[cfg(test)]
pub use fake::{Call, FakeBackend, Operation, test_session};
pub use supabase::{SupabaseClient, SupabaseConfig};

/// A change to the auth provider's session.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthEvent {
    SignedIn(Session),
    TokenRefreshed(Session),
    SignedOut,
}

/// Email and password for signing in.
#[derive(Debug, Clone, PartialEq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// The details needed to create an account.
#[derive(Debug, Clone, PartialEq)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub phone: Option<String>,
}

/// Which transactions to fetch. Results are always ordered by date, newest
/// first, and include the category name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionQuery {
    /// Only transactions dated within the half-open range.
    pub date_range: Option<Range<Date>>,
    /// The maximum number of transactions to return.
    pub limit: Option<usize>,
}

impl TransactionQuery {
    /// Every transaction of the signed-in user.
    pub fn all() -> Self {
        Self::default()
    }

    /// The `limit` most recent transactions.
    pub fn recent(limit: usize) -> Self {
        Self {
            date_range: None,
            limit: Some(limit),
        }
    }

    /// Transactions dated on or after `range.start` and before `range.end`.
    pub fn between(range: Range<Date>) -> Self {
        Self {
            date_range: Some(range),
            limit: None,
        }
    }
}

/// The auth provider's session lifecycle.
#[async_trait]
pub trait AuthProvider: Send + Sync + 'static {
    /// The current session, if any.
    ///
    /// A session that is about to expire is refreshed first.
    async fn get_session(&self) -> Result<Option<Session>, BackendError>;

    /// Exchange the stored refresh token for a new session.
    ///
    /// Returns `None` when nobody is signed in, or when the provider rejected
    /// the refresh token and the session has ended.
    async fn refresh_session(&self) -> Result<Option<Session>, BackendError>;

    /// Receive every future session change.
    fn subscribe(&self) -> broadcast::Receiver<AuthEvent>;

    async fn sign_in_with_password(
        &self,
        credentials: &Credentials,
    ) -> Result<Session, BackendError>;

    async fn sign_up(&self, request: &SignUpRequest) -> Result<(), BackendError>;

    async fn sign_out(&self) -> Result<(), BackendError>;

    /// Ask the auth provider who the current session belongs to.
    async fn get_user(&self) -> Result<User, BackendError>;
}

/// Tables and RPCs, always called on behalf of a signed-in user.
#[async_trait]
pub trait DataApi: Send + Sync + 'static {
    /// The profile row for `user_id`, if one exists.
    async fn get_profile(
        &self,
        session: &Session,
        user_id: &UserId,
    ) -> Result<Option<Profile>, BackendError>;

    /// The user's categories ordered by name.
    async fn list_categories(&self, session: &Session) -> Result<Vec<Category>, BackendError>;

    async fn insert_category(
        &self,
        session: &Session,
        category: &NewCategory,
    ) -> Result<Category, BackendError>;

    async fn delete_category(
        &self,
        session: &Session,
        category_id: CategoryId,
    ) -> Result<(), BackendError>;

    async fn list_transactions(
        &self,
        session: &Session,
        query: &TransactionQuery,
    ) -> Result<Vec<Transaction>, BackendError>;

    /// Insert a transaction and return the stored row with its category name.
    async fn insert_transaction(
        &self,
        session: &Session,
        transaction: &NewTransaction,
    ) -> Result<Transaction, BackendError>;

    /// Totals for the current month (`get_monthly_summary`).
    async fn monthly_summary(&self, session: &Session) -> Result<MonthlySummary, BackendError>;

    /// Per-month totals (`get_income_expense_by_month`).
    async fn income_expense_by_month(
        &self,
        session: &Session,
    ) -> Result<Vec<MonthlyTotals>, BackendError>;

    /// Totals for an arbitrary month (`obter_resumo_do_mes`).
    async fn month_summary(
        &self,
        session: &Session,
        year: i32,
        month: Month,
    ) -> Result<MonthSummary, BackendError>;
}
