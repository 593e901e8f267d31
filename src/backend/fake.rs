//! An in-memory backend for tests that records every call it receives.

use std::sync::{
    Mutex,
    atomic::{AtomicI64, Ordering},
};

use async_trait::async_trait;
use time::{Duration, Month, OffsetDateTime};
use tokio::sync::broadcast;

use crate::{
    auth::{Session, User, UserId},
    category::{Category, CategoryId, NewCategory, compare_by_name},
    profile::Profile,
    summary::{MonthSummary, MonthlySummary, MonthlyTotals},
    transaction::{NewTransaction, Transaction},
};

use super::{
    AuthEvent, AuthProvider, BackendError, BackendErrorKind, Credentials, DataApi, SignUpRequest,
    TransactionQuery,
};

/// A session that expires an hour from now.
pub fn test_session() -> Session {
    Session {
        access_token: "test-access-token".to_owned(),
        refresh_token: "test-refresh-token".to_owned(),
        expires_at: OffsetDateTime::now_utc() + Duration::hours(1),
        user: User {
            id: UserId::new("user-1"),
            email: Some("ana@example.com".to_owned()),
        },
    }
}

/// A request received by [FakeBackend].
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    GetSession,
    RefreshSession,
    SignIn { email: String },
    SignUp(SignUpRequest),
    SignOut,
    GetUser,
    GetProfile(UserId),
    ListCategories,
    InsertCategory(NewCategory),
    DeleteCategory(CategoryId),
    ListTransactions(TransactionQuery),
    InsertTransaction(NewTransaction),
    MonthlySummary,
    IncomeExpenseByMonth,
    MonthSummary { year: i32, month: Month },
}

/// Identifies a kind of [Call] that should fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    GetSession,
    RefreshSession,
    SignIn,
    SignUp,
    SignOut,
    GetUser,
    GetProfile,
    ListCategories,
    InsertCategory,
    DeleteCategory,
    ListTransactions,
    InsertTransaction,
    MonthlySummary,
    IncomeExpenseByMonth,
    MonthSummary,
}

impl Call {
    fn operation(&self) -> Operation {
        match self {
            Call::GetSession => Operation::GetSession,
            Call::RefreshSession => Operation::RefreshSession,
            Call::SignIn { .. } => Operation::SignIn,
            Call::SignUp(_) => Operation::SignUp,
            Call::SignOut => Operation::SignOut,
            Call::GetUser => Operation::GetUser,
            Call::GetProfile(_) => Operation::GetProfile,
            Call::ListCategories => Operation::ListCategories,
            Call::InsertCategory(_) => Operation::InsertCategory,
            Call::DeleteCategory(_) => Operation::DeleteCategory,
            Call::ListTransactions(_) => Operation::ListTransactions,
            Call::InsertTransaction(_) => Operation::InsertTransaction,
            Call::MonthlySummary => Operation::MonthlySummary,
            Call::IncomeExpenseByMonth => Operation::IncomeExpenseByMonth,
            Call::MonthSummary { .. } => Operation::MonthSummary,
        }
    }
}

pub struct FakeBackend {
    session: Mutex<Option<Session>>,
    events: broadcast::Sender<AuthEvent>,
    calls: Mutex<Vec<Call>>,
    failing: Mutex<Vec<Operation>>,
    profile: Mutex<Option<Profile>>,
    categories: Mutex<Vec<Category>>,
    transactions: Mutex<Vec<Transaction>>,
    monthly_summary: Mutex<MonthlySummary>,
    monthly_totals: Mutex<Vec<MonthlyTotals>>,
    month_summary: Mutex<MonthSummary>,
    next_id: AtomicI64,
    refreshes: AtomicI64,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeBackend {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(16);

        Self {
            session: Mutex::new(None),
            events,
            calls: Mutex::new(Vec::new()),
            failing: Mutex::new(Vec::new()),
            profile: Mutex::new(None),
            categories: Mutex::new(Vec::new()),
            transactions: Mutex::new(Vec::new()),
            monthly_summary: Mutex::new(MonthlySummary::default()),
            monthly_totals: Mutex::new(Vec::new()),
            month_summary: Mutex::new(MonthSummary::default()),
            next_id: AtomicI64::new(100),
            refreshes: AtomicI64::new(0),
        }
    }

    pub fn with_session(self, session: Session) -> Self {
        *self.session.lock().unwrap() = Some(session);
        self
    }

    pub fn with_profile(self, full_name: Option<&str>) -> Self {
        *self.profile.lock().unwrap() = Some(Profile {
            full_name: full_name.map(str::to_owned),
        });
        self
    }

    pub fn with_categories(self, categories: Vec<Category>) -> Self {
        *self.categories.lock().unwrap() = categories;
        self
    }

    pub fn with_transactions(self, transactions: Vec<Transaction>) -> Self {
        *self.transactions.lock().unwrap() = transactions;
        self
    }

    pub fn with_monthly_summary(self, summary: MonthlySummary) -> Self {
        *self.monthly_summary.lock().unwrap() = summary;
        self
    }

    pub fn with_monthly_totals(self, totals: Vec<MonthlyTotals>) -> Self {
        *self.monthly_totals.lock().unwrap() = totals;
        self
    }

    pub fn with_month_summary(self, summary: MonthSummary) -> Self {
        *self.month_summary.lock().unwrap() = summary;
        self
    }

    /// Make every future call of `operation` fail.
    pub fn failing(self, operation: Operation) -> Self {
        self.fail(operation);
        self
    }

    pub fn fail(&self, operation: Operation) {
        self.failing.lock().unwrap().push(operation);
    }

    /// Broadcast `event` to subscribers, updating the stored session to match.
    pub fn emit(&self, event: AuthEvent) {
        let session = match &event {
            AuthEvent::SignedIn(session) | AuthEvent::TokenRefreshed(session) => {
                Some(session.clone())
            }
            AuthEvent::SignedOut => None,
        };
        *self.session.lock().unwrap() = session;
        let _ = self.events.send(event);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, operation: Operation) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.operation() == operation)
            .count()
    }

    pub fn categories(&self) -> Vec<Category> {
        self.categories.lock().unwrap().clone()
    }

    fn record(&self, call: Call) -> Result<(), BackendError> {
        let operation = call.operation();
        self.calls.lock().unwrap().push(call);

        if self.failing.lock().unwrap().contains(&operation) {
            Err(BackendError::new(
                BackendErrorKind::Status(400),
                format!("simulated {operation:?} failure"),
            ))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl AuthProvider for FakeBackend {
    async fn get_session(&self) -> Result<Option<Session>, BackendError> {
        self.record(Call::GetSession)?;

        Ok(self.session.lock().unwrap().clone())
    }

    /// Issues a new access token valid for an hour.
    async fn refresh_session(&self) -> Result<Option<Session>, BackendError> {
        self.record(Call::RefreshSession)?;

        let Some(mut session) = self.session.lock().unwrap().clone() else {
            return Ok(None);
        };
        let refresh = self.refreshes.fetch_add(1, Ordering::SeqCst) + 1;
        session.access_token = format!("test-access-token-{refresh}");
        session.expires_at = OffsetDateTime::now_utc() + Duration::hours(1);
        self.emit(AuthEvent::TokenRefreshed(session.clone()));

        Ok(Some(session))
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    async fn sign_in_with_password(
        &self,
        credentials: &Credentials,
    ) -> Result<Session, BackendError> {
        self.record(Call::SignIn {
            email: credentials.email.clone(),
        })?;

        let mut session = test_session();
        session.user.email = Some(credentials.email.clone());
        self.emit(AuthEvent::SignedIn(session.clone()));

        Ok(session)
    }

    async fn sign_up(&self, request: &SignUpRequest) -> Result<(), BackendError> {
        self.record(Call::SignUp(request.clone()))
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        self.record(Call::SignOut)?;
        self.emit(AuthEvent::SignedOut);

        Ok(())
    }

    async fn get_user(&self) -> Result<User, BackendError> {
        self.record(Call::GetUser)?;

        self.session
            .lock()
            .unwrap()
            .as_ref()
            .map(|session| session.user.clone())
            .ok_or_else(BackendError::not_signed_in)
    }
}

#[async_trait]
impl DataApi for FakeBackend {
    async fn get_profile(
        &self,
        _session: &Session,
        user_id: &UserId,
    ) -> Result<Option<Profile>, BackendError> {
        self.record(Call::GetProfile(user_id.clone()))?;

        Ok(self.profile.lock().unwrap().clone())
    }

    async fn list_categories(&self, _session: &Session) -> Result<Vec<Category>, BackendError> {
        self.record(Call::ListCategories)?;

        let mut categories = self.categories();
        categories.sort_by(compare_by_name);

        Ok(categories)
    }

    async fn insert_category(
        &self,
        _session: &Session,
        category: &NewCategory,
    ) -> Result<Category, BackendError> {
        self.record(Call::InsertCategory(category.clone()))?;

        let category = Category {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            name: category.name.clone(),
            transaction_type: category.transaction_type,
            user_id: category.user_id.clone(),
        };
        self.categories.lock().unwrap().push(category.clone());

        Ok(category)
    }

    async fn delete_category(
        &self,
        _session: &Session,
        category_id: CategoryId,
    ) -> Result<(), BackendError> {
        self.record(Call::DeleteCategory(category_id))?;

        self.categories
            .lock()
            .unwrap()
            .retain(|category| category.id != category_id);

        Ok(())
    }

    async fn list_transactions(
        &self,
        _session: &Session,
        query: &TransactionQuery,
    ) -> Result<Vec<Transaction>, BackendError> {
        self.record(Call::ListTransactions(query.clone()))?;

        let mut transactions: Vec<Transaction> = self
            .transactions
            .lock()
            .unwrap()
            .iter()
            .filter(|transaction| {
                query
                    .date_range
                    .as_ref()
                    .is_none_or(|range| range.contains(&transaction.date))
            })
            .cloned()
            .collect();
        transactions.sort_by(|a, b| b.date.cmp(&a.date));
        if let Some(limit) = query.limit {
            transactions.truncate(limit);
        }

        Ok(transactions)
    }

    async fn insert_transaction(
        &self,
        _session: &Session,
        transaction: &NewTransaction,
    ) -> Result<Transaction, BackendError> {
        self.record(Call::InsertTransaction(transaction.clone()))?;

        let category_name = self
            .categories
            .lock()
            .unwrap()
            .iter()
            .find(|category| category.id == transaction.category_id)
            .map(|category| category.name.to_string());
        let stored = Transaction {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            description: transaction.description.clone(),
            amount: transaction.amount,
            transaction_type: transaction.transaction_type,
            date: transaction.date,
            category_id: Some(transaction.category_id),
            user_id: transaction.user_id.clone(),
            category_name,
        };
        self.transactions.lock().unwrap().push(stored.clone());

        Ok(stored)
    }

    async fn monthly_summary(&self, _session: &Session) -> Result<MonthlySummary, BackendError> {
        self.record(Call::MonthlySummary)?;

        Ok(*self.monthly_summary.lock().unwrap())
    }

    async fn income_expense_by_month(
        &self,
        _session: &Session,
    ) -> Result<Vec<MonthlyTotals>, BackendError> {
        self.record(Call::IncomeExpenseByMonth)?;

        Ok(self.monthly_totals.lock().unwrap().clone())
    }

    async fn month_summary(
        &self,
        _session: &Session,
        year: i32,
        month: Month,
    ) -> Result<MonthSummary, BackendError> {
        self.record(Call::MonthSummary { year, month })?;

        Ok(*self.month_summary.lock().unwrap())
    }
}
