//! [AuthProvider] and [DataApi] over the HTTP APIs of a Supabase project:
//! GoTrue under `/auth/v1` and PostgREST under `/rest/v1`.

use std::{
    sync::{Mutex, PoisonError},
    time::Duration,
};

use async_trait::async_trait;
use reqwest::{
    Client, Method, RequestBuilder, Response,
    header::{ACCEPT, HeaderValue},
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::json;
use time::{Month, OffsetDateTime};
use tokio::sync::broadcast;

use crate::{
    auth::{Session, User, UserId},
    category::{Category, CategoryId, NewCategory},
    profile::Profile,
    summary::{MonthSummary, MonthlySummary, MonthlyTotals},
    transaction::{NewTransaction, Transaction, TransactionId, TransactionType},
};

use super::{
    AuthEvent, AuthProvider, BackendError, BackendErrorKind, Credentials, DataApi, SignUpRequest,
    TransactionQuery,
    wire::{self, OneOrMany},
};

/// Sessions closer than this to their expiry are refreshed before use.
const REFRESH_MARGIN: time::Duration = time::Duration::seconds(60);

const AUTH_EVENT_CAPACITY: usize = 16;

/// Ask PostgREST for a single JSON object instead of an array.
const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

const TRANSACTION_SELECT: &str = "*,categories(name)";

/// Where the backend lives and how to reach it.
#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    /// The project URL, e.g. "https://abc.supabase.co".
    pub url: String,
    /// The project's public anonymous key.
    pub anon_key: String,
    /// How long to wait for any single request before giving up.
    pub request_timeout: Duration,
}

/// HTTP client for a Supabase project.
///
/// Holds the current session in memory, like the browser client does, and
/// broadcasts an [AuthEvent] whenever it changes.
pub struct SupabaseClient {
    http: Client,
    base_url: String,
    anon_key: String,
    session: Mutex<Option<Session>>,
    events: broadcast::Sender<AuthEvent>,
}

impl SupabaseClient {
    /// Create a client for the project described by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: SupabaseConfig) -> Result<Self, BackendError> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(BackendError::network)?;
        let (events, _) = broadcast::channel(AUTH_EVENT_CAPACITY);

        Ok(Self {
            http,
            base_url: config.url.trim_end_matches('/').to_owned(),
            anon_key: config.anon_key,
            session: Mutex::new(None),
            events,
        })
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{path}", self.base_url)
    }

    fn rest_url(&self, path: &str) -> String {
        format!("{}/rest/v1/{path}", self.base_url)
    }

    /// Start a request carrying the project key and, when given, the user's
    /// access token.
    fn request(&self, method: Method, url: &str, access_token: Option<&str>) -> RequestBuilder {
        tracing::debug!("{method} {url}");

        self.http
            .request(method, url)
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token.unwrap_or(&self.anon_key))
    }

    fn stored_session(&self) -> Option<Session> {
        self.session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn store_session(&self, session: Option<Session>) {
        *self.session.lock().unwrap_or_else(PoisonError::into_inner) = session;
    }

    fn emit(&self, event: AuthEvent) {
        // Sending only fails when nobody is listening.
        let _ = self.events.send(event);
    }

    async fn exchange_refresh_token(&self, refresh_token: &str) -> Result<Session, BackendError> {
        let builder = self
            .request(
                Method::POST,
                &self.auth_url("token?grant_type=refresh_token"),
                None,
            )
            .json(&json!({ "refresh_token": refresh_token }));

        let token: TokenResponse = receive_json(builder).await?;
        let session = token.into_session(OffsetDateTime::now_utc());

        self.store_session(Some(session.clone()));
        self.emit(AuthEvent::TokenRefreshed(session.clone()));

        Ok(session)
    }

    /// Refresh `session`. A refresh token the provider rejects ends the
    /// session.
    async fn refresh_or_sign_out(
        &self,
        session: &Session,
    ) -> Result<Option<Session>, BackendError> {
        match self.exchange_refresh_token(&session.refresh_token).await {
            Ok(session) => Ok(Some(session)),
            Err(error) if matches!(error.kind, BackendErrorKind::Status(_)) => {
                tracing::warn!("Could not refresh the session, signing out: {error}");
                self.store_session(None);
                self.emit(AuthEvent::SignedOut);
                Ok(None)
            }
            Err(error) => Err(error),
        }
    }

    async fn rpc<T: DeserializeOwned>(
        &self,
        session: &Session,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<Option<OneOrMany<T>>, BackendError> {
        let builder = self
            .request(
                Method::POST,
                &self.rest_url(&format!("rpc/{name}")),
                Some(&session.access_token),
            )
            .json(&arguments);

        receive_json(builder).await
    }
}

#[async_trait]
impl AuthProvider for SupabaseClient {
    async fn get_session(&self) -> Result<Option<Session>, BackendError> {
        let Some(session) = self.stored_session() else {
            return Ok(None);
        };

        if !session.is_expired(OffsetDateTime::now_utc() + REFRESH_MARGIN) {
            return Ok(Some(session));
        }

        self.refresh_or_sign_out(&session).await
    }

    async fn refresh_session(&self) -> Result<Option<Session>, BackendError> {
        match self.stored_session() {
            Some(session) => self.refresh_or_sign_out(&session).await,
            None => Ok(None),
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    async fn sign_in_with_password(
        &self,
        credentials: &Credentials,
    ) -> Result<Session, BackendError> {
        let builder = self
            .request(
                Method::POST,
                &self.auth_url("token?grant_type=password"),
                None,
            )
            .json(&json!({
                "email": credentials.email,
                "password": credentials.password,
            }));

        let token: TokenResponse = receive_json(builder).await?;
        let session = token.into_session(OffsetDateTime::now_utc());

        self.store_session(Some(session.clone()));
        self.emit(AuthEvent::SignedIn(session.clone()));

        Ok(session)
    }

    async fn sign_up(&self, request: &SignUpRequest) -> Result<(), BackendError> {
        let builder = self
            .request(Method::POST, &self.auth_url("signup"), None)
            .json(&json!({
                "email": request.email,
                "password": request.password,
                "data": {
                    "full_name": request.full_name,
                    "phone": request.phone,
                },
            }));

        receive_empty(builder).await
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        if let Some(session) = self.stored_session() {
            let builder = self.request(
                Method::POST,
                &self.auth_url("logout"),
                Some(&session.access_token),
            );

            match receive_empty(builder).await {
                Ok(()) => {}
                // The session is already gone on the backend.
                Err(error)
                    if matches!(error.kind, BackendErrorKind::Status(401 | 403 | 404)) =>
                {
                    tracing::debug!("Session was already invalid when signing out: {error}");
                }
                Err(error) => return Err(error),
            }
        }

        self.store_session(None);
        self.emit(AuthEvent::SignedOut);

        Ok(())
    }

    async fn get_user(&self) -> Result<User, BackendError> {
        let session = self
            .get_session()
            .await?
            .ok_or_else(BackendError::not_signed_in)?;
        let builder = self.request(
            Method::GET,
            &self.auth_url("user"),
            Some(&session.access_token),
        );

        receive_json(builder).await
    }
}

#[async_trait]
impl DataApi for SupabaseClient {
    async fn get_profile(
        &self,
        session: &Session,
        user_id: &UserId,
    ) -> Result<Option<Profile>, BackendError> {
        let id_filter = format!("eq.{user_id}");
        let builder = self
            .request(
                Method::GET,
                &self.rest_url("profiles"),
                Some(&session.access_token),
            )
            .query(&[("select", "full_name"), ("id", id_filter.as_str())]);

        let profiles: Vec<Profile> = receive_json(builder).await?;

        Ok(profiles.into_iter().next())
    }

    async fn list_categories(&self, session: &Session) -> Result<Vec<Category>, BackendError> {
        let builder = self
            .request(
                Method::GET,
                &self.rest_url("categories"),
                Some(&session.access_token),
            )
            .query(&[("select", "*"), ("order", "name.asc")]);

        receive_json(builder).await
    }

    async fn insert_category(
        &self,
        session: &Session,
        category: &NewCategory,
    ) -> Result<Category, BackendError> {
        let builder = self
            .request(
                Method::POST,
                &self.rest_url("categories"),
                Some(&session.access_token),
            )
            .header("Prefer", "return=representation")
            .header(ACCEPT, HeaderValue::from_static(SINGLE_OBJECT))
            .json(category);

        receive_json(builder).await
    }

    async fn delete_category(
        &self,
        session: &Session,
        category_id: CategoryId,
    ) -> Result<(), BackendError> {
        let builder = self
            .request(
                Method::DELETE,
                &self.rest_url("categories"),
                Some(&session.access_token),
            )
            .query(&[("id", format!("eq.{category_id}"))]);

        receive_empty(builder).await
    }

    async fn list_transactions(
        &self,
        session: &Session,
        query: &TransactionQuery,
    ) -> Result<Vec<Transaction>, BackendError> {
        let builder = self
            .request(
                Method::GET,
                &self.rest_url("transactions"),
                Some(&session.access_token),
            )
            .query(&transaction_query_params(query));

        let rows: Vec<TransactionRow> = receive_json(builder).await?;

        Ok(rows.into_iter().map(Transaction::from).collect())
    }

    async fn insert_transaction(
        &self,
        session: &Session,
        transaction: &NewTransaction,
    ) -> Result<Transaction, BackendError> {
        let builder = self
            .request(
                Method::POST,
                &self.rest_url("transactions"),
                Some(&session.access_token),
            )
            .query(&[("select", TRANSACTION_SELECT)])
            .header("Prefer", "return=representation")
            .header(ACCEPT, HeaderValue::from_static(SINGLE_OBJECT))
            .json(&TransactionInsert::from(transaction));

        let row: TransactionRow = receive_json(builder).await?;

        Ok(row.into())
    }

    async fn monthly_summary(&self, session: &Session) -> Result<MonthlySummary, BackendError> {
        let rows = self
            .rpc::<MonthlySummary>(session, "get_monthly_summary", json!({}))
            .await?;

        Ok(rows.and_then(OneOrMany::into_first).unwrap_or_default())
    }

    async fn income_expense_by_month(
        &self,
        session: &Session,
    ) -> Result<Vec<MonthlyTotals>, BackendError> {
        let rows = self
            .rpc::<MonthlyTotals>(session, "get_income_expense_by_month", json!({}))
            .await?;

        Ok(rows.map(OneOrMany::into_vec).unwrap_or_default())
    }

    async fn month_summary(
        &self,
        session: &Session,
        year: i32,
        month: Month,
    ) -> Result<MonthSummary, BackendError> {
        let rows = self
            .rpc::<MonthSummary>(
                session,
                "obter_resumo_do_mes",
                json!({
                    "ano_selecionado": year,
                    "mes_selecionado": u8::from(month),
                }),
            )
            .await?;

        Ok(rows.and_then(OneOrMany::into_first).unwrap_or_default())
    }
}

/// Send the request and decode a JSON body from a successful response.
async fn receive_json<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T, BackendError> {
    let response = send(builder).await?;

    response.json::<T>().await.map_err(BackendError::decode)
}

/// Send the request and discard the body of a successful response.
async fn receive_empty(builder: RequestBuilder) -> Result<(), BackendError> {
    send(builder).await.map(|_| ())
}

async fn send(builder: RequestBuilder) -> Result<Response, BackendError> {
    let response = builder
        .send()
        .await
        .map_err(BackendError::network)
        .inspect_err(|error| tracing::error!("Backend request failed: {error}"))?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let error = BackendError::from_response(status.as_u16(), &body);
    tracing::warn!("Backend responded with {status}: {error}");

    Err(error)
}

fn transaction_query_params(query: &TransactionQuery) -> Vec<(&'static str, String)> {
    let mut params = vec![("select", TRANSACTION_SELECT.to_owned())];

    if let Some(range) = &query.date_range {
        params.push((
            "transaction_date",
            format!("gte.{}", wire::format_date(range.start)),
        ));
        params.push((
            "transaction_date",
            format!("lt.{}", wire::format_date(range.end)),
        ));
    }

    params.push(("order", "transaction_date.desc".to_owned()));

    if let Some(limit) = query.limit {
        params.push(("limit", limit.to_string()));
    }

    params
}

/// A successful password or refresh token grant.
#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
    #[serde(default)]
    expires_at: Option<i64>,
    user: User,
}

impl TokenResponse {
    fn into_session(self, now: OffsetDateTime) -> Session {
        let expires_at = self
            .expires_at
            .and_then(|timestamp| OffsetDateTime::from_unix_timestamp(timestamp).ok())
            .unwrap_or(now + time::Duration::seconds(self.expires_in));

        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            user: self.user,
        }
    }
}

/// A transaction row joined with its category's name.
#[derive(Deserialize)]
struct TransactionRow {
    id: TransactionId,
    description: String,
    #[serde(deserialize_with = "wire::number")]
    amount: f64,
    #[serde(rename = "type")]
    transaction_type: TransactionType,
    #[serde(deserialize_with = "wire::date")]
    transaction_date: time::Date,
    category_id: Option<CategoryId>,
    user_id: UserId,
    #[serde(default)]
    categories: Option<CategoryJoin>,
}

#[derive(Deserialize)]
struct CategoryJoin {
    name: String,
}

impl From<TransactionRow> for Transaction {
    fn from(row: TransactionRow) -> Self {
        Self {
            id: row.id,
            description: row.description,
            amount: row.amount,
            transaction_type: row.transaction_type,
            date: row.transaction_date,
            category_id: row.category_id,
            user_id: row.user_id,
            category_name: row.categories.map(|category| category.name),
        }
    }
}

#[derive(Serialize)]
struct TransactionInsert<'a> {
    description: &'a str,
    amount: f64,
    #[serde(rename = "type")]
    transaction_type: TransactionType,
    category_id: CategoryId,
    transaction_date: String,
    user_id: &'a UserId,
}

impl<'a> From<&'a NewTransaction> for TransactionInsert<'a> {
    fn from(transaction: &'a NewTransaction) -> Self {
        Self {
            description: &transaction.description,
            amount: transaction.amount,
            transaction_type: transaction.transaction_type,
            category_id: transaction.category_id,
            transaction_date: wire::format_date(transaction.date),
            user_id: &transaction.user_id,
        }
    }
}
