//! Session-token authentication.
//!
//! Login exchanges a known account name for an opaque session token.
//! Handlers bind the current user through one of two extractors:
//! [`RequireUser`] answers 401 for the REST surface, [`RequireLogin`]
//! redirects page requests to `/login`.

use axum::extract::{FromRef, FromRequestParts};
use axum::http::{header, request::Parts};
use axum::response::{IntoResponse, Redirect, Response};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::catalog::Account;
use crate::error::ServiceError;
use crate::store::CatalogStore;

#[derive(Clone, Default)]
pub struct SessionManager {
    sessions: Arc<Mutex<HashMap<String, Account>>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a token for a known account name.
    pub async fn login(
        &self,
        store: &Arc<dyn CatalogStore>,
        account_name: &str,
    ) -> Result<(String, Account), ServiceError> {
        let account = store
            .get_account_by_name(account_name)
            .await?
            .ok_or_else(|| ServiceError::AccountNotFound {
                account: account_name.to_string(),
            })?;

        let token = Uuid::new_v4().simple().to_string();
        self.sessions
            .lock()
            .await
            .insert(token.clone(), account.clone());

        Ok((token, account))
    }

    pub async fn resolve(&self, token: &str) -> Option<Account> {
        self.sessions.lock().await.get(token).cloned()
    }

    pub async fn logout(&self, token: &str) {
        self.sessions.lock().await.remove(token);
    }
}

fn bearer_token(parts: &Parts) -> Option<String> {
    let value = parts.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    value
        .strip_prefix("Bearer ")
        .map(|token| token.trim().to_string())
}

fn cookie_token(parts: &Parts) -> Option<String> {
    let value = parts.headers.get(header::COOKIE)?.to_str().ok()?;
    value.split(';').find_map(|pair| {
        let (name, token) = pair.trim().split_once('=')?;
        (name == "session").then(|| token.to_string())
    })
}

async fn resolve_request_user<S>(parts: &Parts, state: &S) -> Option<Account>
where
    SessionManager: FromRef<S>,
{
    let sessions = SessionManager::from_ref(state);
    let token = bearer_token(parts).or_else(|| cookie_token(parts))?;
    sessions.resolve(&token).await
}

/// Current user for the REST surface; missing or stale tokens are 401.
pub struct RequireUser(pub Account);

#[axum::async_trait]
impl<S> FromRequestParts<S> for RequireUser
where
    SessionManager: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        resolve_request_user(parts, state)
            .await
            .map(RequireUser)
            .ok_or(ServiceError::Unauthorized)
    }
}

/// Current user for page handlers; unauthenticated requests are
/// redirected to the login page.
pub struct RequireLogin(pub Account);

pub struct LoginRedirect;

impl IntoResponse for LoginRedirect {
    fn into_response(self) -> Response {
        Redirect::to("/login").into_response()
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for RequireLogin
where
    SessionManager: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = LoginRedirect;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        resolve_request_user(parts, state)
            .await
            .map(RequireLogin)
            .ok_or(LoginRedirect)
    }
}
