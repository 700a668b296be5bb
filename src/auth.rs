use crate::core::error::{AppError, AppResult};
use crate::models::{Role, User};
use crate::server::AppState;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Client for the hosted auth service; turns a caller's bearer token into
/// a verified subject or nothing.
#[derive(Clone)]
pub struct AuthClient {
    client: Client,
    base_url: String,
    service_key: String,
}

#[derive(Debug, Deserialize)]
pub struct AuthSubject {
    pub id: Uuid,
    pub email: Option<String>,
}

impl AuthClient {
    pub fn new(base_url: String, service_key: String) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key,
        }
    }

    pub async fn verify_token(&self, token: &str) -> AppResult<AuthSubject> {
        let url = format!("{}/auth/v1/user", self.base_url);
        let response = self
            .client
            .get(url)
            .header("apikey", &self.service_key)
            .bearer_auth(token)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED
            || response.status() == reqwest::StatusCode::FORBIDDEN
        {
            return Err(AppError::Unauthorized);
        }
        if !response.status().is_success() {
            return Err(AppError::Api(format!(
                "auth request failed ({})",
                response.status()
            )));
        }
        Ok(response.json().await?)
    }
}

/// Everything a handler needs to know about the caller, resolved once per
/// request. Built after token verification and row lookup, so the role and
/// blocked flag reflect the stored account, not claims inside the token.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
    pub is_blocked: bool,
}

impl RequestContext {
    pub fn from_user(user: User) -> Self {
        Self {
            user_id: user.id,
            email: user.email,
            role: user.role,
            is_blocked: user.is_blocked,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn require_admin(&self) -> AppResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Forbidden("Admin access required".to_string()))
        }
    }

    /// Blocked accounts keep read access but cannot touch registrations.
    pub fn require_not_blocked(&self) -> AppResult<()> {
        if self.is_blocked {
            Err(AppError::Forbidden("Your account is blocked".to_string()))
        } else {
            Ok(())
        }
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Verifies the token, then loads the account row, provisioning it on
/// first sight. A concurrent first request can win the insert; the
/// conflict is resolved by re-reading.
pub async fn authenticate(state: &AppState, token: &str) -> AppResult<RequestContext> {
    let subject = state.auth.verify_token(token).await?;

    if let Some(user) = state.store.find_user(subject.id).await? {
        return Ok(RequestContext::from_user(user));
    }

    let fresh = User {
        id: subject.id,
        email: subject.email.unwrap_or_default(),
        role: Role::User,
        is_blocked: false,
    };
    match state.store.insert_user(&fresh).await {
        Ok(user) => {
            info!("provisioned account for {}", user.id);
            Ok(RequestContext::from_user(user))
        }
        Err(AppError::Conflict(_)) => {
            let user = state
                .store
                .find_user(subject.id)
                .await?
                .ok_or_else(|| AppError::Api("account row vanished after conflict".to_string()))?;
            Ok(RequestContext::from_user(user))
        }
        Err(err) => Err(err),
    }
}

impl FromRequestParts<Arc<AppState>> for RequestContext {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(AppError::Unauthorized)?;
        authenticate(state, token).await
    }
}

/// For endpoints that are public but enrich their answer for signed-in
/// callers. A missing header yields `None`; a bad token is still an error.
pub struct MaybeContext(pub Option<RequestContext>);

impl FromRequestParts<Arc<AppState>> for MaybeContext {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        match bearer_token(parts) {
            None => Ok(MaybeContext(None)),
            Some(token) => Ok(MaybeContext(Some(authenticate(state, token).await?))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(role: Role, is_blocked: bool) -> RequestContext {
        RequestContext {
            user_id: Uuid::new_v4(),
            email: "x@example.com".to_string(),
            role,
            is_blocked,
        }
    }

    #[test]
    fn admin_gate_rejects_plain_users() {
        assert!(context(Role::Admin, false).require_admin().is_ok());
        let err = context(Role::User, false).require_admin().unwrap_err();
        assert_eq!(err.to_string(), "Forbidden: Admin access required");
    }

    #[test]
    fn blocked_accounts_cannot_register() {
        assert!(context(Role::User, false).require_not_blocked().is_ok());
        assert!(context(Role::User, true).require_not_blocked().is_err());
    }
}
