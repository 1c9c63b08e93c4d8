//! Route guards: resolve the caller's session and turn a resolver denial
//! into a 401/403 before the handler runs.

use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use platform_api::{ApiError, ApiResult};
use platform_authn::{AuthConfig, SESSION_COOKIE, Session, decode_token};
use platform_authz::{Action, PolicyEngine, Resource};

use crate::http::AppState;

/// Bearer header first, then the session cookie.
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    if let Some(value) = headers.get(AUTHORIZATION) {
        if let Ok(text) = value.to_str() {
            // Auth schemes are case-insensitive (RFC 7235).
            if let Some((scheme, rest)) = text.split_once(' ') {
                let token = rest.trim();
                if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() {
                    return Some(token.to_string());
                }
            }
        }
    }
    CookieJar::from_headers(headers)
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
}

pub fn session_from_headers(headers: &HeaderMap, auth: &AuthConfig) -> ApiResult<Session> {
    let token = extract_token(headers).ok_or(ApiError::Unauthorized)?;
    Ok(decode_token(&token, auth)?)
}

/// The authenticated caller of a handler.
#[derive(Clone, Debug)]
pub struct Caller(pub Session);

impl FromRequestParts<AppState> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> ApiResult<Self> {
        if let Some(session) = parts.extensions.get::<Session>() {
            return Ok(Caller(session.clone()));
        }
        session_from_headers(&parts.headers, &state.auth).map(Caller)
    }
}

/// Middleware state naming the permission a group of routes requires.
#[derive(Clone)]
pub struct RouteGuard {
    auth: Arc<AuthConfig>,
    engine: PolicyEngine,
    resource: Resource,
    action: Action,
}

impl RouteGuard {
    pub fn new(state: &AppState, resource: Resource, action: Action) -> Self {
        Self {
            auth: state.auth.clone(),
            engine: state.engine,
            resource,
            action,
        }
    }
}

pub async fn enforce(
    State(guard): State<RouteGuard>,
    mut request: Request,
    next: Next,
) -> ApiResult<Response> {
    let session = session_from_headers(request.headers(), &guard.auth)?;
    let subject = session.id.to_string();
    if let Err(err) = guard
        .engine
        .authorize(&subject, &session.role, guard.resource, guard.action)
    {
        tracing::info!(
            subject = %subject,
            role = %session.role,
            resource = %guard.resource,
            action = %guard.action,
            path = %request.uri().path(),
            "route guard denied request"
        );
        return Err(err.into());
    }
    request.extensions_mut().insert(session);
    Ok(next.run(request).await)
}
