use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
};

use anyhow::Context;
use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::{
    Json, Router,
    extract::{Path, Query, State, rejection::QueryRejection},
    http::{self, HeaderMap, HeaderName, HeaderValue, Method},
    middleware,
    routing::{get, post},
};
use platform_api::{ApiError, ApiResult};
use platform_authn::AuthConfig;
use platform_authz::{Action, Grant, PolicyEngine, Resource, Role, grants, has_permission};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::info;
use uuid::Uuid;

use crate::{
    config::AppConfig,
    graphql::SchemaType,
    guard::{Caller, RouteGuard, enforce, session_from_headers},
};

#[derive(Clone)]
pub struct AppState {
    pub schema: SchemaType,
    pub config: Arc<AppConfig>,
    pub auth: Arc<AuthConfig>,
    pub engine: PolicyEngine,
}

impl AppState {
    pub fn new(config: Arc<AppConfig>, schema: SchemaType) -> Self {
        let auth = Arc::new(config.auth.clone());
        Self {
            schema,
            config,
            auth,
            engine: PolicyEngine,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ServeConfig {
    addr: SocketAddr,
}

impl ServeConfig {
    pub fn new(host: IpAddr, port: u16) -> Self {
        Self {
            addr: SocketAddr::from((host, port)),
        }
    }
}

pub async fn serve(config: ServeConfig, state: AppState) -> anyhow::Result<()> {
    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;

    info!(%config.addr, "dealer server listening");
    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;
    Ok(())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed = origins
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect::<Vec<_>>();
    let cors = CorsLayer::new()
        .allow_headers([http::header::CONTENT_TYPE, http::header::AUTHORIZATION])
        .allow_methods([Method::POST, Method::GET]);
    // tower-http panics on credentials combined with a wildcard origin.
    if allowed.is_empty() {
        cors.allow_origin(AllowOrigin::any())
    } else {
        cors.allow_origin(AllowOrigin::list(allowed))
            .allow_credentials(true)
    }
}

pub fn build_router(state: AppState) -> Router {
    let request_id = MakeRequestUuid;
    let header_name = HeaderName::from_static("x-request-id");

    let system_admin = Router::new()
        .route("/api/authz/matrix", get(matrix_handler))
        .route_layer(middleware::from_fn_with_state(
            RouteGuard::new(&state, Resource::System, Action::Admin),
            enforce,
        ));
    let user_directory = Router::new()
        .route("/api/authz/roles/{role}", get(role_grants_handler))
        .route_layer(middleware::from_fn_with_state(
            RouteGuard::new(&state, Resource::Users, Action::Read),
            enforce,
        ));

    Router::new()
        .route("/health", get(health_handler))
        .route("/api/me", get(me_handler))
        .route("/api/authz/check", get(check_handler))
        .route("/graphql", post(graphql_handler))
        .merge(system_admin)
        .merge(user_directory)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(header_name.clone(), request_id))
                .layer(PropagateRequestIdLayer::new(header_name))
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&state.config.cors_allowed_origins)),
        )
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Debug, Serialize)]
struct MeResponse {
    id: Uuid,
    email: String,
    role: String,
    grants: Vec<Grant>,
}

async fn me_handler(Caller(session): Caller) -> Json<MeResponse> {
    let grants = Role::parse(&session.role).map(grants).unwrap_or_default();
    Json(MeResponse {
        id: session.id,
        email: session.email,
        role: session.role,
        grants,
    })
}

#[derive(Debug, Deserialize)]
struct CheckQuery {
    resource: String,
    action: String,
}

#[derive(Debug, Serialize)]
struct CheckResponse {
    role: String,
    resource: String,
    action: String,
    allowed: bool,
}

async fn check_handler(
    Caller(session): Caller,
    query: Result<Query<CheckQuery>, QueryRejection>,
) -> ApiResult<Json<CheckResponse>> {
    let Query(query) = query.map_err(|rejection| ApiError::InvalidInput(rejection.body_text()))?;
    let allowed = has_permission(&session.role, &query.resource, &query.action);
    Ok(Json(CheckResponse {
        role: session.role,
        resource: query.resource,
        action: query.action,
        allowed,
    }))
}

#[derive(Debug, Serialize)]
pub struct RoleGrants {
    pub role: Role,
    pub grants: Vec<Grant>,
}

impl RoleGrants {
    pub fn for_role(role: Role) -> Self {
        Self {
            role,
            grants: grants(role),
        }
    }
}

async fn matrix_handler() -> Json<Vec<RoleGrants>> {
    Json(Role::ALL.into_iter().map(RoleGrants::for_role).collect())
}

async fn role_grants_handler(Path(role): Path<String>) -> ApiResult<Json<RoleGrants>> {
    let role = role.parse::<Role>().map_err(ApiError::from)?;
    Ok(Json(RoleGrants::for_role(role)))
}

/// Sessions are optional here; resolvers that need one report
/// `UNAUTHORIZED` themselves.
async fn graphql_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: GraphQLRequest,
) -> GraphQLResponse {
    let mut req = request.into_inner();
    if let Ok(session) = session_from_headers(&headers, &state.auth) {
        req = req.data(session);
    }
    state.schema.execute(req).await.into()
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install CTRL+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        signal(SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    };
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
    };
    use http_body_util::BodyExt;
    use platform_authn::{Session, issue_token};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::graphql::build_schema;

    const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

    fn state() -> AppState {
        let config = AppConfig {
            auth: AuthConfig::new(SECRET.to_vec(), 30),
            cors_allowed_origins: vec!["http://localhost:5173".into()],
        };
        AppState::new(Arc::new(config), build_schema())
    }

    fn token_for(role: &str) -> String {
        let session = Session {
            id: Uuid::new_v4(),
            email: format!("{role}@dealer.test"),
            role: role.into(),
        };
        issue_token(&session, &AuthConfig::new(SECRET.to_vec(), 30)).unwrap()
    }

    async fn get_json(uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let response = build_router(state())
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }

    #[tokio::test]
    async fn health_is_public() {
        let (status, body) = get_json("/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], json!(true));
    }

    #[tokio::test]
    async fn me_requires_session() {
        let (status, body) = get_json("/api/me", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], json!("UNAUTHORIZED"));

        let (status, _) = get_json("/api/me", Some("forged.token.value")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn me_lists_grants_for_role() {
        let token = token_for("sales_agent");
        let (status, body) = get_json("/api/me", Some(&token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["role"], json!("sales_agent"));
        assert_eq!(
            body["grants"],
            json!([
                {"resource": "vehicles", "actions": ["read", "update"]},
                {"resource": "customers", "actions": ["create", "read", "update"]},
                {"resource": "invoices", "actions": ["read"]},
                {"resource": "settings", "actions": ["read"]},
            ])
        );
    }

    #[tokio::test]
    async fn me_with_unknown_role_has_no_grants() {
        let token = token_for("regional_director");
        let (status, body) = get_json("/api/me", Some(&token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["grants"], json!([]));
    }

    #[tokio::test]
    async fn check_uses_caller_role() {
        let token = token_for("finance_manager");
        let (status, body) =
            get_json("/api/authz/check?resource=vehicles&action=update", Some(&token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["allowed"], json!(true));

        let (_, body) =
            get_json("/api/authz/check?resource=vehicles&action=create", Some(&token)).await;
        assert_eq!(body["allowed"], json!(false));

        let (_, body) =
            get_json("/api/authz/check?resource=VEHICLES&action=update", Some(&token)).await;
        assert_eq!(body["allowed"], json!(false));
    }

    #[tokio::test]
    async fn check_without_parameters_is_bad_request() {
        let token = token_for("viewer");
        let (status, body) = get_json("/api/authz/check?resource=vehicles", Some(&token)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], json!("INVALID_INPUT"));
        assert!(body["message"].as_str().unwrap().starts_with("bad request:"));

        let (status, body) = get_json("/api/authz/check", Some(&token)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], json!("INVALID_INPUT"));
    }

    #[tokio::test]
    async fn matrix_requires_system_admin() {
        let (status, _) = get_json("/api/authz/matrix", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let manager = token_for("manager");
        let (status, body) = get_json("/api/authz/matrix", Some(&manager)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], json!("FORBIDDEN"));

        let admin = token_for("super_admin");
        let (status, body) = get_json("/api/authz/matrix", Some(&admin)).await;
        assert_eq!(status, StatusCode::OK);
        let rows = body.as_array().unwrap();
        assert_eq!(rows.len(), 6);
        assert_eq!(rows[0]["role"], json!("super_admin"));
        assert_eq!(rows[5]["role"], json!("viewer"));
    }

    #[tokio::test]
    async fn role_lookup_requires_users_read() {
        let agent = token_for("sales_agent");
        let (status, _) = get_json("/api/authz/roles/viewer", Some(&agent)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let admin = token_for("super_admin");
        let (status, body) = get_json("/api/authz/roles/inventory_manager", Some(&admin)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["grants"][0]["resource"], json!("vehicles"));
        assert_eq!(
            body["grants"][0]["actions"],
            json!(["create", "read", "update", "delete"])
        );

        let (status, body) = get_json("/api/authz/roles/Manager", Some(&admin)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], json!("INVALID_INPUT"));
    }

    #[tokio::test]
    async fn bearer_scheme_is_case_insensitive() {
        let token = token_for("viewer");
        for scheme in ["bearer", "BEARER", "BeArEr"] {
            let request = Request::builder()
                .uri("/api/me")
                .header(header::AUTHORIZATION, format!("{scheme} {token}"))
                .body(Body::empty())
                .unwrap();
            let response = build_router(state()).oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK, "{scheme}");
        }
    }

    #[tokio::test]
    async fn session_cookie_is_accepted() {
        let token = token_for("viewer");
        let request = Request::builder()
            .uri("/api/me")
            .header(header::COOKIE, format!("dealer_session={token}"))
            .body(Body::empty())
            .unwrap();
        let response = build_router(state()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn graphql_can_reflects_caller() {
        let token = token_for("viewer");
        let request = Request::builder()
            .method(Method::POST)
            .uri("/graphql")
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::from(
                json!({"query": r#"{ read: can(resource: "vehicles", action: "read") create: can(resource: "vehicles", action: "create") }"#})
                    .to_string(),
            ))
            .unwrap();
        let response = build_router(state()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["data"], json!({"read": true, "create": false}));
    }
}
