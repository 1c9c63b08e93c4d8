//! Command bodies for the CLI. Each returns what the command prints on
//! stdout; logging goes to stderr.

use std::fmt::Write as _;

use anyhow::Result;
use platform_authn::{AuthConfig, Session, issue_token};
use platform_authz::{Action, ActionSet, Resource, Role, actions_for, has_permission};
use uuid::Uuid;

use crate::{config::validate_ttl, graphql::build_schema, http::RoleGrants};

#[derive(Debug, Eq, PartialEq)]
pub enum Verdict {
    Allowed,
    Denied,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Allowed => "allowed",
            Verdict::Denied => "denied",
        }
    }
}

/// Arguments are passed through verbatim, so the CLI answers exactly what a
/// route guard would.
pub fn check(role: &str, resource: &str, action: &str) -> Verdict {
    if has_permission(role, resource, action) {
        Verdict::Allowed
    } else {
        Verdict::Denied
    }
}

pub fn select_roles(role: Option<&str>) -> Result<Vec<Role>> {
    match role {
        Some(name) => Ok(vec![name.parse::<Role>()?]),
        None => Ok(Role::ALL.to_vec()),
    }
}

fn letter(action: Action) -> &'static str {
    match action {
        Action::Create => "C",
        Action::Read => "R",
        Action::Update => "U",
        Action::Delete => "D",
        Action::Admin => "admin",
    }
}

fn cell(actions: ActionSet) -> String {
    if actions.is_empty() {
        return "-".to_string();
    }
    actions.iter().map(letter).collect::<Vec<_>>().join(",")
}

pub fn render_table(roles: &[Role]) -> String {
    let role_width = roles
        .iter()
        .map(|role| role.as_str().len())
        .max()
        .unwrap_or(0)
        .max("role".len());

    let mut out = String::new();
    let _ = write!(out, "{:<role_width$}", "role");
    for resource in Resource::ALL {
        let _ = write!(out, "  {:<9}", resource.as_str());
    }
    out.push('\n');
    for role in roles {
        let _ = write!(out, "{:<role_width$}", role.as_str());
        for resource in Resource::ALL {
            let _ = write!(out, "  {:<9}", cell(actions_for(*role, resource)));
        }
        out.push('\n');
    }
    out
}

pub fn render_json(roles: &[Role]) -> Result<String> {
    let rows: Vec<RoleGrants> = roles.iter().copied().map(RoleGrants::for_role).collect();
    Ok(serde_json::to_string_pretty(&rows)?)
}

/// Mint a development token. The returned string is the bare token and is
/// the only thing `token:issue` writes to stdout.
pub fn mint_token(
    mut auth: AuthConfig,
    session: &Session,
    ttl_minutes: Option<i64>,
) -> Result<String> {
    if let Some(ttl) = ttl_minutes {
        auth.session_ttl_minutes = validate_ttl(ttl)?;
    }
    if Role::parse(&session.role).is_none() {
        tracing::warn!(role = %session.role, "role is not recognized; every check will be denied");
    }
    let token = issue_token(session, &auth)?;
    tracing::info!(id = %session.id, role = %session.role, "issued development token");
    Ok(token)
}

pub fn dev_session(email: String, role: String, id: Option<Uuid>) -> Session {
    Session {
        id: id.unwrap_or_else(Uuid::new_v4),
        email,
        role,
    }
}

pub fn schema_sdl() -> String {
    build_schema().sdl()
}
