//! Authorization primitives for the dealer suite.
//!
//! The permission table is a compile-time constant; [`has_permission`] is a
//! pure lookup over it and never fails. Anything it does not recognize is
//! denied. [`PolicyEngine`] wraps the lookup for route guards that want a
//! `Result` and a log line on denial.

mod table;
mod vocab;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use table::{ActionSet, Grant, actions_for, grants};
pub use vocab::{Action, Resource, Role};

#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum AuthzError {
    #[error("{role} may not {action} {resource}")]
    Denied {
        subject: String,
        role: String,
        resource: String,
        action: String,
    },
    #[error("unknown role: {0}")]
    UnknownRole(String),
    #[error("unknown resource: {0}")]
    UnknownResource(String),
    #[error("unknown action: {0}")]
    UnknownAction(String),
}

/// Whether `role` may perform `action` on `resource`.
///
/// All three inputs are compared by exact, case-sensitive equality against
/// the known tags. Unknown values of any kind yield `false`.
pub fn has_permission(role: &str, resource: &str, action: &str) -> bool {
    let (Some(role), Some(resource), Some(action)) = (
        Role::parse(role),
        Resource::parse(resource),
        Action::parse(action),
    ) else {
        return false;
    };
    role.can(resource, action)
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PolicyContext {
    pub subject: String,
    pub role: String,
    pub resource: String,
    pub action: String,
}

impl PolicyContext {
    pub fn new(
        subject: impl Into<String>,
        role: impl Into<String>,
        resource: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            role: role.into(),
            resource: resource.into(),
            action: action.into(),
        }
    }
}

#[derive(Clone, Copy, Default, Debug)]
pub struct PolicyEngine;

impl PolicyEngine {
    pub fn check(&self, ctx: &PolicyContext) -> Result<(), AuthzError> {
        if has_permission(&ctx.role, &ctx.resource, &ctx.action) {
            return Ok(());
        }
        tracing::debug!(
            subject = %ctx.subject,
            role = %ctx.role,
            resource = %ctx.resource,
            action = %ctx.action,
            "permission denied"
        );
        Err(AuthzError::Denied {
            subject: ctx.subject.clone(),
            role: ctx.role.clone(),
            resource: ctx.resource.clone(),
            action: ctx.action.clone(),
        })
    }

    /// Typed variant for guards whose resource and action are fixed at the
    /// call site. The role stays a string since it comes from the session.
    pub fn authorize(
        &self,
        subject: &str,
        role: &str,
        resource: Resource,
        action: Action,
    ) -> Result<(), AuthzError> {
        self.check(&PolicyContext::new(
            subject,
            role,
            resource.as_str(),
            action.as_str(),
        ))
    }
}
