//! Closed vocabularies for roles, resources and actions.
//!
//! Every parser matches by exact, case-sensitive identity. No trimming or
//! normalization happens here; `" manager"` and `"Manager"` are unknown.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::AuthzError;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    Manager,
    InventoryManager,
    FinanceManager,
    SalesAgent,
    Viewer,
}

impl Role {
    pub const ALL: [Role; 6] = [
        Role::SuperAdmin,
        Role::Manager,
        Role::InventoryManager,
        Role::FinanceManager,
        Role::SalesAgent,
        Role::Viewer,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::SuperAdmin => "super_admin",
            Role::Manager => "manager",
            Role::InventoryManager => "inventory_manager",
            Role::FinanceManager => "finance_manager",
            Role::SalesAgent => "sales_agent",
            Role::Viewer => "viewer",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "super_admin" => Some(Role::SuperAdmin),
            "manager" => Some(Role::Manager),
            "inventory_manager" => Some(Role::InventoryManager),
            "finance_manager" => Some(Role::FinanceManager),
            "sales_agent" => Some(Role::SalesAgent),
            "viewer" => Some(Role::Viewer),
            _ => None,
        }
    }
}

/// Protected collections of the dealer suite.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Vehicles,
    Customers,
    Invoices,
    Settings,
    Users,
    System,
    Backups,
    Logs,
}

impl Resource {
    /// Table column order.
    pub const ALL: [Resource; 8] = [
        Resource::Vehicles,
        Resource::Customers,
        Resource::Invoices,
        Resource::Settings,
        Resource::Users,
        Resource::System,
        Resource::Backups,
        Resource::Logs,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Resource::Vehicles => "vehicles",
            Resource::Customers => "customers",
            Resource::Invoices => "invoices",
            Resource::Settings => "settings",
            Resource::Users => "users",
            Resource::System => "system",
            Resource::Backups => "backups",
            Resource::Logs => "logs",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "vehicles" => Some(Resource::Vehicles),
            "customers" => Some(Resource::Customers),
            "invoices" => Some(Resource::Invoices),
            "settings" => Some(Resource::Settings),
            "users" => Some(Resource::Users),
            "system" => Some(Resource::System),
            "backups" => Some(Resource::Backups),
            "logs" => Some(Resource::Logs),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
    Admin,
}

impl Action {
    pub const ALL: [Action; 5] = [
        Action::Create,
        Action::Read,
        Action::Update,
        Action::Delete,
        Action::Admin,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Read => "read",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::Admin => "admin",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "create" => Some(Action::Create),
            "read" => Some(Action::Read),
            "update" => Some(Action::Update),
            "delete" => Some(Action::Delete),
            "admin" => Some(Action::Admin),
            _ => None,
        }
    }

    pub(crate) const fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AuthzError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::parse(s).ok_or_else(|| AuthzError::UnknownRole(s.to_string()))
    }
}

impl FromStr for Resource {
    type Err = AuthzError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Resource::parse(s).ok_or_else(|| AuthzError::UnknownResource(s.to_string()))
    }
}

impl FromStr for Action {
    type Err = AuthzError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::parse(s).ok_or_else(|| AuthzError::UnknownAction(s.to_string()))
    }
}
