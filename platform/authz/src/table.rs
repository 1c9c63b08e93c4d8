//! The static permission table.
//!
//! Each role owns exactly one row set. A resource that maps to
//! [`ActionSet::EMPTY`] is equivalent to having no entry at all.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::vocab::{Action, Resource, Role};

/// Immutable set of [`Action`]s, one bit per action.
#[derive(Clone, Copy, Default, Eq, PartialEq, Hash)]
pub struct ActionSet(u8);

impl ActionSet {
    pub const EMPTY: ActionSet = ActionSet(0);

    pub const fn of(actions: &[Action]) -> Self {
        let mut bits = 0;
        let mut idx = 0;
        while idx < actions.len() {
            bits |= actions[idx].bit();
            idx += 1;
        }
        ActionSet(bits)
    }

    pub const fn contains(self, action: Action) -> bool {
        self.0 & action.bit() != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Actions in create/read/update/delete/admin order.
    pub fn iter(self) -> impl Iterator<Item = Action> {
        Action::ALL
            .into_iter()
            .filter(move |action| self.contains(*action))
    }
}

impl fmt::Debug for ActionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl Serialize for ActionSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

const NONE: ActionSet = ActionSet::EMPTY;
const R: ActionSet = ActionSet::of(&[Action::Read]);
const RU: ActionSet = ActionSet::of(&[Action::Read, Action::Update]);
const CR: ActionSet = ActionSet::of(&[Action::Create, Action::Read]);
const CRU: ActionSet = ActionSet::of(&[Action::Create, Action::Read, Action::Update]);
const CRUD: ActionSet = ActionSet::of(&[
    Action::Create,
    Action::Read,
    Action::Update,
    Action::Delete,
]);
const ADMIN: ActionSet = ActionSet::of(&[Action::Admin]);

/// Actions `role` may perform on `resource`.
pub const fn actions_for(role: Role, resource: Resource) -> ActionSet {
    use Resource::*;

    match role {
        Role::SuperAdmin => match resource {
            Vehicles | Customers | Invoices | Users => CRUD,
            Settings => RU,
            System => ADMIN,
            Backups => CR,
            Logs => R,
        },
        Role::Manager => match resource {
            Vehicles | Customers | Invoices => CRUD,
            Settings => RU,
            Users | System | Backups | Logs => NONE,
        },
        Role::InventoryManager => match resource {
            Vehicles => CRUD,
            Customers => RU,
            Settings => R,
            Invoices | Users | System | Backups | Logs => NONE,
        },
        Role::FinanceManager => match resource {
            Vehicles | Customers => RU,
            Invoices => CRUD,
            Settings => R,
            Users | System | Backups | Logs => NONE,
        },
        Role::SalesAgent => match resource {
            Vehicles => RU,
            Customers => CRU,
            Invoices | Settings => R,
            Users | System | Backups | Logs => NONE,
        },
        Role::Viewer => match resource {
            Vehicles | Customers | Invoices | Settings => R,
            Users | System | Backups | Logs => NONE,
        },
    }
}

/// One row of a role's table entry.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct Grant {
    pub resource: Resource,
    pub actions: ActionSet,
}

/// Rows with at least one action, in table column order.
pub fn grants(role: Role) -> Vec<Grant> {
    Resource::ALL
        .into_iter()
        .map(|resource| Grant {
            resource,
            actions: actions_for(role, resource),
        })
        .filter(|grant| !grant.actions.is_empty())
        .collect()
}

impl Role {
    pub fn can(self, resource: Resource, action: Action) -> bool {
        actions_for(self, resource).contains(action)
    }
}
