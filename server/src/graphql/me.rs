use async_graphql::SimpleObject;
use platform_authn::Session;
use platform_authz::{Grant, Role, grants};

#[derive(Clone, Debug, SimpleObject)]
pub struct MePayload {
    pub id: String,
    pub email: String,
    pub role: String,
    pub grants: Vec<GrantPayload>,
}

#[derive(Clone, Debug, SimpleObject)]
pub struct GrantPayload {
    pub resource: String,
    pub actions: Vec<String>,
}

#[derive(Clone, Debug, SimpleObject)]
pub struct RoleGrantsPayload {
    pub role: String,
    pub grants: Vec<GrantPayload>,
}

impl From<Grant> for GrantPayload {
    fn from(grant: Grant) -> Self {
        Self {
            resource: grant.resource.as_str().to_string(),
            actions: grant
                .actions
                .iter()
                .map(|action| action.as_str().to_string())
                .collect(),
        }
    }
}

fn payloads(role: Role) -> Vec<GrantPayload> {
    grants(role).into_iter().map(GrantPayload::from).collect()
}

impl MePayload {
    pub fn from_session(session: &Session) -> Self {
        Self {
            id: session.id.to_string(),
            email: session.email.clone(),
            role: session.role.clone(),
            grants: Role::parse(&session.role).map(payloads).unwrap_or_default(),
        }
    }
}

impl RoleGrantsPayload {
    pub fn for_role(role: Role) -> Self {
        Self {
            role: role.as_str().to_string(),
            grants: payloads(role),
        }
    }
}
