mod me;

use async_graphql::{
    Context, EmptyMutation, EmptySubscription, ErrorExtensions, Object, Schema, SimpleObject,
};
use platform_api::ApiError;
use platform_authn::Session;
use platform_authz::{Action, PolicyEngine, Resource, Role, has_permission};
use tracing::instrument;

use me::{MePayload, RoleGrantsPayload};

pub type SchemaType = Schema<QueryRoot, EmptyMutation, EmptySubscription>;

pub fn build_schema() -> SchemaType {
    Schema::build(QueryRoot, EmptyMutation, EmptySubscription).finish()
}

fn require_session<'a>(ctx: &'a Context<'_>) -> async_graphql::Result<&'a Session> {
    ctx.data_opt::<Session>()
        .ok_or_else(|| ApiError::Unauthorized.extend())
}

#[derive(Default)]
pub struct QueryRoot;

#[Object]
impl QueryRoot {
    #[instrument(name = "graphql.health", skip_all)]
    async fn health(&self) -> HealthPayload {
        HealthPayload { ok: true }
    }

    #[instrument(name = "graphql.version", skip_all)]
    async fn version(&self) -> String {
        env!("CARGO_PKG_VERSION").to_string()
    }

    #[instrument(name = "graphql.me", skip_all)]
    async fn me(&self, ctx: &Context<'_>) -> async_graphql::Result<MePayload> {
        let session = require_session(ctx)?;
        Ok(MePayload::from_session(session))
    }

    /// Whether the caller may perform `action` on `resource`.
    #[instrument(name = "graphql.can", skip_all, fields(resource = %resource, action = %action))]
    async fn can(
        &self,
        ctx: &Context<'_>,
        resource: String,
        action: String,
    ) -> async_graphql::Result<bool> {
        let session = require_session(ctx)?;
        Ok(has_permission(&session.role, &resource, &action))
    }

    #[instrument(name = "graphql.matrix", skip_all)]
    async fn matrix(&self, ctx: &Context<'_>) -> async_graphql::Result<Vec<RoleGrantsPayload>> {
        let session = require_session(ctx)?;
        PolicyEngine
            .authorize(
                &session.id.to_string(),
                &session.role,
                Resource::System,
                Action::Admin,
            )
            .map_err(|err| ApiError::from(err).extend())?;
        Ok(Role::ALL
            .into_iter()
            .map(RoleGrantsPayload::for_role)
            .collect())
    }
}

#[derive(Clone, Debug, SimpleObject)]
pub struct HealthPayload {
    pub ok: bool,
}
