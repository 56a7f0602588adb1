use crate::{
    AppState,
    api::models::users::CurrentUser,
    auth::{resolver, session},
    db::handlers::Sessions,
    errors::{Error, Result},
};
use axum::{extract::FromRequestParts, http::request::Parts};
use tracing::{instrument, warn};

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Error;

    /// Resolve the principal for this request: session cookie -> session
    /// row -> role resolution. Runs once per request; if the session row
    /// lacked a role claim, the resolved role is written back (best-effort)
    /// so the next request takes the claim path.
    #[instrument(skip(parts, state))]
    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let token = session::token_from_headers(&parts.headers, &state.config)?.ok_or(Error::Unauthenticated { message: None })?;

        let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

        let session = Sessions::new(&mut conn)
            .get_active(&token)
            .await?
            .ok_or(Error::Unauthenticated { message: None })?;

        let had_claim = session.role.is_some();
        let role = resolver::resolve_role(session.role, Some(session.user_id), None, &mut conn).await;

        if !had_claim {
            // Cache the resolved claim on the session. Best-effort: the
            // request proceeds with the resolved role either way.
            if let Err(e) = Sessions::new(&mut conn).set_role(&token, role).await {
                warn!("Failed to write role claim back to session: {e}");
            }
        }

        Ok(CurrentUser {
            id: session.user_id,
            role,
        })
    }
}
