//! User-context resolution. Authentication itself is an external
//! collaborator; requests arrive with an already-authenticated `X-User-Id`
//! header and this layer resolves the effective role (legacy `parent`
//! normalized to `main_parent`) and family scope from config.

use axum::{
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};

use chorepoints_shared::domain::Role;

use super::{AppError, AppState};

pub const USER_HEADER: &str = "x-user-id";

#[derive(Debug, Clone)]
pub struct UserCtx {
    pub user_id: String,
    pub role: Role,
    pub child_id: Option<String>,
    /// Primary parent id owning this user's shared data scope.
    pub family_root: String,
}

impl UserCtx {
    pub fn require_parent(&self) -> Result<(), AppError> {
        if self.role == Role::MainParent {
            Ok(())
        } else {
            Err(AppError::forbidden())
        }
    }

    /// The child id the acting user may act as. Parents may act for any
    /// child they name; child users only for themselves.
    pub fn acting_child<'a>(&'a self, requested: &'a str) -> Result<&'a str, AppError> {
        match self.role {
            Role::MainParent => Ok(requested),
            Role::Child => match self.child_id.as_deref() {
                Some(own) if own == requested => Ok(own),
                _ => Err(AppError::forbidden()),
            },
        }
    }
}

pub async fn resolve_user(
    State(state): State<AppState>,
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, AppError> {
    let user_id = req
        .headers()
        .get(USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .ok_or_else(AppError::unauthorized)?;
    let Some(user) = state.config.user(&user_id) else {
        tracing::warn!(%user_id, "unknown user id");
        return Err(AppError::unauthorized());
    };
    let ctx = UserCtx {
        user_id: user.id.clone(),
        role: user.role,
        child_id: user.child_id.clone(),
        family_root: state.config.family_root_of(user),
    };
    req.extensions_mut().insert(ctx);
    Ok(next.run(req).await)
}
