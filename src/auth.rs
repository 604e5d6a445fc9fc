//! Per-request authentication state.
//!
//! The session alone is never trusted: a user ID found in the session is
//! re-checked against the user store on every request, so a user deleted
//! mid-session falls back to anonymous and the stale ID is scrubbed.

use axum::{
    extract::{Request, State},
    http::{HeaderValue, header},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::AppState;
use crate::db::User;
use crate::error::AppError;
use crate::session::Session;

/// Where the auth guard sends anonymous visitors.
pub const LOGIN_PATH: &str = "/user/login";

/// Authentication state derived once per request and attached to it, so
/// every downstream stage observes the same snapshot. `None` is
/// anonymous; `Some` holds a user verified to exist this request.
#[derive(Debug, Clone)]
pub struct AuthState(pub Option<User>);

impl AuthState {
    pub fn signed_in(&self) -> bool {
        self.0.is_some()
    }
}

/// Resolve the session's claimed user into an [`AuthState`].
pub async fn authenticate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let session = req.extensions().get::<Session>().cloned();

    let mut current = None;
    if let Some(session) = session {
        if let Some(user_id) = session.user_id() {
            match state.db.users().get(user_id).await {
                Ok(Some(user)) => current = Some(user),
                // User deleted mid-session: scrub the stale ID
                Ok(None) => session.clear_user_id(),
                Err(e) => {
                    return AppError::internal("Failed to look up session user", e)
                        .into_response();
                }
            }
        }
    }

    req.extensions_mut().insert(AuthState(current));
    next.run(req).await
}

/// Short-circuit with a redirect to the login page unless the request
/// carries an authenticated user. Applied as a route layer on the
/// protected routes only.
pub async fn require_auth(req: Request, next: Next) -> Response {
    let authenticated = req
        .extensions()
        .get::<AuthState>()
        .is_some_and(AuthState::signed_in);

    if !authenticated {
        let mut response = Redirect::to(LOGIN_PATH).into_response();
        // Pages behind the guard must never land in shared caches
        response
            .headers_mut()
            .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
        return response;
    }

    next.run(req).await
}
