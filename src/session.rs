//! Session cookie handling and the stateful middleware stages.
//!
//! [`attach_session`] loads (or lazily creates) the session for a request
//! and persists it after the handler returns; [`csrf_guard`] rejects
//! state-changing requests whose form nonce does not match the session.
//! Handlers reach the session through the [`Session`] request extension.

use std::sync::{Arc, Mutex};

use axum::{
    body::{Body, to_bytes},
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, Method, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;

use crate::AppState;
use crate::db::SessionData;
use crate::error::AppError;
use crate::forms::MAX_FORM_BYTES;

/// Cookie carrying the opaque session token.
pub const SESSION_COOKIE_NAME: &str = "session";

/// Rolling session lifetime, refreshed on every request.
pub const SESSION_TTL_HOURS: i64 = 12;

/// Form field carrying the CSRF nonce.
pub const CSRF_FIELD: &str = "csrf_token";

/// Extract a cookie value from the Cookie header.
pub fn get_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    let cookie_header = headers.get(header::COOKIE)?.to_str().ok()?;
    for part in cookie_header.split(';') {
        let part = part.trim();
        if let Some((key, value)) = part.split_once('=') {
            if key.trim() == name {
                return Some(value.trim());
            }
        }
    }
    None
}

/// Generate an opaque 256-bit token, base64url-encoded.
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

struct SessionInner {
    token: String,
    data: SessionData,
    /// Created this request; nothing to load or rotate in the store yet.
    fresh: bool,
    renew: bool,
    destroy: bool,
}

/// Per-request session handle, shared between the attach middleware and
/// the handler. Mutations are applied to the store once, after the
/// handler returns.
#[derive(Clone)]
pub struct Session {
    inner: Arc<Mutex<SessionInner>>,
}

impl Session {
    fn new(token: String, data: SessionData, fresh: bool) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SessionInner {
                token,
                data,
                fresh,
                renew: false,
                destroy: false,
            })),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SessionInner> {
        // Never poisoned: no holder of this lock can panic
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn user_id(&self) -> Option<i64> {
        self.lock().data.user_id
    }

    pub fn set_user_id(&self, id: i64) {
        self.lock().data.user_id = Some(id);
    }

    pub fn clear_user_id(&self) {
        self.lock().data.user_id = None;
    }

    pub fn csrf_token(&self) -> String {
        self.lock().data.csrf_token.clone()
    }

    pub fn set_flash(&self, message: &str) {
        self.lock().data.flash = Some(message.to_string());
    }

    /// Take the one-shot flash message, clearing it from the session.
    pub fn take_flash(&self) -> Option<String> {
        self.lock().data.flash.take()
    }

    /// Rotate the session token before the post-handler save. Called
    /// after privilege changes (login, logout).
    pub fn renew(&self) {
        self.lock().renew = true;
    }

    /// Drop the session entirely after this request.
    pub fn destroy(&self) {
        self.lock().destroy = true;
    }

    fn snapshot(&self) -> (String, SessionData, bool, bool, bool) {
        let inner = self.lock();
        (
            inner.token.clone(),
            inner.data.clone(),
            inner.fresh,
            inner.renew,
            inner.destroy,
        )
    }
}

/// Load or create the session, expose it to inner stages, and persist
/// it once the handler has finished.
pub async fn attach_session(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let loaded = match get_cookie(req.headers(), SESSION_COOKIE_NAME) {
        Some(token) => match state.db.sessions().load(token).await {
            Ok(Some(data)) => Some((token.to_string(), data)),
            // Absent and expired tokens both mean "no session"
            Ok(None) => None,
            Err(e) => return AppError::internal("Failed to load session", e).into_response(),
        },
        None => None,
    };

    let session = match loaded {
        Some((token, data)) => Session::new(token, data, false),
        None => {
            let data = SessionData {
                csrf_token: generate_token(),
                ..SessionData::default()
            };
            Session::new(generate_token(), data, true)
        }
    };

    req.extensions_mut().insert(session.clone());
    let mut response = next.run(req).await;

    if let Err(e) = persist(&state, &session, &mut response).await {
        return AppError::internal("Failed to save session", e).into_response();
    }
    response
}

async fn persist(
    state: &AppState,
    session: &Session,
    response: &mut Response,
) -> Result<(), sqlx::Error> {
    let (mut token, data, fresh, renew, destroy) = session.snapshot();
    let store = state.db.sessions();

    if destroy {
        if !fresh {
            store.destroy(&token).await?;
        }
        append_cookie(response, &expired_cookie(state.secure_cookies));
        return Ok(());
    }

    let mut set_cookie = fresh;
    if renew {
        let new_token = generate_token();
        if !fresh {
            store.renew_token(&token, &new_token).await?;
        }
        token = new_token;
        set_cookie = true;
    }

    store.save(&token, &data, SESSION_TTL_HOURS).await?;

    if set_cookie {
        append_cookie(response, &session_cookie(&token, state.secure_cookies));
    }
    Ok(())
}

fn session_cookie(token: &str, secure: bool) -> String {
    let secure = if secure { "; Secure" } else { "" };
    format!(
        "{SESSION_COOKIE_NAME}={token}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}{secure}",
        SESSION_TTL_HOURS * 3600
    )
}

fn expired_cookie(secure: bool) -> String {
    let secure = if secure { "; Secure" } else { "" };
    format!("{SESSION_COOKIE_NAME}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0{secure}")
}

fn append_cookie(response: &mut Response, cookie: &str) {
    if let Ok(value) = HeaderValue::from_str(cookie) {
        response.headers_mut().append(header::SET_COOKIE, value);
    }
}

/// Reject state-changing requests whose submitted nonce does not match
/// the one issued for the session. The body is buffered here (bounded)
/// and handed back to the inner stages untouched. Runs inside the
/// session stage and outside authentication.
pub async fn csrf_guard(req: Request, next: Next) -> Response {
    if matches!(
        *req.method(),
        Method::GET | Method::HEAD | Method::OPTIONS | Method::TRACE
    ) {
        return next.run(req).await;
    }

    let (parts, body) = req.into_parts();

    // The session stage always runs before this one on dynamic routes
    let Some(session) = parts.extensions.get::<Session>().cloned() else {
        return AppError::internal("CSRF guard ran without a session", "missing extension")
            .into_response();
    };

    let bytes = match to_bytes(body, MAX_FORM_BYTES).await {
        Ok(bytes) => bytes,
        Err(_) => return AppError::PayloadTooLarge.into_response(),
    };

    let submitted = url::form_urlencoded::parse(&bytes)
        .find(|(key, _)| key == CSRF_FIELD)
        .map(|(_, value)| value.into_owned());
    let expected = session.csrf_token();

    if submitted.as_deref() != Some(expected.as_str()) {
        return AppError::BadRequest("Invalid CSRF Token").into_response();
    }

    let req = Request::from_parts(parts, Body::from(bytes));
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_cookie_simple() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("session=abc123"));

        assert_eq!(get_cookie(&headers, "session"), Some("abc123"));
    }

    #[test]
    fn test_get_cookie_multiple() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("foo=bar; session=abc123; theme=dark"),
        );

        assert_eq!(get_cookie(&headers, "session"), Some("abc123"));
        assert_eq!(get_cookie(&headers, "theme"), Some("dark"));
    }

    #[test]
    fn test_get_cookie_not_found() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("foo=bar"));

        assert_eq!(get_cookie(&headers, "session"), None);
        assert_eq!(get_cookie(&HeaderMap::new(), "session"), None);
    }

    #[test]
    fn test_generate_token_is_unguessable_length_and_unique() {
        let a = generate_token();
        let b = generate_token();
        // 32 bytes base64url without padding
        assert_eq!(a.len(), 43);
        assert_ne!(a, b);
    }

    #[test]
    fn test_session_flash_is_one_shot() {
        let session = Session::new("tok".into(), SessionData::default(), true);
        session.set_flash("Snippet successfully created!");

        assert_eq!(
            session.take_flash().as_deref(),
            Some("Snippet successfully created!")
        );
        assert_eq!(session.take_flash(), None);
    }

    #[test]
    fn test_session_user_id_roundtrip() {
        let session = Session::new("tok".into(), SessionData::default(), true);
        assert_eq!(session.user_id(), None);

        session.set_user_id(9);
        assert_eq!(session.user_id(), Some(9));

        session.clear_user_id();
        assert_eq!(session.user_id(), None);
    }
}
