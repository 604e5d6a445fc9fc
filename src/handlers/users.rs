use axum::{
    Extension,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};

use super::page_context;
use crate::AppState;
use crate::auth::AuthState;
use crate::db::UserError;
use crate::error::{AppError, ResultExt};
use crate::forms::{EMAIL_RX, Form};
use crate::password;
use crate::render;
use crate::session::Session;

/// Minimum password length in characters.
const MIN_PASSWORD_CHARS: usize = 8;

/// Shown for any credential failure. Deliberately does not distinguish
/// an unknown email from a wrong password.
const INVALID_CREDENTIALS: &str = "Email or password is incorrect";

pub async fn signup_form(
    Extension(auth): Extension<AuthState>,
    Extension(session): Extension<Session>,
) -> Html<String> {
    render::signup_page(&page_context(&auth, &session), &Form::default(), None)
}

pub async fn signup_submit(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthState>,
    Extension(session): Extension<Session>,
    mut form: Form,
) -> Result<Response, AppError> {
    form.required(&["name", "email", "password"]);
    form.max_length("name", 255);
    form.max_length("email", 255);
    form.matches_pattern("email", &EMAIL_RX);
    form.min_length("password", MIN_PASSWORD_CHARS);

    if !form.valid() {
        let page = render::signup_page(&page_context(&auth, &session), &form, None);
        return Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response());
    }

    let hashed = password::hash(form.get("password"))
        .map_err(|e| AppError::internal("Failed to hash password", e))?;

    match state
        .db
        .users()
        .insert(form.get("name"), form.get("email"), &hashed)
        .await
    {
        Ok(_) => {
            session.set_flash("Your signup was successful. Please log in.");
            Ok(Redirect::to("/user/login").into_response())
        }
        Err(UserError::DuplicateEmail) => {
            let page = render::signup_page(
                &page_context(&auth, &session),
                &form,
                Some("That email address is already in use"),
            );
            Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response())
        }
        Err(UserError::Sqlx(e)) => Err(AppError::internal("Failed to insert user", e)),
    }
}

pub async fn login_form(
    Extension(auth): Extension<AuthState>,
    Extension(session): Extension<Session>,
) -> Html<String> {
    render::login_page(&page_context(&auth, &session), &Form::default(), None)
}

pub async fn login_submit(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthState>,
    Extension(session): Extension<Session>,
    mut form: Form,
) -> Result<Response, AppError> {
    form.required(&["email", "password"]);
    form.matches_pattern("email", &EMAIL_RX);

    if !form.valid() {
        let page = render::login_page(&page_context(&auth, &session), &form, None);
        return Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response());
    }

    let credentials = state
        .db
        .users()
        .credentials_by_email(form.get("email"))
        .await
        .db_err("Failed to look up credentials")?;

    let Some((user_id, stored_hash)) = credentials else {
        return Ok(invalid_credentials(&auth, &session, &form));
    };

    match password::verify(form.get("password"), &stored_hash) {
        Ok(true) => {
            // Rotate the token on privilege change to defeat fixation
            session.renew();
            session.set_user_id(user_id);
            Ok(Redirect::to("/snippet/create").into_response())
        }
        Ok(false) => Ok(invalid_credentials(&auth, &session, &form)),
        Err(e) => Err(AppError::internal("Failed to verify password", e)),
    }
}

fn invalid_credentials(auth: &AuthState, session: &Session, form: &Form) -> Response {
    let page = render::login_page(
        &page_context(auth, session),
        form,
        Some(INVALID_CREDENTIALS),
    );
    (StatusCode::UNPROCESSABLE_ENTITY, page).into_response()
}

pub async fn logout(Extension(session): Extension<Session>) -> Redirect {
    session.clear_user_id();
    session.renew();
    session.set_flash("You've been logged out successfully!");
    Redirect::to("/")
}
