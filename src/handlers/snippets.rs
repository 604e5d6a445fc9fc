use axum::{
    Extension,
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};

use super::page_context;
use crate::AppState;
use crate::auth::AuthState;
use crate::error::{AppError, ResultExt};
use crate::forms::Form;
use crate::render;
use crate::session::Session;

/// Maximum snippet title length in characters.
const MAX_TITLE_CHARS: usize = 100;

/// Permitted lifetimes for a new snippet, in days.
const EXPIRES_OPTIONS: [&str; 3] = ["1", "7", "365"];

pub async fn home(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthState>,
    Extension(session): Extension<Session>,
) -> Result<Html<String>, AppError> {
    let snippets = state
        .db
        .snippets()
        .latest()
        .await
        .db_err("Failed to list latest snippets")?;
    Ok(render::home_page(&page_context(&auth, &session), &snippets))
}

pub async fn view(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> Result<Html<String>, AppError> {
    // An unparseable or non-positive ID reads as a snippet that does
    // not exist, not as a malformed request
    let id: i64 = id.parse().map_err(|_| AppError::NotFound)?;
    if id < 1 {
        return Err(AppError::NotFound);
    }

    let snippet = state
        .db
        .snippets()
        .get(id)
        .await
        .db_err("Failed to get snippet")?
        .ok_or(AppError::NotFound)?;

    Ok(render::snippet_page(&page_context(&auth, &session), &snippet))
}

pub async fn create_form(
    Extension(auth): Extension<AuthState>,
    Extension(session): Extension<Session>,
) -> Html<String> {
    render::create_form_page(&page_context(&auth, &session), &Form::default())
}

pub async fn create_submit(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthState>,
    Extension(session): Extension<Session>,
    mut form: Form,
) -> Result<Response, AppError> {
    form.required(&["title", "content", "expires"]);
    form.max_length("title", MAX_TITLE_CHARS);
    form.permitted_values("expires", &EXPIRES_OPTIONS);

    if !form.valid() {
        let page = render::create_form_page(&page_context(&auth, &session), &form);
        return Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response());
    }

    // Guaranteed numeric by the permitted-values check
    let days: i64 = form
        .get("expires")
        .parse()
        .map_err(|e| AppError::internal("Validated expires value failed to parse", e))?;

    let id = state
        .db
        .snippets()
        .insert(form.get("title"), form.get("content"), days)
        .await
        .db_err("Failed to insert snippet")?;

    session.set_flash("Snippet successfully created!");
    Ok(Redirect::to(&format!("/snippet/{id}")).into_response())
}
