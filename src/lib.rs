pub mod auth;
pub mod cli;
pub mod db;
pub mod error;
pub mod forms;
pub mod handlers;
pub mod middleware;
pub mod password;
pub mod render;
pub mod session;

use axum::{
    Router,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::{catch_panic::CatchPanicLayer, services::ServeDir};

use db::Database;

pub struct ServerConfig {
    /// Database connection (cloneable, uses connection pool internally)
    pub db: Database,
    /// Directory of static assets served under /static
    pub static_dir: String,
    /// Whether to set the Secure flag on the session cookie (should be
    /// true in production behind HTTPS)
    pub secure_cookies: bool,
}

/// Shared handler and middleware state.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub secure_cookies: bool,
}

/// Create the application router with the given configuration.
///
/// Two chains wrap the handlers: a universal one (panic recovery,
/// request logging, security headers) around every route, and a dynamic
/// one (session attach, CSRF guard, authentication) around the stateful
/// routes. Routes needing a signed-in user add the auth guard as their
/// innermost stage.
pub fn create_app(config: &ServerConfig) -> Router {
    let state = AppState {
        db: config.db.clone(),
        secure_cookies: config.secure_cookies,
    };

    let protected = Router::new()
        .route(
            "/snippet/create",
            get(handlers::create_form).post(handlers::create_submit),
        )
        .route("/user/logout", post(handlers::logout))
        .route_layer(from_fn(auth::require_auth));

    // Layers run top-down from the last .layer call, so the order below
    // reads inside-out: authenticate, then the CSRF guard, with session
    // attach outermost.
    let dynamic = Router::new()
        .route("/", get(handlers::home))
        .route("/snippet/{id}", get(handlers::view))
        .route(
            "/user/signup",
            get(handlers::signup_form).post(handlers::signup_submit),
        )
        .route(
            "/user/login",
            get(handlers::login_form).post(handlers::login_submit),
        )
        .merge(protected)
        .layer(from_fn_with_state(state.clone(), auth::authenticate))
        .layer(from_fn(session::csrf_guard))
        .layer(from_fn_with_state(state.clone(), session::attach_session))
        .with_state(state);

    // /ping and /static bypass the dynamic chain entirely
    Router::new()
        .merge(dynamic)
        .route("/ping", get(handlers::ping))
        .nest_service("/static", ServeDir::new(&config.static_dir))
        .layer(from_fn(middleware::security_headers))
        .layer(from_fn(middleware::log_requests))
        .layer(CatchPanicLayer::custom(middleware::handle_panic))
}

/// Run the server on the given listener. This function blocks until the
/// server exits.
pub async fn run_server(config: ServerConfig, listener: TcpListener) -> Result<(), std::io::Error> {
    let app = create_app(&config);
    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, make_service).await
}
