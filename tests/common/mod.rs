#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, header},
    response::Response,
};
use snipbin::{ServerConfig, create_app, db::Database};
use tower::ServiceExt;

/// Create a test app backed by an in-memory database.
pub async fn test_app() -> (Router, Database) {
    let db = Database::open(":memory:")
        .await
        .expect("Failed to open test database");
    let config = ServerConfig {
        db: db.clone(),
        static_dir: "./ui/static".to_string(),
        secure_cookies: false,
    };
    (create_app(&config), db)
}

/// Read the full response body as a string.
pub async fn body_string(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    String::from_utf8(bytes.to_vec()).expect("Body was not UTF-8")
}

/// Pull the CSRF nonce out of a rendered form.
pub fn extract_csrf(html: &str) -> String {
    let marker = "name=\"csrf_token\" value=\"";
    let start = html
        .find(marker)
        .expect("Page should contain a CSRF token input")
        + marker.len();
    let rest = &html[start..];
    let end = rest.find('"').expect("Unterminated CSRF value");
    rest[..end].to_string()
}

/// URL-encode form fields for a POST body.
pub fn encode_form(fields: &[(&str, &str)]) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in fields {
        serializer.append_pair(key, value);
    }
    serializer.finish()
}

/// Minimal cookie-carrying test client over `Router::oneshot`.
pub struct Client {
    app: Router,
    pub cookie: Option<String>,
}

impl Client {
    pub fn new(app: Router) -> Self {
        Self { app, cookie: None }
    }

    pub async fn get(&mut self, path: &str) -> Response {
        let mut builder = Request::builder().uri(path);
        if let Some(cookie) = &self.cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = builder.body(Body::empty()).expect("Failed to build request");
        let response = self
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("Request failed");
        self.update_cookie(&response);
        response
    }

    pub async fn post(&mut self, path: &str, fields: &[(&str, &str)]) -> Response {
        self.post_raw(path, encode_form(fields)).await
    }

    pub async fn post_raw(&mut self, path: &str, body: String) -> Response {
        let mut builder = Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = &self.cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = builder.body(Body::from(body)).expect("Failed to build request");
        let response = self
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("Request failed");
        self.update_cookie(&response);
        response
    }

    /// Fetch a page and return the CSRF nonce embedded in its form.
    pub async fn csrf_from(&mut self, path: &str) -> String {
        let response = self.get(path).await;
        extract_csrf(&body_string(response).await)
    }

    /// Sign up and log in a fresh user, leaving the client authenticated.
    pub async fn signup_and_login(&mut self, name: &str, email: &str, password: &str) {
        let csrf = self.csrf_from("/user/signup").await;
        let response = self
            .post(
                "/user/signup",
                &[
                    ("csrf_token", &csrf),
                    ("name", name),
                    ("email", email),
                    ("password", password),
                ],
            )
            .await;
        assert_eq!(response.status().as_u16(), 303, "signup should redirect");

        let csrf = self.csrf_from("/user/login").await;
        let response = self
            .post(
                "/user/login",
                &[
                    ("csrf_token", &csrf),
                    ("email", email),
                    ("password", password),
                ],
            )
            .await;
        assert_eq!(response.status().as_u16(), 303, "login should redirect");
    }

    fn update_cookie(&mut self, response: &Response) {
        for value in response.headers().get_all(header::SET_COOKIE) {
            let Ok(raw) = value.to_str() else { continue };
            if let Some(rest) = raw.strip_prefix("session=") {
                let token = rest.split(';').next().unwrap_or("");
                self.cookie = if token.is_empty() {
                    None
                } else {
                    Some(format!("session={token}"))
                };
            }
        }
    }
}

/// Location header of a redirect response.
pub fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .expect("Response should carry a Location header")
        .to_str()
        .expect("Location header was not UTF-8")
}
