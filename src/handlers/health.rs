/// Liveness probe; deliberately outside the session/auth chain.
pub async fn ping() -> &'static str {
    "OK"
}
