use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Serialize)]
pub struct Greeting {
    message: &'static str,
    timestamp: DateTime<Utc>,
}

/// Liveness endpoint, no auth and no side effects.
pub async fn hello() -> Json<Greeting> {
    Json(Greeting {
        message: "Hello!",
        timestamp: Utc::now(),
    })
}
