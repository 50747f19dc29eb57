mod auth_view;
mod chat_view;
mod error;
mod hello_view;
mod manager;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::Request;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use axum_extra::extract::cookie::CookieJar;
use sqlx::sqlite::SqlitePoolOptions;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use error::ApiError;
use manager::session_manager::{self, AuthSession, SessionId, SessionManager};

pub const SESSION_ID_KEY: &str = "session_id";

pub struct AppState {
    pub pool: sqlx::SqlitePool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let database_url = dotenvy::var("DATABASE_URL")?;
    let pool = SqlitePoolOptions::new().connect(&database_url).await?;
    sqlx::migrate!().run(&pool).await?;

    let state = Arc::new(AppState { pool });
    let addr: SocketAddr = dotenvy::var("BIND_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:3000".to_owned())
        .parse()?;
    tracing::info!(%addr, "listening");

    axum::Server::bind(&addr)
        .serve(app(state).into_make_service())
        .await?;
    Ok(())
}

fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/hello/", get(hello_view::hello))
        .route("/auth/register/", post(auth_view::register))
        .route("/auth/login/", post(auth_view::login))
        .route("/auth/me/", get(auth_view::me))
        .route("/auth/logout/", post(auth_view::logout))
        .route(
            "/chat/messages/",
            get(chat_view::list_messages).post(chat_view::post_message),
        )
        .layer(middleware::from_fn_with_state(state.clone(), resolve_session))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Resolves the session cookie into an [`AuthSession`] extension before any
/// handler runs. A missing, unknown, or dangling session leaves the member
/// unset; only a database failure aborts the request.
async fn resolve_session<B>(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request<B>,
    next: Next<B>,
) -> Response {
    let auth = match jar.get(SESSION_ID_KEY) {
        None => AuthSession::default(),
        Some(cookie) => {
            let session_id = SessionId(cookie.value().to_owned());
            match SessionManager::new(&state.pool).get_member(&session_id).await {
                Ok(member) => AuthSession {
                    session_id: Some(session_id),
                    member: Some(member),
                },
                Err(session_manager::Error::DoesNotExist) => AuthSession {
                    session_id: Some(session_id),
                    member: None,
                },
                Err(session_manager::Error::Database(e)) => {
                    return ApiError::from(e).into_response()
                }
            }
        }
    };
    request.extensions_mut().insert(auth);
    next.run(request).await
}
