//! # haven-server
//!
//! HTTP API for Haven:
//!
//! - streaming chat with the coordinator, the intake agent and shelter agents
//! - shelter and donor records
//! - donation statistics read from the chain

pub mod chat;
pub mod error;
pub mod records;

use std::sync::Arc;
use std::time::Instant;

use axum::{
    Router,
    extract::State,
    http::{HeaderMap, Request, StatusCode},
    middleware::{self, Next},
    response::{Json, Response},
    routing::{get, post},
};
use haven_agents::AgentManager;
use haven_config::HavenConfig;
use haven_core::HavenError;
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub use error::{ApiError, ApiResult};

/// Shared server state.
pub struct AppState {
    pub manager: Arc<AgentManager>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(manager: Arc<AgentManager>) -> Self {
        Self {
            manager,
            started_at: Instant::now(),
        }
    }

    pub fn config(&self) -> &HavenConfig {
        &self.manager.context().config
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    uptime_secs: u64,
    shelter_agents: usize,
}

/// Build the Axum router.
pub fn build_router(manager: Arc<AgentManager>) -> Router {
    let state = Arc::new(AppState::new(manager));
    let server = state.config().server.clone();

    let api_routes = Router::new()
        .route("/api/adopt", post(chat::adopt_handler))
        .route("/api/chat", post(chat::chat_handler))
        .route("/api/coordinator", post(chat::coordinator_handler))
        .route("/api/intake", post(chat::intake_handler))
        .route(
            "/api/shelters",
            get(records::list_shelters_handler).post(records::create_shelter_handler),
        )
        .route(
            "/api/shelters/create",
            post(records::create_shelter_checked_handler),
        )
        .route(
            "/api/shelters/{id}/chat",
            post(chat::shelter_chat_handler),
        )
        .route("/api/donors", post(records::create_donor_handler))
        .route("/api/stats", get(records::stats_handler));

    let api_routes = if server.api_key.is_some() {
        api_routes.layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
    } else {
        api_routes
    };

    let mut router = Router::new()
        .route("/health", get(health_handler))
        .merge(api_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if server.cors {
        router = router.layer(CorsLayer::permissive());
    }

    router
}

/// Checks `Authorization: Bearer <key>` against `server.api_key`.
async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    request: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    if let Some(ref expected_key) = state.config().server.api_key {
        let provided = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));

        match provided {
            Some(key) if key == expected_key => {}
            _ => {
                warn!(path = %request.uri().path(), "unauthorized API request");
                return Err(StatusCode::UNAUTHORIZED);
            }
        }
    }
    Ok(next.run(request).await)
}

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        shelter_agents: state.manager.registry().len(),
    })
}

/// Start the HTTP server on `server.listen`.
pub async fn start_server(manager: Arc<AgentManager>) -> haven_core::Result<()> {
    let listen = manager.context().config.server.listen.clone();
    let router = build_router(manager);

    info!(listen = %listen, "starting HTTP server");

    let listener = tokio::net::TcpListener::bind(&listen)
        .await
        .map_err(|e| HavenError::Config(format!("failed to bind {listen}: {e}")))?;

    axum::serve(listener, router)
        .await
        .map_err(|e| HavenError::Agent(format!("server error: {e}")))?;

    Ok(())
}
