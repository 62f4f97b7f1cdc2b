use crate::ai::{CorrectionHandler, CorrectionResult};
use crate::views;
use axum::{
    extract::{rejection::FormRejection, State},
    response::Html,
    routing::get,
    Form, Json, Router,
};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;

/// Shared state handed to every route
#[derive(Clone)]
pub struct AppState {
    handler: Arc<CorrectionHandler>,
}

/// Body of a form submission
#[derive(Debug, Deserialize)]
pub struct CorrectionForm {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub provider: &'static str,
}

/// Build the application router
pub fn router(handler: Arc<CorrectionHandler>) -> Router {
    Router::new()
        .route("/", get(index).post(submit))
        .route("/health", get(health))
        .with_state(AppState { handler })
}

async fn index() -> Html<String> {
    Html(views::render_page(&CorrectionResult::empty()))
}

/// Unreadable submissions are treated as empty text so the page always renders
async fn submit(
    State(state): State<AppState>,
    form: Result<Form<CorrectionForm>, FormRejection>,
) -> Html<String> {
    let text = match form {
        Ok(Form(form)) => form.text,
        Err(rejection) => {
            warn!("Unreadable form submission: {}", rejection);
            String::new()
        }
    };

    let result = state.handler.handle(&text).await;
    Html(views::render_page(&result))
}

async fn health(State(state): State<AppState>) -> Json<Health> {
    Json(Health {
        status: "ok",
        provider: state.handler.provider_name(),
    })
}

/// Serve the correction form until Ctrl+C
pub async fn serve(handler: Arc<CorrectionHandler>, addr: SocketAddr) -> std::io::Result<()> {
    let provider = handler.provider_name();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{} using {}", listener.local_addr()?, provider);

    axum::serve(listener, router(handler))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received interrupt signal, shutting down gracefully..."),
        Err(e) => warn!("Failed to listen for shutdown signal: {}", e),
    }
}
