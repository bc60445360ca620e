use std::sync::Arc;

use anyhow::Context;
use axum::extract::{Path, State};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use lokimap_core::LokimapError;
use lokimap_core::catalog::NameCatalog;
use lokimap_core::config::Config;
use lokimap_loki::LokiClient;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::Level;

use crate::dashboard;

#[derive(Clone)]
pub struct AppState {
    pub client: LokiClient,
    pub catalog: Arc<NameCatalog>,
    pub cfg: Arc<Config>,
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers(Any);
    let prefix = state.cfg.api_prefix.trim_end_matches('/').to_string();

    Router::new()
        .route(
            &format!("{prefix}/user-movement-map/{{account_id}}/{{hours}}"),
            get(user_movement_map),
        )
        .route("/healthz", get(|| async { "ok" }))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .on_request(tower_http::trace::DefaultOnRequest::new().level(Level::INFO))
                .on_response(tower_http::trace::DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}

async fn user_movement_map(
    State(state): State<AppState>,
    Path((account_id, hours)): Path<(i64, u32)>,
) -> Response {
    let result = dashboard::get_user_movement_map(
        &state.client,
        &state.catalog,
        &state.cfg,
        account_id,
        hours,
    )
    .await;

    match result {
        Ok(entries) => (StatusCode::OK, Json(entries)).into_response(),
        Err(err) => error_response(err),
    }
}

fn error_response(err: LokimapError) -> Response {
    let status = match &err {
        LokimapError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
        LokimapError::Upstream(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    tracing::warn!(error = %err, "movement map request failed");
    (status, Json(serde_json::json!({"error": err.to_string()}))).into_response()
}

pub async fn run(cfg: Config) -> anyhow::Result<()> {
    let catalog = match &cfg.catalog_path {
        Some(path) => NameCatalog::load(path).context("load name catalog")?,
        None => NameCatalog::builtin(),
    };
    let client =
        LokiClient::new(&cfg.loki_url, cfg.request_timeout).context("build loki client")?;

    let http_addr = cfg.http_addr.clone();
    let state = AppState {
        client,
        catalog: Arc::new(catalog),
        cfg: Arc::new(cfg),
    };

    let listener = tokio::net::TcpListener::bind(&http_addr)
        .await
        .with_context(|| format!("bind dashboard api {http_addr}"))?;
    tracing::info!(addr = %http_addr, loki = %state.cfg.loki_url, "dashboard api listening");

    let serve = tokio::spawn(async move {
        axum::serve(listener, router(state))
            .await
            .context("serve dashboard api")
    });

    tokio::select! {
        res = serve => {
            res??;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("received ctrl-c, shutting down");
        }
    }

    Ok(())
}
