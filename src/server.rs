//! HTTP surface: extraction endpoint, SSE progress feed, Apple Music
//! developer-token issuance.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures_util::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::core::Platform;
use crate::error::Result;
use crate::progress::{self, MemoryProgressStore, ProgressStore};

/// How often stale progress entries are swept out.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub progress: Arc<MemoryProgressStore>,
}

/// Bind and serve until the process is stopped.
pub async fn serve(port: u16) -> Result<()> {
    let state = AppState {
        progress: Arc::new(MemoryProgressStore::default()),
    };

    // Progress entries outlive their subscribers; sweep them periodically.
    let sweeper = state.progress.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            let evicted = sweeper.evict_expired();
            if evicted > 0 {
                tracing::debug!(evicted, "evicted stale progress entries");
            }
        }
    });

    let app = router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, "server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn router(state: AppState) -> Router {
    // The browser client is served from another origin.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let router = Router::new()
        .route("/api/test", get(test_endpoint))
        .route("/api/extract", post(extract))
        .route("/api/progress/{request_id}", get(progress_events));

    #[cfg(feature = "apple")]
    let router = router.route("/api/apple-music/auth", post(apple_music_auth));

    router
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractRequest {
    pub url: Option<String>,
    pub platform: Option<String>,
    pub request_id: Option<String>,
    pub user_token: Option<String>,
}

async fn test_endpoint() -> Json<serde_json::Value> {
    Json(json!({"message": "API is working"}))
}

/// `POST /api/extract`. Missing fields and unknown platform tags are input
/// errors; everything else degrades to mock data with a success status.
async fn extract(State(state): State<AppState>, Json(request): Json<ExtractRequest>) -> Response {
    let (Some(url), Some(platform_tag)) = (request.url, request.platform) else {
        return error_response(StatusCode::BAD_REQUEST, "URL and platform are required");
    };
    if url.is_empty() || platform_tag.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "URL and platform are required");
    }
    let Ok(platform) = platform_tag.parse::<Platform>() else {
        return error_response(StatusCode::BAD_REQUEST, "Unsupported platform");
    };

    let store = state.progress.clone() as Arc<dyn ProgressStore>;
    match crate::extract_playlist(platform, &url, request.request_id, request.user_token, store)
        .await
    {
        Ok(result) => Json(result).into_response(),
        Err(err) => error_response(StatusCode::BAD_REQUEST, &err.to_string()),
    }
}

/// `GET /api/progress/{request_id}`: one JSON record per tick until the
/// record turns terminal or the client disconnects.
async fn progress_events(
    Path(request_id): Path<String>,
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    tracing::debug!(%request_id, "progress subscriber connected");

    let store = state.progress.clone() as Arc<dyn ProgressStore>;
    let stream = progress::subscribe(store, request_id).map(|record| {
        Ok(Event::default()
            .json_data(&record)
            .unwrap_or_else(|_| Event::default().data("{}")))
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

#[cfg(feature = "apple")]
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AppleAuthResponse {
    developer_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

/// `POST /api/apple-music/auth`: absent credentials are a soft miss so the
/// client can fall back to unauthenticated mode; a configured-but-broken key
/// is a real error.
#[cfg(feature = "apple")]
async fn apple_music_auth() -> Response {
    match crate::apple::mint_developer_token() {
        Ok(Some(token)) => Json(AppleAuthResponse {
            developer_token: Some(token),
            message: None,
        })
        .into_response(),
        Ok(None) => Json(AppleAuthResponse {
            developer_token: None,
            message: Some(
                "Apple Music developer credentials not configured properly. \
                 Using non-authenticated mode."
                    .to_string(),
            ),
        })
        .into_response(),
        Err(err) => {
            tracing::error!(error = %err, "developer token generation failed");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to generate Apple Music developer token",
            )
        }
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({"error": message}))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_request_wire_names() {
        let request: ExtractRequest = serde_json::from_str(
            r#"{"url": "https://x", "platform": "netease", "requestId": "r1", "userToken": "t"}"#,
        )
        .unwrap();
        assert_eq!(request.url.as_deref(), Some("https://x"));
        assert_eq!(request.request_id.as_deref(), Some("r1"));
        assert_eq!(request.user_token.as_deref(), Some("t"));
    }

    #[test]
    fn test_extract_request_tolerates_missing_fields() {
        let request: ExtractRequest = serde_json::from_str(r#"{}"#).unwrap();
        assert!(request.url.is_none());
        assert!(request.platform.is_none());
    }

    #[cfg(feature = "apple")]
    #[test]
    fn test_auth_response_omits_absent_message() {
        let response = AppleAuthResponse {
            developer_token: Some("abc".into()),
            message: None,
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"developerToken\":\"abc\""));
        assert!(!json.contains("message"));
    }
}
