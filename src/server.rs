//! HTTP surface: `GET /ready` and `POST /process`.

use anyhow::{Context, Result};
use axum::extract::{DefaultBodyLimit, FromRequest, Multipart, Request, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use std::sync::Arc;

use crate::config::Config;
use crate::error::ProcessError;
use crate::pipeline::Engine;
use crate::readiness::{ReadinessState, ReadinessTracker};
use crate::request::{CHUNK_FIELD, RawRequest, RequestError};

/// Shared by every handler.
pub struct AppState {
    pub engine: Engine,
    pub readiness: ReadinessTracker,
}

impl AppState {
    pub fn new(engine: Engine, readiness: ReadinessTracker) -> Self {
        Self { engine, readiness }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Engine::from_config(config),
            ReadinessTracker::new(config.warmup()),
        )
    }
}

pub fn build_router(state: Arc<AppState>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/ready", get(ready_handler))
        .route("/process", post(process_handler))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
}

/// GET /ready
///
/// Readiness probe. The first call starts the warm-up.
pub async fn ready_handler(State(state): State<Arc<AppState>>) -> StatusCode {
    match state.readiness.check_and_advance() {
        ReadinessState::Ready => StatusCode::OK,
        ReadinessState::Failed => StatusCode::INTERNAL_SERVER_ERROR,
        ReadinessState::Untouched | ReadinessState::Initializing => {
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

/// POST /process
///
/// Accepts `multipart/form-data` (with an optional `chunk` file part) or
/// `application/x-www-form-urlencoded`.
pub async fn process_handler(State(state): State<Arc<AppState>>, req: Request) -> Response {
    let raw = match read_form(req).await {
        Ok(raw) => raw,
        Err(e) => {
            log::warn!("Rejected request body: {e}");
            return e.into_response();
        }
    };

    match state.engine.process(raw).await {
        Ok(envelope) => Json(envelope).into_response(),
        Err(e) => {
            log::warn!("Request failed ({}): {e}", e.status_code());
            e.into_response()
        }
    }
}

async fn read_form(req: Request) -> Result<RawRequest, ProcessError> {
    let headers: Vec<(String, String)> = req
        .headers()
        .iter()
        .map(|(name, value)| {
            (
                name.to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();
    let is_multipart = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(is_multipart_form);

    let mut raw = if is_multipart {
        read_multipart(req).await?
    } else {
        let Form(fields) = Form::<Vec<(String, String)>>::from_request(req, &())
            .await
            .map_err(|e| body_error(e.status(), e.body_text()))?;
        RawRequest::from_fields(fields)
    };
    for (name, value) in headers {
        raw.push_header(name, value);
    }
    Ok(raw)
}

/// Media types compare case-insensitively.
fn is_multipart_form(content_type: &str) -> bool {
    content_type
        .trim_start()
        .to_ascii_lowercase()
        .starts_with("multipart/form-data")
}

async fn read_multipart(req: Request) -> Result<RawRequest, ProcessError> {
    let mut multipart = Multipart::from_request(req, &())
        .await
        .map_err(|e| body_error(e.status(), e.body_text()))?;

    let mut raw = RawRequest::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| body_error(e.status(), e.body_text()))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        if name == CHUNK_FIELD {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| body_error(e.status(), e.body_text()))?;
            raw.set_chunk(bytes);
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| body_error(e.status(), e.body_text()))?;
            raw.push_field(name, value);
        }
    }
    Ok(raw)
}

fn body_error(status: StatusCode, text: String) -> ProcessError {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        ProcessError::BodyTooLarge(text)
    } else {
        RequestError::MalformedBody(text).into()
    }
}

/// Bind the configured address and serve until Ctrl-C.
pub async fn serve(config: &Config) -> Result<()> {
    let state = Arc::new(AppState::from_config(config));
    let router = build_router(state, config.server.max_upload_bytes);

    let listener = tokio::net::TcpListener::bind(&config.server.listen)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.listen))?;
    log::info!(
        "Listening on http://{}",
        listener.local_addr().context("Failed to read bound address")?
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::error!("Failed to listen for shutdown signal: {e}");
                std::future::pending::<()>().await;
            }
            log::info!("Shutting down");
        })
        .await
        .context("HTTP server error")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exif::fixtures;
    use crate::fetch::ContentFetcher;
    use crate::notify::NoopNotifier;
    use reqwest::multipart;
    use std::net::SocketAddr;
    use std::time::Duration;

    async fn spawn_app(warmup: Duration, max_upload_bytes: usize) -> SocketAddr {
        let engine = Engine::new(
            ContentFetcher::new(Duration::from_secs(2)),
            Arc::new(NoopNotifier),
            false,
        );
        let state = Arc::new(AppState::new(engine, ReadinessTracker::new(warmup)));
        let router = build_router(state, max_upload_bytes);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        addr
    }

    fn base_form() -> multipart::Form {
        multipart::Form::new()
            .text("startOffsetMS", "1000")
            .text("endOffsetMS", "2000")
            .text("chunkMimeType", "image/jpeg")
    }

    // ── /ready ───────────────────────────────────────────────────────

    #[tokio::test]
    async fn ready_warms_up() {
        let addr = spawn_app(Duration::from_millis(100), 1024 * 1024).await;
        let url = format!("http://{addr}/ready");

        let first = reqwest::get(&url).await.unwrap();
        assert_eq!(first.status(), StatusCode::SERVICE_UNAVAILABLE);

        tokio::time::sleep(Duration::from_millis(300)).await;
        let later = reqwest::get(&url).await.unwrap();
        assert_eq!(later.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn failed_engine_reports_server_error() {
        let engine = Engine::new(
            ContentFetcher::new(Duration::from_secs(1)),
            Arc::new(NoopNotifier),
            false,
        );
        let state = Arc::new(AppState::new(
            engine,
            ReadinessTracker::new(Duration::from_secs(60)),
        ));
        state.readiness.mark_failed();

        let status = ready_handler(State(state)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    // ── /process ─────────────────────────────────────────────────────

    #[tokio::test]
    async fn multipart_chunk_is_decoded() {
        let addr = spawn_app(Duration::ZERO, 1024 * 1024).await;
        let form = base_form().part(
            "chunk",
            multipart::Part::bytes(fixtures::jpeg_with_exif()).file_name("chunk.jpg"),
        );

        let response = reqwest::Client::new()
            .post(format!("http://{addr}/process"))
            .multipart(form)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body: serde_json::Value = response.json().await.unwrap();
        let segment = &body["series"][0];
        assert_eq!(segment["startTimeMs"], 1000);
        assert_eq!(segment["stopTimeMs"], 2000);
        assert_eq!(segment["vendor"]["exif"]["DateTime"], fixtures::DATE_TIME);
    }

    #[tokio::test]
    async fn validation_error_is_plain_text_400() {
        let addr = spawn_app(Duration::ZERO, 1024 * 1024).await;
        let form = multipart::Form::new().text("endOffsetMS", "2000");

        let response = reqwest::Client::new()
            .post(format!("http://{addr}/process"))
            .multipart(form)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.text().await.unwrap(),
            "field 'startOffsetMS' could not be found in the request"
        );
    }

    #[tokio::test]
    async fn urlencoded_form_is_accepted() {
        let addr = spawn_app(Duration::ZERO, 1024 * 1024).await;
        let response = reqwest::Client::new()
            .post(format!("http://{addr}/process"))
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body("startOffsetMS=0&endOffsetMS=0&chunkMimeType=image%2Fgif")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(
            response
                .text()
                .await
                .unwrap()
                .starts_with("Chunk has media type 'image/gif'")
        );
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let addr = spawn_app(Duration::ZERO, 64).await;
        let form = base_form().part("chunk", multipart::Part::bytes(vec![0u8; 4096]));

        let response = reqwest::Client::new()
            .post(format!("http://{addr}/process"))
            .multipart(form)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn mixed_case_multipart_content_type() {
        let addr = spawn_app(Duration::ZERO, 1024 * 1024).await;
        let body = "--XX\r\n\
            Content-Disposition: form-data; name=\"startOffsetMS\"\r\n\r\n\
            0\r\n\
            --XX\r\n\
            Content-Disposition: form-data; name=\"endOffsetMS\"\r\n\r\n\
            0\r\n\
            --XX\r\n\
            Content-Disposition: form-data; name=\"chunkMimeType\"\r\n\r\n\
            image/png\r\n\
            --XX--\r\n";

        let response = reqwest::Client::new()
            .post(format!("http://{addr}/process"))
            .header(header::CONTENT_TYPE, "Multipart/Form-Data; boundary=XX")
            .body(body)
            .send()
            .await
            .unwrap();
        // Reaching media-type validation means the multipart body was parsed
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(
            response
                .text()
                .await
                .unwrap()
                .starts_with("Chunk has media type 'image/png'")
        );
    }

    #[test]
    fn multipart_detection_ignores_case() {
        assert!(is_multipart_form("multipart/form-data; boundary=a"));
        assert!(is_multipart_form("Multipart/Form-Data; boundary=a"));
        assert!(is_multipart_form(" MULTIPART/FORM-DATA"));
        assert!(!is_multipart_form("application/x-www-form-urlencoded"));
    }

    #[tokio::test]
    async fn headers_are_captured() {
        let req = Request::builder()
            .method("POST")
            .uri("/process")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header("x-task-id", "42")
            .body(axum::body::Body::from("startOffsetMS=1"))
            .unwrap();

        let raw = read_form(req).await.unwrap();
        assert_eq!(raw.field("startOffsetMS"), Some("1"));
        assert!(
            raw.headers()
                .iter()
                .any(|(name, value)| name == "x-task-id" && value == "42")
        );
        assert!(
            raw.headers()
                .iter()
                .any(|(name, value)| name == "content-type"
                    && value == "application/x-www-form-urlencoded")
        );
    }

    #[test]
    fn body_errors_map_by_status() {
        assert!(matches!(
            body_error(StatusCode::PAYLOAD_TOO_LARGE, "big".into()),
            ProcessError::BodyTooLarge(_)
        ));
        assert!(matches!(
            body_error(StatusCode::UNSUPPORTED_MEDIA_TYPE, "what".into()),
            ProcessError::Request(RequestError::MalformedBody(_))
        ));
    }
}
