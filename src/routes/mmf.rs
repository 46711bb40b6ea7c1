use actix_web::{http::StatusCode, web, web::Bytes, HttpResponse, Responder};
use futures::{future, stream, StreamExt};
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use validator::Validate;
use crate::core::{EngineError, MatchFunction, RunSummary};
use crate::models::{ErrorResponse, HealthResponse, RunRequest, RunResponse};
use crate::services::{ChannelSink, PoolQuery};
use std::sync::Arc;

/// Proposals buffered between the engine task and the response writer
const SINK_CAPACITY: usize = 64;

type RunTask = JoinHandle<Result<RunSummary, EngineError>>;

/// Application state shared across all handlers
pub struct AppState<Q> {
    pub matcher: MatchFunction,
    pub query: Arc<Q>,
}

impl<Q> Clone for AppState<Q> {
    fn clone(&self) -> Self {
        Self {
            matcher: self.matcher.clone(),
            query: Arc::clone(&self.query),
        }
    }
}

/// Configure all match-function routes
pub fn configure<Q: PoolQuery + 'static>(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/mmf/run", web::post().to(run_profile::<Q>));
}

/// Health check endpoint
async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Run the match function for one profile
///
/// POST /api/v1/mmf/run
///
/// Streams newline-delimited JSON, one `{"proposal": ...}` chunk per proposal
/// as soon as the engine emits it. The response is only committed to 200
/// once the first proposal arrives: a run that fails before emitting anything
/// answers with a plain error status, a run that fails later appends one
/// `ErrorResponse` line to the stream.
async fn run_profile<Q: PoolQuery + 'static>(
    state: web::Data<AppState<Q>>,
    req: web::Json<RunRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        tracing::info!("Validation failed for run request: field_errors={:?}", errors);
        return HttpResponse::BadRequest().json(ErrorResponse {
            error: "Validation failed".to_string(),
            message: errors.to_string(),
            status_code: 400,
        });
    }

    let profile = req.into_inner().profile;
    let (mut sink, mut rx) = ChannelSink::channel(SINK_CAPACITY);
    let app = state.get_ref().clone();

    tracing::info!("Running match function for profile: {}", profile.name);

    let task: RunTask = actix_web::rt::spawn(async move {
        app.matcher.run(&profile, app.query.as_ref(), &mut sink, None).await
    });

    let Some(first) = rx.recv().await else {
        // Sender dropped without emitting: the run is over
        return match finish(task).await {
            Ok(_) => HttpResponse::Ok().content_type("application/x-ndjson").finish(),
            Err(error) => HttpResponse::build(status_code(&error)).json(error),
        };
    };

    let proposals = stream::iter(Some(first))
        .chain(ReceiverStream::new(rx))
        .filter_map(|proposal| future::ready(encode_line(&RunResponse { proposal })));
    let trailer = stream::once(async move { finish(task).await.err() })
        .filter_map(|error| future::ready(error.as_ref().and_then(encode_line)));

    HttpResponse::Ok()
        .content_type("application/x-ndjson")
        .streaming(proposals.chain(trailer).map(Ok::<_, actix_web::Error>))
}

/// Wait for the engine task and log how it ended
async fn finish(task: RunTask) -> Result<RunSummary, ErrorResponse> {
    match task.await {
        Ok(Ok(summary)) => {
            tracing::info!(
                "Streamed {} proposals ({} dropped)",
                summary.sent,
                summary.dropped
            );
            Ok(summary)
        }
        Ok(Err(e)) => {
            tracing::error!("Match function failed: {}", e);
            Err(error_response(&e))
        }
        Err(e) => {
            tracing::error!("Match function task panicked: {}", e);
            Err(ErrorResponse {
                error: "Match function crashed".to_string(),
                message: e.to_string(),
                status_code: 500,
            })
        }
    }
}

fn encode_line<T: Serialize>(value: &T) -> Option<Bytes> {
    match serde_json::to_vec(value) {
        Ok(mut line) => {
            line.push(b'\n');
            Some(Bytes::from(line))
        }
        Err(e) => {
            tracing::error!("Failed to encode response line: {}", e);
            None
        }
    }
}

fn status_for(error: &EngineError) -> StatusCode {
    match error {
        EngineError::InvalidConfig(_) => StatusCode::BAD_REQUEST,
        EngineError::QueryFailed(_) => StatusCode::BAD_GATEWAY,
        EngineError::Scoring(_) => StatusCode::UNPROCESSABLE_ENTITY,
        EngineError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
        EngineError::Encoding(_) | EngineError::SendFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn status_code(error: &ErrorResponse) -> StatusCode {
    StatusCode::from_u16(error.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

fn error_response(error: &EngineError) -> ErrorResponse {
    let status = status_for(error);
    ErrorResponse {
        error: status
            .canonical_reason()
            .unwrap_or("Match function failed")
            .to_string(),
        message: error.to_string(),
        status_code: status.as_u16(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::QueryError;

    #[test]
    fn test_health_check_response() {
        let response = HealthResponse {
            status: "healthy".to_string(),
            version: "0.1.0".to_string(),
            timestamp: chrono::Utc::now(),
        };

        assert_eq!(response.status, "healthy");
    }

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(
            status_for(&EngineError::InvalidConfig("x".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&EngineError::QueryFailed(QueryError::ApiError("down".to_string()))),
            StatusCode::BAD_GATEWAY
        );

        let body = error_response(&EngineError::Cancelled);
        assert_eq!(body.status_code, 503);
        assert_eq!(body.message, "Run cancelled");
        assert_eq!(status_code(&body), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_encode_line_is_newline_terminated() {
        let line = encode_line(&error_response(&EngineError::Cancelled)).unwrap();

        assert_eq!(line.last(), Some(&b'\n'));
        let parsed: ErrorResponse = serde_json::from_slice(&line[..line.len() - 1]).unwrap();
        assert_eq!(parsed.status_code, 503);
    }
}
