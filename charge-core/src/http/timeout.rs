use std::time::Duration;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::warn;

use super::response::ApiError;
use crate::Error;

/// Deadline applied to every request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(500);

/// Answers with a timeout envelope if the handler hasn't finished within the
/// deadline. The handler future is dropped; a write already sent to the
/// database may still complete.
pub async fn request_deadline(
    State(deadline): State<Duration>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();

    match tokio::time::timeout(deadline, next.run(request)).await {
        Ok(response) => response,
        Err(elapsed) => {
            warn!("{} {} exceeded {:?}", method, uri, deadline);
            ApiError(Error::Timeout(elapsed)).into_response()
        }
    }
}
