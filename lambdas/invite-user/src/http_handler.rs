use lambda_http::{http::Method, Body, Error, Request, Response};
use std::sync::Arc;
use wbl_shared::error::ApiError;
use wbl_shared::http::{method_not_allowed, preflight};
use wbl_shared::{invites, AppState};

/// Main Lambda handler - invites a user on POST
pub(crate) async fn function_handler(
    event: Request,
    state: Arc<AppState>,
) -> Result<Response<Body>, Error> {
    tracing::info!(
        "Invite user lambda invoked - Method: {} Path: {}",
        event.method(),
        event.uri().path()
    );

    match *event.method() {
        Method::OPTIONS => preflight(),
        Method::POST => match invites::invite_user(&state, &event).await {
            Ok(response) => Ok(response),
            Err(e) => {
                tracing::error!("Unhandled error: {}", e);
                ApiError::Unexpected(e.to_string()).into_response()
            }
        },
        _ => method_not_allowed(),
    }
}
