use lambda_http::{http::Method, Body, Error, Request, Response};
use std::sync::Arc;
use wbl_shared::error::ApiError;
use wbl_shared::http::{method_not_allowed, preflight};
use wbl_shared::{users, AppState};

/// Main Lambda handler - creates a user on POST
pub(crate) async fn function_handler(
    event: Request,
    state: Arc<AppState>,
) -> Result<Response<Body>, Error> {
    tracing::info!(
        "Create user lambda invoked - Method: {} Path: {}",
        event.method(),
        event.uri().path()
    );

    match *event.method() {
        Method::OPTIONS => preflight(),
        Method::POST => match users::create_user(&state, &event).await {
            Ok(response) => Ok(response),
            Err(e) => {
                tracing::error!("Unhandled error: {}", e);
                ApiError::Unexpected(e.to_string()).into_response()
            }
        },
        _ => method_not_allowed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wbl_shared::testing::{Accepts, MemoryProfileStore, ScriptedProvider, StaticCaller};

    fn state() -> Arc<AppState> {
        AppState::new(
            Arc::new(StaticCaller::admin("boss")),
            Arc::new(ScriptedProvider::new(Accepts::Both)),
            Arc::new(MemoryProfileStore::default()),
        )
    }

    fn request(method: Method, body: &str) -> Request {
        lambda_http::http::Request::builder()
            .method(method)
            .uri("/admin/create-user")
            .header("Authorization", "Bearer token")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_preflight() {
        let response = function_handler(request(Method::OPTIONS, ""), state())
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(response.headers()["Access-Control-Allow-Origin"], "*");
    }

    #[tokio::test]
    async fn test_method_not_allowed() {
        let response = function_handler(request(Method::GET, ""), state())
            .await
            .unwrap();
        assert_eq!(response.status(), 405);
    }

    #[tokio::test]
    async fn test_post_creates_user() {
        let body = serde_json::json!({"email": "ada@wbl.org", "password": "12345678"}).to_string();
        let response = function_handler(request(Method::POST, &body), state())
            .await
            .unwrap();
        assert_eq!(response.status(), 200);

        let body: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["mode"], "created");
    }

    #[tokio::test]
    async fn test_post_empty_body_rejected() {
        let response = function_handler(request(Method::POST, ""), state())
            .await
            .unwrap();
        assert_eq!(response.status(), 400);
    }
}
