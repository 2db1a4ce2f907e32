use lambda_http::{run, service_fn, Error, Request};
use std::sync::Arc;
use wbl_shared::{config::Config, AppState};

mod http_handler;

#[tokio::main]
async fn main() -> Result<(), Error> {
    wbl_shared::init_tracing();

    // Initialize AWS clients once at startup
    let config = Config::from_env()?;
    let state = AppState::from_env(&config).await;

    run(service_fn(move |event: Request| {
        let state = Arc::clone(&state);
        async move { http_handler::function_handler(event, state).await }
    }))
    .await
}
