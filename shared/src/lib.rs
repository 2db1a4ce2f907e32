pub mod authz;
pub mod caller;
pub mod cognito;
pub mod config;
pub mod error;
pub mod http;
pub mod invites;
pub mod profiles;
pub mod provider;
pub mod roles;
pub mod types;
pub mod users;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

use aws_sdk_cognitoidentityprovider::Client as CognitoClient;
use aws_sdk_dynamodb::Client as DynamoClient;
use caller::CallerResolver;
use cognito::{CognitoCallerResolver, CognitoProvider};
use config::Config;
use profiles::{DynamoProfileStore, ProfileStore};
use provider::IdentityProvider;
use std::sync::Arc;

/// Shared application state
///
/// `callers` only ever sees the caller's own access token. `provider` and
/// `profiles` run with the function's IAM role.
pub struct AppState {
    pub callers: Arc<dyn CallerResolver>,
    pub provider: Arc<dyn IdentityProvider>,
    pub profiles: Arc<dyn ProfileStore>,
}

impl AppState {
    pub fn new(
        callers: Arc<dyn CallerResolver>,
        provider: Arc<dyn IdentityProvider>,
        profiles: Arc<dyn ProfileStore>,
    ) -> Arc<Self> {
        Arc::new(Self {
            callers,
            provider,
            profiles,
        })
    }

    /// Build the Cognito and DynamoDB backed state once per cold start.
    pub async fn from_env(config: &Config) -> Arc<Self> {
        let aws_config = aws_config::load_from_env().await;
        let cognito_client = CognitoClient::new(&aws_config);
        let dynamo_client = DynamoClient::new(&aws_config);

        Self::new(
            Arc::new(CognitoCallerResolver::new(cognito_client.clone())),
            Arc::new(CognitoProvider::new(
                cognito_client,
                config.user_pool_id.clone(),
            )),
            Arc::new(DynamoProfileStore::new(
                dynamo_client,
                config.table_name.clone(),
                config.user_id_index.clone(),
            )),
        )
    }
}

/// Install the tracing subscriber used by every lambda.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}
