use std::env;

const DEFAULT_TABLE_NAME: &str = "wbl-profiles";
const DEFAULT_USER_ID_INDEX: &str = "user_id-index";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
}

/// Runtime configuration read from the lambda environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub user_pool_id: String,
    pub table_name: String,
    pub user_id_index: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let user_pool_id =
            non_empty("COGNITO_USER_POOL_ID").ok_or(ConfigError::Missing("COGNITO_USER_POOL_ID"))?;
        let table_name = non_empty("TABLE_NAME").unwrap_or_else(|| DEFAULT_TABLE_NAME.to_string());
        let user_id_index = non_empty("PROFILE_USER_ID_INDEX")
            .unwrap_or_else(|| DEFAULT_USER_ID_INDEX.to_string());

        Ok(Self {
            user_pool_id,
            table_name,
            user_id_index,
        })
    }
}
