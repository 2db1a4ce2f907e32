//! Identity-provider interface and the two-phase call strategy used by both
//! handlers.
//!
//! Each operation is tried once with the full attribute set
//! ([`CallShape::Structured`]) and, if the provider rejects it, once more
//! with only the attributes the provider requires ([`CallShape::Simplified`]).
//! There is no further retry.

use crate::error::ProviderError;
use crate::roles::RoleAssignment;
use async_trait::async_trait;
use std::future::Future;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallShape {
    Structured,
    Simplified,
}

/// Account to create with a password
#[derive(Debug, Clone)]
pub struct NewAccount<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub full_name: Option<&'a str>,
    pub roles: &'a RoleAssignment,
}

/// Account to invite
#[derive(Debug, Clone)]
pub struct Invitation<'a> {
    pub email: &'a str,
    pub roles: &'a RoleAssignment,
}

/// Account record returned by the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderAccount {
    /// Provider-issued identifier, when the provider reports one
    pub id: Option<String>,
    pub username: String,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn create_account(
        &self,
        account: &NewAccount<'_>,
        shape: CallShape,
    ) -> Result<ProviderAccount, ProviderError>;

    async fn invite_account(
        &self,
        invitation: &Invitation<'_>,
        shape: CallShape,
    ) -> Result<ProviderAccount, ProviderError>;

    /// Make `password` the account's permanent password. Runs once, after
    /// the account exists, and is not part of the shape fallback.
    async fn set_password(&self, username: &str, password: &str) -> Result<(), ProviderError>;
}

/// Run `call` with the structured shape, falling back to the simplified
/// shape once. The error of the second attempt is returned if both fail.
pub async fn with_fallback<F, Fut>(operation: &str, mut call: F) -> Result<ProviderAccount, ProviderError>
where
    F: FnMut(CallShape) -> Fut,
    Fut: Future<Output = Result<ProviderAccount, ProviderError>>,
{
    match call(CallShape::Structured).await {
        Ok(account) => Ok(account),
        Err(first) => {
            tracing::warn!(
                "{} rejected structured call ({}: {}); retrying with simplified call",
                operation,
                first.code().unwrap_or("unknown"),
                first
            );
            let account = call(CallShape::Simplified).await.map_err(|second| {
                tracing::error!(
                    "{} failed with simplified call ({}: {})",
                    operation,
                    second.code().unwrap_or("unknown"),
                    second
                );
                second
            })?;
            tracing::info!("{} succeeded with simplified call", operation);
            Ok(account)
        }
    }
}

pub async fn create_account(
    provider: &dyn IdentityProvider,
    account: &NewAccount<'_>,
) -> Result<ProviderAccount, ProviderError> {
    with_fallback("create_account", move |shape| provider.create_account(account, shape)).await
}

pub async fn invite_account(
    provider: &dyn IdentityProvider,
    invitation: &Invitation<'_>,
) -> Result<ProviderAccount, ProviderError> {
    with_fallback("invite_account", move |shape| provider.invite_account(invitation, shape)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn account() -> ProviderAccount {
        ProviderAccount {
            id: Some("u-1".to_string()),
            username: "a@wbl.org".to_string(),
        }
    }

    #[tokio::test]
    async fn test_structured_success_no_retry() {
        let calls = RefCell::new(Vec::new());
        let result = with_fallback("op", |shape| {
            calls.borrow_mut().push(shape);
            async { Ok(account()) }
        })
        .await;

        assert_eq!(result.unwrap(), account());
        assert_eq!(*calls.borrow(), vec![CallShape::Structured]);
    }

    #[tokio::test]
    async fn test_falls_back_once() {
        let calls = RefCell::new(Vec::new());
        let result = with_fallback("op", |shape| {
            calls.borrow_mut().push(shape);
            async move {
                match shape {
                    CallShape::Structured => Err(ProviderError::rejected(None, "unknown attribute")),
                    CallShape::Simplified => Ok(account()),
                }
            }
        })
        .await;

        assert!(result.is_ok());
        assert_eq!(
            *calls.borrow(),
            vec![CallShape::Structured, CallShape::Simplified]
        );
    }

    #[tokio::test]
    async fn test_second_error_returned() {
        let calls = RefCell::new(0);
        let result = with_fallback("op", |shape| {
            *calls.borrow_mut() += 1;
            async move {
                match shape {
                    CallShape::Structured => Err(ProviderError::rejected(None, "first")),
                    CallShape::Simplified => Err(ProviderError::rejected(
                        Some("UsernameExistsException"),
                        "User account already exists",
                    )),
                }
            }
        })
        .await;

        let err = result.unwrap_err();
        assert_eq!(err.to_string(), "User account already exists");
        assert_eq!(err.code(), Some("UsernameExistsException"));
        assert_eq!(*calls.borrow(), 2);
    }
}
