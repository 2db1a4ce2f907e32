use crate::error::ProviderError;
use crate::types::CallerIdentity;
use async_trait::async_trait;
use lambda_http::{Request, RequestExt};

/// Claim and attribute carrying the coarse role
pub const ROLE_ATTRIBUTE: &str = "custom:role";

/// Resolves the identity behind a caller's access token, using only the
/// caller's own privileges.
#[async_trait]
pub trait CallerResolver: Send + Sync {
    async fn resolve(&self, access_token: &str) -> Result<CallerIdentity, ProviderError>;
}

/// Identity from JWT claims already validated by the API Gateway authorizer
pub fn caller_from_claims(event: &Request) -> Option<CallerIdentity> {
    let claims = &event
        .request_context_ref()?
        .authorizer()?
        .jwt
        .as_ref()?
        .claims;

    let caller = CallerIdentity {
        id: claims.get("sub").cloned(),
        email: claims.get("email").cloned(),
        role: claims.get(ROLE_ATTRIBUTE).cloned(),
    };

    if caller.id.is_none() && caller.email.is_none() {
        return None;
    }
    Some(caller)
}

pub fn bearer_token(event: &Request) -> Option<&str> {
    let value = event.headers().get("Authorization")?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Caller behind the request, if one can be established
pub async fn resolve_caller(event: &Request, callers: &dyn CallerResolver) -> Option<CallerIdentity> {
    if let Some(caller) = caller_from_claims(event) {
        return Some(caller);
    }

    let Some(token) = bearer_token(event) else {
        tracing::info!("Request carried no authorizer claims or bearer token");
        return None;
    };

    match callers.resolve(token).await {
        Ok(caller) => Some(caller),
        Err(e) => {
            tracing::warn!("Failed to resolve caller from access token: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StaticCaller;
    use lambda_http::aws_lambda_events::apigw::{
        ApiGatewayRequestAuthorizer, ApiGatewayRequestAuthorizerJwtDescription,
        ApiGatewayV2httpRequestContext,
    };
    use lambda_http::request::RequestContext;
    use std::collections::HashMap;

    fn with_auth_header(value: &str) -> Request {
        let mut request = Request::default();
        request
            .headers_mut()
            .insert("Authorization", value.parse().unwrap());
        request
    }

    fn with_claims(claims: &[(&str, &str)]) -> Request {
        let claims: HashMap<String, String> = claims
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let authorizer = ApiGatewayRequestAuthorizer {
            jwt: Some(ApiGatewayRequestAuthorizerJwtDescription {
                claims,
                ..Default::default()
            }),
            ..Default::default()
        };
        let context = ApiGatewayV2httpRequestContext {
            authorizer: Some(authorizer),
            ..Default::default()
        };
        Request::default().with_request_context(RequestContext::ApiGatewayV2(context))
    }

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token(&with_auth_header("Bearer abc.def")), Some("abc.def"));
        assert_eq!(bearer_token(&with_auth_header("bearer xyz")), Some("xyz"));
        assert_eq!(bearer_token(&with_auth_header("Basic dXNlcg==")), None);
        assert_eq!(bearer_token(&with_auth_header("Bearer ")), None);
        assert_eq!(bearer_token(&Request::default()), None);
    }

    #[test]
    fn test_caller_from_claims() {
        let request = with_claims(&[
            ("sub", "u-1"),
            ("email", "boss@wbl.org"),
            ("custom:role", "admin"),
        ]);
        let caller = caller_from_claims(&request).unwrap();
        assert_eq!(caller.id.as_deref(), Some("u-1"));
        assert_eq!(caller.email.as_deref(), Some("boss@wbl.org"));
        assert_eq!(caller.role.as_deref(), Some("admin"));

        assert!(caller_from_claims(&with_claims(&[("scope", "openid")])).is_none());
        assert!(caller_from_claims(&Request::default()).is_none());
    }

    #[tokio::test]
    async fn test_resolve_prefers_claims() {
        let callers = StaticCaller::admin("u-token");
        let request = with_claims(&[("sub", "u-claims")]);

        let caller = resolve_caller(&request, &callers).await.unwrap();
        assert_eq!(caller.id.as_deref(), Some("u-claims"));
    }

    #[tokio::test]
    async fn test_resolve_from_token() {
        let callers = StaticCaller::admin("u-token");
        let caller = resolve_caller(&with_auth_header("Bearer t"), &callers)
            .await
            .unwrap();
        assert_eq!(caller.id.as_deref(), Some("u-token"));
    }

    #[tokio::test]
    async fn test_resolve_failure_is_anonymous() {
        let callers = StaticCaller::rejecting();
        assert!(resolve_caller(&with_auth_header("Bearer t"), &callers).await.is_none());
        assert!(resolve_caller(&Request::default(), &callers).await.is_none());
    }
}
