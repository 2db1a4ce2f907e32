use crate::authz::is_authorized;
use crate::caller::resolve_caller;
use crate::error::ApiError;
use crate::http::json_response;
use crate::profiles::{normalize_email, sync_invited_profile};
use crate::provider::{self, Invitation};
use crate::roles::RoleAssignment;
use crate::types::{InviteUserRequest, ProvisionResponse, ProvisionedUser};
use crate::AppState;
use lambda_http::{http::StatusCode, Body, Error, Request, Response};

/// Invite a user by email. The identity provider delivers the invitation.
pub async fn invite_user(state: &AppState, event: &Request) -> Result<Response<Body>, Error> {
    match invite(state, event).await {
        Ok(response) => json_response(StatusCode::OK, &response),
        Err(e) => {
            tracing::warn!("Invite user failed: {}", e);
            e.into_response()
        }
    }
}

async fn invite(state: &AppState, event: &Request) -> Result<ProvisionResponse, ApiError> {
    let caller = resolve_caller(event, state.callers.as_ref()).await;
    if !is_authorized(caller.as_ref(), state.profiles.as_ref()).await {
        return Err(ApiError::Forbidden(
            "Only admins and sub-admins can invite users".to_string(),
        ));
    }

    let req: InviteUserRequest = serde_json::from_slice(event.body())
        .map_err(|e| ApiError::Validation(format!("Invalid request body: {}", e)))?;

    let email = normalize_email(req.email.as_deref())
        .ok_or_else(|| ApiError::Validation("Email is required".to_string()))?;
    let email = email.as_str();

    let roles = RoleAssignment::reconcile(req.role.as_deref(), req.wbl_role.as_deref());

    tracing::info!(
        "Inviting {} with role {} / {}",
        email,
        roles.role(),
        roles.wbl_role()
    );

    let account = provider::invite_account(
        state.provider.as_ref(),
        &Invitation {
            email,
            roles: &roles,
        },
    )
    .await
    .map_err(|e| ApiError::Provider(e.to_string()))?;

    // The profile itself is created once the invitation is accepted
    if let Err(e) =
        sync_invited_profile(state.profiles.as_ref(), email, &roles, account.id.as_deref()).await
    {
        tracing::error!("Failed to sync roles for invited user {}: {}", email, e);
    }

    Ok(ProvisionResponse {
        success: true,
        mode: "invited",
        user: ProvisionedUser {
            id: account.id.unwrap_or(account.username),
            email: email.to_string(),
            role: roles.role().to_string(),
            wbl_role: roles.wbl_role().to_string(),
        },
    })
}
