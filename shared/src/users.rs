use crate::authz::is_authorized;
use crate::caller::resolve_caller;
use crate::error::ApiError;
use crate::http::json_response;
use crate::profiles::{normalize_email, sync_created_profile};
use crate::provider::{self, NewAccount};
use crate::roles::{present, RoleAssignment};
use crate::types::{CreateUserRequest, ProvisionResponse, ProvisionedUser};
use crate::AppState;
use lambda_http::{http::StatusCode, Body, Error, Request, Response};

pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Create a user account directly, with a password chosen by the admin
pub async fn create_user(state: &AppState, event: &Request) -> Result<Response<Body>, Error> {
    match provision(state, event).await {
        Ok(response) => json_response(StatusCode::OK, &response),
        Err(e) => {
            tracing::warn!("Create user failed: {}", e);
            e.into_response()
        }
    }
}

async fn provision(state: &AppState, event: &Request) -> Result<ProvisionResponse, ApiError> {
    let caller = resolve_caller(event, state.callers.as_ref()).await;
    if !is_authorized(caller.as_ref(), state.profiles.as_ref()).await {
        return Err(ApiError::Forbidden(
            "Only admins and sub-admins can create users".to_string(),
        ));
    }

    let req: CreateUserRequest = serde_json::from_slice(event.body())
        .map_err(|e| ApiError::Validation(format!("Invalid request body: {}", e)))?;

    let email = normalize_email(req.email.as_deref());
    let password = req.password.as_deref().filter(|p| !p.is_empty());
    let (Some(email), Some(password)) = (email.as_deref(), password) else {
        return Err(ApiError::Validation(
            "Email and password are required".to_string(),
        ));
    };
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ApiError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }

    let roles = RoleAssignment::reconcile(req.role.as_deref(), req.wbl_role.as_deref());
    let full_name = present(req.full_name.as_deref());

    tracing::info!(
        "Creating user {} with role {} / {}",
        email,
        roles.role(),
        roles.wbl_role()
    );

    let account = provider::create_account(
        state.provider.as_ref(),
        &NewAccount {
            email,
            password,
            full_name,
            roles: &roles,
        },
    )
    .await
    .map_err(|e| ApiError::Provider(e.to_string()))?;

    // The account exists at this point; a profile sync failure is only logged
    if let Err(e) = sync_created_profile(
        state.profiles.as_ref(),
        email,
        &roles,
        full_name,
        account.id.as_deref(),
    )
    .await
    {
        tracing::error!("Failed to sync profile for {}: {}", email, e);
    }

    // Set once for whichever call shape created the account; never retried
    state
        .provider
        .set_password(&account.username, password)
        .await
        .map_err(|e| {
            tracing::error!(
                "Created {} but could not set its password ({}): {}",
                email,
                e.code().unwrap_or("unknown"),
                e
            );
            ApiError::Provider(e.to_string())
        })?;

    Ok(ProvisionResponse {
        success: true,
        mode: "created",
        user: ProvisionedUser {
            id: account.id.unwrap_or(account.username),
            email: email.to_string(),
            role: roles.role().to_string(),
            wbl_role: roles.wbl_role().to_string(),
        },
    })
}
