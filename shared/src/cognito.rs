use crate::caller::{CallerResolver, ROLE_ATTRIBUTE};
use crate::error::ProviderError;
use crate::provider::{CallShape, IdentityProvider, Invitation, NewAccount, ProviderAccount};
use crate::types::CallerIdentity;
use async_trait::async_trait;
use aws_sdk_cognitoidentityprovider::error::{DisplayErrorContext, ProvideErrorMetadata};
use aws_sdk_cognitoidentityprovider::types::{
    AttributeType, DeliveryMediumType, MessageActionType, UserType,
};
use aws_sdk_cognitoidentityprovider::Client as CognitoClient;

const WBL_ROLE_ATTRIBUTE: &str = "custom:wbl_role";

fn provider_error<E>(e: E) -> ProviderError
where
    E: ProvideErrorMetadata + std::error::Error,
{
    let code = e.code().map(str::to_string);
    let message = e.message().map(str::to_string);
    let message = message.unwrap_or_else(|| DisplayErrorContext(e).to_string());
    ProviderError::Rejected { code, message }
}

fn attribute(name: &str, value: &str) -> Result<AttributeType, ProviderError> {
    AttributeType::builder()
        .name(name)
        .value(value)
        .build()
        .map_err(|e| ProviderError::rejected(None, e.to_string()))
}

fn find_attribute<'a>(attributes: &'a [AttributeType], name: &str) -> Option<&'a str> {
    attributes
        .iter()
        .find(|a| a.name() == name)
        .and_then(|a| a.value())
}

fn account_from_user(user: Option<&UserType>, email: &str) -> Result<ProviderAccount, ProviderError> {
    let user = user.ok_or(ProviderError::MissingUser)?;
    Ok(ProviderAccount {
        id: find_attribute(user.attributes(), "sub").map(str::to_string),
        username: user.username().unwrap_or(email).to_string(),
    })
}

/// Resolves callers with Cognito `GetUser`, which authorizes with the
/// caller's own access token.
pub struct CognitoCallerResolver {
    client: CognitoClient,
}

impl CognitoCallerResolver {
    pub fn new(client: CognitoClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CallerResolver for CognitoCallerResolver {
    async fn resolve(&self, access_token: &str) -> Result<CallerIdentity, ProviderError> {
        let output = self
            .client
            .get_user()
            .access_token(access_token)
            .send()
            .await
            .map_err(provider_error)?;

        let attributes = output.user_attributes();
        Ok(CallerIdentity {
            id: find_attribute(attributes, "sub")
                .map(str::to_string)
                .or_else(|| Some(output.username().to_string())),
            email: find_attribute(attributes, "email").map(str::to_string),
            role: find_attribute(attributes, ROLE_ATTRIBUTE).map(str::to_string),
        })
    }
}

/// Admin operations against a Cognito user pool, run with the lambda's IAM role.
pub struct CognitoProvider {
    client: CognitoClient,
    user_pool_id: String,
}

impl CognitoProvider {
    pub fn new(client: CognitoClient, user_pool_id: String) -> Self {
        Self {
            client,
            user_pool_id,
        }
    }
}

/// Attributes sent with each call shape. The simplified shape works on pools
/// without the custom role attributes.
fn creation_attributes(account: &NewAccount<'_>, shape: CallShape) -> Result<Vec<AttributeType>, ProviderError> {
    let mut attributes = vec![attribute("email", account.email)?];
    if shape == CallShape::Structured {
        attributes.push(attribute("email_verified", "true")?);
        if let Some(full_name) = account.full_name {
            attributes.push(attribute("name", full_name)?);
        }
        attributes.push(attribute(ROLE_ATTRIBUTE, account.roles.role())?);
        attributes.push(attribute(WBL_ROLE_ATTRIBUTE, account.roles.wbl_role())?);
    }
    Ok(attributes)
}

fn invitation_attributes(invitation: &Invitation<'_>, shape: CallShape) -> Result<Vec<AttributeType>, ProviderError> {
    let mut attributes = vec![attribute("email", invitation.email)?];
    if shape == CallShape::Structured {
        attributes.push(attribute("email_verified", "true")?);
        attributes.push(attribute(ROLE_ATTRIBUTE, invitation.roles.role())?);
        attributes.push(attribute(WBL_ROLE_ATTRIBUTE, invitation.roles.wbl_role())?);
    }
    Ok(attributes)
}

#[async_trait]
impl IdentityProvider for CognitoProvider {
    async fn create_account(
        &self,
        account: &NewAccount<'_>,
        shape: CallShape,
    ) -> Result<ProviderAccount, ProviderError> {
        let output = self
            .client
            .admin_create_user()
            .user_pool_id(&self.user_pool_id)
            .username(account.email)
            .set_user_attributes(Some(creation_attributes(account, shape)?))
            .temporary_password(account.password)
            .message_action(MessageActionType::Suppress)
            .send()
            .await
            .map_err(provider_error)?;

        account_from_user(output.user(), account.email)
    }

    async fn invite_account(
        &self,
        invitation: &Invitation<'_>,
        shape: CallShape,
    ) -> Result<ProviderAccount, ProviderError> {
        // No temporary password: Cognito generates one and emails the invitation
        let output = self
            .client
            .admin_create_user()
            .user_pool_id(&self.user_pool_id)
            .username(invitation.email)
            .set_user_attributes(Some(invitation_attributes(invitation, shape)?))
            .desired_delivery_mediums(DeliveryMediumType::Email)
            .send()
            .await
            .map_err(provider_error)?;

        account_from_user(output.user(), invitation.email)
    }

    async fn set_password(&self, username: &str, password: &str) -> Result<(), ProviderError> {
        // Account is usable straight away without a forced password change
        self.client
            .admin_set_user_password()
            .user_pool_id(&self.user_pool_id)
            .username(username)
            .password(password)
            .permanent(true)
            .send()
            .await
            .map_err(provider_error)?;
        Ok(())
    }
}
