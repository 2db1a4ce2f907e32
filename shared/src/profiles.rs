use crate::error::StoreError;
use crate::roles::{present, RoleAssignment};
use crate::types::{Profile, ProfileChanges};
use async_trait::async_trait;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client as DynamoClient;
use std::collections::HashMap;

/// Local profile records, owned by the storage collaborator.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// First profile whose `user_id` matches.
    async fn find_by_user_id(&self, user_id: &str) -> Result<Option<Profile>, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<Profile>, StoreError>;

    /// Unconditional write, last writer wins.
    async fn create(&self, profile: &Profile) -> Result<(), StoreError>;

    /// Update an existing profile. Never creates one.
    async fn update(&self, email: &str, changes: &ProfileChanges) -> Result<(), StoreError>;
}

/// Local part of an email address, used as a fallback display name
pub fn email_local_part(email: &str) -> &str {
    email.split_once('@').map(|(local, _)| local).unwrap_or(email)
}

/// Email as used for profile keys and provider usernames: trimmed and
/// lowercased. Blank input counts as absent.
pub fn normalize_email(email: Option<&str>) -> Option<String> {
    present(email).map(str::to_lowercase)
}

/// Bring the profile for a newly created account in line with its roles.
pub async fn sync_created_profile(
    profiles: &dyn ProfileStore,
    email: &str,
    assignment: &RoleAssignment,
    full_name: Option<&str>,
    user_id: Option<&str>,
) -> Result<(), StoreError> {
    match profiles.find_by_email(email).await? {
        Some(_) => {
            let changes = ProfileChanges {
                role: assignment.role().to_string(),
                wbl_role: assignment.wbl_role().to_string(),
                full_name: full_name.map(str::to_string),
                user_id: user_id.map(str::to_string),
            };
            profiles.update(email, &changes).await?;
            tracing::info!("Updated existing profile for {}", email);
        }
        None => {
            let now = chrono::Utc::now().to_rfc3339();
            let profile = Profile {
                email: email.to_string(),
                user_id: user_id.map(str::to_string),
                role: assignment.role().to_string(),
                wbl_role: assignment.wbl_role().to_string(),
                full_name: full_name.unwrap_or_else(|| email_local_part(email)).to_string(),
                created_at: now.clone(),
                updated_at: now,
            };
            profiles.create(&profile).await?;
            tracing::info!("Created profile for {}", email);
        }
    }
    Ok(())
}

/// Update the roles on an invited user's profile if one already exists.
///
/// Returns whether a profile was updated. Profiles for invited users are
/// otherwise created when the invitation is accepted.
pub async fn sync_invited_profile(
    profiles: &dyn ProfileStore,
    email: &str,
    assignment: &RoleAssignment,
    user_id: Option<&str>,
) -> Result<bool, StoreError> {
    if profiles.find_by_email(email).await?.is_none() {
        tracing::info!("No profile for {} yet; skipping role sync", email);
        return Ok(false);
    }

    let changes = ProfileChanges {
        role: assignment.role().to_string(),
        wbl_role: assignment.wbl_role().to_string(),
        full_name: None,
        user_id: user_id.map(str::to_string),
    };
    profiles.update(email, &changes).await?;
    tracing::info!("Updated roles on existing profile for {}", email);
    Ok(true)
}

// ========== DYNAMODB ==========

/// Profiles in a DynamoDB table with PK=PROFILE#email, SK=PROFILE and a
/// global secondary index on `user_id`.
pub struct DynamoProfileStore {
    client: DynamoClient,
    table_name: String,
    user_id_index: String,
}

impl DynamoProfileStore {
    pub fn new(client: DynamoClient, table_name: String, user_id_index: String) -> Self {
        Self {
            client,
            table_name,
            user_id_index,
        }
    }
}

const PROFILE_SK: &str = "PROFILE";

fn profile_pk(email: &str) -> String {
    format!("PROFILE#{}", email)
}

fn attr_s(item: &HashMap<String, AttributeValue>, key: &str) -> Option<String> {
    item.get(key).and_then(|v| v.as_s().ok()).map(|s| s.to_string())
}

fn profile_from_item(item: &HashMap<String, AttributeValue>) -> Option<Profile> {
    Some(Profile {
        email: attr_s(item, "email")?,
        user_id: attr_s(item, "user_id"),
        role: attr_s(item, "role").unwrap_or_default(),
        wbl_role: attr_s(item, "wbl_role").unwrap_or_default(),
        full_name: attr_s(item, "full_name").unwrap_or_default(),
        created_at: attr_s(item, "created_at").unwrap_or_default(),
        updated_at: attr_s(item, "updated_at").unwrap_or_default(),
    })
}

fn request_error<E>(e: E) -> StoreError
where
    E: std::error::Error,
{
    StoreError::Request(DisplayErrorContext(e).to_string())
}

#[async_trait]
impl ProfileStore for DynamoProfileStore {
    async fn find_by_user_id(&self, user_id: &str) -> Result<Option<Profile>, StoreError> {
        let result = self
            .client
            .query()
            .table_name(&self.table_name)
            .index_name(&self.user_id_index)
            .key_condition_expression("user_id = :uid")
            .expression_attribute_values(":uid", AttributeValue::S(user_id.to_string()))
            .limit(1)
            .send()
            .await
            .map_err(request_error)?;

        Ok(result.items().first().and_then(profile_from_item))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Profile>, StoreError> {
        let result = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key("PK", AttributeValue::S(profile_pk(email)))
            .key("SK", AttributeValue::S(PROFILE_SK.to_string()))
            .send()
            .await
            .map_err(request_error)?;

        Ok(result.item().and_then(profile_from_item))
    }

    async fn create(&self, profile: &Profile) -> Result<(), StoreError> {
        let mut put_request = self
            .client
            .put_item()
            .table_name(&self.table_name)
            .item("PK", AttributeValue::S(profile_pk(&profile.email)))
            .item("SK", AttributeValue::S(PROFILE_SK.to_string()))
            .item("email", AttributeValue::S(profile.email.clone()))
            .item("role", AttributeValue::S(profile.role.clone()))
            .item("wbl_role", AttributeValue::S(profile.wbl_role.clone()))
            .item("full_name", AttributeValue::S(profile.full_name.clone()))
            .item("created_at", AttributeValue::S(profile.created_at.clone()))
            .item("updated_at", AttributeValue::S(profile.updated_at.clone()));

        // GSI key attributes may not be written as empty strings
        if let Some(user_id) = &profile.user_id {
            put_request = put_request.item("user_id", AttributeValue::S(user_id.clone()));
        }

        put_request.send().await.map_err(request_error)?;
        Ok(())
    }

    async fn update(&self, email: &str, changes: &ProfileChanges) -> Result<(), StoreError> {
        let mut update_expr = vec!["#role = :role", "wbl_role = :wbl_role", "updated_at = :now"];
        let mut expr_values = HashMap::new();
        expr_values.insert(":role".to_string(), AttributeValue::S(changes.role.clone()));
        expr_values.insert(":wbl_role".to_string(), AttributeValue::S(changes.wbl_role.clone()));
        expr_values.insert(
            ":now".to_string(),
            AttributeValue::S(chrono::Utc::now().to_rfc3339()),
        );

        if let Some(full_name) = &changes.full_name {
            update_expr.push("full_name = :full_name");
            expr_values.insert(":full_name".to_string(), AttributeValue::S(full_name.clone()));
        }

        if let Some(user_id) = &changes.user_id {
            update_expr.push("user_id = :user_id");
            expr_values.insert(":user_id".to_string(), AttributeValue::S(user_id.clone()));
        }

        let mut builder = self
            .client
            .update_item()
            .table_name(&self.table_name)
            .key("PK", AttributeValue::S(profile_pk(email)))
            .key("SK", AttributeValue::S(PROFILE_SK.to_string()))
            .update_expression(format!("SET {}", update_expr.join(", ")))
            .condition_expression("attribute_exists(PK)")
            .expression_attribute_names("#role", "role");

        for (k, v) in expr_values {
            builder = builder.expression_attribute_values(k, v);
        }

        match builder.send().await {
            Ok(_) => Ok(()),
            Err(e) => {
                let missing = e
                    .as_service_error()
                    .map(|se| se.is_conditional_check_failed_exception())
                    .unwrap_or(false);
                if missing {
                    Err(StoreError::NotFound(email.to_string()))
                } else {
                    Err(request_error(e))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{profile, MemoryProfileStore};

    #[test]
    fn test_email_local_part() {
        assert_eq!(email_local_part("ada.lovelace@wbl.org"), "ada.lovelace");
        assert_eq!(email_local_part("no-at-sign"), "no-at-sign");
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email(Some("  Ada@WBL.org ")).as_deref(), Some("ada@wbl.org"));
        assert_eq!(normalize_email(Some("   ")), None);
        assert_eq!(normalize_email(None), None);
    }

    #[test]
    fn test_profile_from_item() {
        let mut item = HashMap::new();
        item.insert("email".to_string(), AttributeValue::S("a@wbl.org".into()));
        item.insert("role".to_string(), AttributeValue::S("admin".into()));
        item.insert("wbl_role".to_string(), AttributeValue::S("sub_admin".into()));

        let parsed = profile_from_item(&item).unwrap();
        assert_eq!(parsed.email, "a@wbl.org");
        assert_eq!(parsed.user_id, None);
        assert_eq!(parsed.wbl_role, "sub_admin");

        item.remove("email");
        assert!(profile_from_item(&item).is_none());
    }

    #[tokio::test]
    async fn test_created_profile_inserted_with_defaults() {
        let store = MemoryProfileStore::default();
        let assignment = RoleAssignment::reconcile(None, None);

        sync_created_profile(&store, "new.person@wbl.org", &assignment, None, Some("u-1"))
            .await
            .unwrap();

        let saved = store.get("new.person@wbl.org").unwrap();
        assert_eq!(saved.role, "user");
        assert_eq!(saved.wbl_role, "researcher");
        assert_eq!(saved.full_name, "new.person");
        assert_eq!(saved.user_id.as_deref(), Some("u-1"));
    }

    #[tokio::test]
    async fn test_created_profile_updates_existing() {
        let store = MemoryProfileStore::default();
        let mut existing = profile("old@wbl.org", None, "user", "researcher");
        existing.full_name = "Old Name".to_string();
        store.insert(existing);

        let assignment = RoleAssignment::reconcile(Some("user"), Some("sub_admin"));
        sync_created_profile(&store, "old@wbl.org", &assignment, None, None)
            .await
            .unwrap();

        let saved = store.get("old@wbl.org").unwrap();
        assert_eq!(saved.role, "admin");
        assert_eq!(saved.wbl_role, "sub_admin");
        assert_eq!(saved.full_name, "Old Name");
        assert_eq!(store.created_count(), 0);
    }

    #[tokio::test]
    async fn test_invited_profile_never_created() {
        let store = MemoryProfileStore::default();
        let assignment = RoleAssignment::reconcile(Some("admin"), None);

        let updated = sync_invited_profile(&store, "invitee@wbl.org", &assignment, None)
            .await
            .unwrap();

        assert!(!updated);
        assert!(store.get("invitee@wbl.org").is_none());
        assert_eq!(store.created_count(), 0);
    }

    #[tokio::test]
    async fn test_invited_profile_roles_updated() {
        let store = MemoryProfileStore::default();
        store.insert(profile("invitee@wbl.org", None, "user", "researcher"));
        let assignment = RoleAssignment::reconcile(None, Some("sub_admin"));

        let updated = sync_invited_profile(&store, "invitee@wbl.org", &assignment, Some("u-7"))
            .await
            .unwrap();

        assert!(updated);
        let saved = store.get("invitee@wbl.org").unwrap();
        assert_eq!(saved.role, "admin");
        assert_eq!(saved.wbl_role, "sub_admin");
        assert_eq!(saved.user_id.as_deref(), Some("u-7"));
    }
}
