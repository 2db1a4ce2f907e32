//! In-memory collaborators for handler tests.

use crate::caller::CallerResolver;
use crate::error::{ProviderError, StoreError};
use crate::profiles::ProfileStore;
use crate::provider::{CallShape, IdentityProvider, Invitation, NewAccount, ProviderAccount};
use crate::types::{CallerIdentity, Profile, ProfileChanges};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// Profile with fixed timestamps and the email local part as its name
pub fn profile(email: &str, user_id: Option<&str>, role: &str, wbl_role: &str) -> Profile {
    Profile {
        email: email.to_string(),
        user_id: user_id.map(str::to_string),
        role: role.to_string(),
        wbl_role: wbl_role.to_string(),
        full_name: crate::profiles::email_local_part(email).to_string(),
        created_at: "2024-01-01T00:00:00+00:00".to_string(),
        updated_at: "2024-01-01T00:00:00+00:00".to_string(),
    }
}

#[derive(Default)]
pub struct MemoryProfileStore {
    profiles: Mutex<HashMap<String, Profile>>,
    created: AtomicUsize,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryProfileStore {
    pub fn insert(&self, profile: Profile) {
        self.profiles
            .lock()
            .unwrap()
            .insert(profile.email.clone(), profile);
    }

    pub fn get(&self, email: &str) -> Option<Profile> {
        self.profiles.lock().unwrap().get(email).cloned()
    }

    /// Number of profiles written through `create`
    pub fn created_count(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn fail_reads(&self) {
        self.fail_reads.store(true, Ordering::SeqCst);
    }

    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    fn check(&self, flag: &AtomicBool) -> Result<(), StoreError> {
        if flag.load(Ordering::SeqCst) {
            return Err(StoreError::Request("store unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn find_by_user_id(&self, user_id: &str) -> Result<Option<Profile>, StoreError> {
        self.check(&self.fail_reads)?;
        let profiles = self.profiles.lock().unwrap();
        Ok(profiles
            .values()
            .find(|p| p.user_id.as_deref() == Some(user_id))
            .cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Profile>, StoreError> {
        self.check(&self.fail_reads)?;
        Ok(self.get(email))
    }

    async fn create(&self, profile: &Profile) -> Result<(), StoreError> {
        self.check(&self.fail_writes)?;
        self.created.fetch_add(1, Ordering::SeqCst);
        self.insert(profile.clone());
        Ok(())
    }

    async fn update(&self, email: &str, changes: &ProfileChanges) -> Result<(), StoreError> {
        self.check(&self.fail_writes)?;
        let mut profiles = self.profiles.lock().unwrap();
        let profile = profiles
            .get_mut(email)
            .ok_or_else(|| StoreError::NotFound(email.to_string()))?;

        profile.role = changes.role.clone();
        profile.wbl_role = changes.wbl_role.clone();
        if let Some(full_name) = &changes.full_name {
            profile.full_name = full_name.clone();
        }
        if let Some(user_id) = &changes.user_id {
            profile.user_id = Some(user_id.clone());
        }
        Ok(())
    }
}

/// Which call shapes the fake provider accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accepts {
    Both,
    SimplifiedOnly,
    Nothing,
}

/// Provider that accepts or rejects call shapes as configured and records
/// every attempt.
pub struct ScriptedProvider {
    accepts: Accepts,
    calls: Mutex<Vec<(&'static str, String, CallShape)>>,
    password_sets: Mutex<Vec<String>>,
    fail_password_set: AtomicBool,
}

impl ScriptedProvider {
    pub fn new(accepts: Accepts) -> Self {
        Self {
            accepts,
            calls: Mutex::new(Vec::new()),
            password_sets: Mutex::new(Vec::new()),
            fail_password_set: AtomicBool::new(false),
        }
    }

    /// (operation, email, shape) for each attempt, in order
    pub fn calls(&self) -> Vec<(&'static str, String, CallShape)> {
        self.calls.lock().unwrap().clone()
    }

    /// Usernames passed to `set_password`, in order
    pub fn password_sets(&self) -> Vec<String> {
        self.password_sets.lock().unwrap().clone()
    }

    /// Accounts are created but setting their password fails
    pub fn fail_password_set(&self) {
        self.fail_password_set.store(true, Ordering::SeqCst);
    }

    fn attempt(&self, operation: &'static str, email: &str, shape: CallShape) -> Result<ProviderAccount, ProviderError> {
        self.calls
            .lock()
            .unwrap()
            .push((operation, email.to_string(), shape));

        let accepted = match (self.accepts, shape) {
            (Accepts::Both, _) => true,
            (Accepts::SimplifiedOnly, CallShape::Simplified) => true,
            _ => false,
        };

        if !accepted {
            return Err(match shape {
                CallShape::Structured => ProviderError::rejected(
                    Some("InvalidParameterException"),
                    "Attributes did not conform to the schema",
                ),
                CallShape::Simplified => ProviderError::rejected(
                    Some("UsernameExistsException"),
                    "User account already exists",
                ),
            });
        }

        Ok(ProviderAccount {
            id: Some(format!("sub-{}", email)),
            username: email.to_string(),
        })
    }
}

#[async_trait]
impl IdentityProvider for ScriptedProvider {
    async fn create_account(
        &self,
        account: &NewAccount<'_>,
        shape: CallShape,
    ) -> Result<ProviderAccount, ProviderError> {
        self.attempt("create_account", account.email, shape)
    }

    async fn invite_account(
        &self,
        invitation: &Invitation<'_>,
        shape: CallShape,
    ) -> Result<ProviderAccount, ProviderError> {
        self.attempt("invite_account", invitation.email, shape)
    }

    async fn set_password(&self, username: &str, _password: &str) -> Result<(), ProviderError> {
        self.password_sets.lock().unwrap().push(username.to_string());
        if self.fail_password_set.load(Ordering::SeqCst) {
            return Err(ProviderError::rejected(
                Some("TooManyRequestsException"),
                "Rate exceeded",
            ));
        }
        Ok(())
    }
}

/// Caller resolver returning a fixed identity for any token
pub struct StaticCaller {
    identity: Option<CallerIdentity>,
}

impl StaticCaller {
    pub fn new(identity: CallerIdentity) -> Self {
        Self {
            identity: Some(identity),
        }
    }

    pub fn admin(id: &str) -> Self {
        Self::new(CallerIdentity {
            id: Some(id.to_string()),
            email: Some(format!("{}@wbl.org", id)),
            role: Some(crate::roles::ADMIN.to_string()),
        })
    }

    /// Every token is rejected
    pub fn rejecting() -> Self {
        Self { identity: None }
    }
}

#[async_trait]
impl CallerResolver for StaticCaller {
    async fn resolve(&self, _access_token: &str) -> Result<CallerIdentity, ProviderError> {
        self.identity.clone().ok_or_else(|| {
            ProviderError::rejected(Some("NotAuthorizedException"), "Invalid Access Token")
        })
    }
}
