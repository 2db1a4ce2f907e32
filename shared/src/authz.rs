use crate::profiles::ProfileStore;
use crate::roles::{ADMIN, SUB_ADMIN};
use crate::types::CallerIdentity;

/// Whether the caller may manage users.
///
/// Admins pass outright. Anyone else needs a profile, found by caller id or
/// else by email, whose fine role is `sub_admin`. Lookup failures deny.
pub async fn is_authorized(caller: Option<&CallerIdentity>, profiles: &dyn ProfileStore) -> bool {
    let Some(caller) = caller else {
        return false;
    };

    if caller.role.as_deref() == Some(ADMIN) {
        return true;
    }

    let lookup = match caller.id.as_deref() {
        Some(id) => profiles.find_by_user_id(id).await,
        None => Ok(None),
    };

    // Profiles written outside account creation carry no user id
    let lookup = match (lookup, caller.email.as_deref()) {
        (Ok(None), Some(email)) => profiles.find_by_email(email).await,
        (lookup, _) => lookup,
    };

    match lookup {
        Ok(Some(profile)) => profile.wbl_role == SUB_ADMIN,
        Ok(None) => false,
        Err(e) => {
            tracing::warn!("Profile lookup failed during authorization: {}", e);
            false
        }
    }
}
