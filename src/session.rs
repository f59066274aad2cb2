//! Sign-in state: loads (or creates) the caller's profile, resolves the role
//! claim once, and remembers tokens revoked by sign-out.

use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::{create_jwt, AuthError, Claims, Role};
use crate::identity::Identity;
use crate::lifecycle::SIGNUP_BONUS;
use crate::models::{Profile, Settings};
use crate::repo::{Repo, RepoError, RepoResult};

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub profile: Profile,
    pub role: Role,
}

impl Session {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Profile used when an identity signs in without one.
pub fn default_profile(identity: &Identity) -> Profile {
    let display_name = identity.email.split('@').next().unwrap_or_default().to_string();
    Profile {
        uid: identity.uid.clone(),
        email: identity.email.clone(),
        display_name,
        points: SIGNUP_BONUS,
        phone: None,
        address: None,
        age: None,
        is_admin: false,
        settings: Settings::default(),
    }
}

#[derive(Clone)]
pub struct SessionManager {
    admin_emails: Arc<Vec<String>>,
    token_ttl: chrono::Duration,
    /// jti -> exp of tokens signed out before expiry
    revoked: Arc<DashMap<String, usize>>,
}

impl SessionManager {
    pub fn new(admin_emails: Vec<String>, token_ttl: chrono::Duration) -> Self {
        Self { admin_emails: Arc::new(admin_emails), token_ttl, revoked: Arc::new(DashMap::new()) }
    }

    pub fn role_for(&self, profile: &Profile) -> Role {
        let email = profile.email.to_lowercase();
        if profile.is_admin || self.admin_emails.iter().any(|a| *a == email) {
            Role::Admin
        } else {
            Role::Member
        }
    }

    /// Loads the profile for `identity`, creating the default one on first sign-in.
    pub async fn load(&self, repo: &dyn Repo, identity: &Identity) -> RepoResult<Session> {
        let profile = match repo.get_profile(&identity.uid).await {
            Ok(p) => p,
            Err(RepoError::NotFound) => match repo.create_profile(default_profile(identity)).await {
                Ok(p) => {
                    tracing::info!(uid = %p.uid, "created profile on first sign-in");
                    p
                }
                // lost a race with a concurrent sign-in
                Err(RepoError::Conflict) => repo.get_profile(&identity.uid).await?,
                Err(e) => return Err(e),
            },
            Err(e) => {
                tracing::error!(uid = %identity.uid, error = %e, "profile fetch failed");
                return Err(e);
            }
        };
        let role = self.role_for(&profile);
        Ok(Session { profile, role })
    }

    pub fn issue_token(&self, session: &Session) -> Result<String, AuthError> {
        let (token, _) = create_jwt(&session.profile.uid, &session.profile.email, vec![session.role], self.token_ttl)?;
        Ok(token)
    }

    pub fn revoke(&self, claims: &Claims) {
        let now = chrono::Utc::now().timestamp().max(0) as usize;
        self.revoked.retain(|_, exp| *exp > now);
        self.revoked.insert(claims.jti.clone(), claims.exp);
    }

    pub fn is_revoked(&self, jti: &str) -> bool {
        self.revoked.contains_key(jti)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::inmem::InMemRepo;
    use crate::repo::ProfileRepo;

    fn identity() -> Identity {
        Identity { uid: "u1".into(), email: "nur@example.com".into() }
    }

    #[tokio::test]
    async fn first_load_fabricates_profile_once() {
        let repo = InMemRepo::ephemeral();
        let mgr = SessionManager::new(vec![], chrono::Duration::hours(1));
        let s = mgr.load(&repo, &identity()).await.unwrap();
        assert_eq!(s.profile.points, SIGNUP_BONUS);
        assert_eq!(s.profile.display_name, "nur");
        assert_eq!(s.role, Role::Member);

        repo.admin_update_profile("u1", crate::models::AdminProfileUpdate { points: Some(3), ..Default::default() }).await.unwrap();
        let again = mgr.load(&repo, &identity()).await.unwrap();
        assert_eq!(again.profile.points, 3);
    }

    #[tokio::test]
    async fn admin_role_from_email_list_or_flag() {
        let repo = InMemRepo::ephemeral();
        let mgr = SessionManager::new(vec!["nur@example.com".into()], chrono::Duration::hours(1));
        assert!(mgr.load(&repo, &identity()).await.unwrap().is_admin());

        let mut flagged = default_profile(&Identity { uid: "u2".into(), email: "x@example.com".into() });
        flagged.is_admin = true;
        assert_eq!(SessionManager::new(vec![], chrono::Duration::hours(1)).role_for(&flagged), Role::Admin);
    }
}
