use std::sync::Arc;

use thiserror::Error;

use crate::{Principal, PrincipalId, ProfileStore, Role, SessionError, SessionHandle, SessionProvider};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Turns request session credentials into a [`Principal`].
///
/// Role comes from the session's role claim (see [`Role::from_claim`]).
/// Profile fields come from the optional [`ProfileStore`]; a missing or
/// unreachable profile leaves them empty rather than failing the request.
#[derive(Clone)]
pub struct PrincipalResolver {
    sessions: Arc<dyn SessionProvider>,
    profiles: Option<Arc<dyn ProfileStore>>,
}

impl PrincipalResolver {
    pub fn new(sessions: Arc<dyn SessionProvider>) -> Self {
        Self {
            sessions,
            profiles: None,
        }
    }

    pub fn with_profiles(mut self, profiles: Arc<dyn ProfileStore>) -> Self {
        self.profiles = Some(profiles);
        self
    }

    /// `Ok(None)` for anonymous callers.
    pub async fn resolve(&self, session: &SessionHandle) -> Result<Option<Principal>, ResolveError> {
        let Some(user) = self.sessions.get_user(session).await? else {
            return Ok(None);
        };
        if user.id.is_empty() {
            return Err(SessionError::Malformed("session user has an empty id".to_string()).into());
        }

        let role = Role::from_claim(user.role_claim());
        let id = PrincipalId::new(user.id);
        let mut principal = Principal::new(id, user.email.unwrap_or_default(), role);

        if let Some(profiles) = &self.profiles {
            match profiles.find_profile(&principal.id).await {
                Ok(Some(profile)) => principal = principal.with_profile(profile),
                Ok(None) => tracing::debug!(user_id = %principal.id, "no profile on file"),
                Err(e) => tracing::warn!(user_id = %principal.id, error = %e, "profile lookup failed"),
            }
        }

        Ok(Some(principal))
    }

    /// Like [`resolve`](Self::resolve), but any failure is treated as anonymous.
    pub async fn resolve_or_deny(&self, session: &SessionHandle) -> Option<Principal> {
        match self.resolve(session).await {
            Ok(principal) => principal,
            Err(e) => {
                tracing::warn!(error = %e, "principal resolution failed; treating as anonymous");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{InMemoryProfileStore, InMemorySessionProvider, Profile, ProfileError, SessionUser};
    use async_trait::async_trait;

    struct DownProfiles;

    #[async_trait]
    impl ProfileStore for DownProfiles {
        async fn find_profile(&self, _: &PrincipalId) -> Result<Option<Profile>, ProfileError> {
            Err(ProfileError::Unavailable("connection refused".into()))
        }
    }

    fn sessions() -> Arc<InMemorySessionProvider> {
        let s = InMemorySessionProvider::new();
        s.insert("admin", SessionUser::new("u-admin", "root@shop.test").with_app_role("admin"));
        s.insert("plain", SessionUser::new("u-plain", "plain@shop.test"));
        s.insert("weird", SessionUser::new("u-weird", "w@shop.test").with_app_role("overlord"));
        s.insert("blank", SessionUser::new("", "x@shop.test"));
        Arc::new(s)
    }

    #[tokio::test]
    async fn resolves_role_and_profile() {
        let profiles = InMemoryProfileStore::new();
        profiles.upsert(
            "u-admin",
            Profile {
                first_name: "Grace".into(),
                last_name: "Hopper".into(),
                avatar_url: Some("https://cdn.test/g.png".into()),
            },
        );
        let resolver = PrincipalResolver::new(sessions()).with_profiles(Arc::new(profiles));

        let p = resolver.resolve(&SessionHandle::bearer("admin")).await.unwrap().unwrap();
        assert_eq!(p.role, Role::Admin);
        assert_eq!(p.display_name(), "Grace Hopper");

        let p = resolver.resolve(&SessionHandle::bearer("plain")).await.unwrap().unwrap();
        assert_eq!(p.role, Role::Customer);
        assert_eq!(p.first_name, "");
    }

    #[tokio::test]
    async fn unknown_role_claim_is_customer() {
        let resolver = PrincipalResolver::new(sessions());
        let p = resolver.resolve(&SessionHandle::bearer("weird")).await.unwrap().unwrap();
        assert_eq!(p.role, Role::Customer);
    }

    #[tokio::test]
    async fn anonymous_and_unknown_tokens_resolve_to_none() {
        let resolver = PrincipalResolver::new(sessions());
        assert_eq!(resolver.resolve(&SessionHandle::anonymous()).await.unwrap(), None);
        assert_eq!(resolver.resolve(&SessionHandle::bearer("nope")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn profile_outage_keeps_principal() {
        let resolver = PrincipalResolver::new(sessions()).with_profiles(Arc::new(DownProfiles));
        let p = resolver.resolve(&SessionHandle::bearer("plain")).await.unwrap().unwrap();
        assert_eq!(p.id.as_str(), "u-plain");
        assert_eq!(p.last_name, "");
    }

    #[tokio::test]
    async fn empty_user_id_is_denied() {
        let resolver = PrincipalResolver::new(sessions());
        let handle = SessionHandle::bearer("blank");
        assert!(matches!(
            resolver.resolve(&handle).await,
            Err(ResolveError::Session(SessionError::Malformed(_)))
        ));
        assert_eq!(resolver.resolve_or_deny(&handle).await, None);
    }
}
