use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::PrincipalId;

/// Display profile kept alongside the identity record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub first_name: String,
    pub last_name: String,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProfileError {
    #[error("profile store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn find_profile(&self, id: &PrincipalId) -> Result<Option<Profile>, ProfileError>;
}

#[derive(Debug, Default)]
pub struct InMemoryProfileStore {
    profiles: RwLock<HashMap<PrincipalId, Profile>>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&self, id: impl Into<PrincipalId>, profile: Profile) {
        if let Ok(mut profiles) = self.profiles.write() {
            profiles.insert(id.into(), profile);
        }
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn find_profile(&self, id: &PrincipalId) -> Result<Option<Profile>, ProfileError> {
        let profiles = self
            .profiles
            .read()
            .map_err(|_| ProfileError::Unavailable("profile table poisoned".to_string()))?;
        Ok(profiles.get(id).cloned())
    }
}
