use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use crate::models::jar::{JarStatus, SavingsJar};
use crate::repositories::RepositoryError;

/// Contract over the savings-jar store.
#[async_trait]
pub trait JarRepository: Send + Sync {
    /// Persist a new jar
    async fn create(&self, jar: SavingsJar) -> Result<SavingsJar, RepositoryError>;

    /// Find a jar by ID
    async fn find_by_id(&self, id: Uuid) -> Result<Option<SavingsJar>, RepositoryError>;

    /// All of a user's jars, regardless of status
    async fn find_by_user(&self, user_id: Uuid) -> Result<Vec<SavingsJar>, RepositoryError>;

    /// Find a user's active jar by title
    async fn find_active_by_title(
        &self,
        user_id: Uuid,
        title: &str,
    ) -> Result<Option<SavingsJar>, RepositoryError>;

    /// Replace the stored jar with the given state
    async fn update(&self, jar: SavingsJar) -> Result<SavingsJar, RepositoryError>;
}

pub struct InMemoryJarRepository {
    jars: Mutex<HashMap<Uuid, SavingsJar>>,
    should_fail: bool,
}

impl InMemoryJarRepository {
    pub fn new() -> Self {
        Self {
            jars: Mutex::new(HashMap::new()),
            should_fail: false,
        }
    }

    pub fn with_failure() -> Self {
        Self {
            jars: Mutex::new(HashMap::new()),
            should_fail: true,
        }
    }
}

impl Default for InMemoryJarRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JarRepository for InMemoryJarRepository {
    async fn create(&self, jar: SavingsJar) -> Result<SavingsJar, RepositoryError> {
        if self.should_fail {
            return Err(RepositoryError::DatabaseError(
                "Storage backend unavailable".to_string(),
            ));
        }

        let mut jars = self.jars.lock().unwrap();
        jars.insert(jar.id, jar.clone());
        Ok(jar)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<SavingsJar>, RepositoryError> {
        if self.should_fail {
            return Err(RepositoryError::DatabaseError(
                "Storage backend unavailable".to_string(),
            ));
        }

        let jars = self.jars.lock().unwrap();
        Ok(jars.get(&id).cloned())
    }

    async fn find_by_user(&self, user_id: Uuid) -> Result<Vec<SavingsJar>, RepositoryError> {
        if self.should_fail {
            return Err(RepositoryError::DatabaseError(
                "Storage backend unavailable".to_string(),
            ));
        }

        let jars = self.jars.lock().unwrap();
        let mut result: Vec<SavingsJar> = jars
            .values()
            .filter(|j| j.user_id == user_id)
            .cloned()
            .collect();
        result.sort_by(|a, b| a.deadline.cmp(&b.deadline));
        Ok(result)
    }

    async fn find_active_by_title(
        &self,
        user_id: Uuid,
        title: &str,
    ) -> Result<Option<SavingsJar>, RepositoryError> {
        if self.should_fail {
            return Err(RepositoryError::DatabaseError(
                "Storage backend unavailable".to_string(),
            ));
        }

        let jars = self.jars.lock().unwrap();
        Ok(jars
            .values()
            .find(|j| j.user_id == user_id && j.status == JarStatus::Active && j.title == title)
            .cloned())
    }

    async fn update(&self, jar: SavingsJar) -> Result<SavingsJar, RepositoryError> {
        if self.should_fail {
            return Err(RepositoryError::DatabaseError(
                "Storage backend unavailable".to_string(),
            ));
        }

        let mut jars = self.jars.lock().unwrap();
        if !jars.contains_key(&jar.id) {
            return Err(RepositoryError::NotFound);
        }
        jars.insert(jar.id, jar.clone());
        Ok(jar)
    }
}
