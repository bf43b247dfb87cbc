//! Pet aggregate storage with optimistic concurrency.

use async_trait::async_trait;

use super::RepositoryResult;
use crate::api::{PetId, TaskId, UserId};
use crate::models::pet::{NewPet, PetRecord};

#[async_trait]
pub trait PetRepository: Send + Sync {
    /// Check if the storage backend is healthy.
    ///
    /// # Returns
    /// - `Ok(true)` if healthy
    /// - `Ok(false)` if unhealthy but no error occurred
    async fn health_check(&self) -> RepositoryResult<bool>;

    /// Reserve a task id. Tasks live inside the pet aggregate, so ids are
    /// handed out before the owning pet is saved.
    async fn allocate_task_id(&self) -> RepositoryResult<TaskId>;

    /// Store a new pet at version 1.
    async fn create_pet(&self, pet: NewPet) -> RepositoryResult<PetRecord>;

    async fn get_pet(&self, pet_id: PetId) -> RepositoryResult<PetRecord>;

    async fn list_pet_ids(&self) -> RepositoryResult<Vec<PetId>>;

    /// Pets where `user_id` holds any ownership role, ordered by id.
    async fn list_pets_for_user(&self, user_id: UserId) -> RepositoryResult<Vec<PetRecord>>;

    /// Compare-and-swap save.
    ///
    /// # Arguments
    /// * `record` - The full aggregate to store
    /// * `expected_version` - Version the caller loaded before mutating
    ///
    /// # Returns
    /// * `Ok(PetRecord)` - The stored record with its version bumped by one
    /// * `Err(RepositoryError::Conflict)` - Retryable, when the stored version
    ///   no longer matches `expected_version`
    async fn save_pet(&self, record: PetRecord, expected_version: u64)
        -> RepositoryResult<PetRecord>;
}
