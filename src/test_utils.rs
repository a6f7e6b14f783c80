//! Shared test infrastructure.
//!
//! [`MemoryStore`] implements [`CatalogStore`] with the same
//! uniqueness contract as the Postgres store, so service and handler
//! semantics can be exercised without a database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::catalog::{Account, DataFileEntry, DatasetEntry, NewDatasetFields, StarEntry};
use crate::error::ServiceError;
use crate::store::{CatalogStore, NewDataFileFields};

#[derive(Default)]
struct MemoryState {
    accounts: Vec<Account>,
    datasets: Vec<DatasetEntry>,
    files: Vec<DataFileEntry>,
    stars: Vec<StarEntry>,
    next_id: i32,
}

impl MemoryState {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Seed an account, panicking on failure; fixture setup only.
pub async fn seed_account(store: &Arc<dyn CatalogStore>, name: &str) -> Account {
    store
        .create_account(name)
        .await
        .expect("failed to seed account")
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn create_account(&self, name: &str) -> Result<Account, ServiceError> {
        let mut state = self.state.lock().await;
        if state.accounts.iter().any(|a| a.name == name) {
            return Err(ServiceError::ValidationError {
                message: format!("Account name {} is taken", name),
            });
        }

        let account = Account {
            id: state.next_id(),
            name: name.to_string(),
            created_at: Utc::now(),
        };
        state.accounts.push(account.clone());
        Ok(account)
    }

    async fn get_account_by_name(&self, name: &str) -> Result<Option<Account>, ServiceError> {
        let state = self.state.lock().await;
        Ok(state.accounts.iter().find(|a| a.name == name).cloned())
    }

    async fn create_dataset(
        &self,
        fields: &NewDatasetFields,
    ) -> Result<DatasetEntry, ServiceError> {
        let mut state = self.state.lock().await;

        let owner = state
            .accounts
            .iter()
            .find(|a| a.id == fields.owner_id)
            .cloned()
            .ok_or_else(|| ServiceError::ValidationError {
                message: format!("No such owner: {}", fields.owner_id),
            })?;

        if state
            .datasets
            .iter()
            .any(|d| d.owner_id == fields.owner_id && d.name == fields.name)
        {
            return Err(ServiceError::DuplicateDatasetName);
        }

        let now = Utc::now();
        let dataset = DatasetEntry {
            id: state.next_id(),
            owner_id: owner.id,
            owner_name: owner.name,
            name: fields.name.clone(),
            description: fields.description.clone(),
            created_at: now,
            updated_at: now,
        };
        state.datasets.push(dataset.clone());
        Ok(dataset)
    }

    async fn get_dataset(&self, dataset_id: i32) -> Result<Option<DatasetEntry>, ServiceError> {
        let state = self.state.lock().await;
        Ok(state.datasets.iter().find(|d| d.id == dataset_id).cloned())
    }

    async fn find_dataset(
        &self,
        account: &str,
        name: &str,
    ) -> Result<Option<DatasetEntry>, ServiceError> {
        let state = self.state.lock().await;
        Ok(state
            .datasets
            .iter()
            .find(|d| d.owner_name == account && d.name == name)
            .cloned())
    }

    async fn list_datasets(
        &self,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<DatasetEntry>, ServiceError> {
        let state = self.state.lock().await;
        let mut datasets = state.datasets.clone();
        datasets.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(datasets
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn count_datasets(&self) -> Result<i64, ServiceError> {
        let state = self.state.lock().await;
        Ok(state.datasets.len() as i64)
    }

    async fn latest_dataset_created_at(&self) -> Result<Option<DateTime<Utc>>, ServiceError> {
        let state = self.state.lock().await;
        Ok(state.datasets.iter().map(|d| d.created_at).max())
    }

    async fn update_dataset(
        &self,
        dataset_id: i32,
        name: &str,
        description: &str,
    ) -> Result<Option<DatasetEntry>, ServiceError> {
        let mut state = self.state.lock().await;

        let Some(owner_id) = state
            .datasets
            .iter()
            .find(|d| d.id == dataset_id)
            .map(|d| d.owner_id)
        else {
            return Ok(None);
        };

        if state
            .datasets
            .iter()
            .any(|d| d.id != dataset_id && d.owner_id == owner_id && d.name == name)
        {
            return Err(ServiceError::DuplicateDatasetName);
        }

        let Some(dataset) = state.datasets.iter_mut().find(|d| d.id == dataset_id) else {
            return Ok(None);
        };
        dataset.name = name.to_string();
        dataset.description = description.to_string();
        dataset.updated_at = Utc::now();
        Ok(Some(dataset.clone()))
    }

    async fn delete_dataset(&self, dataset_id: i32) -> Result<bool, ServiceError> {
        let mut state = self.state.lock().await;
        let before = state.datasets.len();
        state.datasets.retain(|d| d.id != dataset_id);
        state.files.retain(|f| f.dataset_id != dataset_id);
        state.stars.retain(|s| s.dataset_id != dataset_id);
        Ok(state.datasets.len() < before)
    }

    async fn add_data_file(
        &self,
        fields: &NewDataFileFields,
    ) -> Result<DataFileEntry, ServiceError> {
        let mut state = self.state.lock().await;

        if !state.datasets.iter().any(|d| d.id == fields.dataset_id) {
            return Err(ServiceError::ValidationError {
                message: format!("No such dataset: {}", fields.dataset_id),
            });
        }

        if state
            .files
            .iter()
            .any(|f| f.dataset_id == fields.dataset_id && f.signature == fields.signature)
        {
            return Err(ServiceError::DuplicateFile);
        }

        let file = DataFileEntry {
            id: state.next_id(),
            dataset_id: fields.dataset_id,
            filename: fields.filename.clone(),
            signature: fields.signature.clone(),
            storage_path: fields.storage_path.clone(),
            size_bytes: fields.size_bytes,
            created_at: Utc::now(),
        };
        state.files.push(file.clone());
        Ok(file)
    }

    async fn list_data_files(&self, dataset_id: i32) -> Result<Vec<DataFileEntry>, ServiceError> {
        let state = self.state.lock().await;
        Ok(state
            .files
            .iter()
            .filter(|f| f.dataset_id == dataset_id)
            .cloned()
            .collect())
    }

    async fn list_stars(&self, user_id: i32) -> Result<Vec<StarEntry>, ServiceError> {
        let state = self.state.lock().await;
        Ok(state
            .stars
            .iter()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn create_star(&self, user_id: i32, dataset_id: i32) -> Result<StarEntry, ServiceError> {
        let mut state = self.state.lock().await;

        if !state.datasets.iter().any(|d| d.id == dataset_id) {
            return Err(ServiceError::ValidationError {
                message: format!("No such dataset: {}", dataset_id),
            });
        }

        if state
            .stars
            .iter()
            .any(|s| s.user_id == user_id && s.dataset_id == dataset_id)
        {
            return Err(ServiceError::ValidationError {
                message: format!("Dataset {} is already starred", dataset_id),
            });
        }

        let star = StarEntry {
            id: state.next_id(),
            user_id,
            dataset_id,
            created_at: Utc::now(),
        };
        state.stars.push(star.clone());
        Ok(star)
    }

    async fn find_star(
        &self,
        user_id: i32,
        dataset_id: i32,
    ) -> Result<Option<StarEntry>, ServiceError> {
        let state = self.state.lock().await;
        Ok(state
            .stars
            .iter()
            .find(|s| s.user_id == user_id && s.dataset_id == dataset_id)
            .cloned())
    }

    async fn delete_star(&self, star_id: i32) -> Result<(), ServiceError> {
        let mut state = self.state.lock().await;
        state.stars.retain(|s| s.id != star_id);
        Ok(())
    }
}
