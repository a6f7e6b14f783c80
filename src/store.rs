//! Storage seam between the HTTP/service layers and the database.
//!
//! Every handler-visible persistence operation goes through
//! [`CatalogStore`]. The production implementation is backed by
//! Postgres ([`crate::database::DatabaseManager`]); tests run against
//! an in-memory implementation with the same uniqueness contract.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::catalog::{Account, DataFileEntry, DatasetEntry, NewDatasetFields, StarEntry};
use crate::error::ServiceError;

/// Fields persisted for one uploaded file.
#[derive(Debug, Clone)]
pub struct NewDataFileFields {
    pub dataset_id: i32,
    pub filename: String,
    pub signature: String,
    pub storage_path: String,
    pub size_bytes: i64,
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn create_account(&self, name: &str) -> Result<Account, ServiceError>;

    async fn get_account_by_name(&self, name: &str) -> Result<Option<Account>, ServiceError>;

    /// Insert a dataset. A `(owner, name)` collision yields
    /// [`ServiceError::DuplicateDatasetName`]; no row is written.
    async fn create_dataset(&self, fields: &NewDatasetFields)
        -> Result<DatasetEntry, ServiceError>;

    async fn get_dataset(&self, dataset_id: i32) -> Result<Option<DatasetEntry>, ServiceError>;

    /// Unique lookup by owner account name and dataset name.
    async fn find_dataset(
        &self,
        account: &str,
        name: &str,
    ) -> Result<Option<DatasetEntry>, ServiceError>;

    /// Datasets ordered newest-first.
    async fn list_datasets(
        &self,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<DatasetEntry>, ServiceError>;

    async fn count_datasets(&self) -> Result<i64, ServiceError>;

    /// Creation time of the newest dataset, `None` when there are none.
    async fn latest_dataset_created_at(&self) -> Result<Option<DateTime<Utc>>, ServiceError>;

    async fn update_dataset(
        &self,
        dataset_id: i32,
        name: &str,
        description: &str,
    ) -> Result<Option<DatasetEntry>, ServiceError>;

    /// Returns false when no such dataset existed. Files and stars are
    /// removed by the storage layer's cascade.
    async fn delete_dataset(&self, dataset_id: i32) -> Result<bool, ServiceError>;

    /// Insert a file record. A `(dataset, signature)` collision yields
    /// [`ServiceError::DuplicateFile`]; no row is written.
    async fn add_data_file(
        &self,
        fields: &NewDataFileFields,
    ) -> Result<DataFileEntry, ServiceError>;

    async fn list_data_files(&self, dataset_id: i32) -> Result<Vec<DataFileEntry>, ServiceError>;

    async fn list_stars(&self, user_id: i32) -> Result<Vec<StarEntry>, ServiceError>;

    /// Insert a star. A missing dataset yields
    /// [`ServiceError::ValidationError`]; a `(user, dataset)` collision
    /// also fails validation rather than writing a second row.
    async fn create_star(&self, user_id: i32, dataset_id: i32) -> Result<StarEntry, ServiceError>;

    async fn find_star(
        &self,
        user_id: i32,
        dataset_id: i32,
    ) -> Result<Option<StarEntry>, ServiceError>;

    async fn delete_star(&self, star_id: i32) -> Result<(), ServiceError>;
}
