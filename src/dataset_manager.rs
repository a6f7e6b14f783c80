use std::sync::Arc;
use tracing::{info, warn};

use crate::catalog::{
    DataFileEntry, DatasetEntry, DatasetListPage, DatasetPanel, NewDatasetFields, PanelName,
    DATASETS_PER_PAGE,
};
use crate::error::ServiceError;
use crate::storage::BlobStorage;
use crate::store::{CatalogStore, NewDataFileFields};

/// Service layer tying the blob store and the catalog store together.
///
/// Every handler performs exactly one operation here; the manager owns
/// the translation of storage-level uniqueness failures into the
/// user-facing duplicate errors.
pub struct DatasetManager {
    store: Arc<dyn CatalogStore>,
    storage: BlobStorage,
}

impl DatasetManager {
    pub fn new(store: Arc<dyn CatalogStore>, storage: BlobStorage) -> Self {
        Self { store, storage }
    }

    pub fn store(&self) -> &Arc<dyn CatalogStore> {
        &self.store
    }

    pub async fn create_dataset(
        &self,
        owner_id: i32,
        name: &str,
        description: &str,
    ) -> Result<DatasetEntry, ServiceError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ServiceError::ValidationError {
                message: "Dataset name must not be empty".to_string(),
            });
        }

        let fields = NewDatasetFields {
            owner_id,
            name: name.to_string(),
            description: description.to_string(),
        };

        let dataset = self.store.create_dataset(&fields).await?;
        info!("Dataset {} created", dataset.absolute_url());
        Ok(dataset)
    }

    /// Unique lookup by `(account, dataset name)` path parameters.
    pub async fn resolve_dataset(
        &self,
        account: &str,
        slug: &str,
    ) -> Result<DatasetEntry, ServiceError> {
        self.store
            .find_dataset(account, slug)
            .await?
            .ok_or_else(|| ServiceError::DatasetNotFound {
                dataset: format!("{}/{}", account, slug),
            })
    }

    /// Store uploaded bytes and record the file against the dataset at
    /// `(account, slug)`. Byte-identical content already present on the
    /// dataset is rejected and the orphaned blob is cleaned up.
    pub async fn upload_file(
        &self,
        account: &str,
        slug: &str,
        filename: &str,
        content: &[u8],
    ) -> Result<(DatasetEntry, DataFileEntry), ServiceError> {
        let dataset = self.resolve_dataset(account, slug).await?;

        let signature = BlobStorage::signature(content);
        let storage_path = self.storage.store(dataset.id, &signature, content).await?;

        let fields = NewDataFileFields {
            dataset_id: dataset.id,
            filename: filename.to_string(),
            signature,
            storage_path: storage_path.clone(),
            size_bytes: content.len() as i64,
        };

        match self.store.add_data_file(&fields).await {
            Ok(file) => {
                info!("File {} uploaded to {}", file.filename, dataset.absolute_url());
                Ok((dataset, file))
            }
            // A duplicate wrote to the same content-addressed path the
            // original row references, so the blob must stay.
            Err(ServiceError::DuplicateFile) => Err(ServiceError::DuplicateFile),
            Err(err) => {
                if let Err(cleanup) = self.storage.remove(&storage_path).await {
                    warn!("Failed to clean up rejected blob: {}", cleanup);
                }
                Err(err)
            }
        }
    }

    /// One page of the dataset list, newest first, with aggregate
    /// context. The latest-creation timestamp is only looked up when at
    /// least one dataset exists.
    pub async fn list_page(&self, page: i64) -> Result<DatasetListPage, ServiceError> {
        let page = page.max(1);
        let num_datasets = self.store.count_datasets().await?;

        let latest_dataset = if num_datasets > 0 {
            self.store.latest_dataset_created_at().await?
        } else {
            None
        };

        let datasets = self
            .store
            .list_datasets((page - 1) * DATASETS_PER_PAGE, DATASETS_PER_PAGE)
            .await?;

        Ok(DatasetListPage {
            datasets,
            page,
            num_datasets,
            latest_dataset,
        })
    }

    /// Detail context for one panel. All four panels share the lookup
    /// and differ only in the panel tag.
    pub async fn dataset_panel(
        &self,
        account: &str,
        slug: &str,
        panel_name: PanelName,
    ) -> Result<DatasetPanel, ServiceError> {
        let dataset = self.resolve_dataset(account, slug).await?;
        let files = self.store.list_data_files(dataset.id).await?;

        Ok(DatasetPanel {
            dataset,
            files,
            panel_name,
        })
    }

    pub async fn list_datasets(&self) -> Result<Vec<DatasetEntry>, ServiceError> {
        self.store.list_datasets(0, i64::MAX).await
    }

    pub async fn get_dataset(&self, dataset_id: i32) -> Result<DatasetEntry, ServiceError> {
        self.store
            .get_dataset(dataset_id)
            .await?
            .ok_or_else(|| ServiceError::DatasetNotFound {
                dataset: dataset_id.to_string(),
            })
    }

    pub async fn create_dataset_record(
        &self,
        fields: &NewDatasetFields,
    ) -> Result<DatasetEntry, ServiceError> {
        self.create_dataset(fields.owner_id, &fields.name, &fields.description)
            .await
    }

    pub async fn update_dataset(
        &self,
        dataset_id: i32,
        name: &str,
        description: &str,
    ) -> Result<DatasetEntry, ServiceError> {
        self.store
            .update_dataset(dataset_id, name, description)
            .await?
            .ok_or_else(|| ServiceError::DatasetNotFound {
                dataset: dataset_id.to_string(),
            })
    }

    pub async fn delete_dataset(&self, dataset_id: i32) -> Result<(), ServiceError> {
        if !self.store.delete_dataset(dataset_id).await? {
            return Err(ServiceError::DatasetNotFound {
                dataset: dataset_id.to_string(),
            });
        }
        Ok(())
    }

    pub async fn list_stars(
        &self,
        user_id: i32,
    ) -> Result<Vec<crate::catalog::StarEntry>, ServiceError> {
        self.store.list_stars(user_id).await
    }

    /// Star a dataset for a user. A star that fails validation (missing
    /// dataset, or one this user already starred) is reported as
    /// not-found; API clients depend on that mapping.
    pub async fn star_dataset(&self, user_id: i32, dataset_id: i32) -> Result<(), ServiceError> {
        match self.store.create_star(user_id, dataset_id).await {
            Ok(_) => Ok(()),
            Err(ServiceError::ValidationError { .. }) => Err(ServiceError::DatasetNotFound {
                dataset: dataset_id.to_string(),
            }),
            Err(err) => Err(err),
        }
    }

    /// Remove a user's star by dataset id. An absent star answers
    /// not-found rather than failing inside the delete.
    pub async fn unstar_dataset(&self, user_id: i32, dataset_id: i32) -> Result<(), ServiceError> {
        let star = self
            .store
            .find_star(user_id, dataset_id)
            .await?
            .ok_or(ServiceError::StarNotFound {
                user_id,
                dataset_id,
            })?;

        self.store.delete_star(star.id).await
    }
}
