use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{
    pooled_connection::{deadpool::Pool, AsyncDieselConnectionManager},
    AsyncPgConnection, RunQueryDsl,
};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use tracing::info;

use crate::catalog::{Account, DataFileEntry, DatasetEntry, NewDatasetFields, StarEntry};
use crate::error::{is_unique_violation, ServiceError};
use crate::models::*;
use crate::schema::{data_files, datasets, starred_datasets, users};
use crate::store::{CatalogStore, NewDataFileFields};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

#[derive(Clone)]
pub struct DatabaseManager {
    pool: Pool<AsyncPgConnection>,
}

impl DatabaseManager {
    pub async fn new(database_url: &str) -> Result<Self, ServiceError> {
        let config = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url);
        let pool = Pool::builder(config)
            .build()
            .map_err(|e| ServiceError::ConfigError {
                message: format!("Failed to create database pool: {}", e),
            })?;

        let manager = Self { pool };
        manager.run_migrations(database_url)?;

        Ok(manager)
    }

    pub fn run_migrations(&self, database_url: &str) -> Result<(), ServiceError> {
        use diesel::Connection;
        use diesel::PgConnection;

        // diesel_migrations has no async harness yet, so migrations run
        // over a one-off synchronous connection.
        let mut connection =
            PgConnection::establish(database_url).map_err(|e| ServiceError::ConfigError {
                message: format!("Failed to establish connection for migrations: {}", e),
            })?;

        connection
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| ServiceError::ConfigError {
                message: format!("Failed to run migrations: {}", e),
            })?;

        Ok(())
    }

    async fn conn(
        &self,
    ) -> Result<
        diesel_async::pooled_connection::deadpool::Object<AsyncPgConnection>,
        ServiceError,
    > {
        self.pool.get().await.map_err(|e| ServiceError::ConfigError {
            message: format!("Failed to get database connection: {}", e),
        })
    }
}

#[async_trait]
impl CatalogStore for DatabaseManager {
    async fn create_account(&self, account_name: &str) -> Result<Account, ServiceError> {
        let mut conn = self.conn().await?;

        let new_user = NewUser {
            name: account_name,
            created_at: Utc::now(),
        };

        let user = diesel::insert_into(users::table)
            .values(&new_user)
            .get_result::<User>(&mut conn)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    ServiceError::ValidationError {
                        message: format!("Account name {} is taken", account_name),
                    }
                } else {
                    e.into()
                }
            })?;

        Ok(user.into())
    }

    async fn get_account_by_name(
        &self,
        account_name: &str,
    ) -> Result<Option<Account>, ServiceError> {
        let mut conn = self.conn().await?;

        let user = users::table
            .filter(users::name.eq(account_name))
            .get_result::<User>(&mut conn)
            .await
            .optional()?;

        Ok(user.map(|u| u.into()))
    }

    async fn create_dataset(
        &self,
        fields: &NewDatasetFields,
    ) -> Result<DatasetEntry, ServiceError> {
        info!("Creating dataset {} for owner {}", fields.name, fields.owner_id);
        let mut conn = self.conn().await?;

        let owner = users::table
            .find(fields.owner_id)
            .get_result::<User>(&mut conn)
            .await
            .optional()?
            .ok_or_else(|| ServiceError::ValidationError {
                message: format!("No such owner: {}", fields.owner_id),
            })?;

        let now = Utc::now();
        let new_dataset = NewDataset {
            owner_id: fields.owner_id,
            name: &fields.name,
            description: &fields.description,
            created_at: now,
            updated_at: now,
        };

        let dataset = diesel::insert_into(datasets::table)
            .values(&new_dataset)
            .get_result::<Dataset>(&mut conn)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    ServiceError::DuplicateDatasetName
                } else {
                    e.into()
                }
            })?;

        Ok(dataset.into_entry(owner.name))
    }

    async fn get_dataset(&self, dataset_id: i32) -> Result<Option<DatasetEntry>, ServiceError> {
        let mut conn = self.conn().await?;

        let row = datasets::table
            .inner_join(users::table)
            .filter(datasets::id.eq(dataset_id))
            .select((Dataset::as_select(), users::name))
            .get_result::<(Dataset, String)>(&mut conn)
            .await
            .optional()?;

        Ok(row.map(|(dataset, owner_name)| dataset.into_entry(owner_name)))
    }

    async fn find_dataset(
        &self,
        account: &str,
        dataset_name: &str,
    ) -> Result<Option<DatasetEntry>, ServiceError> {
        let mut conn = self.conn().await?;

        let row = datasets::table
            .inner_join(users::table)
            .filter(users::name.eq(account))
            .filter(datasets::name.eq(dataset_name))
            .select((Dataset::as_select(), users::name))
            .get_result::<(Dataset, String)>(&mut conn)
            .await
            .optional()?;

        Ok(row.map(|(dataset, owner_name)| dataset.into_entry(owner_name)))
    }

    async fn list_datasets(
        &self,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<DatasetEntry>, ServiceError> {
        let mut conn = self.conn().await?;

        let rows = datasets::table
            .inner_join(users::table)
            .order(datasets::created_at.desc())
            .offset(offset)
            .limit(limit)
            .select((Dataset::as_select(), users::name))
            .get_results::<(Dataset, String)>(&mut conn)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(dataset, owner_name)| dataset.into_entry(owner_name))
            .collect())
    }

    async fn count_datasets(&self) -> Result<i64, ServiceError> {
        let mut conn = self.conn().await?;

        let count = datasets::table
            .count()
            .get_result::<i64>(&mut conn)
            .await?;

        Ok(count)
    }

    async fn latest_dataset_created_at(&self) -> Result<Option<DateTime<Utc>>, ServiceError> {
        let mut conn = self.conn().await?;

        let latest = datasets::table
            .select(diesel::dsl::max(datasets::created_at))
            .get_result::<Option<DateTime<Utc>>>(&mut conn)
            .await?;

        Ok(latest)
    }

    async fn update_dataset(
        &self,
        dataset_id: i32,
        dataset_name: &str,
        description: &str,
    ) -> Result<Option<DatasetEntry>, ServiceError> {
        let mut conn = self.conn().await?;

        let updated = diesel::update(datasets::table.find(dataset_id))
            .set((
                datasets::name.eq(dataset_name),
                datasets::description.eq(description),
                datasets::updated_at.eq(Utc::now()),
            ))
            .get_result::<Dataset>(&mut conn)
            .await
            .optional()
            .map_err(|e| {
                if is_unique_violation(&e) {
                    ServiceError::DuplicateDatasetName
                } else {
                    ServiceError::from(e)
                }
            })?;

        let Some(dataset) = updated else {
            return Ok(None);
        };

        let owner = users::table
            .find(dataset.owner_id)
            .get_result::<User>(&mut conn)
            .await?;

        Ok(Some(dataset.into_entry(owner.name)))
    }

    async fn delete_dataset(&self, dataset_id: i32) -> Result<bool, ServiceError> {
        info!("Deleting dataset {}", dataset_id);
        let mut conn = self.conn().await?;

        let deleted = diesel::delete(datasets::table.find(dataset_id))
            .execute(&mut conn)
            .await?;

        Ok(deleted > 0)
    }

    async fn add_data_file(
        &self,
        fields: &NewDataFileFields,
    ) -> Result<DataFileEntry, ServiceError> {
        info!(
            "Adding file {} to dataset {}",
            fields.filename, fields.dataset_id
        );
        let mut conn = self.conn().await?;

        let new_file = NewDataFile {
            dataset_id: fields.dataset_id,
            filename: &fields.filename,
            signature: &fields.signature,
            storage_path: &fields.storage_path,
            size_bytes: fields.size_bytes,
            created_at: Utc::now(),
        };

        let file = diesel::insert_into(data_files::table)
            .values(&new_file)
            .get_result::<DataFile>(&mut conn)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    ServiceError::DuplicateFile
                } else {
                    e.into()
                }
            })?;

        Ok(file.into())
    }

    async fn list_data_files(&self, dataset_id: i32) -> Result<Vec<DataFileEntry>, ServiceError> {
        let mut conn = self.conn().await?;

        let files = data_files::table
            .filter(data_files::dataset_id.eq(dataset_id))
            .order(data_files::created_at.asc())
            .get_results::<DataFile>(&mut conn)
            .await?;

        Ok(files.into_iter().map(|f| f.into()).collect())
    }

    async fn list_stars(&self, user_id: i32) -> Result<Vec<StarEntry>, ServiceError> {
        let mut conn = self.conn().await?;

        let stars = starred_datasets::table
            .filter(starred_datasets::user_id.eq(user_id))
            .order(starred_datasets::created_at.asc())
            .get_results::<StarredDataset>(&mut conn)
            .await?;

        Ok(stars.into_iter().map(|s| s.into()).collect())
    }

    async fn create_star(&self, user_id: i32, dataset_id: i32) -> Result<StarEntry, ServiceError> {
        info!("Starring dataset {} for user {}", dataset_id, user_id);
        let mut conn = self.conn().await?;

        let new_star = NewStarredDataset {
            user_id,
            dataset_id,
            created_at: Utc::now(),
        };

        let star = diesel::insert_into(starred_datasets::table)
            .values(&new_star)
            .get_result::<StarredDataset>(&mut conn)
            .await
            .map_err(|e| {
                let foreign_key = matches!(
                    e,
                    diesel::result::Error::DatabaseError(
                        diesel::result::DatabaseErrorKind::ForeignKeyViolation,
                        _,
                    )
                );
                if foreign_key {
                    ServiceError::ValidationError {
                        message: format!("No such dataset: {}", dataset_id),
                    }
                } else if is_unique_violation(&e) {
                    ServiceError::ValidationError {
                        message: format!("Dataset {} is already starred", dataset_id),
                    }
                } else {
                    e.into()
                }
            })?;

        Ok(star.into())
    }

    async fn find_star(
        &self,
        user_id: i32,
        dataset_id: i32,
    ) -> Result<Option<StarEntry>, ServiceError> {
        let mut conn = self.conn().await?;

        let star = starred_datasets::table
            .filter(starred_datasets::user_id.eq(user_id))
            .filter(starred_datasets::dataset_id.eq(dataset_id))
            .get_result::<StarredDataset>(&mut conn)
            .await
            .optional()?;

        Ok(star.map(|s| s.into()))
    }

    async fn delete_star(&self, star_id: i32) -> Result<(), ServiceError> {
        info!("Deleting star {}", star_id);
        let mut conn = self.conn().await?;

        diesel::delete(starred_datasets::table.find(star_id))
            .execute(&mut conn)
            .await?;

        Ok(())
    }
}
