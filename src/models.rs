use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::catalog::{Account, DataFileEntry, DatasetEntry, StarEntry};
use crate::schema::{data_files, datasets, starred_datasets, users};

#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = users)]
pub struct User {
    pub id: i32,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = users)]
pub struct NewUser<'a> {
    pub name: &'a str,
    pub created_at: DateTime<Utc>,
}

#[derive(Queryable, Selectable, Identifiable, Associations, Debug, Clone)]
#[diesel(table_name = datasets)]
#[diesel(belongs_to(User, foreign_key = owner_id))]
pub struct Dataset {
    pub id: i32,
    pub owner_id: i32,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = datasets)]
pub struct NewDataset<'a> {
    pub owner_id: i32,
    pub name: &'a str,
    pub description: &'a str,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Queryable, Selectable, Identifiable, Associations, Debug, Clone)]
#[diesel(table_name = data_files)]
#[diesel(belongs_to(Dataset, foreign_key = dataset_id))]
pub struct DataFile {
    pub id: i32,
    pub dataset_id: i32,
    pub filename: String,
    pub signature: String,
    pub storage_path: String,
    pub size_bytes: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = data_files)]
pub struct NewDataFile<'a> {
    pub dataset_id: i32,
    pub filename: &'a str,
    pub signature: &'a str,
    pub storage_path: &'a str,
    pub size_bytes: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Queryable, Selectable, Identifiable, Associations, Debug, Clone)]
#[diesel(table_name = starred_datasets)]
#[diesel(belongs_to(User, foreign_key = user_id))]
#[diesel(belongs_to(Dataset, foreign_key = dataset_id))]
pub struct StarredDataset {
    pub id: i32,
    pub user_id: i32,
    pub dataset_id: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = starred_datasets)]
pub struct NewStarredDataset {
    pub user_id: i32,
    pub dataset_id: i32,
    pub created_at: DateTime<Utc>,
}

impl From<User> for Account {
    fn from(user: User) -> Self {
        Account {
            id: user.id,
            name: user.name,
            created_at: user.created_at,
        }
    }
}

impl Dataset {
    /// Datasets are always surfaced with their owner's account name,
    /// which lives on the joined user row.
    pub fn into_entry(self, owner_name: String) -> DatasetEntry {
        DatasetEntry {
            id: self.id,
            owner_id: self.owner_id,
            owner_name,
            name: self.name,
            description: self.description,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl From<DataFile> for DataFileEntry {
    fn from(file: DataFile) -> Self {
        DataFileEntry {
            id: file.id,
            dataset_id: file.dataset_id,
            filename: file.filename,
            signature: file.signature,
            storage_path: file.storage_path,
            size_bytes: file.size_bytes,
            created_at: file.created_at,
        }
    }
}

impl From<StarredDataset> for StarEntry {
    fn from(star: StarredDataset) -> Self {
        StarEntry {
            id: star.id,
            user_id: star.user_id,
            dataset_id: star.dataset_id,
            created_at: star.created_at,
        }
    }
}
