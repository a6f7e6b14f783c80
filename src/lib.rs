pub mod auth;
pub mod catalog;
pub mod database;
pub mod dataset_manager;
pub mod error;
pub mod models;
pub mod schema;
pub mod storage;
pub mod store;
pub mod test_utils;
pub mod web_server;

pub use dataset_manager::DatasetManager;
pub use error::ServiceError;
pub use storage::BlobStorage;
pub use store::CatalogStore;
pub use web_server::WebServer;
