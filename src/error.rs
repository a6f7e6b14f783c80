use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

/// Form-level message shown when a dataset name collides for an owner.
pub const DUPLICATE_DATASET_MESSAGE: &str =
    "A dataset with this name already exists, please choose another.";

/// Form-level message shown when byte-identical content is re-uploaded.
pub const DUPLICATE_FILE_MESSAGE: &str =
    "Duplicate file detected! Cannot upload the same file twice.";

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Dataset not found: {dataset}")]
    DatasetNotFound { dataset: String },

    #[error("Account not found: {account}")]
    AccountNotFound { account: String },

    #[error("Star not found for user {user_id} on dataset {dataset_id}")]
    StarNotFound { user_id: i32, dataset_id: i32 },

    #[error("{}", DUPLICATE_DATASET_MESSAGE)]
    DuplicateDatasetName,

    #[error("{}", DUPLICATE_FILE_MESSAGE)]
    DuplicateFile,

    #[error("Authentication required")]
    Unauthorized,

    #[error("Validation failed: {message}")]
    ValidationError { message: String },

    #[error("IO error: {message}")]
    IoError { message: String },

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Database error: {message}")]
    DatabaseError { message: String },
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::DatasetNotFound { .. }
            | ServiceError::AccountNotFound { .. }
            | ServiceError::StarNotFound { .. } => StatusCode::NOT_FOUND,
            ServiceError::DuplicateDatasetName | ServiceError::DuplicateFile => {
                StatusCode::CONFLICT
            }
            ServiceError::Unauthorized => StatusCode::UNAUTHORIZED,
            ServiceError::ValidationError { .. } => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<std::io::Error> for ServiceError {
    fn from(err: std::io::Error) -> Self {
        ServiceError::IoError {
            message: err.to_string(),
        }
    }
}

impl From<diesel::result::Error> for ServiceError {
    fn from(err: diesel::result::Error) -> Self {
        ServiceError::DatabaseError {
            message: format!("Database error: {}", err),
        }
    }
}

/// True when a diesel error is a storage-level uniqueness violation.
/// Callers translate it into the duplicate variant for their table.
pub fn is_unique_violation(err: &diesel::result::Error) -> bool {
    matches!(
        err,
        diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::UniqueViolation,
            _,
        )
    )
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_variants_map_to_404() {
        let errors = [
            ServiceError::DatasetNotFound {
                dataset: "a/b".to_string(),
            },
            ServiceError::AccountNotFound {
                account: "a".to_string(),
            },
            ServiceError::StarNotFound {
                user_id: 7,
                dataset_id: 5,
            },
        ];
        for err in errors {
            assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        }
    }

    #[test]
    fn duplicate_variants_carry_the_user_facing_messages() {
        assert_eq!(
            ServiceError::DuplicateDatasetName.to_string(),
            DUPLICATE_DATASET_MESSAGE
        );
        assert_eq!(ServiceError::DuplicateFile.to_string(), DUPLICATE_FILE_MESSAGE);
        assert_eq!(
            ServiceError::DuplicateDatasetName.status_code(),
            StatusCode::CONFLICT
        );
    }
}
