use http::StatusCode;
use sea_orm::DbErr;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure reported by a [`ProductRepository`](crate::repository::ProductRepository)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The write matched no row
    #[error("Record not found")]
    RowNotFound,

    #[error("{0}")]
    Other(String),
}

impl From<DbErr> for StoreError {
    fn from(err: DbErr) -> Self {
        match err {
            DbErr::RecordNotFound(_) | DbErr::RecordNotUpdated => StoreError::RowNotFound,
            other => StoreError::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Error)]
pub enum ProductError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Internal(String),

    /// Store failure passed through without translation
    #[error("{0}")]
    Database(#[from] StoreError),
}

pub type ProductResult<T> = Result<T, ProductError>;

impl ProductError {
    /// Missing or unavailable product on a read
    pub fn not_found(id: i32) -> Self {
        ProductError::NotFound(format!("Product with ID {} not found", id))
    }

    /// Translate a failed update or soft delete
    pub fn from_write_failure(err: StoreError) -> Self {
        match err {
            StoreError::RowNotFound => ProductError::NotFound("Product not found".to_string()),
            StoreError::Other(detail) => {
                tracing::error!(error = %detail, "Product write failed");
                ProductError::Internal("Internal server error".to_string())
            }
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ProductError::NotFound(_) => StatusCode::NOT_FOUND,
            ProductError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ProductError::Internal(_) | ProductError::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Error body sent back to RPC callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcError {
    pub status: u16,
    pub message: String,
}

impl RpcError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status: status.as_u16(),
            message: message.into(),
        }
    }
}

impl From<ProductError> for RpcError {
    fn from(err: ProductError) -> Self {
        RpcError::new(err.status(), err.to_string())
    }
}
