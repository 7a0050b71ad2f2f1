use sea_orm::error::DbErr;
use serde::Serialize;

/// Errors surfaced by the allocation engine.
///
/// Calculation guards (`ZeroFob`, `ZeroInvoiceValue`) are expected,
/// user-correctable conditions and carry the identifiers and totals the
/// caller needs to fix the data. Storage failures are wrapped as-is in
/// `DatabaseError`; the engine never retries silently.
#[derive(Debug, thiserror::Error, Serialize)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(
        #[from]
        #[serde(skip)]
        DbErr,
    ),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error("No detail lines: {0}")]
    NoDetails(String),

    #[error("Purchase {0} has no buy order reference")]
    NoBuyOrder(i64),

    #[error("Incomplete allocation data: {0}")]
    IncompleteData(String),

    #[error("Total FOB value is zero: {0}")]
    ZeroFob(String),

    #[error("Total invoice value is zero: {0}")]
    ZeroInvoiceValue(String),

    #[error("Allocation {0} is already approved")]
    AlreadyApproved(i64),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}
