// Error kinds surfaced by validation, the store and the edit binding

use thiserror::Error;

/// Every failure the ledger core can report.
///
/// Validation and selection errors are raised before the store is touched.
/// `RecordNotFound` is soft: the target vanished between selection and
/// mutation, nothing was changed.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("{field} is required (date, category and amount must be filled in)")]
    MissingRequiredField { field: &'static str },

    #[error("date must be in YYYY-MM-DD format, got '{value}'")]
    InvalidDateFormat { value: String },

    #[error("amount must be a positive number, got '{value}'")]
    InvalidAmount { value: String },

    #[error("select a record to {action}")]
    SelectionRequired { action: &'static str },

    #[error("no expense with id {id}")]
    RecordNotFound { id: String },

    #[error("storage unavailable: {0}")]
    StorageUnavailable(#[from] rusqlite::Error),
}

impl LedgerError {
    /// Stable snake_case name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerError::MissingRequiredField { .. } => "missing_required_field",
            LedgerError::InvalidDateFormat { .. } => "invalid_date_format",
            LedgerError::InvalidAmount { .. } => "invalid_amount",
            LedgerError::SelectionRequired { .. } => "selection_required",
            LedgerError::RecordNotFound { .. } => "record_not_found",
            LedgerError::StorageUnavailable(_) => "storage_unavailable",
        }
    }

    /// Heading for the blocking notification shown to the user.
    pub fn title(&self) -> &'static str {
        match self {
            LedgerError::MissingRequiredField { .. }
            | LedgerError::InvalidDateFormat { .. }
            | LedgerError::InvalidAmount { .. } => "Input Error",
            LedgerError::SelectionRequired { .. } => "Selection Error",
            LedgerError::RecordNotFound { .. } => "Not Found",
            LedgerError::StorageUnavailable(_) => "Storage Error",
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            LedgerError::MissingRequiredField { .. }
                | LedgerError::InvalidDateFormat { .. }
                | LedgerError::InvalidAmount { .. }
        )
    }

    pub fn is_soft(&self) -> bool {
        matches!(self, LedgerError::RecordNotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
