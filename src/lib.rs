// Expense Ledger - Core Library
// Validation, SQLite-backed store and form/table binding, shared by the TUI and the API server

pub mod config;
pub mod db;
pub mod editor;
pub mod error;
pub mod logging;
pub mod model;
pub mod validation;

// Re-export commonly used types
pub use config::Config;
pub use db::{setup_database, LedgerStore, SqliteLedger};
pub use editor::{Editor, ExpenseForm, Outcome, Selection};
pub use error::{LedgerError, Result};
pub use model::{format_amount, Expense, ExpenseId, NewExpense};
pub use validation::{parse_amount, validate_date, validate_expense};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
