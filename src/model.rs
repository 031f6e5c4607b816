use serde::{Deserialize, Serialize};

/// Identifier assigned by the store on creation, never reused.
pub type ExpenseId = String;

/// A stored expense record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub id: ExpenseId,

    /// Calendar date as `YYYY-MM-DD`, kept as text
    pub date: String,

    pub category: String,

    /// Always > 0, currency-agnostic
    pub amount: f64,

    #[serde(default)]
    pub notes: String,
}

/// Validated field values, ready to be created or to replace an existing record.
///
/// Fields are private and `validation::validate_expense` is the only public
/// way to build one, so a `NewExpense` always carries a fixed-width
/// `YYYY-MM-DD` date, a non-blank category and a positive finite amount.
///
/// ```compile_fail
/// let bad = expense_ledger::NewExpense {
///     date: "garbage".to_string(),
///     category: String::new(),
///     amount: 5.0,
///     notes: String::new(),
/// };
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewExpense {
    date: String,
    category: String,
    amount: f64,
    notes: String,
}

impl NewExpense {
    /// Callers must have checked every field already.
    pub(crate) fn from_checked(date: String, category: String, amount: f64, notes: String) -> Self {
        Self {
            date,
            category,
            amount,
            notes,
        }
    }

    pub fn date(&self) -> &str {
        &self.date
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    /// Attach a store-assigned identifier.
    pub fn with_id(self, id: ExpenseId) -> Expense {
        Expense {
            id,
            date: self.date,
            category: self.category,
            amount: self.amount,
            notes: self.notes,
        }
    }
}

/// Render an amount with its currency symbol for display only.
pub fn format_amount(amount: f64, symbol: &str) -> String {
    format!("{}{:.2}", symbol, amount)
}
