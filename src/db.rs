use crate::error::{LedgerError, Result};
use crate::model::{Expense, ExpenseId, NewExpense};
use rusqlite::{params, Connection};
use std::path::Path;
use tracing::{debug, info};

/// The four round trips the ledger needs from a persistence medium.
///
/// Any store that can insert one document, return all documents sorted by
/// date descending, and update or delete one document by id can stand in.
pub trait LedgerStore {
    /// Persist a validated record and return its new identifier.
    fn create(&mut self, expense: &NewExpense) -> Result<ExpenseId>;

    /// Fresh snapshot of every record, newest date first.
    fn list(&self) -> Result<Vec<Expense>>;

    /// Replace every field of the record at `id`.
    fn update(&mut self, id: &str, expense: &NewExpense) -> Result<()>;

    /// Remove the record at `id`.
    fn delete(&mut self, id: &str) -> Result<()>;
}

/// Expense ledger backed by a single SQLite database.
pub struct SqliteLedger {
    conn: Connection,
}

impl SqliteLedger {
    /// Open (or create) the database file and make sure the schema exists.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        setup_database(&conn)?;
        info!(path = %path.display(), "ledger opened");
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        setup_database(&conn)?;
        Ok(Self { conn })
    }

    /// Number of stored records
    pub fn count(&self) -> Result<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM expenses", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Release the connection, flushing the WAL.
    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, e)| LedgerError::from(e))?;
        info!("ledger closed");
        Ok(())
    }
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // WAL for crash recovery; in-memory databases keep their own journal mode
    conn.pragma_update(None, "journal_mode", "WAL")?;

    // seq is AUTOINCREMENT so insertion order survives deletes and breaks date ties
    conn.execute(
        "CREATE TABLE IF NOT EXISTS expenses (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            id TEXT UNIQUE NOT NULL,
            date TEXT NOT NULL
                CHECK (date GLOB '[0-9][0-9][0-9][0-9]-[0-9][0-9]-[0-9][0-9]'),
            category TEXT NOT NULL CHECK (trim(category) <> ''),
            amount REAL NOT NULL CHECK (amount > 0),
            notes TEXT NOT NULL DEFAULT ''
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_expenses_date ON expenses(date)",
        [],
    )?;

    Ok(())
}

impl LedgerStore for SqliteLedger {
    fn create(&mut self, expense: &NewExpense) -> Result<ExpenseId> {
        let id = uuid::Uuid::new_v4().to_string();

        self.conn.execute(
            "INSERT INTO expenses (id, date, category, amount, notes)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![id, expense.date(), expense.category(), expense.amount(), expense.notes()],
        )?;

        debug!(%id, date = expense.date(), "expense inserted");
        Ok(id)
    }

    fn list(&self) -> Result<Vec<Expense>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, date, category, amount, notes
             FROM expenses
             ORDER BY date DESC, seq ASC",
        )?;

        let expenses = stmt
            .query_map([], |row| {
                Ok(Expense {
                    id: row.get(0)?,
                    date: row.get(1)?,
                    category: row.get(2)?,
                    amount: row.get(3)?,
                    notes: row.get(4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        debug!(count = expenses.len(), "expenses listed");
        Ok(expenses)
    }

    fn update(&mut self, id: &str, expense: &NewExpense) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE expenses
             SET date = ?1, category = ?2, amount = ?3, notes = ?4
             WHERE id = ?5",
            params![expense.date(), expense.category(), expense.amount(), expense.notes(), id],
        )?;

        if changed == 0 {
            return Err(LedgerError::RecordNotFound { id: id.to_string() });
        }

        debug!(%id, "expense updated");
        Ok(())
    }

    fn delete(&mut self, id: &str) -> Result<()> {
        let changed = self
            .conn
            .execute("DELETE FROM expenses WHERE id = ?1", params![id])?;

        if changed == 0 {
            return Err(LedgerError::RecordNotFound { id: id.to_string() });
        }

        debug!(%id, "expense deleted");
        Ok(())
    }
}
