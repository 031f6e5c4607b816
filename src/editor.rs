// Form / table binding
// Keeps the edit form, the selected row and the displayed snapshot in step with the store

use crate::db::LedgerStore;
use crate::error::{LedgerError, Result};
use crate::model::{Expense, ExpenseId, NewExpense};
use crate::validation::{validate_expense, DATE_FORMAT};
use chrono::NaiveDate;
use tracing::{error, info, warn};

/// Raw text of the four form inputs
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExpenseForm {
    pub date: String,
    pub category: String,
    pub amount: String,
    pub notes: String,
}

impl ExpenseForm {
    /// Default form: today's date, everything else empty.
    pub fn cleared(today: NaiveDate) -> Self {
        Self {
            date: today.format(DATE_FORMAT).to_string(),
            ..Self::default()
        }
    }

    /// Mirror a stored record into editable text.
    ///
    /// The amount is written from its numeric value; no currency symbol ever
    /// enters the form.
    pub fn from_expense(expense: &Expense) -> Self {
        Self {
            date: expense.date.clone(),
            category: expense.category.clone(),
            amount: expense.amount.to_string(),
            notes: expense.notes.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Idle,
    Editing { id: ExpenseId },
}

/// What a successful action did, for the confirmation message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Added(ExpenseId),
    Updated(ExpenseId),
    Deleted(ExpenseId),
    Cancelled,
    Cleared,
}

impl Outcome {
    pub fn message(&self) -> &'static str {
        match self {
            Outcome::Added(_) => "Expense added successfully!",
            Outcome::Updated(_) => "Expense updated successfully!",
            Outcome::Deleted(_) => "Expense deleted successfully!",
            Outcome::Cancelled => "Delete cancelled.",
            Outcome::Cleared => "Fields cleared.",
        }
    }
}

pub type Clock = fn() -> NaiveDate;

fn local_today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Application context: the store handle plus all UI state that mirrors it.
pub struct Editor<S: LedgerStore> {
    store: S,
    form: ExpenseForm,
    selection: Selection,
    records: Vec<Expense>,
    clock: Clock,
}

impl<S: LedgerStore> Editor<S> {
    /// Bind to a store and load the initial snapshot.
    pub fn new(store: S) -> Result<Self> {
        Self::with_clock(store, local_today)
    }

    pub fn with_clock(store: S, clock: Clock) -> Result<Self> {
        let records = store.list()?;
        Ok(Self {
            store,
            form: ExpenseForm::cleared(clock()),
            selection: Selection::Idle,
            records,
            clock,
        })
    }

    pub fn form(&self) -> &ExpenseForm {
        &self.form
    }

    /// Form inputs are edited in place by the presentation layer.
    pub fn form_mut(&mut self) -> &mut ExpenseForm {
        &mut self.form
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn records(&self) -> &[Expense] {
        &self.records
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// The record currently mirrored into the form, if any.
    pub fn selected(&self) -> Option<&Expense> {
        match &self.selection {
            Selection::Idle => None,
            Selection::Editing { id } => self.records.iter().find(|e| &e.id == id),
        }
    }

    /// Reload the snapshot from the store.
    pub fn refresh(&mut self) -> Result<()> {
        self.records = self.store.list()?;
        Ok(())
    }

    /// Select a displayed row and copy its values into the form.
    pub fn select(&mut self, id: &str) -> Result<()> {
        let expense = self
            .records
            .iter()
            .find(|e| e.id == id)
            .ok_or_else(|| LedgerError::RecordNotFound { id: id.to_string() })?;

        self.form = ExpenseForm::from_expense(expense);
        self.selection = Selection::Editing { id: expense.id.clone() };
        Ok(())
    }

    /// Create a new record from the form, whatever the current selection.
    pub fn add(&mut self) -> Result<Outcome> {
        let expense = self.validated_form("add")?;

        let id = self.store.create(&expense).map_err(|e| log_failure("add", e))?;
        info!(%id, date = expense.date(), amount = expense.amount(), "expense added");

        self.finish_mutation();
        Ok(Outcome::Added(id))
    }

    /// Replace the selected record with the form values.
    pub fn update(&mut self) -> Result<Outcome> {
        let id = self.require_selection("update")?;
        let expense = self.validated_form("update")?;

        match self.store.update(&id, &expense) {
            Ok(()) => {
                info!(%id, "expense updated");
                self.finish_mutation();
                Ok(Outcome::Updated(id))
            }
            Err(e) => Err(self.handle_mutation_error("update", e)),
        }
    }

    /// Delete the selected record once the user has confirmed.
    ///
    /// The selection is checked before confirmation matters, so calling this
    /// while idle always yields `SelectionRequired`.
    pub fn delete(&mut self, confirmed: bool) -> Result<Outcome> {
        let id = self.require_selection("delete")?;
        if !confirmed {
            return Ok(Outcome::Cancelled);
        }

        match self.store.delete(&id) {
            Ok(()) => {
                info!(%id, "expense deleted");
                self.finish_mutation();
                Ok(Outcome::Deleted(id))
            }
            Err(e) => Err(self.handle_mutation_error("delete", e)),
        }
    }

    /// Reset the form to defaults and drop the selection.
    pub fn clear(&mut self) -> Outcome {
        self.form = ExpenseForm::cleared((self.clock)());
        self.selection = Selection::Idle;
        Outcome::Cleared
    }

    /// Selected id, or `SelectionRequired` naming the attempted action.
    pub fn require_selection(&self, action: &'static str) -> Result<ExpenseId> {
        match &self.selection {
            Selection::Editing { id } => Ok(id.clone()),
            Selection::Idle => {
                warn!(action, "rejected: no record selected");
                Err(LedgerError::SelectionRequired { action })
            }
        }
    }

    fn validated_form(&self, action: &'static str) -> Result<NewExpense> {
        let form = &self.form;
        validate_expense(&form.date, &form.category, &form.amount, &form.notes).map_err(|e| {
            warn!(action, kind = e.kind(), "rejected: {}", e);
            e
        })
    }

    // The write is already committed, so a failed reload only leaves the
    // table stale until the next refresh.
    fn finish_mutation(&mut self) {
        self.clear();
        if let Err(e) = self.refresh() {
            log_failure("refresh", e);
        }
    }

    // The target vanished from the store: show what is really there and go
    // back to idle, but keep the typed values so nothing is lost.
    fn handle_mutation_error(&mut self, action: &'static str, err: LedgerError) -> LedgerError {
        if let LedgerError::RecordNotFound { id } = &err {
            warn!(action, %id, "target record no longer exists");
            self.selection = Selection::Idle;
            if let Err(refresh_err) = self.refresh() {
                return log_failure("refresh", refresh_err);
            }
            return err;
        }
        log_failure(action, err)
    }
}

fn log_failure(action: &str, err: LedgerError) -> LedgerError {
    error!(action, kind = err.kind(), "{}", err);
    err
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SqliteLedger;
    use std::cell::Cell;
    use std::rc::Rc;

    fn fixed_today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
    }

    fn editor() -> Editor<SqliteLedger> {
        let ledger = SqliteLedger::open_in_memory().unwrap();
        Editor::with_clock(ledger, fixed_today).unwrap()
    }

    fn fill<S: LedgerStore>(editor: &mut Editor<S>, date: &str, category: &str, amount: &str, notes: &str) {
        let form = editor.form_mut();
        form.date = date.to_string();
        form.category = category.to_string();
        form.amount = amount.to_string();
        form.notes = notes.to_string();
    }

    fn add<S: LedgerStore>(editor: &mut Editor<S>, date: &str, category: &str, amount: &str) -> ExpenseId {
        fill(editor, date, category, amount, "");
        match editor.add().unwrap() {
            Outcome::Added(id) => id,
            other => panic!("expected Added, got {:?}", other),
        }
    }

    #[test]
    fn test_starts_idle_with_today() {
        let editor = editor();
        assert_eq!(editor.selection(), &Selection::Idle);
        assert_eq!(editor.form(), &ExpenseForm::cleared(fixed_today()));
        assert_eq!(editor.form().date, "2024-03-15");
    }

    #[test]
    fn test_add_refreshes_and_clears() {
        let mut editor = editor();
        let id = add(&mut editor, "2024-03-01", "Food", "12.50");

        assert_eq!(editor.records().len(), 1);
        assert_eq!(editor.records()[0].id, id);
        assert_eq!(editor.records()[0].amount, 12.5);
        assert_eq!(editor.form(), &ExpenseForm::cleared(fixed_today()));
        assert_eq!(editor.selection(), &Selection::Idle);
    }

    #[test]
    fn test_select_mirrors_row_into_form() {
        let mut editor = editor();
        let id = add(&mut editor, "2024-03-01", "Food", "12.50");

        editor.select(&id).unwrap();

        assert_eq!(editor.selection(), &Selection::Editing { id: id.clone() });
        assert_eq!(editor.form().date, "2024-03-01");
        assert_eq!(editor.form().category, "Food");
        assert_eq!(editor.form().amount, "12.5");
        assert_eq!(editor.selected().map(|e| e.id.as_str()), Some(id.as_str()));
    }

    #[test]
    fn test_update_changes_only_selected_row() {
        let mut editor = editor();
        let other = add(&mut editor, "2024-03-02", "Taxi", "8");
        let target = add(&mut editor, "2024-03-01", "Food", "12.50");

        editor.select(&target).unwrap();
        editor.form_mut().amount = "99.99".to_string();
        assert_eq!(editor.update().unwrap(), Outcome::Updated(target.clone()));

        let records = editor.records();
        assert_eq!(records.len(), 2);
        let updated = records.iter().find(|e| e.id == target).unwrap();
        let untouched = records.iter().find(|e| e.id == other).unwrap();
        assert_eq!(updated.amount, 99.99);
        assert_eq!(untouched.amount, 8.0);
        assert_eq!(editor.selection(), &Selection::Idle);
    }

    #[test]
    fn test_update_and_delete_require_selection() {
        let mut editor = editor();
        add(&mut editor, "2024-03-01", "Food", "12.50");
        let before = editor.store().list().unwrap();

        fill(&mut editor, "2024-03-01", "Food", "1", "");
        assert_eq!(editor.update().unwrap_err().kind(), "selection_required");
        assert_eq!(editor.delete(true).unwrap_err().kind(), "selection_required");
        assert_eq!(editor.delete(false).unwrap_err().kind(), "selection_required");

        assert_eq!(editor.store().list().unwrap(), before);
    }

    #[test]
    fn test_delete_needs_confirmation() {
        let mut editor = editor();
        let id = add(&mut editor, "2024-03-01", "Food", "12.50");
        editor.select(&id).unwrap();

        assert_eq!(editor.delete(false).unwrap(), Outcome::Cancelled);
        assert_eq!(editor.records().len(), 1, "Declined delete must not touch the store");
        assert_eq!(editor.selection(), &Selection::Editing { id: id.clone() });

        assert_eq!(editor.delete(true).unwrap(), Outcome::Deleted(id));
        assert!(editor.records().is_empty());
        assert_eq!(editor.selection(), &Selection::Idle);
    }

    #[test]
    fn test_validation_failure_keeps_state_and_form() {
        let mut editor = editor();
        let id = add(&mut editor, "2024-03-01", "Food", "12.50");
        editor.select(&id).unwrap();
        editor.form_mut().amount = "-5".to_string();
        let form_before = editor.form().clone();

        let err = editor.update().unwrap_err();
        assert_eq!(err.kind(), "invalid_amount");
        assert_eq!(editor.form(), &form_before);
        assert_eq!(editor.selection(), &Selection::Editing { id });
        assert_eq!(editor.records()[0].amount, 12.5);

        let err = editor.add().unwrap_err();
        assert_eq!(err.kind(), "invalid_amount");
        assert_eq!(editor.records().len(), 1);
    }

    #[test]
    fn test_clear_resets_from_any_state() {
        let mut editor = editor();
        let id = add(&mut editor, "2024-03-01", "Food", "12.50");
        editor.select(&id).unwrap();
        editor.form_mut().notes = "typed".to_string();

        assert_eq!(editor.clear(), Outcome::Cleared);
        assert_eq!(editor.selection(), &Selection::Idle);
        assert_eq!(
            editor.form(),
            &ExpenseForm {
                date: "2024-03-15".to_string(),
                category: String::new(),
                amount: String::new(),
                notes: String::new(),
            }
        );
    }

    /// Switches shared with a `FlakyStore` so a test can cut the store off
    /// and bring it back while the editor owns it.
    #[derive(Clone, Default)]
    struct Outage {
        writes: Rc<Cell<bool>>,
        reads: Rc<Cell<bool>>,
    }

    /// SQLite ledger that fails on demand like a dropped connection.
    struct FlakyStore {
        inner: SqliteLedger,
        outage: Outage,
    }

    fn fail_if(down: &Cell<bool>) -> Result<()> {
        if down.get() {
            return Err(LedgerError::StorageUnavailable(rusqlite::Error::InvalidQuery));
        }
        Ok(())
    }

    impl LedgerStore for FlakyStore {
        fn create(&mut self, expense: &NewExpense) -> Result<ExpenseId> {
            fail_if(&self.outage.writes)?;
            self.inner.create(expense)
        }

        fn list(&self) -> Result<Vec<Expense>> {
            fail_if(&self.outage.reads)?;
            self.inner.list()
        }

        fn update(&mut self, id: &str, expense: &NewExpense) -> Result<()> {
            fail_if(&self.outage.writes)?;
            self.inner.update(id, expense)
        }

        fn delete(&mut self, id: &str) -> Result<()> {
            fail_if(&self.outage.writes)?;
            self.inner.delete(id)
        }
    }

    fn flaky_editor() -> (Editor<FlakyStore>, Outage) {
        let outage = Outage::default();
        let store = FlakyStore {
            inner: SqliteLedger::open_in_memory().unwrap(),
            outage: outage.clone(),
        };
        (Editor::with_clock(store, fixed_today).unwrap(), outage)
    }

    /// Editor still showing and editing a row that another writer removed.
    fn editing_vanished_row() -> (Editor<SqliteLedger>, ExpenseId) {
        let mut editor = editor();
        let id = add(&mut editor, "2024-03-01", "Food", "12.50");
        let stale = editor.records().to_vec();

        let mut store = editor.into_store();
        store.delete(&id).unwrap();
        let mut editor = Editor::with_clock(store, fixed_today).unwrap();
        editor.records = stale;
        editor.select(&id).unwrap();
        (editor, id)
    }

    #[test]
    fn test_storage_failure_keeps_state_and_retry_succeeds() {
        let (mut editor, outage) = flaky_editor();
        let id = add(&mut editor, "2024-03-01", "Food", "12.50");
        editor.select(&id).unwrap();
        editor.form_mut().amount = "20".to_string();

        let form_before = editor.form().clone();
        let records_before = editor.records().to_vec();
        let selection_before = Selection::Editing { id: id.clone() };

        outage.writes.set(true);
        for err in [editor.update().unwrap_err(), editor.delete(true).unwrap_err(), editor.add().unwrap_err()] {
            assert_eq!(err.kind(), "storage_unavailable");
            assert!(!err.is_soft());
            assert_eq!(editor.form(), &form_before, "Typed values must survive a failed write");
            assert_eq!(editor.selection(), &selection_before);
            assert_eq!(editor.records(), records_before.as_slice());
        }

        outage.writes.set(false);
        assert_eq!(editor.update().unwrap(), Outcome::Updated(id.clone()));
        assert_eq!(editor.records().len(), 1);
        assert_eq!(editor.records()[0].amount, 20.0);
        assert_eq!(editor.selection(), &Selection::Idle);
    }

    #[test]
    fn test_refresh_failure_after_write_still_reports_success() {
        let (mut editor, outage) = flaky_editor();
        outage.reads.set(true);

        fill(&mut editor, "2024-03-01", "Food", "12.50", "");
        let id = match editor.add().unwrap() {
            Outcome::Added(id) => id,
            other => panic!("expected Added, got {:?}", other),
        };
        assert_eq!(editor.form(), &ExpenseForm::cleared(fixed_today()));
        assert_eq!(editor.selection(), &Selection::Idle);
        assert!(editor.records().is_empty(), "Table stays stale until the store is back");

        outage.reads.set(false);
        editor.refresh().unwrap();
        assert_eq!(editor.records().len(), 1);
        assert_eq!(editor.records()[0].id, id);
    }

    #[test]
    fn test_vanished_record_delete_is_soft_error() {
        let (mut editor, id) = editing_vanished_row();

        let err = editor.delete(true).unwrap_err();
        assert!(matches!(&err, LedgerError::RecordNotFound { id: gone } if gone == &id));
        assert!(err.is_soft());
        assert_eq!(editor.selection(), &Selection::Idle);
        assert!(editor.records().is_empty(), "Snapshot should reflect the store");
        assert_eq!(editor.form().category, "Food", "Typed values are kept");
    }

    #[test]
    fn test_vanished_record_is_soft_error() {
        let (mut editor, _id) = editing_vanished_row();
        editor.form_mut().amount = "20".to_string();

        let err = editor.update().unwrap_err();
        assert!(err.is_soft());
        assert_eq!(editor.selection(), &Selection::Idle);
        assert!(editor.records().is_empty(), "Snapshot should reflect the store");
        assert_eq!(editor.form().amount, "20", "Typed values are kept");
    }

    #[test]
    fn test_select_unknown_id() {
        let mut editor = editor();
        assert_eq!(editor.select("nope").unwrap_err().kind(), "record_not_found");
        assert_eq!(editor.selection(), &Selection::Idle);
    }
}
