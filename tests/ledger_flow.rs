// End-to-end checks of the ledger through the public API

use chrono::NaiveDate;
use expense_ledger::{Editor, ExpenseForm, LedgerStore, Outcome, Selection, SqliteLedger};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()
}

fn set_form(editor: &mut Editor<SqliteLedger>, date: &str, category: &str, amount: &str, notes: &str) {
    *editor.form_mut() = ExpenseForm {
        date: date.to_string(),
        category: category.to_string(),
        amount: amount.to_string(),
        notes: notes.to_string(),
    };
}

fn added_id(outcome: Outcome) -> String {
    match outcome {
        Outcome::Added(id) => id,
        other => panic!("expected Added, got {:?}", other),
    }
}

#[test]
fn test_create_places_record_by_date() {
    let mut editor = Editor::with_clock(SqliteLedger::open_in_memory().unwrap(), today).unwrap();

    for (date, category) in [("2024-01-10", "Rent"), ("2024-05-02", "Food"), ("2023-11-20", "Gift")] {
        set_form(&mut editor, date, category, "10", "");
        editor.add().unwrap();
    }

    set_form(&mut editor, "2024-02-14", "Flowers", "25.75", "valentine");
    let id = added_id(editor.add().unwrap());

    let records = editor.records();
    assert_eq!(records.len(), 4);
    let dates: Vec<&str> = records.iter().map(|e| e.date.as_str()).collect();
    assert_eq!(dates, vec!["2024-05-02", "2024-02-14", "2024-01-10", "2023-11-20"]);

    let new = &records[1];
    assert_eq!(new.id, id);
    assert_eq!(new.category, "Flowers");
    assert_eq!(new.amount, 25.75);
    assert_eq!(new.notes, "valentine");
    assert_eq!(records.iter().filter(|e| e.id == id).count(), 1);
}

#[test]
fn test_full_edit_cycle() {
    let mut editor = Editor::with_clock(SqliteLedger::open_in_memory().unwrap(), today).unwrap();

    set_form(&mut editor, "2024-03-01", "Food", "12.50", "");
    let food = added_id(editor.add().unwrap());
    set_form(&mut editor, "2024-03-02", "Taxi", "8", "airport");
    let taxi = added_id(editor.add().unwrap());

    // Select, change the amount, update
    editor.select(&food).unwrap();
    assert_eq!(editor.form().amount, "12.5");
    editor.form_mut().amount = "99.99".to_string();
    assert_eq!(editor.update().unwrap(), Outcome::Updated(food.clone()));

    let snapshot = editor.store().list().unwrap();
    assert_eq!(snapshot.len(), 2, "Update must not duplicate");
    let food_row = snapshot.iter().find(|e| e.id == food).unwrap();
    let taxi_row = snapshot.iter().find(|e| e.id == taxi).unwrap();
    assert_eq!(food_row.amount, 99.99);
    assert_eq!(taxi_row.amount, 8.0);
    assert_eq!(taxi_row.notes, "airport");

    // Delete the taxi ride
    editor.select(&taxi).unwrap();
    assert_eq!(editor.delete(true).unwrap(), Outcome::Deleted(taxi.clone()));
    assert!(editor.store().list().unwrap().iter().all(|e| e.id != taxi));
    assert_eq!(editor.selection(), &Selection::Idle);
    assert_eq!(editor.form(), &ExpenseForm::cleared(today()));
}

#[test]
fn test_rejected_actions_leave_store_untouched() {
    let mut editor = Editor::with_clock(SqliteLedger::open_in_memory().unwrap(), today).unwrap();
    set_form(&mut editor, "2024-03-01", "Food", "12.50", "");
    editor.add().unwrap();
    let before = editor.store().list().unwrap();

    for (date, category, amount, kind) in [
        ("", "Food", "1", "missing_required_field"),
        ("2024-03-01", "", "1", "missing_required_field"),
        ("2024-03-01", "Food", "", "missing_required_field"),
        ("2024-13-40", "Food", "1", "invalid_date_format"),
        ("2024-03-01", "Food", "-5", "invalid_amount"),
        ("2024-03-01", "Food", "abc", "invalid_amount"),
    ] {
        set_form(&mut editor, date, category, amount, "");
        let err = editor.add().unwrap_err();
        assert_eq!(err.kind(), kind, "input {:?}", (date, category, amount));
        assert_eq!(editor.form().amount, amount, "Form must keep what was typed");
    }

    set_form(&mut editor, "2024-03-01", "Food", "5", "");
    assert_eq!(editor.update().unwrap_err().kind(), "selection_required");
    assert_eq!(editor.delete(true).unwrap_err().kind(), "selection_required");

    assert_eq!(editor.store().list().unwrap(), before);
}

#[test]
fn test_records_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("expenses.db");

    let id = {
        let ledger = SqliteLedger::open(&path).unwrap();
        let mut editor = Editor::with_clock(ledger, today).unwrap();
        set_form(&mut editor, "2024-04-01", "Books", "30", "rust book");
        let id = added_id(editor.add().unwrap());
        editor.into_store().close().unwrap();
        id
    };

    let ledger = SqliteLedger::open(&path).unwrap();
    let editor = Editor::with_clock(ledger, today).unwrap();
    assert_eq!(editor.records().len(), 1);
    assert_eq!(editor.records()[0].id, id);
    assert_eq!(editor.records()[0].notes, "rust book");
}
