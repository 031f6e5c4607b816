// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{Context, Result};
use std::env;

use expense_ledger::{format_amount, logging, Config, LedgerStore, SqliteLedger};

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let config = Config::from_env()?;

    if args.len() > 1 && args[1] == "list" {
        // Print mode
        logging::init_stderr();
        run_list(&config)?;
    } else {
        // UI mode (default)
        logging::init_file(&config.log_path)?;
        run_ui_mode(&config)?;
    }

    Ok(())
}

fn open_ledger(config: &Config) -> Result<SqliteLedger> {
    config.ensure_db_dir()?;
    SqliteLedger::open(&config.db_path)
        .with_context(|| format!("failed to open ledger at {:?}", config.db_path))
}

fn run_list(config: &Config) -> Result<()> {
    let ledger = open_ledger(config)?;
    let expenses = ledger.list().context("failed to list expenses")?;

    println!("{:<12} {:<20} {:>14}  {}", "Date", "Category", "Amount", "Notes");
    println!("{}", "-".repeat(64));
    for e in &expenses {
        println!(
            "{:<12} {:<20} {:>14}  {}",
            e.date,
            e.category,
            format_amount(e.amount, &config.currency_symbol),
            e.notes
        );
    }

    let total: f64 = expenses.iter().map(|e| e.amount).sum();
    println!("{}", "-".repeat(64));
    println!(
        "{} expenses, total {}",
        expenses.len(),
        format_amount(total, &config.currency_symbol)
    );

    ledger.close()?;
    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode(config: &Config) -> Result<()> {
    let ledger = open_ledger(config)?;
    let editor = expense_ledger::Editor::new(ledger).context("failed to load expenses")?;

    let mut app = ui::App::new(editor, config.currency_symbol.clone());
    let res = ui::run_ui(&mut app);

    // Release the connection whether or not the UI failed
    app.editor.into_store().close()?;
    res
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_config: &Config) -> Result<()> {
    eprintln!("TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or print the ledger: expense-ledger list");
    std::process::exit(1);
}
