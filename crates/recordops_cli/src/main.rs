//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `recordops_core` linkage.
//! - Check a filter expression's syntax: `recordops_cli 'age,gt,30;name,like,ada'`.

use recordops_core::FilterExpr;
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("recordops_core ping={}", recordops_core::ping());
    println!("recordops_core version={}", recordops_core::core_version());

    let Some(filter) = std::env::args().nth(1) else {
        return ExitCode::SUCCESS;
    };

    match FilterExpr::parse(&filter) {
        Ok(expr) => {
            for clause in expr.clauses() {
                println!(
                    "clause field={} comparator={} value={:?}",
                    clause.field, clause.comparator, clause.value
                );
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("invalid filter: {err}");
            ExitCode::from(2)
        }
    }
}
