use rust_decimal::Decimal;
use std::fmt::Write;

use super::util::{bar, format_amount, truncate};
use crate::analytics::{CategoryPoint, MonthRow, Summary, YearMonth};
use crate::models::{CategoryList, Entry};

const RULE_WIDTH: usize = 56;
const BAR_WIDTH: usize = 24;

fn rule() -> String {
    "─".repeat(RULE_WIDTH)
}

/// Totals, top category, the sorted breakdown and both chart series.
pub(crate) fn dashboard(
    heading: &str,
    summary: &Summary,
    shares: &[CategoryPoint],
    months: &[MonthRow],
    symbol: &str,
) -> String {
    let mut out = String::new();
    let totals = &summary.totals;

    let _ = writeln!(out, "{heading}");
    let _ = writeln!(out, "{}", rule());
    let _ = writeln!(out, "  Total Income:    {}", format_amount(totals.total_income, symbol));
    let _ = writeln!(out, "  Total Expenses:  {}", format_amount(totals.total_expenses, symbol));
    let _ = writeln!(out, "  Balance:         {}", format_amount(totals.balance, symbol));
    let _ = writeln!(out, "  Top Spending:    {}", summary.top_category_label());

    if !summary.breakdown.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Expense Breakdown:");
        for row in &summary.breakdown {
            let _ = writeln!(
                out,
                "  {:<24} {:>14} {:>6.1}%",
                truncate(&row.category, 24),
                format_amount(row.amount, symbol),
                row.percentage,
            );
        }
    }

    if !shares.is_empty() {
        let max = shares.iter().map(|p| p.value).max().unwrap_or_default();
        let _ = writeln!(out);
        let _ = writeln!(out, "Spending by Category:");
        for point in shares {
            let _ = writeln!(
                out,
                "  {:<16} {:<width$} {}",
                truncate(&point.category, 16),
                bar(point.value, max, BAR_WIDTH),
                format_amount(point.value, symbol),
                width = BAR_WIDTH,
            );
        }
    }

    if !months.is_empty() {
        let max = months
            .iter()
            .map(|m| m.income.max(m.expense))
            .max()
            .unwrap_or_default();
        let _ = writeln!(out);
        let _ = writeln!(out, "Monthly Income vs Expense:");
        for row in months {
            let _ = writeln!(
                out,
                "  {:<7} in  {:<width$} {}",
                row.label,
                bar(row.income, max, BAR_WIDTH),
                format_amount(row.income, symbol),
                width = BAR_WIDTH,
            );
            let _ = writeln!(
                out,
                "  {:<7} out {:<width$} {}",
                "",
                bar(row.expense, max, BAR_WIDTH),
                format_amount(row.expense, symbol),
                width = BAR_WIDTH,
            );
        }
    }

    out
}

/// Entry table followed by its totals.
pub(crate) fn entries(heading: &str, entries: &[Entry], symbol: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{heading}");
    if entries.is_empty() {
        let _ = writeln!(out, "No entries");
        return out;
    }

    let _ = writeln!(
        out,
        "{:<10}  {:<7}  {:<16}  {:>14}  {:<20}  Id",
        "Date", "Type", "Category", "Amount", "Remarks"
    );
    let _ = writeln!(out, "{}", "─".repeat(RULE_WIDTH + 32));
    for entry in entries {
        let _ = writeln!(
            out,
            "{:<10}  {:<7}  {:<16}  {:>14}  {:<20}  {}",
            entry.date.format("%Y-%m-%d"),
            entry.kind,
            truncate(&entry.category, 16),
            format_amount(entry.amount, symbol),
            truncate(&entry.remarks, 20),
            entry.id,
        );
    }

    let totals = crate::analytics::totals_by_type(entries);
    let _ = writeln!(out, "{}", "─".repeat(RULE_WIDTH + 32));
    let _ = writeln!(
        out,
        "{} entries · income {} · expenses {} · balance {}",
        entries.len(),
        format_amount(totals.total_income, symbol),
        format_amount(totals.total_expenses, symbol),
        format_amount(totals.balance, symbol),
    );
    out
}

pub(crate) fn months(months: &[YearMonth]) -> String {
    if months.is_empty() {
        return "No activity yet\n".to_string();
    }
    let mut out = String::new();
    for month in months {
        let _ = writeln!(out, "  {}  {}", month.key(), month.long_label());
    }
    out
}

pub(crate) fn categories(lists: &[CategoryList]) -> String {
    let mut out = String::new();
    for list in lists {
        let _ = writeln!(out, "{} categories ({}):", list.kind, list.categories.len());
        for name in &list.categories {
            let _ = writeln!(out, "  {name}");
        }
    }
    out
}

/// One-line status used by the interactive shell after each refresh.
pub(crate) fn status_line(summary: &Summary, count: usize, symbol: &str) -> String {
    let balance = summary.totals.balance;
    let sign = if balance < Decimal::ZERO { "overspent" } else { "balance" };
    format!(
        "{count} entries · {sign} {} · top {}",
        format_amount(balance, symbol),
        summary.top_category_label()
    )
}
