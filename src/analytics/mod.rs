//! Pure aggregation over an entry snapshot: totals, category breakdowns and
//! month-by-month income/expense series.

use chrono::{Datelike, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::{BTreeMap, HashMap};

use crate::models::{Entry, EntryType};

/// Shown when there is no expense to rank.
pub(crate) const NO_TOP_CATEGORY: &str = "N/A";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Totals {
    pub total_income: Decimal,
    pub total_expenses: Decimal,
    pub balance: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CategoryShare {
    pub category: String,
    pub amount: Decimal,
    /// Share of total expenses, one decimal place.
    pub percentage: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CategoryPoint {
    pub category: String,
    pub value: Decimal,
}

/// Calendar month. Ordering is chronological (year first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub(crate) fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    fn first_day(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }

    /// Abbreviated month and 2-digit year, e.g. "Jan 24".
    pub(crate) fn short_label(&self) -> String {
        self.first_day()
            .map(|d| d.format("%b %y").to_string())
            .unwrap_or_default()
    }

    /// Full month name and year, e.g. "January 2024".
    pub(crate) fn long_label(&self) -> String {
        self.first_day()
            .map(|d| d.format("%B %Y").to_string())
            .unwrap_or_default()
    }

    /// "2024-01"
    pub(crate) fn key(&self) -> String {
        format!("{:04}-{:02}", self.year, self.month)
    }

    /// Accepts "2024-01", "Jan 24" and "January 2024".
    pub(crate) fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        if let Ok(d) = NaiveDate::parse_from_str(&format!("{input}-01"), "%Y-%m-%d") {
            return Some(Self::of(d));
        }
        // Two-digit years land in 20xx; %y alone would split at 1969/2068.
        let (name, year) = input.rsplit_once(' ')?;
        let year: i32 = match year.len() {
            2 => 2000 + year.parse::<i32>().ok()?,
            4 => year.parse().ok()?,
            _ => return None,
        };
        ["%d %b %Y", "%d %B %Y"]
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(&format!("01 {name} {year}"), fmt).ok())
            .map(Self::of)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MonthRow {
    pub month: YearMonth,
    pub label: String,
    pub income: Decimal,
    pub expense: Decimal,
}

/// The dashboard bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Summary {
    pub totals: Totals,
    pub top_spending_category: Option<String>,
    pub breakdown: Vec<CategoryShare>,
}

impl Summary {
    pub(crate) fn top_category_label(&self) -> &str {
        self.top_spending_category
            .as_deref()
            .unwrap_or(NO_TOP_CATEGORY)
    }
}

/// Category sums in first-seen order.
struct CategoryTotals {
    order: Vec<(String, Decimal)>,
    index: HashMap<String, usize>,
}

impl CategoryTotals {
    fn expenses_of(entries: &[Entry]) -> Self {
        let mut totals = Self {
            order: Vec::new(),
            index: HashMap::new(),
        };
        for entry in entries.iter().filter(|e| e.is_expense()) {
            totals.add(&entry.category, entry.amount);
        }
        totals
    }

    fn add(&mut self, category: &str, amount: Decimal) {
        match self.index.get(category) {
            Some(&i) => {
                let sum = &mut self.order[i].1;
                *sum = sum.saturating_add(amount);
            }
            None => {
                self.index.insert(category.to_string(), self.order.len());
                self.order.push((category.to_string(), amount));
            }
        }
    }

    /// Largest sum; the earliest inserted category wins a tie.
    fn top(&self) -> Option<&str> {
        let mut best: Option<&(String, Decimal)> = None;
        for pair in &self.order {
            if best.map_or(true, |b| pair.1 > b.1) {
                best = Some(pair);
            }
        }
        best.map(|(name, _)| name.as_str())
    }
}

fn sum_of(entries: &[Entry], kind: EntryType) -> Decimal {
    entries
        .iter()
        .filter(|e| e.kind == kind)
        .fold(Decimal::ZERO, |acc, e| acc.saturating_add(e.amount))
}

pub(crate) fn totals_by_type(entries: &[Entry]) -> Totals {
    let total_income = sum_of(entries, EntryType::Income);
    let total_expenses = sum_of(entries, EntryType::Expense);
    Totals {
        total_income,
        total_expenses,
        balance: total_income.saturating_sub(total_expenses),
    }
}

/// Zero when there is nothing to divide by or the ratio leaves `Decimal`'s
/// range, which only a near-zero total of mixed-sign amounts can cause.
fn percentage_of(amount: Decimal, total: Decimal) -> Decimal {
    if total.is_zero() {
        return Decimal::ZERO;
    }
    amount
        .checked_div(total)
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .map(|pct| pct.round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero))
        .unwrap_or(Decimal::ZERO)
}

/// Expense totals per category with their share of all expenses, largest first.
pub(crate) fn category_breakdown(entries: &[Entry]) -> Vec<CategoryShare> {
    let totals = CategoryTotals::expenses_of(entries);
    let total_expenses = sum_of(entries, EntryType::Expense);
    let mut rows: Vec<CategoryShare> = totals
        .order
        .into_iter()
        .map(|(category, amount)| CategoryShare {
            percentage: percentage_of(amount, total_expenses),
            category,
            amount,
        })
        .collect();
    // Stable: equal amounts keep first-seen order.
    rows.sort_by(|a, b| b.amount.cmp(&a.amount));
    rows
}

pub(crate) fn top_spending_category(entries: &[Entry]) -> Option<String> {
    CategoryTotals::expenses_of(entries).top().map(str::to_string)
}

/// Raw expense sums per category for proportion charts.
pub(crate) fn category_series(entries: &[Entry]) -> Vec<CategoryPoint> {
    CategoryTotals::expenses_of(entries)
        .order
        .into_iter()
        .map(|(category, value)| CategoryPoint { category, value })
        .collect()
}

/// One row per month with any activity, oldest first.
pub(crate) fn monthly_series(entries: &[Entry]) -> Vec<MonthRow> {
    let mut months: BTreeMap<YearMonth, (Decimal, Decimal)> = BTreeMap::new();
    for entry in entries {
        let slot = months.entry(YearMonth::of(entry.date)).or_default();
        let sum = match entry.kind {
            EntryType::Income => &mut slot.0,
            EntryType::Expense => &mut slot.1,
        };
        *sum = sum.saturating_add(entry.amount);
    }
    months
        .into_iter()
        .map(|(month, (income, expense))| MonthRow {
            month,
            label: month.short_label(),
            income,
            expense,
        })
        .collect()
}

pub(crate) fn summarize(entries: &[Entry]) -> Summary {
    Summary {
        totals: totals_by_type(entries),
        top_spending_category: top_spending_category(entries),
        breakdown: category_breakdown(entries),
    }
}

/// Distinct months present in the snapshot, oldest first.
pub(crate) fn available_months(entries: &[Entry]) -> Vec<YearMonth> {
    let mut months: Vec<YearMonth> = entries.iter().map(|e| YearMonth::of(e.date)).collect();
    months.sort();
    months.dedup();
    months
}

pub(crate) fn entries_in_month(entries: &[Entry], month: YearMonth) -> Vec<Entry> {
    entries
        .iter()
        .filter(|e| YearMonth::of(e.date) == month)
        .cloned()
        .collect()
}
