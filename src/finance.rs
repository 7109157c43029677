//! Derived financial calculations.
//!
//! Pure functions with no external state. The backend is authoritative
//! for all persisted amounts; these reproduce the handful of figures the
//! client derives live while the user edits a form, so they must match
//! the numbers the server will later compute.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Inclusive day count between two calendar dates: both endpoints are
/// counted, and the order of the arguments does not matter.
///
/// 2024-01-01..2024-01-01 is 1 day; 2024-01-01..2024-01-05 is 5.
pub fn leave_day_count(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days().abs() + 1
}

/// One row of the HR cost estimation table.
///
/// All factors are free-form numeric inputs; `allocation_pct` is
/// conventionally 1–100 and `headcount` at least 1, but neither is
/// enforced here or server-side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimationRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub function: String,
    pub headcount: f64,
    pub allocation_pct: f64,
    pub duration_months: f64,
    pub days_per_month: f64,
    pub daily_rate: f64,
}

impl EstimationRow {
    /// A fresh editable row: one person, fully allocated, one month of
    /// 26 working days, no rate yet.
    pub fn blank() -> Self {
        Self {
            id: None,
            function: String::new(),
            headcount: 1.0,
            allocation_pct: 100.0,
            duration_months: 1.0,
            days_per_month: 26.0,
            daily_rate: 0.0,
        }
    }

    /// Worked days: `headcount × (allocation_pct / 100) × duration_months × days_per_month`.
    pub fn duration_days(&self) -> f64 {
        self.headcount * (self.allocation_pct / 100.0) * self.duration_months * self.days_per_month
    }

    /// Row cost: worked days × daily rate.
    pub fn cost(&self) -> f64 {
        self.duration_days() * self.daily_rate
    }
}

/// Total cost across an estimation table.
pub fn estimation_total(rows: &[EstimationRow]) -> f64 {
    rows.iter().map(EstimationRow::cost).sum()
}

/// Outstanding revenue on a project: `max(0, budget_total − advance_paid)`.
/// Recomputed live as the advance changes; never negative.
pub fn revenue_remaining(budget_total: f64, advance_paid: f64) -> f64 {
    (budget_total - advance_paid).max(0.0)
}

/// Total for one document line.
pub fn line_total(quantity: f64, unit_price: f64) -> f64 {
    quantity * unit_price
}

/// A priced line as it appears on a quote or delivery note.
pub trait PricedLine {
    fn quantity(&self) -> f64;
    fn unit_price(&self) -> f64;

    fn total(&self) -> f64 {
        line_total(self.quantity(), self.unit_price())
    }
}

/// Subtotal of a group of lines.
pub fn group_subtotal<L: PricedLine>(lines: &[L]) -> f64 {
    lines.iter().map(PricedLine::total).sum()
}

/// Document totals: one subtotal per group plus the ungrouped subtotal,
/// summed into the grand total.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentTotals {
    pub group_subtotals: Vec<f64>,
    pub ungrouped_subtotal: f64,
    pub grand_total: f64,
}

pub fn document_totals<L: PricedLine>(groups: &[Vec<L>], ungrouped: &[L]) -> DocumentTotals {
    let group_subtotals: Vec<f64> = groups.iter().map(|lines| group_subtotal(lines)).collect();
    let ungrouped_subtotal = group_subtotal(ungrouped);
    let grand_total = group_subtotals.iter().sum::<f64>() + ungrouped_subtotal;
    DocumentTotals {
        group_subtotals,
        ungrouped_subtotal,
        grand_total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    struct Line {
        quantity: f64,
        unit_price: f64,
    }

    impl PricedLine for Line {
        fn quantity(&self) -> f64 {
            self.quantity
        }
        fn unit_price(&self) -> f64 {
            self.unit_price
        }
    }

    #[test]
    fn leave_single_day_counts_one() {
        assert_eq!(leave_day_count(date(2024, 1, 1), date(2024, 1, 1)), 1);
    }

    #[test]
    fn leave_range_is_inclusive() {
        assert_eq!(leave_day_count(date(2024, 1, 1), date(2024, 1, 5)), 5);
    }

    #[test]
    fn leave_order_insensitive() {
        assert_eq!(leave_day_count(date(2024, 1, 5), date(2024, 1, 1)), 5);
    }

    #[test]
    fn leave_spans_month_boundary() {
        assert_eq!(leave_day_count(date(2024, 1, 30), date(2024, 2, 2)), 4);
    }

    #[test]
    fn estimation_row_reference_case() {
        let row = EstimationRow {
            id: None,
            function: "developer".to_string(),
            headcount: 2.0,
            allocation_pct: 50.0,
            duration_months: 3.0,
            days_per_month: 26.0,
            daily_rate: 200.0,
        };
        assert_eq!(row.duration_days(), 78.0);
        assert_eq!(row.cost(), 15_600.0);
    }

    #[test]
    fn estimation_blank_row_defaults() {
        let row = EstimationRow::blank();
        assert_eq!(row.headcount, 1.0);
        assert_eq!(row.allocation_pct, 100.0);
        assert_eq!(row.duration_months, 1.0);
        assert_eq!(row.days_per_month, 26.0);
        assert_eq!(row.cost(), 0.0);
    }

    #[test]
    fn estimation_total_sums_rows() {
        let rows = vec![
            EstimationRow {
                daily_rate: 100.0,
                ..EstimationRow::blank()
            },
            EstimationRow {
                daily_rate: 50.0,
                ..EstimationRow::blank()
            },
        ];
        // each blank row works 26 days
        assert_eq!(estimation_total(&rows), 26.0 * 150.0);
    }

    #[test]
    fn revenue_remaining_clamps_at_zero() {
        assert_eq!(revenue_remaining(1000.0, 1500.0), 0.0);
    }

    #[test]
    fn revenue_remaining_simple() {
        assert_eq!(revenue_remaining(1000.0, 250.0), 750.0);
    }

    #[test]
    fn document_totals_sum_groups_and_ungrouped() {
        let groups = vec![
            vec![
                Line { quantity: 2.0, unit_price: 10.0 },
                Line { quantity: 1.0, unit_price: 5.0 },
            ],
            vec![Line { quantity: 3.0, unit_price: 4.0 }],
        ];
        let ungrouped = vec![Line { quantity: 1.0, unit_price: 7.5 }];
        let totals = document_totals(&groups, &ungrouped);
        assert_eq!(totals.group_subtotals, vec![25.0, 12.0]);
        assert_eq!(totals.ungrouped_subtotal, 7.5);
        assert_eq!(totals.grand_total, 44.5);
    }
}
