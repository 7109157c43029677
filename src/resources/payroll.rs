//! Payroll: salary periods and leave records.
//!
//! Leave mutations invalidate both the open period and the period list:
//! the salary deduction is recomputed server-side and only becomes
//! visible through the refetch.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::finance::leave_day_count;
use crate::http::HttpClient;
use crate::sync::{Mutation, QueryHandle, QueryKey, QueryStore};

const PERIODS_PATH: &str = "/payroll/periods/";
const LEAVES_PATH: &str = "/payroll/leaves/";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalaryPeriod {
    pub id: i64,
    pub employee: i64,
    pub employee_name: String,
    pub employee_first_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub theoretical_salary: f64,
    pub total_deductions: f64,
    pub real_salary: f64,
}

/// A period expanded with its leave records (detail endpoint).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalaryPeriodDetail {
    #[serde(flatten)]
    pub period: SalaryPeriod,
    #[serde(default)]
    pub leaves: Vec<Leave>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leave {
    pub id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(rename = "type")]
    pub kind: String,
    /// Inclusive day count, computed client-side on creation.
    pub duration: i64,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalaryPeriodInput {
    pub employee: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub theoretical_salary: f64,
}

/// New leave as entered in the form; duration is derived, not typed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaveInput {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
struct LeavePayload {
    #[serde(flatten)]
    input: LeaveInput,
    duration: i64,
    employee: i64,
    salary_period: i64,
}

/// Scoped accessor for `/payroll/`.
pub struct PayrollApi {
    http: Arc<HttpClient>,
    store: QueryStore,
}

impl PayrollApi {
    pub(crate) fn new(http: Arc<HttpClient>, store: QueryStore) -> Self {
        Self { http, store }
    }

    pub fn periods_key() -> QueryKey {
        QueryKey::new("salary-periods")
    }

    pub fn period_key(period_id: i64) -> QueryKey {
        QueryKey::new("salary-period").with(period_id)
    }

    pub fn watch_periods(&self) -> QueryHandle<Vec<SalaryPeriod>> {
        let http = Arc::clone(&self.http);
        self.store.watch(Self::periods_key(), move || {
            let http = Arc::clone(&http);
            async move { http.get_list(PERIODS_PATH).await }
        })
    }

    pub fn watch_period(&self, period_id: i64) -> QueryHandle<SalaryPeriodDetail> {
        let http = Arc::clone(&self.http);
        self.store.watch(Self::period_key(period_id), move || {
            let http = Arc::clone(&http);
            async move { http.get_json(&format!("{PERIODS_PATH}{period_id}/")).await }
        })
    }

    pub async fn create_period(&self, input: SalaryPeriodInput) -> Result<SalaryPeriod> {
        let http = Arc::clone(&self.http);
        Mutation::new(self.store.clone(), move |input: SalaryPeriodInput| {
            let http = Arc::clone(&http);
            async move { http.post_json(PERIODS_PATH, &input).await }
        })
        .invalidates(Self::periods_key())
        .dispatch(input)
        .await
    }

    pub async fn delete_period(&self, period_id: i64) -> Result<()> {
        let http = Arc::clone(&self.http);
        Mutation::new(self.store.clone(), move |id: i64| {
            let http = Arc::clone(&http);
            async move { http.delete(&format!("{PERIODS_PATH}{id}/")).await }
        })
        .invalidates(Self::periods_key())
        .invalidates(Self::period_key(period_id))
        .dispatch(period_id)
        .await
    }

    /// Record a leave on a period. The inclusive duration is computed
    /// here; the deduction lands with the refetch.
    pub async fn create_leave(
        &self,
        period_id: i64,
        employee_id: i64,
        input: LeaveInput,
    ) -> Result<Leave> {
        let http = Arc::clone(&self.http);
        let duration = leave_day_count(input.start_date, input.end_date);
        let payload = LeavePayload {
            input,
            duration,
            employee: employee_id,
            salary_period: period_id,
        };
        Mutation::new(self.store.clone(), move |payload: LeavePayload| {
            let http = Arc::clone(&http);
            async move { http.post_json(LEAVES_PATH, &payload).await }
        })
        .invalidates(Self::period_key(period_id))
        .invalidates(Self::periods_key())
        .dispatch(payload)
        .await
    }

    pub async fn delete_leave(&self, period_id: i64, leave_id: i64) -> Result<()> {
        let http = Arc::clone(&self.http);
        Mutation::new(self.store.clone(), move |leave_id: i64| {
            let http = Arc::clone(&http);
            async move { http.delete(&format!("{LEAVES_PATH}{leave_id}/")).await }
        })
        .invalidates(Self::period_key(period_id))
        .invalidates(Self::periods_key())
        .dispatch(leave_id)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leave_payload_carries_computed_duration() {
        let input = LeaveInput {
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
            kind: "UNP".to_string(),
            reason: String::new(),
        };
        let payload = LeavePayload {
            duration: leave_day_count(input.start_date, input.end_date),
            input,
            employee: 3,
            salary_period: 9,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["duration"], 5);
        assert_eq!(json["type"], "UNP");
        assert_eq!(json["salary_period"], 9);
    }
}
