//! Budget: employees, general expenses and labour costs.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::http::HttpClient;
use crate::sync::{Mutation, QueryHandle, QueryKey, QueryStore};

const EMPLOYEES_PATH: &str = "/budget/employees/";
const EXPENSES_PATH: &str = "/budget/general-expenses/";
const LABOUR_PATH: &str = "/budget/labour-costs/";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    pub id: i64,
    pub last_name: String,
    pub first_name: String,
    pub phone: String,
    pub national_id: String,
    pub start_date: NaiveDate,
    pub weekly_salary: f64,
    pub function: String,
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmployeeInput {
    pub last_name: String,
    pub first_name: String,
    pub phone: String,
    pub national_id: String,
    pub start_date: NaiveDate,
    pub weekly_salary: f64,
    pub function: String,
    pub kind: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExpenseCategory {
    Transport,
    Fuel,
    Logistics,
    Office,
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralExpense {
    pub id: i64,
    pub label: String,
    pub amount: f64,
    pub date: NaiveDate,
    pub category: ExpenseCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralExpenseInput {
    pub label: String,
    pub amount: f64,
    pub date: NaiveDate,
    pub category: ExpenseCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabourCost {
    pub id: i64,
    pub project: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    pub label: String,
    pub amount: f64,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabourCostInput {
    pub project: i64,
    pub label: String,
    pub amount: f64,
    pub date: NaiveDate,
}

/// Monthly expense dashboard summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseSummary {
    #[serde(default)]
    pub suppliers_total: f64,
    #[serde(default)]
    pub labor_total: f64,
    #[serde(default)]
    pub general_total: f64,
    #[serde(default)]
    pub grand_total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseDashboard {
    pub summary: ExpenseSummary,
}

/// Scoped accessor for `/budget/`.
pub struct BudgetApi {
    http: Arc<HttpClient>,
    store: QueryStore,
}

impl BudgetApi {
    pub(crate) fn new(http: Arc<HttpClient>, store: QueryStore) -> Self {
        Self { http, store }
    }

    pub fn employees_key() -> QueryKey {
        QueryKey::new("budget-employees")
    }

    /// Expense keys are parameterised by month; invalidation uses the
    /// bare prefix to hit every cached month at once.
    pub fn expenses_prefix() -> QueryKey {
        QueryKey::new("general-expenses")
    }

    pub fn expenses_key(year: i32, month: u32) -> QueryKey {
        Self::expenses_prefix().with(year as i64).with(month as i64)
    }

    pub fn labour_key() -> QueryKey {
        QueryKey::new("labour-costs")
    }

    pub fn watch_employees(&self) -> QueryHandle<Vec<Employee>> {
        let http = Arc::clone(&self.http);
        self.store.watch(Self::employees_key(), move || {
            let http = Arc::clone(&http);
            async move { http.get_list(EMPLOYEES_PATH).await }
        })
    }

    pub fn watch_expenses(&self, year: i32, month: u32) -> QueryHandle<Vec<GeneralExpense>> {
        let http = Arc::clone(&self.http);
        self.store.watch(Self::expenses_key(year, month), move || {
            let http = Arc::clone(&http);
            async move {
                http.get_list(&format!("{EXPENSES_PATH}?year={year}&month={month}"))
                    .await
            }
        })
    }

    pub fn watch_expense_dashboard(&self, year: i32, month: u32) -> QueryHandle<ExpenseDashboard> {
        let http = Arc::clone(&self.http);
        let key = QueryKey::new("expense-dashboard")
            .with(year as i64)
            .with(month as i64);
        self.store.watch(key, move || {
            let http = Arc::clone(&http);
            async move {
                http.get_json(&format!(
                    "{EXPENSES_PATH}monthly-dashboard/?year={year}&month={month}"
                ))
                .await
            }
        })
    }

    pub fn watch_labour_costs(&self) -> QueryHandle<Vec<LabourCost>> {
        let http = Arc::clone(&self.http);
        self.store.watch(Self::labour_key(), move || {
            let http = Arc::clone(&http);
            async move { http.get_list(LABOUR_PATH).await }
        })
    }

    pub async fn create_employee(&self, input: EmployeeInput) -> Result<Employee> {
        let http = Arc::clone(&self.http);
        Mutation::new(self.store.clone(), move |input: EmployeeInput| {
            let http = Arc::clone(&http);
            async move { http.post_json(EMPLOYEES_PATH, &input).await }
        })
        .invalidates(Self::employees_key())
        .dispatch(input)
        .await
    }

    pub async fn update_employee(&self, id: i64, input: EmployeeInput) -> Result<Employee> {
        let http = Arc::clone(&self.http);
        Mutation::new(self.store.clone(), move |(id, input): (i64, EmployeeInput)| {
            let http = Arc::clone(&http);
            async move { http.put_json(&format!("{EMPLOYEES_PATH}{id}/"), &input).await }
        })
        .invalidates(Self::employees_key())
        .dispatch((id, input))
        .await
    }

    pub async fn delete_employee(&self, id: i64) -> Result<()> {
        let http = Arc::clone(&self.http);
        Mutation::new(self.store.clone(), move |id: i64| {
            let http = Arc::clone(&http);
            async move { http.delete(&format!("{EMPLOYEES_PATH}{id}/")).await }
        })
        .invalidates(Self::employees_key())
        .dispatch(id)
        .await
    }

    /// Create or update an expense; every cached month refetches.
    pub async fn save_expense(
        &self,
        id: Option<i64>,
        input: GeneralExpenseInput,
    ) -> Result<GeneralExpense> {
        let http = Arc::clone(&self.http);
        Mutation::new(
            self.store.clone(),
            move |(id, input): (Option<i64>, GeneralExpenseInput)| {
                let http = Arc::clone(&http);
                async move {
                    match id {
                        Some(id) => http.put_json(&format!("{EXPENSES_PATH}{id}/"), &input).await,
                        None => http.post_json(EXPENSES_PATH, &input).await,
                    }
                }
            },
        )
        .invalidates_prefix(Self::expenses_prefix())
        .invalidates_prefix(QueryKey::new("expense-dashboard"))
        .dispatch((id, input))
        .await
    }

    pub async fn create_labour_cost(&self, input: LabourCostInput) -> Result<LabourCost> {
        let http = Arc::clone(&self.http);
        Mutation::new(self.store.clone(), move |input: LabourCostInput| {
            let http = Arc::clone(&http);
            async move { http.post_json(LABOUR_PATH, &input).await }
        })
        .invalidates(Self::labour_key())
        .invalidates_prefix(QueryKey::new("expense-dashboard"))
        .dispatch(input)
        .await
    }

    pub async fn delete_labour_cost(&self, id: i64) -> Result<()> {
        let http = Arc::clone(&self.http);
        Mutation::new(self.store.clone(), move |id: i64| {
            let http = Arc::clone(&http);
            async move { http.delete(&format!("{LABOUR_PATH}{id}/")).await }
        })
        .invalidates(Self::labour_key())
        .invalidates_prefix(QueryKey::new("expense-dashboard"))
        .dispatch(id)
        .await
    }

    pub async fn delete_expense(&self, id: i64) -> Result<()> {
        let http = Arc::clone(&self.http);
        Mutation::new(self.store.clone(), move |id: i64| {
            let http = Arc::clone(&http);
            async move { http.delete(&format!("{EXPENSES_PATH}{id}/")).await }
        })
        .invalidates_prefix(Self::expenses_prefix())
        .invalidates_prefix(QueryKey::new("expense-dashboard"))
        .dispatch(id)
        .await
    }
}
