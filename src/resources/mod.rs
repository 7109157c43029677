//! Typed resource APIs, one module per backend domain.
//!
//! Each accessor pairs the serde DTOs with the query keys its reads
//! live under and the invalidation set each write declares. The
//! dependency graph between writes and reads is enumerated here, per
//! mutation, and nowhere else.

mod budget;
mod clients;
mod dashboard;
mod documents;
mod hr;
mod invoices;
mod notifications;
mod payroll;
mod projects;
mod quotes;
mod suppliers;
mod tracking;
mod users;

pub use budget::{
    BudgetApi, Employee, EmployeeInput, ExpenseCategory, ExpenseDashboard, ExpenseSummary,
    GeneralExpense, GeneralExpenseInput, LabourCost, LabourCostInput,
};
pub use clients::{Client, ClientInput, ClientKind, ClientStatus, ClientsApi};
pub use dashboard::{DashboardApi, DashboardKpis, MonthlyPoint};
pub use documents::{Document, DocumentUpload, DocumentsApi};
pub use hr::HrEstimationApi;
pub use invoices::{Invoice, InvoiceInput, InvoicesApi};
pub use notifications::{Notification, NotificationKind, NotificationsApi};
pub use payroll::{
    Leave, LeaveInput, PayrollApi, SalaryPeriod, SalaryPeriodDetail, SalaryPeriodInput,
};
pub use projects::{Project, ProjectInput, ProjectsApi, RevenueUpdate};
pub use quotes::{
    Quote, QuoteGroup, QuoteGroupInput, QuoteInput, QuoteLine, QuoteLineInput, QuotesApi,
};
pub use suppliers::{
    PaymentStatus, Supplier, SupplierInput, SupplierInvoice, SupplierInvoiceInput, SupplierKind,
    SuppliersApi,
};
pub use tracking::{QuoteTracking, TrackingApi, TrackingLine, TrackingLineInput};
pub use users::{UserAccount, UserInput, UsersApi};
