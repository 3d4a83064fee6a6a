//! Response and request schemas for the backend API.
//!
//! Every payload the backend returns is decoded into one of these types at
//! the client boundary. A body that does not match is rejected as
//! [`crate::error::ApiError::MalformedResponse`] instead of flowing through
//! the views with missing fields.
//!
//! Monetary amounts are server-computed and displayed as-is, so they are
//! kept as `f64`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// =============================================================================
// Reference Data
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethod {
    pub id: i64,
    pub name: String,
}

// =============================================================================
// Employees
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub hire_date: Option<NaiveDate>,
    #[serde(default)]
    pub salary: Option<f64>,
}

impl Employee {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Editable employee fields, used for both create and update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeDraft {
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hire_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salary: Option<f64>,
}

impl From<&Employee> for EmployeeDraft {
    fn from(employee: &Employee) -> Self {
        Self {
            first_name: employee.first_name.clone(),
            last_name: employee.last_name.clone(),
            email: employee.email.clone(),
            phone: employee.phone.clone(),
            position: employee.position.clone(),
            hire_date: employee.hire_date,
            salary: employee.salary,
        }
    }
}

// =============================================================================
// Invoices and Payments
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Draft,
    Sent,
    Partial,
    Paid,
    Overdue,
    Void,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: i64,
    pub invoice_number: String,
    pub customer_name: String,
    pub issue_date: NaiveDate,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    pub total: f64,
    pub balance_due: f64,
    pub status: InvoiceStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceLine {
    pub description: String,
    pub quantity: f64,
    pub unit_price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceDraft {
    pub customer_id: i64,
    pub issue_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    pub lines: Vec<InvoiceLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: i64,
    #[serde(default)]
    pub invoice_id: Option<i64>,
    pub payment_date: NaiveDate,
    pub amount: f64,
    pub payment_method_id: i64,
    #[serde(default)]
    pub reference: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDraft {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_id: Option<i64>,
    pub payment_date: NaiveDate,
    pub amount: f64,
    pub payment_method_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

// =============================================================================
// Reports
// =============================================================================

/// One account line in a statement section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportLine {
    pub account: String,
    pub amount: f64,
}

/// A titled group of account lines with its server-computed total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSection {
    pub title: String,
    #[serde(default)]
    pub lines: Vec<ReportLine>,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceSheet {
    pub as_of_date: NaiveDate,
    pub assets: Vec<ReportSection>,
    pub liabilities: Vec<ReportSection>,
    pub equity: Vec<ReportSection>,
    pub total_assets: f64,
    pub total_liabilities: f64,
    pub total_equity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    pub sku: String,
    pub name: String,
    pub quantity_on_hand: f64,
    pub unit_cost: f64,
    pub total_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryValuation {
    pub as_of_date: NaiveDate,
    pub items: Vec<InventoryItem>,
    pub total_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockTakeLine {
    pub sku: String,
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
    pub expected_quantity: f64,
    /// Blank on the printed worksheet until counted
    #[serde(default)]
    pub counted_quantity: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockTakeSheet {
    pub items: Vec<StockTakeLine>,
}

/// Outstanding payables for one supplier, bucketed by days past due.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgingRow {
    pub supplier_name: String,
    pub current: f64,
    #[serde(rename = "days1To30")]
    pub days_1_to_30: f64,
    #[serde(rename = "days31To60")]
    pub days_31_to_60: f64,
    #[serde(rename = "days61To90")]
    pub days_61_to_90: f64,
    #[serde(rename = "over90")]
    pub over_90: f64,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApAging {
    pub as_of_date: NaiveDate,
    pub rows: Vec<AgingRow>,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceEntry {
    pub date: NaiveDate,
    pub transaction_type: String,
    #[serde(default)]
    pub reference: Option<String>,
    pub amount: f64,
    pub balance: f64,
}

/// Running balance for one customer or supplier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceDetail {
    pub entity_id: i64,
    pub entity_name: String,
    pub as_of_date: NaiveDate,
    pub entries: Vec<BalanceEntry>,
    pub closing_balance: f64,
}
