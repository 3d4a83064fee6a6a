//! Typed backend endpoints.
//!
//! Each method maps one backend route to its request and response schema.
//! Report routes are scoped to a company and, where the report is dated, an
//! `asOfDate` query parameter (`YYYY-MM-DD`).

use chrono::NaiveDate;
use http::Method;

use crate::error::ApiError;

use super::client::ApiClient;
use super::models::{
    ApAging, BalanceDetail, BalanceSheet, Employee, EmployeeDraft, InventoryValuation, Invoice,
    InvoiceDraft, Payment, PaymentDraft, PaymentMethod, StockTakeSheet,
};

fn segment(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

fn as_of(date: NaiveDate) -> [(&'static str, String); 1] {
    [("asOfDate", date.format("%Y-%m-%d").to_string())]
}

impl ApiClient {
    // =========================================================================
    // Reference data
    // =========================================================================

    pub async fn payment_methods(&self) -> Result<Vec<PaymentMethod>, ApiError> {
        self.get_json("/getPaymentMethods", &[]).await
    }

    // =========================================================================
    // Employees
    // =========================================================================

    pub async fn list_employees(&self) -> Result<Vec<Employee>, ApiError> {
        self.get_json("/api/employees", &[]).await
    }

    pub async fn get_employee(&self, id: i64) -> Result<Employee, ApiError> {
        self.get_json(&format!("/api/employees/{}", id), &[]).await
    }

    pub async fn create_employee(&self, draft: &EmployeeDraft) -> Result<Employee, ApiError> {
        self.send_json(Method::POST, "/api/employees", draft).await
    }

    pub async fn update_employee(
        &self,
        id: i64,
        draft: &EmployeeDraft,
    ) -> Result<Employee, ApiError> {
        self.send_json(Method::PUT, &format!("/api/employees/{}", id), draft)
            .await
    }

    pub async fn delete_employee(&self, id: i64) -> Result<(), ApiError> {
        self.delete(&format!("/api/employees/{}", id)).await
    }

    // =========================================================================
    // Invoices and payments
    // =========================================================================

    pub async fn list_invoices(&self, company_id: &str) -> Result<Vec<Invoice>, ApiError> {
        self.get_json(&format!("/api/invoices/{}", segment(company_id)), &[])
            .await
    }

    pub async fn get_invoice(&self, company_id: &str, id: i64) -> Result<Invoice, ApiError> {
        self.get_json(
            &format!("/api/invoices/{}/{}", segment(company_id), id),
            &[],
        )
        .await
    }

    pub async fn create_invoice(
        &self,
        company_id: &str,
        draft: &InvoiceDraft,
    ) -> Result<Invoice, ApiError> {
        self.send_json(
            Method::POST,
            &format!("/api/invoices/{}", segment(company_id)),
            draft,
        )
        .await
    }

    pub async fn list_payments(&self, company_id: &str) -> Result<Vec<Payment>, ApiError> {
        self.get_json(&format!("/api/payments/{}", segment(company_id)), &[])
            .await
    }

    pub async fn record_payment(
        &self,
        company_id: &str,
        draft: &PaymentDraft,
    ) -> Result<Payment, ApiError> {
        self.send_json(
            Method::POST,
            &format!("/api/payments/{}", segment(company_id)),
            draft,
        )
        .await
    }

    // =========================================================================
    // Reports
    // =========================================================================

    pub async fn balance_sheet(
        &self,
        company_id: &str,
        as_of_date: NaiveDate,
    ) -> Result<BalanceSheet, ApiError> {
        self.get_json(
            &format!("/api/balance-sheet/{}", segment(company_id)),
            &as_of(as_of_date),
        )
        .await
    }

    pub async fn inventory_valuation(
        &self,
        company_id: &str,
        as_of_date: NaiveDate,
    ) -> Result<InventoryValuation, ApiError> {
        self.get_json(
            &format!("/api/inventory-valuation/{}", segment(company_id)),
            &as_of(as_of_date),
        )
        .await
    }

    /// Current stock-take worksheet; it is always as of now.
    pub async fn stock_take(&self, company_id: &str) -> Result<StockTakeSheet, ApiError> {
        self.get_json(&format!("/api/stock-take/{}", segment(company_id)), &[])
            .await
    }

    pub async fn ap_aging(
        &self,
        company_id: &str,
        as_of_date: NaiveDate,
    ) -> Result<ApAging, ApiError> {
        self.get_json(
            &format!("/api/ap-aging/{}", segment(company_id)),
            &as_of(as_of_date),
        )
        .await
    }

    pub async fn customer_balance_detail(
        &self,
        company_id: &str,
        customer_id: i64,
        as_of_date: NaiveDate,
    ) -> Result<BalanceDetail, ApiError> {
        self.get_json(
            &format!(
                "/api/customer-balance-detail/{}/{}",
                segment(company_id),
                customer_id
            ),
            &as_of(as_of_date),
        )
        .await
    }

    pub async fn supplier_balance_detail(
        &self,
        company_id: &str,
        supplier_id: i64,
        as_of_date: NaiveDate,
    ) -> Result<BalanceDetail, ApiError> {
        self.get_json(
            &format!(
                "/api/supplier-balance-detail/{}/{}",
                segment(company_id),
                supplier_id
            ),
            &as_of(as_of_date),
        )
        .await
    }
}
