//! Report kinds and display formatting.

use std::fmt;
use std::str::FromStr;

/// The financial reports the client can fetch and export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportKind {
    BalanceSheet,
    InventoryValuation,
    StockTake,
    ApAging,
    CustomerBalanceDetail,
    SupplierBalanceDetail,
}

impl ReportKind {
    pub const ALL: [ReportKind; 6] = [
        ReportKind::BalanceSheet,
        ReportKind::InventoryValuation,
        ReportKind::StockTake,
        ReportKind::ApAging,
        ReportKind::CustomerBalanceDetail,
        ReportKind::SupplierBalanceDetail,
    ];

    /// Stable identifier used in file names and on the command line.
    pub fn slug(self) -> &'static str {
        match self {
            ReportKind::BalanceSheet => "balance-sheet",
            ReportKind::InventoryValuation => "inventory-valuation",
            ReportKind::StockTake => "stock-take",
            ReportKind::ApAging => "ap-aging",
            ReportKind::CustomerBalanceDetail => "customer-balance-detail",
            ReportKind::SupplierBalanceDetail => "supplier-balance-detail",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            ReportKind::BalanceSheet => "Balance Sheet",
            ReportKind::InventoryValuation => "Inventory Valuation",
            ReportKind::StockTake => "Stock Take Worksheet",
            ReportKind::ApAging => "Accounts Payable Aging",
            ReportKind::CustomerBalanceDetail => "Customer Balance Detail",
            ReportKind::SupplierBalanceDetail => "Supplier Balance Detail",
        }
    }

    /// Whether the report is about a single customer or supplier.
    pub fn needs_entity(self) -> bool {
        matches!(
            self,
            ReportKind::CustomerBalanceDetail | ReportKind::SupplierBalanceDetail
        )
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for ReportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        ReportKind::ALL
            .into_iter()
            .find(|kind| kind.slug() == wanted)
            .ok_or_else(|| {
                let known: Vec<&str> = ReportKind::ALL.iter().map(|k| k.slug()).collect();
                format!("unknown report '{}' (expected one of: {})", s, known.join(", "))
            })
    }
}

/// Format an amount with two decimals and thousands separators.
///
/// `format_amount(-1234567.891)` gives `-1,234,567.89`.
pub fn format_amount(amount: f64) -> String {
    if !amount.is_finite() {
        return amount.to_string();
    }

    let cents = (amount.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();
    let fraction = cents % 100;

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
    format!("{}{}.{:02}", sign, grouped, fraction)
}
