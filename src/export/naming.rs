//! Output file names for exported reports.

use chrono::NaiveDate;

use crate::report::ReportKind;

/// Build the file name for an export:
/// `<report-slug>[_<entity>]_<YYYY-MM-DD>.pdf`.
///
/// The entity (a customer or supplier name) is reduced to ASCII
/// alphanumerics, with every other run of characters collapsed to one `-`.
/// An entity that reduces to nothing is omitted.
pub fn export_file_name(kind: ReportKind, as_of: NaiveDate, entity: Option<&str>) -> String {
    let date = as_of.format("%Y-%m-%d");
    match entity.map(sanitize).filter(|e| !e.is_empty()) {
        Some(entity) => format!("{}_{}_{}.pdf", kind.slug(), entity, date),
        None => format!("{}_{}.pdf", kind.slug(), date),
    }
}

fn sanitize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_dash = false;
    for c in raw.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(c);
        } else {
            pending_dash = true;
        }
    }
    out
}
