use once_cell::sync::Lazy;
use regex::Regex;

static ENGINE_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([A-Z][A-Za-z]*)_\d+\b").expect("static pattern"));

/// Replace engine-assigned suffixes of anonymous labels (`Aggregate_17`)
/// with `#`, so documents from runs with different ids can be compared.
/// Catalog names are left alone unless they look like `Kind_<digits>`.
pub fn normalize_labels(document: &str) -> String {
    ENGINE_ID.replace_all(document, "${1}_#").into_owned()
}
