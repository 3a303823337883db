//! Display names for the people and vehicles behind identifiers.

use tracing::debug;

use crate::records::{IdentifierKind, TrackingRecord};

/// Shown when no name is available.
pub const UNKNOWN_NAME: &str = "N/A";

/// Marker left behind by upstream mis-decoding of non-Latin names.
const CORRUPTION_MARKER: char = '?';

/// Resolves the name to show for a set of records.
///
/// Uses the `source` label of the first record in received order. A label
/// containing `?` is treated as corrupted and replaced with the generic
/// `Driver` / `Vehicle` name for `kind`.
pub fn resolve_display_name(records: &[TrackingRecord], kind: IdentifierKind) -> String {
    let Some(first) = records.first() else {
        return UNKNOWN_NAME.to_string();
    };

    match first.source.as_deref().filter(|s| !s.is_empty()) {
        None => UNKNOWN_NAME.to_string(),
        Some(name) if name.contains(CORRUPTION_MARKER) => {
            debug!(identifier = %first.identifier, name, "Replacing corrupted source label");
            kind.fallback_name().to_string()
        }
        Some(name) => name.to_string(),
    }
}

/// Name for the `all` view, e.g. `All Employees (12 total)`.
pub fn group_display_name(kind: IdentifierKind, count: usize) -> String {
    if count == 0 {
        format!("All {}", kind.plural_label())
    } else {
        format!("All {} ({} total)", kind.plural_label(), count)
    }
}
