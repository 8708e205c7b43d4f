//! Row identity, row status, and the [`Record`] trait every list entity implements.

use crate::filter::FieldSpec;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Opaque row identifier assigned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowId(String);

impl RowId {
    pub fn new(id: impl Into<String>) -> Self {
        RowId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RowId {
    fn from(id: &str) -> Self {
        RowId(id.to_string())
    }
}

impl From<String> for RowId {
    fn from(id: String) -> Self {
        RowId(id)
    }
}

impl Borrow<str> for RowId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// The reversible activation status shared by every list entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RowStatus {
    #[serde(alias = "active", alias = "ACTIVE")]
    Active,
    #[serde(alias = "inactive", alias = "INACTIVE")]
    Inactive,
}

impl RowStatus {
    /// The status a toggle moves to.
    pub fn flipped(self) -> Self {
        match self {
            RowStatus::Active => RowStatus::Inactive,
            RowStatus::Inactive => RowStatus::Active,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RowStatus::Active => "Active",
            RowStatus::Inactive => "Inactive",
        }
    }
}

impl fmt::Display for RowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// An entity shown on a list screen.
///
/// Identity is [`id`](Record::id). Every other field may be replaced by server
/// truth on refetch, except [`status`](Record::status) while the row has a
/// toggle in flight. The constants describe the screen: which filter keys the
/// address may carry, which columns are displayed, and which curated subset
/// of fields goes into an export.
pub trait Record: Clone + Send + Sync + 'static {
    /// Allow-listed filter fields, in display order.
    const FILTERS: &'static [FieldSpec];
    /// Display column headers, matching [`cells`](Record::cells).
    const COLUMNS: &'static [&'static str];
    /// Export column headers, matching [`export_cells`](Record::export_cells).
    const EXPORT_COLUMNS: &'static [&'static str];

    fn id(&self) -> &RowId;
    fn status(&self) -> RowStatus;
    fn set_status(&mut self, status: RowStatus);

    /// Display values, one per entry in [`COLUMNS`](Record::COLUMNS).
    fn cells(&self) -> Vec<String>;

    /// Export values, one per entry in [`EXPORT_COLUMNS`](Record::EXPORT_COLUMNS).
    fn export_cells(&self) -> Vec<String>;
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_flips_both_ways() {
        assert_eq!(RowStatus::Active.flipped(), RowStatus::Inactive);
        assert_eq!(RowStatus::Inactive.flipped(), RowStatus::Active);
    }

    #[test]
    fn status_accepts_lowercase_wire_values() {
        let status: RowStatus = serde_json::from_str("\"inactive\"").unwrap();
        assert_eq!(status, RowStatus::Inactive);
        assert_eq!(serde_json::to_string(&RowStatus::Active).unwrap(), "\"Active\"");
    }

    #[test]
    fn row_id_is_transparent_on_the_wire() {
        let id: RowId = serde_json::from_str("\"g1\"").unwrap();
        assert_eq!(id.as_str(), "g1");
    }
}
