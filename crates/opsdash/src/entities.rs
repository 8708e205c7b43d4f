//! The entities behind each list screen.

use opsdash_list::{FieldSpec, Record, RowId, RowStatus};
use serde::{Deserialize, Serialize};

const STATUS_CHOICES: &[&str] = &["Active", "Inactive"];

fn or_dash(value: &Option<String>) -> String {
    value.clone().unwrap_or_else(|| "-".to_string())
}

/// Implements the identity and status accessors shared by every entity.
macro_rules! status_record {
    () => {
        fn id(&self) -> &RowId {
            &self.id
        }

        fn status(&self) -> RowStatus {
            self.status
        }

        fn set_status(&mut self, status: RowStatus) {
            self.status = status;
        }
    };
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: RowId,
    pub order_number: String,
    pub patient_name: String,
    #[serde(default)]
    pub facility: Option<String>,
    #[serde(default)]
    pub collected_on: Option<jiff::civil::Date>,
    pub status: RowStatus,
}

impl Record for Order {
    const FILTERS: &'static [FieldSpec] = &[
        FieldSpec::text("orderNumber", "Order #"),
        FieldSpec::text("patient", "Patient"),
        FieldSpec::date("from", "From"),
        FieldSpec::date("to", "To"),
        FieldSpec::choice("status", "Status", STATUS_CHOICES),
    ];
    const COLUMNS: &'static [&'static str] = &["Order #", "Patient", "Facility", "Collected"];
    const EXPORT_COLUMNS: &'static [&'static str] =
        &["Order #", "Patient", "Facility", "Collected", "Status"];

    status_record!();

    fn cells(&self) -> Vec<String> {
        vec![
            self.order_number.clone(),
            self.patient_name.clone(),
            or_dash(&self.facility),
            self.collected_on.map_or_else(|| "-".to_string(), |d| d.to_string()),
        ]
    }

    fn export_cells(&self) -> Vec<String> {
        let mut cells = self.cells();
        cells.push(self.status.to_string());
        cells
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: RowId,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: Option<String>,
    pub status: RowStatus,
}

impl Record for User {
    const FILTERS: &'static [FieldSpec] = &[
        FieldSpec::text("name", "Name"),
        FieldSpec::text("email", "Email"),
        FieldSpec::choice("role", "Role", &["Admin", "Staff", "Phlebotomist"]),
        FieldSpec::choice("status", "Status", STATUS_CHOICES),
    ];
    const COLUMNS: &'static [&'static str] = &["Name", "Email", "Role"];
    const EXPORT_COLUMNS: &'static [&'static str] = &["Name", "Email", "Status"];

    status_record!();

    fn cells(&self) -> Vec<String> {
        vec![self.name.clone(), self.email.clone(), or_dash(&self.role)]
    }

    fn export_cells(&self) -> Vec<String> {
        vec![self.name.clone(), self.email.clone(), self.status.to_string()]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Facility {
    pub id: RowId,
    pub name: String,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    pub status: RowStatus,
}

impl Record for Facility {
    const FILTERS: &'static [FieldSpec] = &[
        FieldSpec::text("name", "Name"),
        FieldSpec::text("city", "City"),
        FieldSpec::choice("status", "Status", STATUS_CHOICES),
    ];
    const COLUMNS: &'static [&'static str] = &["Name", "City", "Phone"];
    const EXPORT_COLUMNS: &'static [&'static str] = &["Name", "City", "Phone", "Status"];

    status_record!();

    fn cells(&self) -> Vec<String> {
        vec![self.name.clone(), or_dash(&self.city), or_dash(&self.phone)]
    }

    fn export_cells(&self) -> Vec<String> {
        let mut cells = self.cells();
        cells.push(self.status.to_string());
        cells
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tube {
    pub id: RowId,
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub volume_ml: Option<f64>,
    pub status: RowStatus,
}

impl Record for Tube {
    const FILTERS: &'static [FieldSpec] = &[
        FieldSpec::text("name", "Name"),
        FieldSpec::text("color", "Color"),
        FieldSpec::choice("status", "Status", STATUS_CHOICES),
    ];
    const COLUMNS: &'static [&'static str] = &["Name", "Color", "Volume (ml)"];
    const EXPORT_COLUMNS: &'static [&'static str] = &["Name", "Color", "Status"];

    status_record!();

    fn cells(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            or_dash(&self.color),
            self.volume_ml.map_or_else(|| "-".to_string(), |v| v.to_string()),
        ]
    }

    fn export_cells(&self) -> Vec<String> {
        vec![self.name.clone(), or_dash(&self.color), self.status.to_string()]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsuranceRecord {
    pub id: RowId,
    pub provider: String,
    pub policy_number: String,
    #[serde(default)]
    pub patient_name: Option<String>,
    #[serde(default)]
    pub valid_until: Option<jiff::civil::Date>,
    pub status: RowStatus,
}

impl Record for InsuranceRecord {
    const FILTERS: &'static [FieldSpec] = &[
        FieldSpec::text("provider", "Provider"),
        FieldSpec::text("policyNumber", "Policy #"),
        FieldSpec::date("validUntil", "Valid until"),
        FieldSpec::choice("status", "Status", STATUS_CHOICES),
    ];
    const COLUMNS: &'static [&'static str] = &["Provider", "Policy #", "Patient", "Valid until"];
    const EXPORT_COLUMNS: &'static [&'static str] = &["Provider", "Policy #", "Patient", "Status"];

    status_record!();

    fn cells(&self) -> Vec<String> {
        vec![
            self.provider.clone(),
            self.policy_number.clone(),
            or_dash(&self.patient_name),
            self.valid_until.map_or_else(|| "-".to_string(), |d| d.to_string()),
        ]
    }

    fn export_cells(&self) -> Vec<String> {
        vec![
            self.provider.clone(),
            self.policy_number.clone(),
            or_dash(&self.patient_name),
            self.status.to_string(),
        ]
    }
}
