use crate::error::{CoreError, CoreResult};
use crate::oracle::interface::OracleFailure;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub const MAX_VENDORS: usize = 6;

/// Country picker placeholder; counts as "no country chosen".
pub const COUNTRY_NOT_SPECIFIED: &str = "Not Specified";

/// One vendor slot of the comparison form. Every field may be blank while the user is still
/// filling the form in.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct VendorInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub coo: Option<String>,
    #[serde(default)]
    pub unit_cost: Option<f64>,
    #[serde(default)]
    pub spi_applicable: bool,
}

impl VendorInput {
    /// Complete = vendor country, country of origin and unit cost are all present.
    pub fn is_complete(&self) -> bool {
        country_present(self.country.as_deref())
            && country_present(self.coo.as_deref())
            && self.unit_cost.is_some()
    }
}

fn country_present(v: Option<&str>) -> bool {
    match v.map(str::trim) {
        Some(c) => !c.is_empty() && c != COUNTRY_NOT_SPECIFIED,
        None => false,
    }
}

/// Shared order fields plus up to [`MAX_VENDORS`] vendor slots.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComparisonRequest {
    pub quantity: u32,
    pub hs_code: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import_country: Option<String>,
    pub vendors: Vec<VendorInput>,
}

impl ComparisonRequest {
    pub fn validate(&self) -> CoreResult<()> {
        if self.vendors.len() > MAX_VENDORS {
            return Err(CoreError::InvalidInput(format!(
                "at most {} vendors can be compared, got {}",
                MAX_VENDORS,
                self.vendors.len()
            )));
        }
        Ok(())
    }

    /// Complete vendors in form order, paired with their 1-based slot id.
    pub fn complete_vendors(&self) -> Vec<(u32, &VendorInput)> {
        self.vendors
            .iter()
            .enumerate()
            .filter(|(_, v)| v.is_complete())
            .map(|(idx, v)| (idx as u32 + 1, v))
            .collect()
    }
}

/// A duty line exactly as the oracle reported it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawDutyEntry {
    #[serde(rename = "type")]
    pub duty_type: String,
    pub description: String,
    pub rate: f64,
}

/// Rate cell of the aligned table. `NotApplicable` serializes as `null`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum DutyRate {
    Rate(f64),
    NotApplicable,
}

impl DutyRate {
    pub fn value(&self) -> Option<f64> {
        match self {
            DutyRate::Rate(r) => Some(*r),
            DutyRate::NotApplicable => None,
        }
    }

    pub fn is_applicable(&self) -> bool {
        matches!(self, DutyRate::Rate(_))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NormalizedDuty {
    #[serde(rename = "type")]
    pub duty_type: String,
    pub label: String,
    pub rate: DutyRate,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CostTotals {
    pub customs_value: f64,
    pub total_duty_rate: f64,
    pub total_duty_amount: f64,
    pub total_cost: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum VendorStatus {
    Success,
    Failed(OracleFailure),
}

impl VendorStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, VendorStatus::Success)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VendorResult {
    pub vendor_id: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub country: String,
    pub coo: String,
    pub unit_cost: f64,
    /// Aligned with the comparison's duty schema, position for position.
    pub duties: Vec<NormalizedDuty>,
    /// `None` for failed vendors.
    pub totals: Option<CostTotals>,
    pub status: VendorStatus,
    /// 0 = cheapest, 1 = most expensive. `None` for failed vendors.
    pub color_rank: Option<f64>,
    pub is_cheapest: bool,
}

/// Raw oracle traffic kept for inspection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OracleTraffic {
    pub request_payload: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<OracleFailure>,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComparisonResult {
    pub comparison_id: String,
    pub quantity: u32,
    pub schema: super::schema::DutySchema,
    pub vendors: Vec<VendorResult>,
    /// Keyed by vendor id.
    pub traffic: BTreeMap<u32, OracleTraffic>,
}

impl ComparisonResult {
    pub fn empty(comparison_id: String, quantity: u32) -> Self {
        Self {
            comparison_id,
            quantity,
            schema: super::schema::DutySchema::default(),
            vendors: Vec::new(),
            traffic: BTreeMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.vendors.is_empty()
    }

    pub fn cheapest_vendor_ids(&self) -> Vec<u32> {
        self.vendors
            .iter()
            .filter(|v| v.is_cheapest)
            .map(|v| v.vendor_id)
            .collect()
    }
}
