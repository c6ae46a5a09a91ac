use super::model::{DutyRate, NormalizedDuty, RawDutyEntry};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DutyColumn {
    #[serde(rename = "type")]
    pub duty_type: String,
    /// Label of the first vendor that reported this type.
    pub label: String,
}

/// Ordered union of duty types across one comparison's vendors.
///
/// Column order is first-seen: vendors in form order, each vendor's duties in the order the
/// oracle returned them. Submitting the same vendors in a different order can therefore give a
/// different column order; the table follows the form. Columns are keyed by type identifier,
/// so two types sharing a label stay separate columns.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DutySchema {
    columns: Vec<DutyColumn>,
}

impl DutySchema {
    pub fn unify<'a, I>(duty_lists: I) -> Self
    where
        I: IntoIterator<Item = &'a [RawDutyEntry]>,
    {
        let mut seen: HashSet<&'a str> = HashSet::new();
        let mut columns = Vec::new();
        for list in duty_lists {
            for duty in list {
                if seen.insert(duty.duty_type.as_str()) {
                    columns.push(DutyColumn {
                        duty_type: duty.duty_type.clone(),
                        label: duty.description.clone(),
                    });
                }
            }
        }
        Self { columns }
    }

    pub fn columns(&self) -> &[DutyColumn] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// One cell per column. A type the vendor did not report becomes `NotApplicable`; if the
    /// vendor reported a type twice, the first line wins.
    pub fn project(&self, duties: &[RawDutyEntry]) -> Vec<NormalizedDuty> {
        self.columns
            .iter()
            .map(|col| match duties.iter().find(|d| d.duty_type == col.duty_type) {
                Some(d) => NormalizedDuty {
                    duty_type: col.duty_type.clone(),
                    label: d.description.clone(),
                    rate: DutyRate::Rate(d.rate),
                },
                None => not_applicable(col),
            })
            .collect()
    }

    /// Row for a vendor whose oracle call failed.
    pub fn project_failed(&self) -> Vec<NormalizedDuty> {
        self.columns.iter().map(not_applicable).collect()
    }
}

fn not_applicable(col: &DutyColumn) -> NormalizedDuty {
    NormalizedDuty {
        duty_type: col.duty_type.clone(),
        label: col.label.clone(),
        rate: DutyRate::NotApplicable,
    }
}
