//! Residency group model.
//!
//! # Responsibility
//! - Define the canonical household unit and its membership edge.
//!
//! # Invariants
//! - The household key 4-tuple is unique across all residency groups.
//! - `member_order`, when present, should be unique within a group
//!   (checked by verification, not enforced on write).

use serde::{Deserialize, Serialize};

/// Canonical identity of a household instance: one dwelling and household
/// number within one township in one census year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HouseholdKey {
    pub year: i64,
    pub township_id: i64,
    pub dwelling_num: i64,
    pub household_num: i64,
}

/// Canonical record of a household unit at a census moment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResGroup {
    pub id: i64,
    pub year: i64,
    pub township_id: i64,
    pub dwelling_num: i64,
    pub household_num: i64,
    /// Provenance tag, e.g. `"Census"`.
    pub event_type: String,
    pub notes: Option<String>,
}

impl ResGroup {
    /// Returns the household key identifying this group.
    pub fn household_key(&self) -> HouseholdKey {
        HouseholdKey {
            year: self.year,
            township_id: self.township_id,
            dwelling_num: self.dwelling_num,
            household_num: self.household_num,
        }
    }
}

/// Membership edge linking a person to a residency group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResGroupMember {
    pub res_group_id: i64,
    pub person_id: i64,
    /// Ordinal position within the household, when recorded.
    pub member_order: Option<i64>,
}
