//! Census row model and household-key derivation.
//!
//! # Responsibility
//! - Mirror the `Census` table shape used by the reconciliation engines.
//! - Derive the canonical household key from one row.
//!
//! # Invariants
//! - Key derivation is pure and total: a row missing any key field yields
//!   `None` and is skipped by every engine, never treated as an error.

use crate::model::resgroup::HouseholdKey;
use serde::{Deserialize, Serialize};

/// One person observed in one census year at one dwelling.
///
/// Created and edited by the census-entry tooling; the reconciliation
/// engines read the key columns and write `res_group_id` only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CensusRow {
    pub id: i64,
    pub person_id: i64,
    pub census_year: Option<i64>,
    pub township_id: Option<i64>,
    /// Dwelling number within the township, as written on the census sheet.
    pub dwelling_num: Option<i64>,
    /// Household number within the dwelling.
    pub household_num: Option<i64>,
    /// Link to the canonical residency group, maintained by the engines.
    pub res_group_id: Option<i64>,
}

impl CensusRow {
    /// Derives the household key identifying this row's residency group.
    ///
    /// Returns `None` when any of the four key fields is missing.
    pub fn household_key(&self) -> Option<HouseholdKey> {
        Some(HouseholdKey {
            year: self.census_year?,
            township_id: self.township_id?,
            dwelling_num: self.dwelling_num?,
            household_num: self.household_num?,
        })
    }

    /// Returns whether this row carries all four household key fields.
    pub fn has_household_key(&self) -> bool {
        self.census_year.is_some()
            && self.township_id.is_some()
            && self.dwelling_num.is_some()
            && self.household_num.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::CensusRow;
    use crate::model::resgroup::HouseholdKey;

    fn keyed_row() -> CensusRow {
        CensusRow {
            id: 1,
            person_id: 10,
            census_year: Some(1900),
            township_id: Some(3),
            dwelling_num: Some(5),
            household_num: Some(2),
            res_group_id: None,
        }
    }

    #[test]
    fn household_key_uses_all_four_fields() {
        let key = keyed_row().household_key().expect("complete row has a key");
        assert_eq!(
            key,
            HouseholdKey {
                year: 1900,
                township_id: 3,
                dwelling_num: 5,
                household_num: 2,
            }
        );
    }

    #[test]
    fn household_key_is_none_when_any_field_is_missing() {
        for strip in 0..4 {
            let mut row = keyed_row();
            match strip {
                0 => row.census_year = None,
                1 => row.township_id = None,
                2 => row.dwelling_num = None,
                _ => row.household_num = None,
            }
            assert!(row.household_key().is_none());
            assert!(!row.has_household_key());
        }
    }
}
