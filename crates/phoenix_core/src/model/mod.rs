//! Domain model for census-derived residency data.
//!
//! # Responsibility
//! - Define the canonical structures shared by the reconciliation engines.
//! - Keep household-identity derivation in one place.
//!
//! # Invariants
//! - A `HouseholdKey` identifies at most one `ResGroup` at any time.
//! - `Census.res_group_id` is mutable by the reconciliation engines only.

pub mod census;
pub mod resgroup;
