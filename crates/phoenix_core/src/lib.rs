//! Residency-group reconciliation for the phoenix records database.
//! This crate is the single source of truth for household-identity
//! invariants over the Census/ResGroups/ResGroupMembers tables.

pub mod db;
pub mod engine;
pub mod logging;
pub mod model;
pub mod repo;

pub use engine::rebuild::{rebuild_residency_groups, RebuildReport};
pub use engine::repair::{repair_residency_links, RepairFix, RepairReport};
pub use engine::verify::{
    verify_residency_integrity, Anomalies, DuplicateMemberOrder, MissingMembership,
    OrphanedMembership, UnlinkedCensusRow, VerificationReport, MAX_EXAMPLE_ROWS,
};
pub use engine::{EngineError, EngineResult, EVENT_TYPE_CENSUS};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::census::CensusRow;
pub use model::resgroup::{HouseholdKey, ResGroup, ResGroupMember};
pub use repo::census_repo::{CensusRepository, SqliteCensusRepository};
pub use repo::resgroup_repo::{ResGroupRepository, SqliteResGroupRepository};
pub use repo::{RepoError, RepoResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
