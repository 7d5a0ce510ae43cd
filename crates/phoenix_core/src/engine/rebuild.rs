//! Full rebuild of residency groups and memberships from census rows.
//!
//! # Responsibility
//! - Snapshot, clear, and regenerate `ResGroups` and `ResGroupMembers` so
//!   they exactly reflect the census household keys.
//!
//! # Invariants
//! - The destructive pass is all-or-nothing: any error rolls back and
//!   leaves the store in its pre-rebuild state.
//! - Backup snapshots commit before the destructive pass begins, so an
//!   aborted rebuild still leaves the snapshot behind.
//! - Group creation goes through the resolver, never through local key
//!   matching.

use crate::engine::verify::{verify_residency_integrity, VerificationReport};
use crate::engine::{EngineResult, EVENT_TYPE_CENSUS};
use crate::model::resgroup::HouseholdKey;
use crate::repo::census_repo::{CensusRepository, SqliteCensusRepository};
use crate::repo::ensure_residency_schema;
use crate::repo::resgroup_repo::{ResGroupRepository, SqliteResGroupRepository};
use log::info;
use rusqlite::Connection;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Instant;

/// Tables snapshotted into `*_backup` before the destructive pass.
const BACKUP_TABLES: &[&str] = &["ResGroups", "ResGroupMembers", "Census"];

const REBUILD_NOTES: &str = "Rebuilt from census records";

/// Counts from one completed rebuild run, plus the closing verification.
#[derive(Debug, Clone, Serialize)]
pub struct RebuildReport {
    /// Distinct household keys found, which equals the groups created.
    pub groups_created: usize,
    pub census_rows_relinked: usize,
    pub members_inserted: usize,
    pub verification: VerificationReport,
}

/// Wipes and regenerates all residency groups and memberships from census
/// rows, then verifies the result.
///
/// # Side effects
/// - Replaces the `*_backup` snapshot tables.
/// - Deletes and recreates every `ResGroups` and `ResGroupMembers` row.
pub fn rebuild_residency_groups(conn: &mut Connection) -> EngineResult<RebuildReport> {
    let started_at = Instant::now();
    info!("event=rebuild module=rebuild status=start");

    ensure_residency_schema(conn)?;
    snapshot_tables(conn)?;

    let (groups_created, census_rows_relinked, members_inserted) = {
        let tx = conn.transaction()?;
        let counts = run_rebuild_pass(&tx)?;
        tx.commit()?;
        counts
    };

    // Verification runs after commit; anomalies are part of the report,
    // not grounds for aborting a rebuild that already landed.
    let verification = verify_residency_integrity(conn)?;

    info!(
        "event=rebuild module=rebuild status=ok duration_ms={} groups={} relinked={} members={} anomalies={}",
        started_at.elapsed().as_millis(),
        groups_created,
        census_rows_relinked,
        members_inserted,
        verification.total_anomalies()
    );

    Ok(RebuildReport {
        groups_created,
        census_rows_relinked,
        members_inserted,
        verification,
    })
}

fn snapshot_tables(conn: &mut Connection) -> EngineResult<()> {
    let tx = conn.transaction()?;
    for table in BACKUP_TABLES {
        tx.execute_batch(&format!(
            "DROP TABLE IF EXISTS {table}_backup;
             CREATE TABLE {table}_backup AS SELECT * FROM {table};"
        ))?;
    }
    tx.commit()?;

    info!("event=rebuild_backup module=rebuild status=ok tables={}", BACKUP_TABLES.len());
    Ok(())
}

fn run_rebuild_pass(conn: &Connection) -> EngineResult<(usize, usize, usize)> {
    let census = SqliteCensusRepository::try_new(conn)?;
    let groups = SqliteResGroupRepository::try_new(conn)?;

    groups.clear_all()?;
    info!("event=rebuild_clear module=rebuild status=ok");

    let keys = census.distinct_household_keys()?;
    info!(
        "event=rebuild_groups module=rebuild status=start household_keys={}",
        keys.len()
    );

    // Key->id mapping scoped to this run. The store was just cleared, so the
    // resolver creates one group per distinct key.
    let mut group_ids: HashMap<HouseholdKey, i64> = HashMap::with_capacity(keys.len());
    for key in &keys {
        let id = groups.get_or_create_group(key, EVENT_TYPE_CENSUS, Some(REBUILD_NOTES))?;
        group_ids.insert(*key, id);
    }

    let mut census_rows_relinked = 0;
    for (key, id) in &group_ids {
        census_rows_relinked += census.relink_household(key, *id)?;
    }
    info!(
        "event=rebuild_relink module=rebuild status=ok updated={census_rows_relinked}"
    );

    let members_inserted = groups.insert_members_from_census()?;
    info!("event=rebuild_members module=rebuild status=ok inserted={members_inserted}");

    Ok((group_ids.len(), census_rows_relinked, members_inserted))
}
