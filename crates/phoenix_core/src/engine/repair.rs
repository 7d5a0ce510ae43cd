//! Incremental repair of census-to-group links.
//!
//! # Responsibility
//! - Re-derive the correct group id for every keyed census row through the
//!   resolver and patch only the rows whose stored link disagrees.
//!
//! # Invariants
//! - Non-destructive: never deletes groups or memberships.
//! - Idempotent: a second run over an unchanged census writes nothing.
//! - The whole scan-and-fix pass is one transaction; any error rolls back
//!   every pending fix.

use crate::engine::verify::{verify_residency_integrity, VerificationReport};
use crate::engine::{EngineResult, EVENT_TYPE_CENSUS};
use crate::repo::census_repo::{CensusRepository, SqliteCensusRepository};
use crate::repo::resgroup_repo::{ResGroupRepository, SqliteResGroupRepository};
use log::info;
use rusqlite::Connection;
use serde::Serialize;
use std::time::Instant;

/// One corrected census link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepairFix {
    pub census_id: i64,
    /// The stale group id the row carried, or `None` when it was unlinked.
    pub previous: Option<i64>,
    pub assigned: i64,
}

/// Outcome of one repair pass, plus the closing verification.
#[derive(Debug, Clone, Serialize)]
pub struct RepairReport {
    /// Keyed census rows examined.
    pub rows_scanned: usize,
    pub fixes: Vec<RepairFix>,
    pub verification: VerificationReport,
}

impl RepairReport {
    pub fn rows_fixed(&self) -> usize {
        self.fixes.len()
    }
}

/// Reconciles every keyed census row's `res_group_id` against the resolver,
/// patching only mismatches, then verifies the result.
pub fn repair_residency_links(conn: &mut Connection) -> EngineResult<RepairReport> {
    let started_at = Instant::now();
    info!("event=repair module=repair status=start");

    let (rows_scanned, fixes) = {
        let tx = conn.transaction()?;
        let outcome = run_repair_pass(&tx)?;
        tx.commit()?;
        outcome
    };

    let verification = verify_residency_integrity(conn)?;

    info!(
        "event=repair module=repair status=ok duration_ms={} scanned={} fixed={} anomalies={}",
        started_at.elapsed().as_millis(),
        rows_scanned,
        fixes.len(),
        verification.total_anomalies()
    );

    Ok(RepairReport {
        rows_scanned,
        fixes,
        verification,
    })
}

fn run_repair_pass(conn: &Connection) -> EngineResult<(usize, Vec<RepairFix>)> {
    let census = SqliteCensusRepository::try_new(conn)?;
    let groups = SqliteResGroupRepository::try_new(conn)?;

    let rows = census.list_keyed_rows()?;
    let rows_scanned = rows.len();
    let mut fixes = Vec::new();

    for row in rows {
        let Some(key) = row.household_key() else {
            continue;
        };

        let assigned = groups.get_or_create_group(&key, EVENT_TYPE_CENSUS, None)?;
        if row.res_group_id == Some(assigned) {
            continue;
        }

        census.assign_res_group(row.id, assigned)?;
        match row.res_group_id {
            Some(previous) => info!(
                "event=repair_fix module=repair census_id={} old={previous} new={assigned}",
                row.id
            ),
            None => info!(
                "event=repair_fix module=repair census_id={} old=none new={assigned}",
                row.id
            ),
        }
        fixes.push(RepairFix {
            census_id: row.id,
            previous: row.res_group_id,
            assigned,
        });
    }

    Ok((rows_scanned, fixes))
}
