//! Read-only integrity audit over the residency tables.
//!
//! # Responsibility
//! - Run the four link-consistency checks and shape their results into a
//!   structured report for the caller to render or consume.
//!
//! # Invariants
//! - Never mutates state; safe to run standalone at any time.
//! - Checks are independent; one check's findings never block another.
//! - Anomalies are the report's content, never an error.

use crate::engine::EngineResult;
use crate::repo::ensure_residency_schema;
use log::info;
use rusqlite::Connection;
use serde::Serialize;

/// Example-row detail is capped per category; counts are not.
pub const MAX_EXAMPLE_ROWS: usize = 10;

/// One check's findings: the full count plus a capped list of examples.
#[derive(Debug, Clone, Serialize)]
pub struct Anomalies<T> {
    pub total: usize,
    /// At most [`MAX_EXAMPLE_ROWS`] entries.
    pub examples: Vec<T>,
}

impl<T> Anomalies<T> {
    fn from_rows(mut rows: Vec<T>) -> Self {
        let total = rows.len();
        rows.truncate(MAX_EXAMPLE_ROWS);
        Self {
            total,
            examples: rows,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

/// A keyed census row that no group has claimed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnlinkedCensusRow {
    pub census_id: i64,
    pub person_id: i64,
}

/// A linked census row with no matching membership edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingMembership {
    pub census_id: i64,
    pub person_id: i64,
    pub res_group_id: i64,
}

/// A membership edge with no census row behind it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrphanedMembership {
    pub res_group_id: i64,
    pub person_id: i64,
}

/// An ordinal shared by several members of the same group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateMemberOrder {
    pub res_group_id: i64,
    pub member_order: i64,
    pub member_count: i64,
}

/// Findings of one verification run, one field per check.
#[derive(Debug, Clone, Serialize)]
pub struct VerificationReport {
    pub unlinked_census_rows: Anomalies<UnlinkedCensusRow>,
    pub missing_memberships: Anomalies<MissingMembership>,
    pub orphaned_memberships: Anomalies<OrphanedMembership>,
    pub duplicate_member_orders: Anomalies<DuplicateMemberOrder>,
}

impl VerificationReport {
    pub fn is_clean(&self) -> bool {
        self.total_anomalies() == 0
    }

    pub fn total_anomalies(&self) -> usize {
        self.unlinked_census_rows.total
            + self.missing_memberships.total
            + self.orphaned_memberships.total
            + self.duplicate_member_orders.total
    }
}

/// Audits census/group/membership consistency without mutating anything.
pub fn verify_residency_integrity(conn: &Connection) -> EngineResult<VerificationReport> {
    ensure_residency_schema(conn)?;
    info!("event=verify module=verify status=start");

    let report = VerificationReport {
        unlinked_census_rows: Anomalies::from_rows(unlinked_census_rows(conn)?),
        missing_memberships: Anomalies::from_rows(missing_memberships(conn)?),
        orphaned_memberships: Anomalies::from_rows(orphaned_memberships(conn)?),
        duplicate_member_orders: Anomalies::from_rows(duplicate_member_orders(conn)?),
    };

    info!(
        "event=verify module=verify status=ok unlinked={} missing_members={} orphaned_members={} duplicate_orders={}",
        report.unlinked_census_rows.total,
        report.missing_memberships.total,
        report.orphaned_memberships.total,
        report.duplicate_member_orders.total
    );

    Ok(report)
}

/// Keyed census rows still waiting for a group link. Rows missing key
/// fields can never be linked and are not anomalies.
fn unlinked_census_rows(conn: &Connection) -> EngineResult<Vec<UnlinkedCensusRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, person_id
         FROM Census
         WHERE res_group_id IS NULL
           AND census_year IS NOT NULL
           AND township_id IS NOT NULL
           AND census_dwellnum IS NOT NULL
           AND census_householdnum IS NOT NULL
         ORDER BY id ASC;",
    )?;

    let mut rows = stmt.query([])?;
    let mut found = Vec::new();
    while let Some(row) = rows.next()? {
        found.push(UnlinkedCensusRow {
            census_id: row.get(0)?,
            person_id: row.get(1)?,
        });
    }

    Ok(found)
}

/// Left anti-join from census links to membership edges.
fn missing_memberships(conn: &Connection) -> EngineResult<Vec<MissingMembership>> {
    let mut stmt = conn.prepare(
        "SELECT c.id, c.person_id, c.res_group_id
         FROM Census c
         LEFT JOIN ResGroupMembers m
           ON m.res_group_id = c.res_group_id
          AND m.res_group_member = c.person_id
         WHERE c.res_group_id IS NOT NULL
           AND m.res_group_member IS NULL
         ORDER BY c.id ASC;",
    )?;

    let mut rows = stmt.query([])?;
    let mut found = Vec::new();
    while let Some(row) = rows.next()? {
        found.push(MissingMembership {
            census_id: row.get(0)?,
            person_id: row.get(1)?,
            res_group_id: row.get(2)?,
        });
    }

    Ok(found)
}

/// The inverse anti-join: membership edges with no census row behind them.
fn orphaned_memberships(conn: &Connection) -> EngineResult<Vec<OrphanedMembership>> {
    let mut stmt = conn.prepare(
        "SELECT m.res_group_id, m.res_group_member
         FROM ResGroupMembers m
         LEFT JOIN Census c
           ON c.res_group_id = m.res_group_id
          AND c.person_id = m.res_group_member
         WHERE c.id IS NULL
         ORDER BY m.res_group_id ASC, m.res_group_member ASC;",
    )?;

    let mut rows = stmt.query([])?;
    let mut found = Vec::new();
    while let Some(row) = rows.next()? {
        found.push(OrphanedMembership {
            res_group_id: row.get(0)?,
            person_id: row.get(1)?,
        });
    }

    Ok(found)
}

fn duplicate_member_orders(conn: &Connection) -> EngineResult<Vec<DuplicateMemberOrder>> {
    let mut stmt = conn.prepare(
        "SELECT res_group_id, member_order, COUNT(*)
         FROM ResGroupMembers
         WHERE member_order IS NOT NULL
         GROUP BY res_group_id, member_order
         HAVING COUNT(*) > 1
         ORDER BY res_group_id ASC, member_order ASC;",
    )?;

    let mut rows = stmt.query([])?;
    let mut found = Vec::new();
    while let Some(row) = rows.next()? {
        found.push(DuplicateMemberOrder {
            res_group_id: row.get(0)?,
            member_order: row.get(1)?,
            member_count: row.get(2)?,
        });
    }

    Ok(found)
}
