//! Repository layer for the residency tables.
//!
//! # Responsibility
//! - Define data-access contracts used by the reconciliation engines.
//! - Isolate SQL details from engine orchestration.
//!
//! # Invariants
//! - Repository constructors are fallible and verify the connection's schema
//!   before any query runs.
//! - Repository APIs return semantic errors in addition to DB transport
//!   errors.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use rusqlite::Connection;
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod census_repo;
pub mod resgroup_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for residency persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    /// The connection has no applied migrations (`user_version` is zero).
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    CensusRowNotFound(i64),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version is {actual_version}, expected {expected_version}; \
                 open the database through db::open_db"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "required table `{table}` is missing")
            }
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "required column `{table}.{column}` is missing")
            }
            Self::CensusRowNotFound(id) => write!(f, "census row not found: {id}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// One table a repository depends on, with the columns it reads or writes.
pub(crate) struct TableRequirement {
    pub table: &'static str,
    pub columns: &'static [&'static str],
}

pub(crate) const CENSUS_REQUIREMENT: TableRequirement = TableRequirement {
    table: "Census",
    columns: &[
        "id",
        "person_id",
        "census_year",
        "township_id",
        "census_dwellnum",
        "census_householdnum",
        "res_group_id",
    ],
};

pub(crate) const RESGROUPS_REQUIREMENT: TableRequirement = TableRequirement {
    table: "ResGroups",
    columns: &[
        "res_group_id",
        "res_group_year",
        "township_id",
        "dwelling_num",
        "household_num",
        "event_type",
        "household_notes",
    ],
};

pub(crate) const RESGROUPMEMBERS_REQUIREMENT: TableRequirement = TableRequirement {
    table: "ResGroupMembers",
    columns: &["res_group_id", "res_group_member", "member_order"],
};

/// Verifies that the connection carries applied migrations and every
/// required table and column before a repository accepts it.
pub(crate) fn ensure_schema_ready(
    conn: &Connection,
    required: &[&TableRequirement],
) -> RepoResult<()> {
    let actual_version =
        conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    if actual_version == 0 {
        return Err(RepoError::UninitializedConnection {
            expected_version: latest_version(),
            actual_version,
        });
    }

    for requirement in required {
        let table_exists = conn.query_row(
            "SELECT EXISTS (SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1);",
            [requirement.table],
            |row| row.get::<_, bool>(0),
        )?;
        if !table_exists {
            return Err(RepoError::MissingRequiredTable(requirement.table));
        }

        let mut stmt = conn.prepare(&format!("PRAGMA table_info({});", requirement.table))?;
        let mut present = HashSet::new();
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            present.insert(row.get::<_, String>("name")?);
        }

        for column in requirement.columns {
            if !present.contains(*column) {
                return Err(RepoError::MissingRequiredColumn {
                    table: requirement.table,
                    column,
                });
            }
        }
    }

    Ok(())
}

/// Schema guard covering all three residency tables, for callers that query
/// across them without going through a single repository.
pub(crate) fn ensure_residency_schema(conn: &Connection) -> RepoResult<()> {
    ensure_schema_ready(
        conn,
        &[
            &CENSUS_REQUIREMENT,
            &RESGROUPS_REQUIREMENT,
            &RESGROUPMEMBERS_REQUIREMENT,
        ],
    )
}
