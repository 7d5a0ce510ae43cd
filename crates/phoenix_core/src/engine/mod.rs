//! Reconciliation engines over the residency tables.
//!
//! # Responsibility
//! - Orchestrate repository calls into the three maintenance entry points:
//!   rebuild, repair, verify.
//! - Own transaction boundaries: one transaction per mutating run, rollback
//!   on any error, no partial application.
//!
//! # Invariants
//! - Rebuild and repair both finish by running verification.
//! - Verification never mutates state and never fails on anomalies.

use crate::db::DbError;
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod rebuild;
pub mod repair;
pub mod verify;

/// Provenance tag stamped on groups created from census rows.
pub const EVENT_TYPE_CENSUS: &str = "Census";

pub type EngineResult<T> = Result<T, EngineError>;

/// Engine-level error for a failed maintenance run.
///
/// Integrity anomalies are never errors; they come back inside the
/// verification report.
#[derive(Debug)]
pub enum EngineError {
    Db(DbError),
    Repo(RepoError),
}

impl Display for EngineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for EngineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<DbError> for EngineError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<RepoError> for EngineError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<rusqlite::Error> for EngineError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}
