//! Census repository: reads key fields, writes `res_group_id` only.
//!
//! # Responsibility
//! - Provide the census-side queries the reconciliation engines run.
//! - Keep the engines' only census mutation (`res_group_id`) behind one API.
//!
//! # Invariants
//! - No other census column is ever written from this crate.
//! - Rows missing key fields are filtered by the queries, not errored on.

use crate::model::census::CensusRow;
use crate::model::resgroup::HouseholdKey;
use crate::repo::{ensure_schema_ready, RepoError, RepoResult, CENSUS_REQUIREMENT};
use rusqlite::{params, Connection, Row};

const CENSUS_SELECT_SQL: &str = "SELECT
    id,
    person_id,
    census_year,
    township_id,
    census_dwellnum,
    census_householdnum,
    res_group_id
FROM Census";

/// Census-side data access used by the reconciliation engines.
pub trait CensusRepository {
    /// Lists every census row carrying all four household key fields,
    /// in stable id order.
    fn list_keyed_rows(&self) -> RepoResult<Vec<CensusRow>>;

    /// Lists the distinct household keys present in the census, considering
    /// only rows where all four key fields are non-null.
    fn distinct_household_keys(&self) -> RepoResult<Vec<HouseholdKey>>;

    /// Points every census row matching `key` at the given group.
    /// Returns the number of rows updated.
    fn relink_household(&self, key: &HouseholdKey, res_group_id: i64) -> RepoResult<usize>;

    /// Points one census row at the given group.
    fn assign_res_group(&self, census_id: i64, res_group_id: i64) -> RepoResult<()>;
}

/// SQLite-backed census repository.
pub struct SqliteCensusRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCensusRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(conn, &[&CENSUS_REQUIREMENT])?;
        Ok(Self { conn })
    }
}

impl CensusRepository for SqliteCensusRepository<'_> {
    fn list_keyed_rows(&self) -> RepoResult<Vec<CensusRow>> {
        let mut stmt = self.conn.prepare(&format!(
            "{CENSUS_SELECT_SQL}
             WHERE census_year IS NOT NULL
               AND township_id IS NOT NULL
               AND census_dwellnum IS NOT NULL
               AND census_householdnum IS NOT NULL
             ORDER BY id ASC;"
        ))?;

        let mut rows = stmt.query([])?;
        let mut result = Vec::new();
        while let Some(row) = rows.next()? {
            result.push(parse_census_row(row)?);
        }

        Ok(result)
    }

    fn distinct_household_keys(&self) -> RepoResult<Vec<HouseholdKey>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT census_year, township_id, census_dwellnum, census_householdnum
             FROM Census
             WHERE census_year IS NOT NULL
               AND township_id IS NOT NULL
               AND census_dwellnum IS NOT NULL
               AND census_householdnum IS NOT NULL
             ORDER BY census_year, township_id, census_dwellnum, census_householdnum;",
        )?;

        let mut rows = stmt.query([])?;
        let mut keys = Vec::new();
        while let Some(row) = rows.next()? {
            keys.push(HouseholdKey {
                year: row.get(0)?,
                township_id: row.get(1)?,
                dwelling_num: row.get(2)?,
                household_num: row.get(3)?,
            });
        }

        Ok(keys)
    }

    fn relink_household(&self, key: &HouseholdKey, res_group_id: i64) -> RepoResult<usize> {
        let updated = self.conn.execute(
            "UPDATE Census
             SET res_group_id = ?1
             WHERE census_year = ?2
               AND township_id = ?3
               AND census_dwellnum = ?4
               AND census_householdnum = ?5;",
            params![
                res_group_id,
                key.year,
                key.township_id,
                key.dwelling_num,
                key.household_num,
            ],
        )?;

        Ok(updated)
    }

    fn assign_res_group(&self, census_id: i64, res_group_id: i64) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE Census SET res_group_id = ?1 WHERE id = ?2;",
            params![res_group_id, census_id],
        )?;

        if changed == 0 {
            return Err(RepoError::CensusRowNotFound(census_id));
        }

        Ok(())
    }
}

fn parse_census_row(row: &Row<'_>) -> RepoResult<CensusRow> {
    Ok(CensusRow {
        id: row.get("id")?,
        person_id: row.get("person_id")?,
        census_year: row.get("census_year")?,
        township_id: row.get("township_id")?,
        dwelling_num: row.get("census_dwellnum")?,
        household_num: row.get("census_householdnum")?,
        res_group_id: row.get("res_group_id")?,
    })
}
