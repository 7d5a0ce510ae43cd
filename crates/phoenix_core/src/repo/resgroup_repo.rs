//! Residency group repository and the group resolver.
//!
//! # Responsibility
//! - Resolve household keys to group ids (`get_or_create_group`), the single
//!   implementation of "what counts as the same household".
//! - Provide the group/membership mutations the rebuild engine needs.
//!
//! # Invariants
//! - At most one group exists per household key; the resolver is idempotent
//!   and the store backs it with a unique key index.
//! - Groups are deleted only through `clear_all` (full rebuild).

use crate::model::resgroup::{HouseholdKey, ResGroup, ResGroupMember};
use crate::repo::{
    ensure_schema_ready, RepoResult, RESGROUPMEMBERS_REQUIREMENT, RESGROUPS_REQUIREMENT,
};
use rusqlite::{params, Connection, OptionalExtension, Row};

/// Group-side data access used by the reconciliation engines.
pub trait ResGroupRepository {
    /// Returns the id of the existing group matching `key`, or creates one
    /// and returns its id. `notes` is only written on creation.
    fn get_or_create_group(
        &self,
        key: &HouseholdKey,
        event_type: &str,
        notes: Option<&str>,
    ) -> RepoResult<i64>;

    /// Looks up the group id for a key without creating anything.
    fn find_group_id(&self, key: &HouseholdKey) -> RepoResult<Option<i64>>;

    fn get_group(&self, res_group_id: i64) -> RepoResult<Option<ResGroup>>;

    /// Lists the members of one group in stable person-id order.
    fn list_members(&self, res_group_id: i64) -> RepoResult<Vec<ResGroupMember>>;

    fn insert_member(&self, member: &ResGroupMember) -> RepoResult<()>;

    /// Inserts one membership edge per linked census row.
    /// Returns the number of rows inserted.
    fn insert_members_from_census(&self) -> RepoResult<usize>;

    /// Deletes all memberships, then all groups. Destructive; only the
    /// rebuild engine calls this, inside its transaction.
    fn clear_all(&self) -> RepoResult<()>;
}

/// SQLite-backed residency group repository.
pub struct SqliteResGroupRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteResGroupRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(conn, &[&RESGROUPS_REQUIREMENT, &RESGROUPMEMBERS_REQUIREMENT])?;
        Ok(Self { conn })
    }
}

impl ResGroupRepository for SqliteResGroupRepository<'_> {
    fn get_or_create_group(
        &self,
        key: &HouseholdKey,
        event_type: &str,
        notes: Option<&str>,
    ) -> RepoResult<i64> {
        if let Some(id) = self.find_group_id(key)? {
            return Ok(id);
        }

        self.conn.execute(
            "INSERT INTO ResGroups (
                res_group_year,
                township_id,
                dwelling_num,
                household_num,
                event_type,
                household_notes
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                key.year,
                key.township_id,
                key.dwelling_num,
                key.household_num,
                event_type,
                notes,
            ],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    fn find_group_id(&self, key: &HouseholdKey) -> RepoResult<Option<i64>> {
        let id = self
            .conn
            .query_row(
                "SELECT res_group_id
                 FROM ResGroups
                 WHERE res_group_year = ?1
                   AND township_id = ?2
                   AND dwelling_num = ?3
                   AND household_num = ?4;",
                params![key.year, key.township_id, key.dwelling_num, key.household_num],
                |row| row.get(0),
            )
            .optional()?;

        Ok(id)
    }

    fn get_group(&self, res_group_id: i64) -> RepoResult<Option<ResGroup>> {
        let group = self
            .conn
            .query_row(
                "SELECT
                    res_group_id,
                    res_group_year,
                    township_id,
                    dwelling_num,
                    household_num,
                    event_type,
                    household_notes
                 FROM ResGroups
                 WHERE res_group_id = ?1;",
                [res_group_id],
                parse_group_row,
            )
            .optional()?;

        Ok(group)
    }

    fn list_members(&self, res_group_id: i64) -> RepoResult<Vec<ResGroupMember>> {
        let mut stmt = self.conn.prepare(
            "SELECT res_group_id, res_group_member, member_order
             FROM ResGroupMembers
             WHERE res_group_id = ?1
             ORDER BY res_group_member ASC;",
        )?;

        let mut rows = stmt.query([res_group_id])?;
        let mut members = Vec::new();
        while let Some(row) = rows.next()? {
            members.push(ResGroupMember {
                res_group_id: row.get("res_group_id")?,
                person_id: row.get("res_group_member")?,
                member_order: row.get("member_order")?,
            });
        }

        Ok(members)
    }

    fn insert_member(&self, member: &ResGroupMember) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO ResGroupMembers (res_group_id, res_group_member, member_order)
             VALUES (?1, ?2, ?3);",
            params![member.res_group_id, member.person_id, member.member_order],
        )?;

        Ok(())
    }

    fn insert_members_from_census(&self) -> RepoResult<usize> {
        let inserted = self.conn.execute(
            "INSERT INTO ResGroupMembers (res_group_id, res_group_member)
             SELECT res_group_id, person_id
             FROM Census
             WHERE res_group_id IS NOT NULL;",
            [],
        )?;

        Ok(inserted)
    }

    fn clear_all(&self) -> RepoResult<()> {
        self.conn.execute("DELETE FROM ResGroupMembers;", [])?;
        self.conn.execute("DELETE FROM ResGroups;", [])?;
        Ok(())
    }
}

fn parse_group_row(row: &Row<'_>) -> rusqlite::Result<ResGroup> {
    Ok(ResGroup {
        id: row.get("res_group_id")?,
        year: row.get("res_group_year")?,
        township_id: row.get("township_id")?,
        dwelling_num: row.get("dwelling_num")?,
        household_num: row.get("household_num")?,
        event_type: row.get("event_type")?,
        notes: row.get("household_notes")?,
    })
}
