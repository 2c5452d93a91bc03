//! Local SQLite storage for mission sets and rewards
//!
//! A single connection guarded by a mutex. Claims and redemptions run in
//! `BEGIN IMMEDIATE` transactions, which take the database write lock up front
//! and so serialize concurrent stock decrements.

use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{RewardError, RewardResult};
use crate::models::{
    ClaimReceipt, Mission, MissionSet, MissionStatus, NewMission, NewMissionSet,
    NewRewardOption, RewardOption, RewardStatus, UserMission, UserReward,
};
use crate::store::RewardStore;

const SCHEMA_VERSION: i32 = 1;
const SCHEMA_SQL: &str = include_str!("../migrations/sqlite/001_schema.sql");

const MISSION_SET_COLUMNS: &str =
    "id, popup_id, title, required_success_count, staff_pin_hash, created_at";
const MISSION_COLUMNS: &str = "id, mission_set_id, title, description, answer, created_at";
const USER_MISSION_COLUMNS: &str =
    "user_id, mission_id, status, attempts, completed_at, updated_at";
const OPTION_COLUMNS: &str = "id, mission_set_id, name, total_stock, issued, created_at";
const USER_REWARD_COLUMNS: &str =
    "id, user_id, mission_set_id, reward_option_id, status, issued_at, redeemed_at";

pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    pub fn new(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let conn = Connection::open(path.as_ref())?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        let storage = Self::with_connection(conn)?;
        info!(path = %path.as_ref().display(), "SQLite storage opened");
        Ok(storage)
    }

    pub fn in_memory() -> anyhow::Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> anyhow::Result<Self> {
        conn.pragma_update(None, "foreign_keys", true)?;
        let storage = Self {
            conn: Mutex::new(conn),
        };
        storage.run_migrations()?;
        Ok(storage)
    }

    fn run_migrations(&self) -> anyhow::Result<()> {
        let conn = self.conn.lock();
        let version: i32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
        if version < SCHEMA_VERSION {
            conn.execute_batch(SCHEMA_SQL)?;
            conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
            info!("Applied SQLite schema version {}", SCHEMA_VERSION);
        }
        Ok(())
    }

    // ========================================================================
    // ADMIN WRITES
    // ========================================================================

    pub fn create_mission_set(&self, new: &NewMissionSet) -> RewardResult<MissionSet> {
        let set = MissionSet {
            id: Uuid::new_v4(),
            popup_id: new.popup_id.clone(),
            title: new.title.clone(),
            required_success_count: new.required_success_count,
            staff_pin_hash: new.staff_pin_hash.clone(),
            created_at: Utc::now(),
        };
        let conn = self.conn.lock();
        conn.execute(
            &format!("INSERT INTO mission_sets ({MISSION_SET_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"),
            params![
                set.id,
                set.popup_id,
                set.title,
                set.required_success_count,
                set.staff_pin_hash,
                set.created_at,
            ],
        )?;
        Ok(set)
    }

    pub fn set_staff_pin(&self, mission_set_id: Uuid, pin_hash: &str) -> RewardResult<()> {
        let conn = self.conn.lock();
        let updated = conn.execute(
            "UPDATE mission_sets SET staff_pin_hash = ?1 WHERE id = ?2",
            params![pin_hash, mission_set_id],
        )?;
        if updated == 0 {
            return Err(RewardError::MissionSetNotFound(mission_set_id));
        }
        Ok(())
    }

    pub fn create_mission(&self, new: &NewMission) -> RewardResult<Mission> {
        let conn = self.conn.lock();
        if query_mission_set(&conn, new.mission_set_id)?.is_none() {
            return Err(RewardError::MissionSetNotFound(new.mission_set_id));
        }
        let mission = Mission {
            id: Uuid::new_v4(),
            mission_set_id: new.mission_set_id,
            title: new.title.clone(),
            description: new.description.clone(),
            answer: new.answer.clone(),
            created_at: Utc::now(),
        };
        conn.execute(
            &format!("INSERT INTO missions ({MISSION_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"),
            params![
                mission.id,
                mission.mission_set_id,
                mission.title,
                mission.description,
                mission.answer,
                mission.created_at,
            ],
        )?;
        Ok(mission)
    }

    pub fn create_reward_option(&self, new: &NewRewardOption) -> RewardResult<RewardOption> {
        let conn = self.conn.lock();
        if query_mission_set(&conn, new.mission_set_id)?.is_none() {
            return Err(RewardError::MissionSetNotFound(new.mission_set_id));
        }
        let option = RewardOption {
            id: Uuid::new_v4(),
            mission_set_id: new.mission_set_id,
            name: new.name.clone(),
            total_stock: new.total_stock,
            issued: 0,
            created_at: Utc::now(),
        };
        conn.execute(
            &format!("INSERT INTO reward_options ({OPTION_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"),
            params![
                option.id,
                option.mission_set_id,
                option.name,
                option.total_stock,
                option.issued,
                option.created_at,
            ],
        )?;
        Ok(option)
    }

    pub fn restock(&self, option_id: Uuid, total_stock: i32) -> RewardResult<RewardOption> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut option = query_reward_option(&tx, option_id)?
            .ok_or(RewardError::RewardOptionNotFound(option_id))?;
        option.restock(total_stock)?;
        tx.execute(
            "UPDATE reward_options SET total_stock = ?1 WHERE id = ?2",
            params![option.total_stock, option.id],
        )?;
        tx.commit()?;
        Ok(option)
    }

    // ========================================================================
    // READS
    // ========================================================================

    pub fn mission_set(&self, id: Uuid) -> RewardResult<Option<MissionSet>> {
        let conn = self.conn.lock();
        Ok(query_mission_set(&conn, id)?)
    }

    pub fn mission(&self, id: Uuid) -> RewardResult<Option<Mission>> {
        let conn = self.conn.lock();
        let mission = conn
            .query_row(
                &format!("SELECT {MISSION_COLUMNS} FROM missions WHERE id = ?1"),
                params![id],
                mission_from_row,
            )
            .optional()?;
        Ok(mission)
    }

    pub fn missions(&self, mission_set_id: Uuid) -> RewardResult<Vec<Mission>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {MISSION_COLUMNS} FROM missions WHERE mission_set_id = ?1 ORDER BY created_at, rowid"
        ))?;
        let missions = stmt
            .query_map(params![mission_set_id], mission_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(missions)
    }

    pub fn reward_options(&self, mission_set_id: Uuid) -> RewardResult<Vec<RewardOption>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {OPTION_COLUMNS} FROM reward_options WHERE mission_set_id = ?1 ORDER BY created_at, rowid"
        ))?;
        let options = stmt
            .query_map(params![mission_set_id], option_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(options)
    }

    pub fn user_mission(&self, user_id: &str, mission_id: Uuid) -> RewardResult<Option<UserMission>> {
        let conn = self.conn.lock();
        Ok(query_user_mission(&conn, user_id, mission_id)?)
    }

    pub fn user_missions(&self, user_id: &str, mission_set_id: Uuid) -> RewardResult<Vec<UserMission>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT um.user_id, um.mission_id, um.status, um.attempts, um.completed_at, um.updated_at
             FROM user_missions um
             JOIN missions m ON m.id = um.mission_id
             WHERE um.user_id = ?1 AND m.mission_set_id = ?2",
        )?;
        let rows = stmt
            .query_map(params![user_id, mission_set_id], user_mission_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn success_count(&self, user_id: &str, mission_set_id: Uuid) -> RewardResult<i64> {
        let conn = self.conn.lock();
        Ok(query_success_count(&conn, user_id, mission_set_id)?)
    }

    pub fn user_reward(&self, user_id: &str, mission_set_id: Uuid) -> RewardResult<Option<UserReward>> {
        let conn = self.conn.lock();
        Ok(query_user_reward(&conn, user_id, mission_set_id)?)
    }

    pub fn user_rewards(&self, user_id: &str) -> RewardResult<Vec<UserReward>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {USER_REWARD_COLUMNS} FROM user_rewards WHERE user_id = ?1 ORDER BY issued_at DESC"
        ))?;
        let rewards = stmt
            .query_map(params![user_id], user_reward_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rewards)
    }

    // ========================================================================
    // MISSION ATTEMPTS
    // ========================================================================

    pub fn upsert_attempt(
        &self,
        user_id: &str,
        mission_id: Uuid,
        passed: bool,
    ) -> RewardResult<UserMission> {
        let now = Utc::now();
        let (status, completed_at) = if passed {
            (MissionStatus::Success, Some(now))
        } else {
            (MissionStatus::Fail, None)
        };

        let mut conn = self.conn.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO user_missions (user_id, mission_id, status, attempts, completed_at, updated_at)
             VALUES (?1, ?2, ?3, 1, ?4, ?5)
             ON CONFLICT (user_id, mission_id) DO UPDATE SET
                status = excluded.status,
                attempts = user_missions.attempts + 1,
                completed_at = excluded.completed_at,
                updated_at = excluded.updated_at
             WHERE user_missions.status <> 'SUCCESS'",
            params![user_id, mission_id, status, completed_at, now],
        )?;
        let stored = query_user_mission(&tx, user_id, mission_id)?
            .ok_or(RewardError::MissionNotFound(mission_id))?;
        tx.commit()?;
        Ok(stored)
    }

    // ========================================================================
    // CLAIM / REDEEM
    // ========================================================================

    pub fn claim(
        &self,
        mission_set_id: Uuid,
        option_id: Uuid,
        user_id: &str,
    ) -> RewardResult<ClaimReceipt> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        if let Some(existing) = query_user_reward(&tx, user_id, mission_set_id)? {
            debug!(user_id, %mission_set_id, "Reward already issued, returning existing");
            return Ok(ClaimReceipt {
                reward: existing,
                newly_issued: false,
            });
        }

        let set = query_mission_set(&tx, mission_set_id)?
            .ok_or(RewardError::MissionSetNotFound(mission_set_id))?;
        let success_count = query_success_count(&tx, user_id, mission_set_id)?;
        set.ensure_cleared(success_count)?;

        let mut option =
            query_reward_option(&tx, option_id)?.ok_or(RewardError::InvalidOption(option_id))?;
        option.ensure_in_set(mission_set_id)?;
        option.issue_one()?;

        tx.execute(
            "UPDATE reward_options SET issued = ?1 WHERE id = ?2",
            params![option.issued, option.id],
        )?;

        let reward = UserReward::issue(user_id, mission_set_id, option.id);
        tx.execute(
            &format!(
                "INSERT INTO user_rewards ({USER_REWARD_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"
            ),
            params![
                reward.id,
                reward.user_id,
                reward.mission_set_id,
                reward.reward_option_id,
                reward.status,
                reward.issued_at,
                reward.redeemed_at,
            ],
        )?;
        tx.commit()?;

        Ok(ClaimReceipt {
            reward,
            newly_issued: true,
        })
    }

    /// Flip the user's ISSUED reward to REDEEMED
    pub fn redeem(&self, mission_set_id: Uuid, user_id: &str) -> RewardResult<UserReward> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut reward = query_user_reward(&tx, user_id, mission_set_id)?
            .filter(|r| r.status == RewardStatus::Issued)
            .ok_or_else(|| RewardError::NotIssued {
                user_id: user_id.to_string(),
                mission_set_id,
            })?;

        let redeemed_at = Utc::now();
        tx.execute(
            "UPDATE user_rewards SET status = ?1, redeemed_at = ?2 WHERE id = ?3 AND status = ?4",
            params![
                RewardStatus::Redeemed,
                redeemed_at,
                reward.id,
                RewardStatus::Issued
            ],
        )?;
        tx.commit()?;

        reward.status = RewardStatus::Redeemed;
        reward.redeemed_at = Some(redeemed_at);
        Ok(reward)
    }
}

// ============================================================================
// ROW HELPERS
// ============================================================================

fn query_mission_set(conn: &Connection, id: Uuid) -> rusqlite::Result<Option<MissionSet>> {
    conn.query_row(
        &format!("SELECT {MISSION_SET_COLUMNS} FROM mission_sets WHERE id = ?1"),
        params![id],
        mission_set_from_row,
    )
    .optional()
}

fn query_reward_option(conn: &Connection, id: Uuid) -> rusqlite::Result<Option<RewardOption>> {
    conn.query_row(
        &format!("SELECT {OPTION_COLUMNS} FROM reward_options WHERE id = ?1"),
        params![id],
        option_from_row,
    )
    .optional()
}

fn query_user_mission(
    conn: &Connection,
    user_id: &str,
    mission_id: Uuid,
) -> rusqlite::Result<Option<UserMission>> {
    conn.query_row(
        &format!(
            "SELECT {USER_MISSION_COLUMNS} FROM user_missions WHERE user_id = ?1 AND mission_id = ?2"
        ),
        params![user_id, mission_id],
        user_mission_from_row,
    )
    .optional()
}

fn query_user_reward(
    conn: &Connection,
    user_id: &str,
    mission_set_id: Uuid,
) -> rusqlite::Result<Option<UserReward>> {
    conn.query_row(
        &format!(
            "SELECT {USER_REWARD_COLUMNS} FROM user_rewards WHERE user_id = ?1 AND mission_set_id = ?2"
        ),
        params![user_id, mission_set_id],
        user_reward_from_row,
    )
    .optional()
}

fn query_success_count(
    conn: &Connection,
    user_id: &str,
    mission_set_id: Uuid,
) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM user_missions um
         JOIN missions m ON m.id = um.mission_id
         WHERE um.user_id = ?1 AND m.mission_set_id = ?2 AND um.status = ?3",
        params![user_id, mission_set_id, MissionStatus::Success],
        |row| row.get(0),
    )
}

fn mission_set_from_row(row: &Row<'_>) -> rusqlite::Result<MissionSet> {
    Ok(MissionSet {
        id: row.get(0)?,
        popup_id: row.get(1)?,
        title: row.get(2)?,
        required_success_count: row.get(3)?,
        staff_pin_hash: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn mission_from_row(row: &Row<'_>) -> rusqlite::Result<Mission> {
    Ok(Mission {
        id: row.get(0)?,
        mission_set_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        answer: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn user_mission_from_row(row: &Row<'_>) -> rusqlite::Result<UserMission> {
    Ok(UserMission {
        user_id: row.get(0)?,
        mission_id: row.get(1)?,
        status: row.get(2)?,
        attempts: row.get(3)?,
        completed_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn option_from_row(row: &Row<'_>) -> rusqlite::Result<RewardOption> {
    Ok(RewardOption {
        id: row.get(0)?,
        mission_set_id: row.get(1)?,
        name: row.get(2)?,
        total_stock: row.get(3)?,
        issued: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn user_reward_from_row(row: &Row<'_>) -> rusqlite::Result<UserReward> {
    Ok(UserReward {
        id: row.get(0)?,
        user_id: row.get(1)?,
        mission_set_id: row.get(2)?,
        reward_option_id: row.get(3)?,
        status: row.get(4)?,
        issued_at: row.get(5)?,
        redeemed_at: row.get(6)?,
    })
}

#[async_trait]
impl RewardStore for SqliteStorage {
    async fn insert_mission_set(&self, new: &NewMissionSet) -> RewardResult<MissionSet> {
        self.create_mission_set(new)
    }

    async fn update_staff_pin(&self, mission_set_id: Uuid, pin_hash: &str) -> RewardResult<()> {
        self.set_staff_pin(mission_set_id, pin_hash)
    }

    async fn insert_mission(&self, new: &NewMission) -> RewardResult<Mission> {
        self.create_mission(new)
    }

    async fn insert_reward_option(&self, new: &NewRewardOption) -> RewardResult<RewardOption> {
        self.create_reward_option(new)
    }

    async fn restock_option(
        &self,
        option_id: Uuid,
        total_stock: i32,
    ) -> RewardResult<RewardOption> {
        self.restock(option_id, total_stock)
    }

    async fn get_mission_set(&self, id: Uuid) -> RewardResult<Option<MissionSet>> {
        self.mission_set(id)
    }

    async fn get_mission(&self, id: Uuid) -> RewardResult<Option<Mission>> {
        self.mission(id)
    }

    async fn list_missions(&self, mission_set_id: Uuid) -> RewardResult<Vec<Mission>> {
        self.missions(mission_set_id)
    }

    async fn list_reward_options(&self, mission_set_id: Uuid) -> RewardResult<Vec<RewardOption>> {
        self.reward_options(mission_set_id)
    }

    async fn get_user_mission(
        &self,
        user_id: &str,
        mission_id: Uuid,
    ) -> RewardResult<Option<UserMission>> {
        self.user_mission(user_id, mission_id)
    }

    async fn list_user_missions(
        &self,
        user_id: &str,
        mission_set_id: Uuid,
    ) -> RewardResult<Vec<UserMission>> {
        self.user_missions(user_id, mission_set_id)
    }

    async fn count_successes(&self, user_id: &str, mission_set_id: Uuid) -> RewardResult<i64> {
        self.success_count(user_id, mission_set_id)
    }

    async fn find_user_reward(
        &self,
        user_id: &str,
        mission_set_id: Uuid,
    ) -> RewardResult<Option<UserReward>> {
        self.user_reward(user_id, mission_set_id)
    }

    async fn list_user_rewards(&self, user_id: &str) -> RewardResult<Vec<UserReward>> {
        self.user_rewards(user_id)
    }

    async fn record_attempt(
        &self,
        user_id: &str,
        mission_id: Uuid,
        passed: bool,
    ) -> RewardResult<UserMission> {
        self.upsert_attempt(user_id, mission_id, passed)
    }

    async fn claim_reward(
        &self,
        mission_set_id: Uuid,
        option_id: Uuid,
        user_id: &str,
    ) -> RewardResult<ClaimReceipt> {
        self.claim(mission_set_id, option_id, user_id)
    }

    async fn redeem_reward(&self, mission_set_id: Uuid, user_id: &str) -> RewardResult<UserReward> {
        self.redeem(mission_set_id, user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> (SqliteStorage, MissionSet, Vec<Mission>, RewardOption) {
        let storage = SqliteStorage::in_memory().unwrap();
        let set = storage
            .create_mission_set(&NewMissionSet {
                popup_id: "popup-1".to_string(),
                title: "Spring hunt".to_string(),
                required_success_count: 2,
                staff_pin_hash: None,
            })
            .unwrap();
        let missions = (0..3)
            .map(|i| {
                storage
                    .create_mission(&NewMission {
                        mission_set_id: set.id,
                        title: format!("Mission {}", i),
                        description: String::new(),
                        answer: format!("answer {}", i),
                    })
                    .unwrap()
            })
            .collect();
        let option = storage
            .create_reward_option(&NewRewardOption {
                mission_set_id: set.id,
                name: "Sticker pack".to_string(),
                total_stock: 1,
            })
            .unwrap();
        (storage, set, missions, option)
    }

    #[test]
    fn test_migrations_are_idempotent() {
        let storage = SqliteStorage::in_memory().unwrap();
        storage.run_migrations().unwrap();
        assert!(storage.user_rewards("nobody").unwrap().is_empty());
    }

    #[test]
    fn test_mission_requires_existing_set() {
        let storage = SqliteStorage::in_memory().unwrap();
        let err = storage
            .create_mission(&NewMission {
                mission_set_id: Uuid::new_v4(),
                title: "Orphan".to_string(),
                description: String::new(),
                answer: "x".to_string(),
            })
            .unwrap_err();
        assert!(matches!(err, RewardError::MissionSetNotFound(_)));
    }

    #[test]
    fn test_missions_listed_in_creation_order() {
        let (storage, set, missions, _) = seeded();
        let listed: Vec<Uuid> = storage.missions(set.id).unwrap().iter().map(|m| m.id).collect();
        let created: Vec<Uuid> = missions.iter().map(|m| m.id).collect();
        assert_eq!(listed, created);
    }

    #[test]
    fn test_success_is_never_downgraded() {
        let (storage, _, missions, _) = seeded();
        let first = storage.upsert_attempt("alice", missions[0].id, true).unwrap();
        assert_eq!(first.status, MissionStatus::Success);
        assert_eq!(first.attempts, 1);

        let again = storage.upsert_attempt("alice", missions[0].id, false).unwrap();
        assert_eq!(again.status, MissionStatus::Success);
        assert_eq!(again.attempts, 1);
        assert_eq!(again.completed_at, first.completed_at);
    }

    #[test]
    fn test_failed_attempts_accumulate() {
        let (storage, _, missions, _) = seeded();
        storage.upsert_attempt("bob", missions[1].id, false).unwrap();
        let row = storage.upsert_attempt("bob", missions[1].id, false).unwrap();
        assert_eq!(row.status, MissionStatus::Fail);
        assert_eq!(row.attempts, 2);
        assert!(row.completed_at.is_none());
    }

    #[test]
    fn test_success_count_is_scoped_to_set() {
        let (storage, set, missions, _) = seeded();
        storage.upsert_attempt("alice", missions[0].id, true).unwrap();
        storage.upsert_attempt("alice", missions[1].id, false).unwrap();
        storage.upsert_attempt("bob", missions[2].id, true).unwrap();
        assert_eq!(storage.success_count("alice", set.id).unwrap(), 1);
        assert_eq!(storage.success_count("bob", set.id).unwrap(), 1);
        assert_eq!(storage.success_count("carol", set.id).unwrap(), 0);
    }

    #[test]
    fn test_claim_rejects_uncleared_user_without_touching_stock() {
        let (storage, set, missions, option) = seeded();
        storage.upsert_attempt("alice", missions[0].id, true).unwrap();

        let err = storage.claim(set.id, option.id, "alice").unwrap_err();
        assert!(matches!(err, RewardError::NotCleared { success_count: 1, required_count: 2 }));
        assert_eq!(storage.reward_options(set.id).unwrap()[0].issued, 0);
    }

    #[test]
    fn test_claim_out_of_stock_creates_no_record() {
        let (storage, set, missions, option) = seeded();
        for user in ["alice", "bob"] {
            storage.upsert_attempt(user, missions[0].id, true).unwrap();
            storage.upsert_attempt(user, missions[1].id, true).unwrap();
        }

        assert!(storage.claim(set.id, option.id, "alice").unwrap().newly_issued);
        let err = storage.claim(set.id, option.id, "bob").unwrap_err();
        assert!(matches!(err, RewardError::OutOfStock(_)));
        assert!(storage.user_reward("bob", set.id).unwrap().is_none());
        assert_eq!(storage.reward_options(set.id).unwrap()[0].issued, 1);
    }

    #[test]
    fn test_restock_locks_floor_at_issued() {
        let (storage, set, missions, option) = seeded();
        storage.upsert_attempt("alice", missions[0].id, true).unwrap();
        storage.upsert_attempt("alice", missions[1].id, true).unwrap();
        storage.claim(set.id, option.id, "alice").unwrap();

        assert!(matches!(
            storage.restock(option.id, 0),
            Err(RewardError::StockBelowIssued { total: 0, issued: 1 })
        ));
        let restocked = storage.restock(option.id, 10).unwrap();
        assert_eq!(restocked.remaining(), 9);
        assert!(matches!(
            storage.restock(Uuid::new_v4(), 1),
            Err(RewardError::RewardOptionNotFound(_))
        ));
    }
}
