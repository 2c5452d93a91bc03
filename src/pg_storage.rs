//! PostgreSQL Storage for Popup Rewards
//!
//! Server-mode storage. Claims lock the reward option row with
//! `SELECT ... FOR UPDATE` so that concurrent claims against the same option
//! are serialized and stock can never be oversold.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use deadpool_postgres::{Config, Pool, Runtime};
use tokio_postgres::{NoTls, Row};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::error::{RewardError, RewardResult};
use crate::models::{
    ClaimReceipt, Mission, MissionSet, MissionStatus, NewMission, NewMissionSet,
    NewRewardOption, RewardOption, RewardStatus, UserMission, UserReward,
};
use crate::store::RewardStore;

const MISSION_SET_COLUMNS: &str =
    "id, popup_id, title, required_success_count, staff_pin_hash, created_at";
const MISSION_COLUMNS: &str = "id, mission_set_id, title, description, answer, created_at";
const USER_MISSION_COLUMNS: &str =
    "user_id, mission_id, status, attempts, completed_at, updated_at";
const OPTION_COLUMNS: &str = "id, mission_set_id, name, total_stock, issued, created_at";
const USER_REWARD_COLUMNS: &str =
    "id, user_id, mission_set_id, reward_option_id, status, issued_at, redeemed_at";

const SUCCESS_COUNT_SQL: &str = "SELECT COUNT(*) FROM user_missions um
     JOIN missions m ON m.id = um.mission_id
     WHERE um.user_id = $1 AND m.mission_set_id = $2 AND um.status = 'SUCCESS'";

// ============================================================================
// PG STORAGE
// ============================================================================

#[derive(Clone)]
pub struct PgStorage {
    pool: Pool,
}

impl PgStorage {
    /// Create storage from a database URL
    pub async fn new(database_url: &str, db: &DatabaseConfig) -> Result<Self> {
        use deadpool_postgres::{ManagerConfig, PoolConfig, RecyclingMethod};
        use std::time::Duration;

        let mut config = Config::new();
        config.url = Some(database_url.to_string());
        config.options = Some(format!("-c statement_timeout={}s", db.query_timeout_secs));

        config.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });

        config.pool = Some(PoolConfig {
            max_size: db.pool_max_size,
            timeouts: deadpool_postgres::Timeouts {
                wait: Some(Duration::from_secs(db.query_timeout_secs)),
                create: Some(Duration::from_secs(10)),
                recycle: Some(Duration::from_secs(30)),
            },
            ..Default::default()
        });

        let pool = config.create_pool(Some(Runtime::Tokio1), NoTls)?;

        // Test connection
        let client = pool.get().await?;
        client.execute("SELECT 1", &[]).await?;

        info!(
            "Connected to PostgreSQL (pool_size: {}, query_timeout: {}s)",
            db.pool_max_size, db.query_timeout_secs
        );

        let storage = Self { pool };
        storage.run_migrations().await?;

        Ok(storage)
    }

    /// Run embedded migrations
    async fn run_migrations(&self) -> Result<()> {
        let client = self.pool.get().await?;

        let exists: bool = client
            .query_one(
                "SELECT EXISTS(SELECT 1 FROM information_schema.tables WHERE table_name = 'schema_migrations')",
                &[],
            )
            .await?
            .get(0);

        if !exists {
            let migration_sql = include_str!("../migrations/001_schema.sql");
            client.batch_execute(migration_sql).await?;
            info!("Applied migration 001_schema");
        }

        Ok(())
    }
}

// ============================================================================
// ROW MAPPING
// ============================================================================

fn mission_set_from_row(row: &Row) -> MissionSet {
    MissionSet {
        id: row.get("id"),
        popup_id: row.get("popup_id"),
        title: row.get("title"),
        required_success_count: row.get("required_success_count"),
        staff_pin_hash: row.get("staff_pin_hash"),
        created_at: row.get("created_at"),
    }
}

fn mission_from_row(row: &Row) -> Mission {
    Mission {
        id: row.get("id"),
        mission_set_id: row.get("mission_set_id"),
        title: row.get("title"),
        description: row.get("description"),
        answer: row.get("answer"),
        created_at: row.get("created_at"),
    }
}

fn user_mission_from_row(row: &Row) -> UserMission {
    UserMission {
        user_id: row.get("user_id"),
        mission_id: row.get("mission_id"),
        status: row.get("status"),
        attempts: row.get("attempts"),
        completed_at: row.get("completed_at"),
        updated_at: row.get("updated_at"),
    }
}

fn option_from_row(row: &Row) -> RewardOption {
    RewardOption {
        id: row.get("id"),
        mission_set_id: row.get("mission_set_id"),
        name: row.get("name"),
        total_stock: row.get("total_stock"),
        issued: row.get("issued"),
        created_at: row.get("created_at"),
    }
}

fn user_reward_from_row(row: &Row) -> UserReward {
    UserReward {
        id: row.get("id"),
        user_id: row.get("user_id"),
        mission_set_id: row.get("mission_set_id"),
        reward_option_id: row.get("reward_option_id"),
        status: row.get("status"),
        issued_at: row.get("issued_at"),
        redeemed_at: row.get("redeemed_at"),
    }
}

#[async_trait]
impl RewardStore for PgStorage {
    // ========================================================================
    // ADMIN WRITES
    // ========================================================================

    async fn insert_mission_set(&self, new: &NewMissionSet) -> RewardResult<MissionSet> {
        let client = self.pool.get().await?;
        let row = client
            .query_one(
                &format!(
                    "INSERT INTO mission_sets (id, popup_id, title, required_success_count, staff_pin_hash)
                     VALUES ($1, $2, $3, $4, $5)
                     RETURNING {MISSION_SET_COLUMNS}"
                ),
                &[
                    &Uuid::new_v4(),
                    &new.popup_id,
                    &new.title,
                    &new.required_success_count,
                    &new.staff_pin_hash,
                ],
            )
            .await?;
        Ok(mission_set_from_row(&row))
    }

    async fn update_staff_pin(&self, mission_set_id: Uuid, pin_hash: &str) -> RewardResult<()> {
        let client = self.pool.get().await?;
        let updated = client
            .execute(
                "UPDATE mission_sets SET staff_pin_hash = $1 WHERE id = $2",
                &[&pin_hash, &mission_set_id],
            )
            .await?;
        if updated == 0 {
            return Err(RewardError::MissionSetNotFound(mission_set_id));
        }
        Ok(())
    }

    async fn insert_mission(&self, new: &NewMission) -> RewardResult<Mission> {
        let client = self.pool.get().await?;
        // INSERT ... SELECT yields no row when the set is missing
        let row = client
            .query_opt(
                &format!(
                    "INSERT INTO missions (id, mission_set_id, title, description, answer)
                     SELECT $1, id, $3, $4, $5 FROM mission_sets WHERE id = $2
                     RETURNING {MISSION_COLUMNS}"
                ),
                &[
                    &Uuid::new_v4(),
                    &new.mission_set_id,
                    &new.title,
                    &new.description,
                    &new.answer,
                ],
            )
            .await?
            .ok_or(RewardError::MissionSetNotFound(new.mission_set_id))?;
        Ok(mission_from_row(&row))
    }

    async fn insert_reward_option(&self, new: &NewRewardOption) -> RewardResult<RewardOption> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                &format!(
                    "INSERT INTO reward_options (id, mission_set_id, name, total_stock, issued)
                     SELECT $1, id, $3, $4, 0 FROM mission_sets WHERE id = $2
                     RETURNING {OPTION_COLUMNS}"
                ),
                &[
                    &Uuid::new_v4(),
                    &new.mission_set_id,
                    &new.name,
                    &new.total_stock,
                ],
            )
            .await?
            .ok_or(RewardError::MissionSetNotFound(new.mission_set_id))?;
        Ok(option_from_row(&row))
    }

    async fn restock_option(
        &self,
        option_id: Uuid,
        total_stock: i32,
    ) -> RewardResult<RewardOption> {
        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;

        let mut option = tx
            .query_opt(
                &format!("SELECT {OPTION_COLUMNS} FROM reward_options WHERE id = $1 FOR UPDATE"),
                &[&option_id],
            )
            .await?
            .map(|row| option_from_row(&row))
            .ok_or(RewardError::RewardOptionNotFound(option_id))?;
        option.restock(total_stock)?;

        tx.execute(
            "UPDATE reward_options SET total_stock = $1 WHERE id = $2",
            &[&option.total_stock, &option.id],
        )
        .await?;
        tx.commit().await?;

        info!(%option_id, total_stock, "Restocked reward option");
        Ok(option)
    }

    // ========================================================================
    // READS
    // ========================================================================

    async fn get_mission_set(&self, id: Uuid) -> RewardResult<Option<MissionSet>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                &format!("SELECT {MISSION_SET_COLUMNS} FROM mission_sets WHERE id = $1"),
                &[&id],
            )
            .await?;
        Ok(row.map(|r| mission_set_from_row(&r)))
    }

    async fn get_mission(&self, id: Uuid) -> RewardResult<Option<Mission>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                &format!("SELECT {MISSION_COLUMNS} FROM missions WHERE id = $1"),
                &[&id],
            )
            .await?;
        Ok(row.map(|r| mission_from_row(&r)))
    }

    async fn list_missions(&self, mission_set_id: Uuid) -> RewardResult<Vec<Mission>> {
        let client = self.pool.get().await?;
        let rows = client
            .query(
                &format!(
                    "SELECT {MISSION_COLUMNS} FROM missions WHERE mission_set_id = $1 ORDER BY created_at, id"
                ),
                &[&mission_set_id],
            )
            .await?;
        Ok(rows.iter().map(mission_from_row).collect())
    }

    async fn list_reward_options(&self, mission_set_id: Uuid) -> RewardResult<Vec<RewardOption>> {
        let client = self.pool.get().await?;
        let rows = client
            .query(
                &format!(
                    "SELECT {OPTION_COLUMNS} FROM reward_options WHERE mission_set_id = $1 ORDER BY created_at, id"
                ),
                &[&mission_set_id],
            )
            .await?;
        Ok(rows.iter().map(option_from_row).collect())
    }

    async fn get_user_mission(
        &self,
        user_id: &str,
        mission_id: Uuid,
    ) -> RewardResult<Option<UserMission>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                &format!(
                    "SELECT {USER_MISSION_COLUMNS} FROM user_missions WHERE user_id = $1 AND mission_id = $2"
                ),
                &[&user_id, &mission_id],
            )
            .await?;
        Ok(row.map(|r| user_mission_from_row(&r)))
    }

    async fn list_user_missions(
        &self,
        user_id: &str,
        mission_set_id: Uuid,
    ) -> RewardResult<Vec<UserMission>> {
        let client = self.pool.get().await?;
        let rows = client
            .query(
                "SELECT um.user_id, um.mission_id, um.status, um.attempts, um.completed_at, um.updated_at
                 FROM user_missions um
                 JOIN missions m ON m.id = um.mission_id
                 WHERE um.user_id = $1 AND m.mission_set_id = $2",
                &[&user_id, &mission_set_id],
            )
            .await?;
        Ok(rows.iter().map(user_mission_from_row).collect())
    }

    async fn count_successes(&self, user_id: &str, mission_set_id: Uuid) -> RewardResult<i64> {
        let client = self.pool.get().await?;
        let row = client
            .query_one(SUCCESS_COUNT_SQL, &[&user_id, &mission_set_id])
            .await?;
        Ok(row.get(0))
    }

    async fn find_user_reward(
        &self,
        user_id: &str,
        mission_set_id: Uuid,
    ) -> RewardResult<Option<UserReward>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                &format!(
                    "SELECT {USER_REWARD_COLUMNS} FROM user_rewards WHERE user_id = $1 AND mission_set_id = $2"
                ),
                &[&user_id, &mission_set_id],
            )
            .await?;
        Ok(row.map(|r| user_reward_from_row(&r)))
    }

    async fn list_user_rewards(&self, user_id: &str) -> RewardResult<Vec<UserReward>> {
        let client = self.pool.get().await?;
        let rows = client
            .query(
                &format!(
                    "SELECT {USER_REWARD_COLUMNS} FROM user_rewards WHERE user_id = $1 ORDER BY issued_at DESC"
                ),
                &[&user_id],
            )
            .await?;
        Ok(rows.iter().map(user_reward_from_row).collect())
    }

    // ========================================================================
    // MISSION ATTEMPTS
    // ========================================================================

    async fn record_attempt(
        &self,
        user_id: &str,
        mission_id: Uuid,
        passed: bool,
    ) -> RewardResult<UserMission> {
        let (status, completed_at) = if passed {
            (MissionStatus::Success, Some(Utc::now()))
        } else {
            (MissionStatus::Fail, None)
        };

        let client = self.pool.get().await?;
        client
            .execute(
                "INSERT INTO user_missions (user_id, mission_id, status, attempts, completed_at, updated_at)
                 VALUES ($1, $2, $3, 1, $4, NOW())
                 ON CONFLICT (user_id, mission_id) DO UPDATE SET
                    status = EXCLUDED.status,
                    attempts = user_missions.attempts + 1,
                    completed_at = EXCLUDED.completed_at,
                    updated_at = NOW()
                 WHERE user_missions.status <> 'SUCCESS'",
                &[&user_id, &mission_id, &status, &completed_at],
            )
            .await?;

        let row = client
            .query_one(
                &format!(
                    "SELECT {USER_MISSION_COLUMNS} FROM user_missions WHERE user_id = $1 AND mission_id = $2"
                ),
                &[&user_id, &mission_id],
            )
            .await?;
        Ok(user_mission_from_row(&row))
    }

    // ========================================================================
    // CLAIM / REDEEM
    // ========================================================================

    async fn claim_reward(
        &self,
        mission_set_id: Uuid,
        option_id: Uuid,
        user_id: &str,
    ) -> RewardResult<ClaimReceipt> {
        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;

        let existing = tx
            .query_opt(
                &format!(
                    "SELECT {USER_REWARD_COLUMNS} FROM user_rewards WHERE user_id = $1 AND mission_set_id = $2"
                ),
                &[&user_id, &mission_set_id],
            )
            .await?;
        if let Some(row) = existing {
            debug!(user_id, %mission_set_id, "Reward already issued, returning existing");
            return Ok(ClaimReceipt {
                reward: user_reward_from_row(&row),
                newly_issued: false,
            });
        }

        let set = tx
            .query_opt(
                &format!("SELECT {MISSION_SET_COLUMNS} FROM mission_sets WHERE id = $1"),
                &[&mission_set_id],
            )
            .await?
            .map(|row| mission_set_from_row(&row))
            .ok_or(RewardError::MissionSetNotFound(mission_set_id))?;

        let success_count: i64 = tx
            .query_one(SUCCESS_COUNT_SQL, &[&user_id, &mission_set_id])
            .await?
            .get(0);
        set.ensure_cleared(success_count)?;

        // Row lock: concurrent claims on this option queue here
        let mut option = tx
            .query_opt(
                &format!("SELECT {OPTION_COLUMNS} FROM reward_options WHERE id = $1 FOR UPDATE"),
                &[&option_id],
            )
            .await?
            .map(|row| option_from_row(&row))
            .ok_or(RewardError::InvalidOption(option_id))?;
        option.ensure_in_set(mission_set_id)?;
        option.issue_one()?;

        tx.execute(
            "UPDATE reward_options SET issued = $1 WHERE id = $2",
            &[&option.issued, &option.id],
        )
        .await?;

        let reward = UserReward::issue(user_id, mission_set_id, option.id);
        let inserted = tx
            .query_opt(
                &format!(
                    "INSERT INTO user_rewards ({USER_REWARD_COLUMNS})
                     VALUES ($1, $2, $3, $4, $5, $6, $7)
                     ON CONFLICT (user_id, mission_set_id) DO NOTHING
                     RETURNING {USER_REWARD_COLUMNS}"
                ),
                &[
                    &reward.id,
                    &reward.user_id,
                    &reward.mission_set_id,
                    &reward.reward_option_id,
                    &reward.status,
                    &reward.issued_at,
                    &reward.redeemed_at,
                ],
            )
            .await?;

        match inserted {
            Some(row) => {
                tx.commit().await?;
                Ok(ClaimReceipt {
                    reward: user_reward_from_row(&row),
                    newly_issued: true,
                })
            }
            None => {
                // A concurrent claim by the same user won; give back the unit.
                tx.rollback().await?;
                warn!(user_id, %mission_set_id, "Lost duplicate claim race, returning existing reward");
                let reward = self
                    .find_user_reward(user_id, mission_set_id)
                    .await?
                    .ok_or_else(|| RewardError::NotIssued {
                        user_id: user_id.to_string(),
                        mission_set_id,
                    })?;
                Ok(ClaimReceipt {
                    reward,
                    newly_issued: false,
                })
            }
        }
    }

    async fn redeem_reward(&self, mission_set_id: Uuid, user_id: &str) -> RewardResult<UserReward> {
        let client = self.pool.get().await?;

        // Guarded on status so a concurrent second redeem matches no row
        let row = client
            .query_opt(
                &format!(
                    "UPDATE user_rewards SET status = $3, redeemed_at = $4
                     WHERE user_id = $1 AND mission_set_id = $2 AND status = 'ISSUED'
                     RETURNING {USER_REWARD_COLUMNS}"
                ),
                &[&user_id, &mission_set_id, &RewardStatus::Redeemed, &Utc::now()],
            )
            .await?
            .ok_or_else(|| RewardError::NotIssued {
                user_id: user_id.to_string(),
                mission_set_id,
            })?;

        Ok(user_reward_from_row(&row))
    }
}
