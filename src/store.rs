//! Storage seam shared by the PostgreSQL and SQLite backends
//!
//! Reads and single-row writes are plain queries. `claim_reward` and
//! `redeem_reward` each run as one database transaction inside the backend so
//! that stock, issuance and redemption state can never be partially applied.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::error::RewardResult;
use crate::models::{
    ClaimReceipt, Mission, MissionSet, NewMission, NewMissionSet, NewRewardOption, RewardOption,
    UserMission, UserReward,
};
use crate::pg_storage::PgStorage;
use crate::storage::SqliteStorage;

#[async_trait]
pub trait RewardStore: Send + Sync {
    // ------------------------------------------------------------------
    // Admin writes
    // ------------------------------------------------------------------

    async fn insert_mission_set(&self, new: &NewMissionSet) -> RewardResult<MissionSet>;

    /// Replace the stored PIN hash. Fails with `MissionSetNotFound` when absent.
    async fn update_staff_pin(&self, mission_set_id: Uuid, pin_hash: &str) -> RewardResult<()>;

    async fn insert_mission(&self, new: &NewMission) -> RewardResult<Mission>;

    async fn insert_reward_option(&self, new: &NewRewardOption) -> RewardResult<RewardOption>;

    /// Change an option's total stock under a row lock
    async fn restock_option(&self, option_id: Uuid, total_stock: i32)
        -> RewardResult<RewardOption>;

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    async fn get_mission_set(&self, id: Uuid) -> RewardResult<Option<MissionSet>>;

    async fn get_mission(&self, id: Uuid) -> RewardResult<Option<Mission>>;

    async fn list_missions(&self, mission_set_id: Uuid) -> RewardResult<Vec<Mission>>;

    async fn list_reward_options(&self, mission_set_id: Uuid) -> RewardResult<Vec<RewardOption>>;

    async fn get_user_mission(
        &self,
        user_id: &str,
        mission_id: Uuid,
    ) -> RewardResult<Option<UserMission>>;

    async fn list_user_missions(
        &self,
        user_id: &str,
        mission_set_id: Uuid,
    ) -> RewardResult<Vec<UserMission>>;

    /// Number of SUCCESS missions the user holds in the set
    async fn count_successes(&self, user_id: &str, mission_set_id: Uuid) -> RewardResult<i64>;

    async fn find_user_reward(
        &self,
        user_id: &str,
        mission_set_id: Uuid,
    ) -> RewardResult<Option<UserReward>>;

    /// All rewards of a user, newest first
    async fn list_user_rewards(&self, user_id: &str) -> RewardResult<Vec<UserReward>>;

    // ------------------------------------------------------------------
    // Mutations with invariants
    // ------------------------------------------------------------------

    /// Upsert the user's attempt. A SUCCESS row is never touched again.
    /// Returns the stored row after the write.
    async fn record_attempt(
        &self,
        user_id: &str,
        mission_id: Uuid,
        passed: bool,
    ) -> RewardResult<UserMission>;

    async fn claim_reward(
        &self,
        mission_set_id: Uuid,
        option_id: Uuid,
        user_id: &str,
    ) -> RewardResult<ClaimReceipt>;

    /// Mark the user's ISSUED reward as REDEEMED. Callers verify the staff PIN
    /// first; the guarded update makes a concurrent second redeem fail with
    /// `NotIssued`.
    async fn redeem_reward(&self, mission_set_id: Uuid, user_id: &str) -> RewardResult<UserReward>;
}

/// Open the backend selected by the URL scheme
pub async fn open_store(url: &str, db: &DatabaseConfig) -> Result<Arc<dyn RewardStore>> {
    if url.starts_with("postgres://") || url.starts_with("postgresql://") {
        let storage = PgStorage::new(url, db).await?;
        info!("Using PostgreSQL storage");
        Ok(Arc::new(storage))
    } else if url == "sqlite::memory:" {
        info!("Using in-memory SQLite storage");
        Ok(Arc::new(SqliteStorage::in_memory()?))
    } else {
        let path = url.strip_prefix("sqlite://").unwrap_or(url);
        info!("Using SQLite storage at {}", path);
        Ok(Arc::new(SqliteStorage::new(path)?))
    }
}
