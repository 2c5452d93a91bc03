//! Popup Rewards - Missions, reward claims and staff redemption for popup stores
//!
//! Visitors to a popup store work through a mission set. Each correct answer
//! counts toward the set's threshold, and a user who clears the set may claim
//! one unit of a finite-stock reward. Staff hand the reward over on site and
//! confirm it with a PIN.
//!
//! # How it works
//!
//! 1. An admin creates a mission set with missions, reward options and a staff PIN
//! 2. Users submit answers; matching ignores case and surrounding/repeated whitespace
//! 3. Once the success count reaches the threshold the user can claim a reward
//! 4. Staff redeem the issued reward by entering the PIN
//!
//! # Guarantees
//!
//! - A mission, once passed, stays passed
//! - At most one reward per user and mission set; retries return the same reward
//! - Stock is decremented under a lock, so the last unit goes to exactly one claimant
//! - Staff PINs are stored as argon2id hashes

pub mod admin;
pub mod answer;
pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod missions;
pub mod models;
pub mod pg_storage;
pub mod rewards;
pub mod storage;
pub mod store;

pub use admin::AdminService;
pub use app::RewardsApp;
pub use config::Config;
pub use error::{ErrorKind, RewardError, RewardResult};
pub use missions::MissionService;
pub use models::{
    AnswerOutcome, ClaimReceipt, Mission, MissionSet, MissionSetOverview, MissionSetProgress,
    MissionStatus, RewardOption, RewardStatus, UserMission, UserReward,
};
pub use pg_storage::PgStorage;
pub use rewards::RewardService;
pub use storage::SqliteStorage;
pub use store::{open_store, RewardStore};
