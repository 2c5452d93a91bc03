//! Domain records shared by both storage backends

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use postgres_types::{FromSql, ToSql};
use rusqlite::types::{FromSqlError, FromSqlResult, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{RewardError, RewardResult};

// ============================================================================
// STATUSES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSql, FromSql)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[postgres(name = "mission_status")]
pub enum MissionStatus {
    #[postgres(name = "PENDING")]
    Pending,
    #[postgres(name = "SUCCESS")]
    Success,
    #[postgres(name = "FAIL")]
    Fail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSql, FromSql)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[postgres(name = "reward_status")]
pub enum RewardStatus {
    #[postgres(name = "ISSUED")]
    Issued,
    #[postgres(name = "REDEEMED")]
    Redeemed,
}

#[derive(Debug, thiserror::Error)]
#[error("unknown status '{0}'")]
pub struct ParseStatusError(String);

impl MissionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            MissionStatus::Pending => "PENDING",
            MissionStatus::Success => "SUCCESS",
            MissionStatus::Fail => "FAIL",
        }
    }
}

impl FromStr for MissionStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(MissionStatus::Pending),
            "SUCCESS" => Ok(MissionStatus::Success),
            "FAIL" => Ok(MissionStatus::Fail),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

impl RewardStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RewardStatus::Issued => "ISSUED",
            RewardStatus::Redeemed => "REDEEMED",
        }
    }
}

impl FromStr for RewardStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ISSUED" => Ok(RewardStatus::Issued),
            "REDEEMED" => Ok(RewardStatus::Redeemed),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

impl fmt::Display for MissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for RewardStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// SQLite keeps statuses as TEXT with CHECK constraints.
macro_rules! sqlite_text_enum {
    ($ty:ty) => {
        impl rusqlite::types::ToSql for $ty {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl rusqlite::types::FromSql for $ty {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|e| FromSqlError::Other(Box::new(e)))
            }
        }
    };
}

sqlite_text_enum!(MissionStatus);
sqlite_text_enum!(RewardStatus);

// ============================================================================
// RECORDS
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionSet {
    pub id: Uuid,
    pub popup_id: String,
    pub title: String,
    pub required_success_count: i32,
    #[serde(skip_serializing, default)]
    pub staff_pin_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl MissionSet {
    pub fn is_cleared(&self, success_count: i64) -> bool {
        success_count >= i64::from(self.required_success_count)
    }

    /// Reject a claim from a user below the threshold
    pub fn ensure_cleared(&self, success_count: i64) -> RewardResult<()> {
        if self.is_cleared(success_count) {
            Ok(())
        } else {
            Err(RewardError::NotCleared {
                success_count,
                required_count: self.required_success_count,
            })
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mission {
    pub id: Uuid,
    pub mission_set_id: Uuid,
    pub title: String,
    pub description: String,
    #[serde(skip_serializing, default)]
    pub answer: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserMission {
    pub user_id: String,
    pub mission_id: Uuid,
    pub status: MissionStatus,
    pub attempts: i32,
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardOption {
    pub id: Uuid,
    pub mission_set_id: Uuid,
    pub name: String,
    pub total_stock: i32,
    pub issued: i32,
    pub created_at: DateTime<Utc>,
}

impl RewardOption {
    pub fn remaining(&self) -> i32 {
        (self.total_stock - self.issued).max(0)
    }

    pub fn ensure_in_set(&self, mission_set_id: Uuid) -> RewardResult<()> {
        if self.mission_set_id == mission_set_id {
            Ok(())
        } else {
            Err(RewardError::OptionNotInSet {
                option_id: self.id,
                mission_set_id,
            })
        }
    }

    /// Take one unit of stock. Fails without mutating when the pool is exhausted.
    pub fn issue_one(&mut self) -> RewardResult<()> {
        if self.issued >= self.total_stock {
            return Err(RewardError::OutOfStock(self.id));
        }
        self.issued += 1;
        Ok(())
    }

    /// Change the total stock, never below what has already been handed out
    pub fn restock(&mut self, total_stock: i32) -> RewardResult<()> {
        if total_stock < self.issued {
            return Err(RewardError::StockBelowIssued {
                total: total_stock,
                issued: self.issued,
            });
        }
        self.total_stock = total_stock;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserReward {
    pub id: Uuid,
    pub user_id: String,
    pub mission_set_id: Uuid,
    pub reward_option_id: Uuid,
    pub status: RewardStatus,
    pub issued_at: DateTime<Utc>,
    pub redeemed_at: Option<DateTime<Utc>>,
}

impl UserReward {
    pub fn issue(user_id: &str, mission_set_id: Uuid, reward_option_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            mission_set_id,
            reward_option_id,
            status: RewardStatus::Issued,
            issued_at: Utc::now(),
            redeemed_at: None,
        }
    }
}

// ============================================================================
// INPUTS
// ============================================================================

#[derive(Debug, Clone)]
pub struct NewMissionSet {
    pub popup_id: String,
    pub title: String,
    pub required_success_count: i32,
    pub staff_pin_hash: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewMission {
    pub mission_set_id: Uuid,
    pub title: String,
    pub description: String,
    pub answer: String,
}

#[derive(Debug, Clone)]
pub struct NewRewardOption {
    pub mission_set_id: Uuid,
    pub name: String,
    pub total_stock: i32,
}

// ============================================================================
// OUTCOMES
// ============================================================================

/// Result of a claim; `newly_issued` is false when an earlier reward was returned
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimReceipt {
    pub reward: UserReward,
    pub newly_issued: bool,
}

/// Result of a single answer submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerOutcome {
    pub mission_id: Uuid,
    pub mission_set_id: Uuid,
    pub passed: bool,
    /// The user had already passed; nothing was re-evaluated
    pub already_passed: bool,
    pub status: MissionStatus,
    pub success_count: i64,
    pub required_count: i32,
    pub cleared: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionProgress {
    pub mission_id: Uuid,
    pub title: String,
    pub status: MissionStatus,
    pub completed_at: Option<DateTime<Utc>>,
}

/// A user's standing in one mission set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionSetProgress {
    pub mission_set_id: Uuid,
    pub title: String,
    pub missions: Vec<MissionProgress>,
    pub success_count: i64,
    pub required_count: i32,
    pub cleared: bool,
    pub reward: Option<UserReward>,
}

/// Admin view of a mission set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionSetOverview {
    pub mission_set: MissionSet,
    pub has_staff_pin: bool,
    pub missions: Vec<Mission>,
    pub options: Vec<RewardOption>,
}
