//! Error types for mission and reward operations

use thiserror::Error;
use uuid::Uuid;

/// Coarse classification used by callers to pick a response status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    BadRequest,
    Internal,
}

impl ErrorKind {
    /// HTTP-equivalent status code
    pub fn status_code(self) -> u16 {
        match self {
            ErrorKind::NotFound => 404,
            ErrorKind::BadRequest => 400,
            ErrorKind::Internal => 500,
        }
    }
}

#[derive(Debug, Error)]
pub enum RewardError {
    #[error("mission set {0} not found")]
    MissionSetNotFound(Uuid),

    #[error("mission {0} not found")]
    MissionNotFound(Uuid),

    #[error("reward option {0} not found")]
    RewardOptionNotFound(Uuid),

    #[error("mission set not cleared: {success_count}/{required_count} missions completed")]
    NotCleared {
        success_count: i64,
        required_count: i32,
    },

    #[error("invalid reward option {0}")]
    InvalidOption(Uuid),

    #[error("reward option {option_id} is not part of mission set {mission_set_id}")]
    OptionNotInSet { option_id: Uuid, mission_set_id: Uuid },

    #[error("reward option {0} is out of stock")]
    OutOfStock(Uuid),

    #[error("no issued reward for user {user_id} in mission set {mission_set_id}")]
    NotIssued { user_id: String, mission_set_id: Uuid },

    #[error("mission set {0} has no staff pin configured")]
    NoStaffPin(Uuid),

    #[error("invalid staff pin")]
    InvalidStaffPin,

    #[error("cannot set total stock {total} below {issued} already issued")]
    StockBelowIssued { total: i32, issued: i32 },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("postgres error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    #[error("connection pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    #[error("pin hashing error: {0}")]
    PinHash(String),
}

impl RewardError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RewardError::MissionSetNotFound(_)
            | RewardError::MissionNotFound(_)
            | RewardError::RewardOptionNotFound(_) => ErrorKind::NotFound,
            RewardError::NotCleared { .. }
            | RewardError::InvalidOption(_)
            | RewardError::OptionNotInSet { .. }
            | RewardError::OutOfStock(_)
            | RewardError::NotIssued { .. }
            | RewardError::NoStaffPin(_)
            | RewardError::InvalidStaffPin
            | RewardError::StockBelowIssued { .. }
            | RewardError::InvalidInput(_) => ErrorKind::BadRequest,
            RewardError::Sqlite(_)
            | RewardError::Postgres(_)
            | RewardError::Pool(_)
            | RewardError::PinHash(_) => ErrorKind::Internal,
        }
    }

    pub fn status_code(&self) -> u16 {
        self.kind().status_code()
    }

    /// Stable reason code for clients
    pub fn code(&self) -> &'static str {
        match self {
            RewardError::MissionSetNotFound(_) => "MISSION_SET_NOT_FOUND",
            RewardError::MissionNotFound(_) => "MISSION_NOT_FOUND",
            RewardError::RewardOptionNotFound(_) => "REWARD_OPTION_NOT_FOUND",
            RewardError::NotCleared { .. } => "NOT_CLEARED",
            RewardError::InvalidOption(_) => "INVALID_OPTION",
            RewardError::OptionNotInSet { .. } => "OPTION_NOT_IN_SET",
            RewardError::OutOfStock(_) => "OUT_OF_STOCK",
            RewardError::NotIssued { .. } => "NOT_ISSUED",
            RewardError::NoStaffPin(_) | RewardError::InvalidStaffPin => "STAFF_AUTH_FAILED",
            RewardError::StockBelowIssued { .. } => "STOCK_BELOW_ISSUED",
            RewardError::InvalidInput(_) => "INVALID_INPUT",
            RewardError::Sqlite(_)
            | RewardError::Postgres(_)
            | RewardError::Pool(_)
            | RewardError::PinHash(_) => "INTERNAL_ERROR",
        }
    }

    /// Message safe to show to the caller.
    ///
    /// Staff PIN failures collapse into one message so the caller cannot tell
    /// a missing PIN from a wrong one. Internal failures never leak details.
    pub fn public_message(&self) -> String {
        match self {
            RewardError::NoStaffPin(_) | RewardError::InvalidStaffPin => {
                "staff authentication failed".to_string()
            }
            _ if self.kind() == ErrorKind::Internal => "internal error".to_string(),
            _ => self.to_string(),
        }
    }
}

pub type RewardResult<T> = std::result::Result<T, RewardError>;
