//! Staff PIN hashing and verification
//!
//! PINs are stored as argon2id PHC strings with a random salt. Verification is
//! done by argon2, which compares digests in constant time.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use tracing::debug;
use uuid::Uuid;

use crate::config::RewardsConfig;
use crate::error::{RewardError, RewardResult};
use crate::models::MissionSet;

/// Hash a staff PIN using argon2id with a random salt.
pub fn hash_pin(pin: &str) -> RewardResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(pin.as_bytes(), &salt)
        .map_err(|e| RewardError::PinHash(e.to_string()))?;
    Ok(hash.to_string())
}

/// Verify a staff PIN against a stored argon2id hash.
pub fn verify_pin(pin: &str, hash: &str) -> RewardResult<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| RewardError::PinHash(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(pin.as_bytes(), &parsed)
        .is_ok())
}

/// Authorize a redemption against the mission set's stored PIN hash
pub fn check_staff_pin(
    mission_set: Option<&MissionSet>,
    mission_set_id: Uuid,
    pin: &str,
) -> RewardResult<()> {
    let hash = mission_set
        .and_then(|set| set.staff_pin_hash.as_deref())
        .ok_or(RewardError::NoStaffPin(mission_set_id))?;
    if verify_pin(pin, hash)? {
        Ok(())
    } else {
        Err(RewardError::InvalidStaffPin)
    }
}

/// Check a new staff PIN against the configured policy
pub fn validate_pin(pin: &str, policy: &RewardsConfig) -> RewardResult<()> {
    let len = pin.chars().count();
    if len < policy.staff_pin_min_length || len > policy.staff_pin_max_length {
        debug!("Rejected staff pin of length {}", len);
        return Err(RewardError::InvalidInput(format!(
            "staff pin must be {}-{} characters",
            policy.staff_pin_min_length, policy.staff_pin_max_length
        )));
    }
    if pin.chars().any(char::is_whitespace) {
        return Err(RewardError::InvalidInput(
            "staff pin must not contain whitespace".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_pin("4821").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_pin("4821", &hash).unwrap());
        assert!(!verify_pin("4822", &hash).unwrap());
    }

    #[test]
    fn test_same_pin_different_salts() {
        let h1 = hash_pin("0000").unwrap();
        let h2 = hash_pin("0000").unwrap();
        assert_ne!(h1, h2);
    }

    #[test]
    fn test_plaintext_is_not_a_valid_hash() {
        assert!(matches!(
            verify_pin("1234", "1234"),
            Err(RewardError::PinHash(_))
        ));
    }

    #[test]
    fn test_check_staff_pin() {
        let id = Uuid::new_v4();
        let mut set = MissionSet {
            id,
            popup_id: "popup-1".to_string(),
            title: "Hunt".to_string(),
            required_success_count: 1,
            staff_pin_hash: None,
            created_at: chrono::Utc::now(),
        };
        assert!(matches!(
            check_staff_pin(None, id, "1234"),
            Err(RewardError::NoStaffPin(_))
        ));
        assert!(matches!(
            check_staff_pin(Some(&set), id, "1234"),
            Err(RewardError::NoStaffPin(_))
        ));

        set.staff_pin_hash = Some(hash_pin("1234").unwrap());
        assert!(check_staff_pin(Some(&set), id, "1234").is_ok());
        assert!(matches!(
            check_staff_pin(Some(&set), id, "4321"),
            Err(RewardError::InvalidStaffPin)
        ));
    }

    #[test]
    fn test_pin_policy() {
        let policy = RewardsConfig::default();
        assert!(validate_pin("1234", &policy).is_ok());
        assert!(validate_pin("123", &policy).is_err());
        assert!(validate_pin("1234567890123", &policy).is_err());
        assert!(validate_pin("12 34", &policy).is_err());
    }
}
