//! Reward claim and staff redemption

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::check_staff_pin;
use crate::error::{RewardError, RewardResult};
use crate::missions::validate_user_id;
use crate::models::{ClaimReceipt, RewardStatus, UserReward};
use crate::store::RewardStore;

pub struct RewardService {
    store: Arc<dyn RewardStore>,
}

impl RewardService {
    pub fn new(store: Arc<dyn RewardStore>) -> Self {
        Self { store }
    }

    /// Claim one unit of a reward option for a user who cleared the set.
    ///
    /// Retrying returns the reward issued the first time, whichever option was
    /// asked for, and stock is only ever decremented once per user and set.
    pub async fn claim(
        &self,
        mission_set_id: Uuid,
        option_id: Uuid,
        user_id: &str,
    ) -> RewardResult<ClaimReceipt> {
        validate_user_id(user_id)?;

        match self
            .store
            .claim_reward(mission_set_id, option_id, user_id)
            .await
        {
            Ok(receipt) => {
                if receipt.newly_issued {
                    info!(
                        user_id,
                        %mission_set_id,
                        %option_id,
                        reward_id = %receipt.reward.id,
                        "Reward issued"
                    );
                } else {
                    info!(
                        user_id,
                        %mission_set_id,
                        reward_id = %receipt.reward.id,
                        "Reward already claimed"
                    );
                }
                Ok(receipt)
            }
            Err(RewardError::OutOfStock(id)) => {
                warn!(user_id, %mission_set_id, option_id = %id, "Reward option out of stock");
                Err(RewardError::OutOfStock(id))
            }
            Err(e) => Err(e),
        }
    }

    /// Mark a user's issued reward as handed over, authorized by the staff PIN.
    ///
    /// Argon2 verification runs on the blocking pool before any row is touched;
    /// the status update itself is guarded so only one concurrent redeem wins.
    pub async fn redeem(
        &self,
        mission_set_id: Uuid,
        user_id: &str,
        staff_pin: &str,
    ) -> RewardResult<UserReward> {
        validate_user_id(user_id)?;

        let issued = self
            .store
            .find_user_reward(user_id, mission_set_id)
            .await?
            .filter(|r| r.status == RewardStatus::Issued);
        if issued.is_none() {
            return Err(RewardError::NotIssued {
                user_id: user_id.to_string(),
                mission_set_id,
            });
        }

        let mission_set = self.store.get_mission_set(mission_set_id).await?;
        let pin = staff_pin.to_string();
        let checked = tokio::task::spawn_blocking(move || {
            check_staff_pin(mission_set.as_ref(), mission_set_id, &pin)
        })
        .await
        .map_err(|e| RewardError::PinHash(e.to_string()))?;
        if let Err(e) = checked {
            warn!(user_id, %mission_set_id, "Staff pin check failed");
            return Err(e);
        }

        let reward = self.store.redeem_reward(mission_set_id, user_id).await?;
        info!(user_id, %mission_set_id, reward_id = %reward.id, "Reward redeemed");
        Ok(reward)
    }

    pub async fn user_rewards(&self, user_id: &str) -> RewardResult<Vec<UserReward>> {
        validate_user_id(user_id)?;
        self.store.list_user_rewards(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::hash_pin;
    use crate::models::{NewMission, NewMissionSet, NewRewardOption};
    use tokio_test::{assert_err, assert_ok};
    use crate::storage::SqliteStorage;

    struct Fixture {
        service: RewardService,
        storage: Arc<SqliteStorage>,
        set_id: Uuid,
        option_id: Uuid,
        missions: Vec<Uuid>,
    }

    async fn fixture(stock: i32, pin: Option<&str>) -> Fixture {
        let storage = Arc::new(SqliteStorage::in_memory().unwrap());
        let set = storage
            .insert_mission_set(&NewMissionSet {
                popup_id: "popup-3".to_string(),
                title: "Night market".to_string(),
                required_success_count: 1,
                staff_pin_hash: pin.map(|p| hash_pin(p).unwrap()),
            })
            .await
            .unwrap();
        let mission = storage
            .insert_mission(&NewMission {
                mission_set_id: set.id,
                title: "Stall".to_string(),
                description: String::new(),
                answer: "dumplings".to_string(),
            })
            .await
            .unwrap();
        let option = storage
            .insert_reward_option(&NewRewardOption {
                mission_set_id: set.id,
                name: "Coupon".to_string(),
                total_stock: stock,
            })
            .await
            .unwrap();
        Fixture {
            service: RewardService::new(storage.clone()),
            storage,
            set_id: set.id,
            option_id: option.id,
            missions: vec![mission.id],
        }
    }

    impl Fixture {
        async fn clear(&self, user: &str) {
            self.storage
                .record_attempt(user, self.missions[0], true)
                .await
                .unwrap();
        }

        fn issued(&self) -> i32 {
            self.storage.reward_options(self.set_id).unwrap()[0].issued
        }
    }

    #[tokio::test]
    async fn test_claim_requires_cleared_set() {
        let f = fixture(3, None).await;
        let err = f.service.claim(f.set_id, f.option_id, "alice").await.unwrap_err();
        assert!(matches!(err, RewardError::NotCleared { .. }));
        assert_eq!(err.code(), "NOT_CLEARED");
        assert_eq!(f.issued(), 0);
    }

    #[tokio::test]
    async fn test_claim_is_idempotent() {
        let f = fixture(3, None).await;
        f.clear("alice").await;

        let first = f.service.claim(f.set_id, f.option_id, "alice").await.unwrap();
        let second = f.service.claim(f.set_id, f.option_id, "alice").await.unwrap();
        assert!(first.newly_issued);
        assert!(!second.newly_issued);
        assert_eq!(first.reward.id, second.reward.id);
        assert_eq!(second.reward.status, RewardStatus::Issued);
        assert_eq!(f.issued(), 1);
    }

    #[tokio::test]
    async fn test_claim_unknown_set_and_option() {
        let f = fixture(3, None).await;
        f.clear("alice").await;

        assert!(matches!(
            f.service.claim(Uuid::new_v4(), f.option_id, "alice").await,
            Err(RewardError::MissionSetNotFound(_))
        ));
        assert!(matches!(
            f.service.claim(f.set_id, Uuid::new_v4(), "alice").await,
            Err(RewardError::InvalidOption(_))
        ));
    }

    #[tokio::test]
    async fn test_claim_option_from_other_set() {
        let f = fixture(3, None).await;
        f.clear("alice").await;

        let elsewhere = f
            .storage
            .insert_mission_set(&NewMissionSet {
                popup_id: "popup-9".to_string(),
                title: "Elsewhere".to_string(),
                required_success_count: 1,
                staff_pin_hash: None,
            })
            .await
            .unwrap();
        let foreign = f
            .storage
            .insert_reward_option(&NewRewardOption {
                mission_set_id: elsewhere.id,
                name: "Poster".to_string(),
                total_stock: 1,
            })
            .await
            .unwrap();

        assert!(matches!(
            f.service.claim(f.set_id, foreign.id, "alice").await,
            Err(RewardError::OptionNotInSet { .. })
        ));
        assert_eq!(f.storage.reward_options(elsewhere.id).unwrap()[0].issued, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_last_unit_goes_to_one_claimant() {
        let f = fixture(1, None).await;
        let users: Vec<String> = (0..8).map(|i| format!("user-{}", i)).collect();
        for user in &users {
            f.clear(user).await;
        }

        let service = Arc::new(f.service);
        let mut handles = Vec::new();
        for user in users.clone() {
            let service = service.clone();
            let (set_id, option_id) = (f.set_id, f.option_id);
            handles.push(tokio::spawn(async move {
                service.claim(set_id, option_id, &user).await
            }));
        }

        let mut issued = 0;
        let mut out_of_stock = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(receipt) if receipt.newly_issued => issued += 1,
                Err(RewardError::OutOfStock(_)) => out_of_stock += 1,
                other => panic!("unexpected claim result: {:?}", other),
            }
        }
        assert_eq!(issued, 1);
        assert_eq!(out_of_stock, users.len() - 1);
        assert_eq!(f.storage.reward_options(f.set_id).unwrap()[0].issued, 1);
    }

    #[tokio::test]
    async fn test_redeem_flow() {
        let f = fixture(2, Some("7788")).await;
        f.clear("alice").await;

        assert!(matches!(
            f.service.redeem(f.set_id, "alice", "7788").await,
            Err(RewardError::NotIssued { .. })
        ));

        f.service.claim(f.set_id, f.option_id, "alice").await.unwrap();

        let err = f.service.redeem(f.set_id, "alice", "0000").await.unwrap_err();
        assert!(matches!(err, RewardError::InvalidStaffPin));
        assert_eq!(err.public_message(), "staff authentication failed");

        let redeemed = f.service.redeem(f.set_id, "alice", "7788").await.unwrap();
        assert_eq!(redeemed.status, RewardStatus::Redeemed);
        assert!(redeemed.redeemed_at.is_some());

        assert!(matches!(
            f.service.redeem(f.set_id, "alice", "7788").await,
            Err(RewardError::NotIssued { .. })
        ));
    }

    #[tokio::test]
    async fn test_redeem_without_configured_pin() {
        let f = fixture(2, None).await;
        f.clear("alice").await;
        f.service.claim(f.set_id, f.option_id, "alice").await.unwrap();

        let err = f.service.redeem(f.set_id, "alice", "1234").await.unwrap_err();
        assert!(matches!(err, RewardError::NoStaffPin(_)));
        assert_eq!(err.public_message(), "staff authentication failed");
        let reward = f.storage.user_reward("alice", f.set_id).unwrap().unwrap();
        assert_eq!(reward.status, RewardStatus::Issued);
    }

    #[tokio::test]
    async fn test_user_rewards_newest_first() {
        let f = fixture(2, None).await;
        f.clear("alice").await;
        f.service.claim(f.set_id, f.option_id, "alice").await.unwrap();

        let rewards = f.service.user_rewards("alice").await.unwrap();
        assert_eq!(rewards.len(), 1);
        assert_eq!(rewards[0].reward_option_id, f.option_id);
        assert!(f.service.user_rewards("bob").await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_same_user_concurrent_claims_share_one_reward() {
        let f = fixture(5, None).await;
        f.clear("alice").await;

        let service = Arc::new(f.service);
        let mut handles = Vec::new();
        for _ in 0..8 {
            let service = service.clone();
            let (set_id, option_id) = (f.set_id, f.option_id);
            handles.push(tokio::spawn(async move {
                service.claim(set_id, option_id, "alice").await
            }));
        }

        let mut reward_ids = Vec::new();
        let mut newly_issued = 0;
        for handle in handles {
            let receipt = assert_ok!(handle.await.unwrap());
            if receipt.newly_issued {
                newly_issued += 1;
            }
            reward_ids.push(receipt.reward.id);
        }
        reward_ids.dedup();
        assert_eq!(reward_ids.len(), 1);
        assert_eq!(newly_issued, 1);
        assert_eq!(f.storage.reward_options(f.set_id).unwrap()[0].issued, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_redeem_succeeds_once() {
        let f = fixture(2, Some("7788")).await;
        f.clear("alice").await;
        assert_ok!(f.service.claim(f.set_id, f.option_id, "alice").await);

        let service = Arc::new(f.service);
        let mut handles = Vec::new();
        for _ in 0..4 {
            let service = service.clone();
            let set_id = f.set_id;
            handles.push(tokio::spawn(async move {
                service.redeem(set_id, "alice", "7788").await
            }));
        }

        let mut redeemed = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(reward) => {
                    assert_eq!(reward.status, RewardStatus::Redeemed);
                    redeemed += 1;
                }
                Err(RewardError::NotIssued { .. }) => {}
                other => panic!("unexpected redeem result: {:?}", other),
            }
        }
        assert_eq!(redeemed, 1);
        let reward = f.storage.user_reward("alice", f.set_id).unwrap().unwrap();
        assert_eq!(reward.status, RewardStatus::Redeemed);
    }

    #[tokio::test]
    async fn test_wrong_pin_leaves_reward_issued() {
        let f = fixture(1, Some("7788")).await;
        f.clear("alice").await;
        assert_ok!(f.service.claim(f.set_id, f.option_id, "alice").await);

        let err = assert_err!(f.service.redeem(f.set_id, "alice", "1111").await);
        assert_eq!(err.code(), "STAFF_AUTH_FAILED");
        let reward = f.storage.user_reward("alice", f.set_id).unwrap().unwrap();
        assert_eq!(reward.status, RewardStatus::Issued);
        assert!(reward.redeemed_at.is_none());
    }
}
