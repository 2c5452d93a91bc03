//! Admin operations: mission sets, missions, reward options and staff PINs

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::auth::{hash_pin, validate_pin};
use crate::config::RewardsConfig;
use crate::error::{RewardError, RewardResult};
use crate::models::{
    Mission, MissionSet, MissionSetOverview, NewMission, NewMissionSet, NewRewardOption,
    RewardOption,
};
use crate::store::RewardStore;

pub struct AdminService {
    store: Arc<dyn RewardStore>,
    pin_policy: RewardsConfig,
}

impl AdminService {
    pub fn new(store: Arc<dyn RewardStore>, pin_policy: RewardsConfig) -> Self {
        Self { store, pin_policy }
    }

    pub async fn create_mission_set(
        &self,
        popup_id: &str,
        title: &str,
        required_success_count: i32,
        staff_pin: Option<&str>,
    ) -> RewardResult<MissionSet> {
        require_non_empty("popup id", popup_id)?;
        require_non_empty("title", title)?;
        if required_success_count < 1 {
            return Err(RewardError::InvalidInput(
                "required success count must be at least 1".to_string(),
            ));
        }
        let staff_pin_hash = match staff_pin {
            Some(pin) => {
                validate_pin(pin, &self.pin_policy)?;
                Some(hash_pin(pin)?)
            }
            None => None,
        };

        let set = self
            .store
            .insert_mission_set(&NewMissionSet {
                popup_id: popup_id.trim().to_string(),
                title: title.trim().to_string(),
                required_success_count,
                staff_pin_hash,
            })
            .await?;
        info!(mission_set_id = %set.id, popup_id, "Created mission set");
        Ok(set)
    }

    /// Set or rotate the redemption PIN of a mission set
    pub async fn set_staff_pin(&self, mission_set_id: Uuid, pin: &str) -> RewardResult<()> {
        validate_pin(pin, &self.pin_policy)?;
        let hash = hash_pin(pin)?;
        self.store.update_staff_pin(mission_set_id, &hash).await?;
        info!(%mission_set_id, "Staff pin updated");
        Ok(())
    }

    pub async fn add_mission(
        &self,
        mission_set_id: Uuid,
        title: &str,
        description: &str,
        answer: &str,
    ) -> RewardResult<Mission> {
        require_non_empty("title", title)?;
        require_non_empty("answer", answer)?;
        let mission = self
            .store
            .insert_mission(&NewMission {
                mission_set_id,
                title: title.trim().to_string(),
                description: description.trim().to_string(),
                answer: answer.to_string(),
            })
            .await?;
        info!(%mission_set_id, mission_id = %mission.id, "Added mission");
        Ok(mission)
    }

    pub async fn add_reward_option(
        &self,
        mission_set_id: Uuid,
        name: &str,
        total_stock: i32,
    ) -> RewardResult<RewardOption> {
        require_non_empty("name", name)?;
        if total_stock < 0 {
            return Err(RewardError::InvalidInput(
                "total stock must not be negative".to_string(),
            ));
        }
        let option = self
            .store
            .insert_reward_option(&NewRewardOption {
                mission_set_id,
                name: name.trim().to_string(),
                total_stock,
            })
            .await?;
        info!(%mission_set_id, option_id = %option.id, total_stock, "Added reward option");
        Ok(option)
    }

    pub async fn restock_option(
        &self,
        option_id: Uuid,
        total_stock: i32,
    ) -> RewardResult<RewardOption> {
        if total_stock < 0 {
            return Err(RewardError::InvalidInput(
                "total stock must not be negative".to_string(),
            ));
        }
        self.store.restock_option(option_id, total_stock).await
    }

    pub async fn mission_set_overview(
        &self,
        mission_set_id: Uuid,
    ) -> RewardResult<MissionSetOverview> {
        let mission_set = self
            .store
            .get_mission_set(mission_set_id)
            .await?
            .ok_or(RewardError::MissionSetNotFound(mission_set_id))?;
        let missions = self.store.list_missions(mission_set_id).await?;
        let options = self.store.list_reward_options(mission_set_id).await?;

        Ok(MissionSetOverview {
            has_staff_pin: mission_set.staff_pin_hash.is_some(),
            mission_set,
            missions,
            options,
        })
    }
}

fn require_non_empty(field: &str, value: &str) -> RewardResult<()> {
    if value.trim().is_empty() {
        return Err(RewardError::InvalidInput(format!("{} must not be empty", field)));
    }
    Ok(())
}
