//! Service wiring

use std::sync::Arc;

use anyhow::Result;

use crate::admin::AdminService;
use crate::config::Config;
use crate::missions::MissionService;
use crate::rewards::RewardService;
use crate::store::{open_store, RewardStore};

/// All services over one shared store
pub struct RewardsApp {
    pub missions: MissionService,
    pub rewards: RewardService,
    pub admin: AdminService,
}

impl RewardsApp {
    pub fn new(store: Arc<dyn RewardStore>, config: &Config) -> Self {
        Self {
            missions: MissionService::new(store.clone(), config.missions.clone()),
            rewards: RewardService::new(store.clone()),
            admin: AdminService::new(store, config.rewards.clone()),
        }
    }

    /// Open the configured database and build the services
    pub async fn connect(config: &Config) -> Result<Self> {
        let store = open_store(&config.database_url(), &config.database).await?;
        Ok(Self::new(store, config))
    }
}
