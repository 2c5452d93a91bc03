//! Mission answer evaluation and per-user progress

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use crate::answer;
use crate::config::MissionsConfig;
use crate::error::{RewardError, RewardResult};
use crate::models::{AnswerOutcome, MissionProgress, MissionSetProgress, MissionStatus};
use crate::store::RewardStore;

pub struct MissionService {
    store: Arc<dyn RewardStore>,
    config: MissionsConfig,
}

impl MissionService {
    pub fn new(store: Arc<dyn RewardStore>, config: MissionsConfig) -> Self {
        Self { store, config }
    }

    /// Evaluate a user's answer to a mission.
    ///
    /// A user who already passed is reported as passing without re-evaluation
    /// and their stored status and completion time are left untouched.
    pub async fn submit_answer(
        &self,
        mission_id: Uuid,
        user_id: &str,
        submitted: &str,
    ) -> RewardResult<AnswerOutcome> {
        validate_user_id(user_id)?;

        let mission = self
            .store
            .get_mission(mission_id)
            .await?
            .ok_or(RewardError::MissionNotFound(mission_id))?;
        let set = self
            .store
            .get_mission_set(mission.mission_set_id)
            .await?
            .ok_or(RewardError::MissionSetNotFound(mission.mission_set_id))?;

        let previous = self.store.get_user_mission(user_id, mission_id).await?;
        let already_passed = previous
            .as_ref()
            .is_some_and(|um| um.status == MissionStatus::Success);

        let status = if already_passed {
            debug!(user_id, %mission_id, "Mission already passed, skipping evaluation");
            MissionStatus::Success
        } else {
            self.validate_answer(submitted)?;
            let passed = answer::matches(&mission.answer, submitted);
            // The store never downgrades SUCCESS, so a concurrent pass wins here.
            self.store
                .record_attempt(user_id, mission_id, passed)
                .await?
                .status
        };

        let success_count = self
            .store
            .count_successes(user_id, mission.mission_set_id)
            .await?;
        let cleared = set.is_cleared(success_count);
        let passed = status == MissionStatus::Success;

        info!(
            user_id,
            %mission_id,
            passed,
            success_count,
            required = set.required_success_count,
            "Answer evaluated"
        );

        Ok(AnswerOutcome {
            mission_id,
            mission_set_id: mission.mission_set_id,
            passed,
            already_passed,
            status,
            success_count,
            required_count: set.required_success_count,
            cleared,
        })
    }

    /// A user's standing in a mission set, including any reward they hold
    pub async fn progress(
        &self,
        mission_set_id: Uuid,
        user_id: &str,
    ) -> RewardResult<MissionSetProgress> {
        let set = self
            .store
            .get_mission_set(mission_set_id)
            .await?
            .ok_or(RewardError::MissionSetNotFound(mission_set_id))?;
        let missions = self.store.list_missions(mission_set_id).await?;
        let mut attempts: HashMap<Uuid, _> = self
            .store
            .list_user_missions(user_id, mission_set_id)
            .await?
            .into_iter()
            .map(|um| (um.mission_id, um))
            .collect();

        let missions: Vec<MissionProgress> = missions
            .into_iter()
            .map(|m| {
                let attempt = attempts.remove(&m.id);
                MissionProgress {
                    mission_id: m.id,
                    title: m.title,
                    status: attempt
                        .as_ref()
                        .map_or(MissionStatus::Pending, |um| um.status),
                    completed_at: attempt.and_then(|um| um.completed_at),
                }
            })
            .collect();

        let success_count = missions
            .iter()
            .filter(|m| m.status == MissionStatus::Success)
            .count() as i64;
        let reward = self.store.find_user_reward(user_id, mission_set_id).await?;

        Ok(MissionSetProgress {
            mission_set_id,
            title: set.title.clone(),
            missions,
            success_count,
            required_count: set.required_success_count,
            cleared: set.is_cleared(success_count),
            reward,
        })
    }

    fn validate_answer(&self, submitted: &str) -> RewardResult<()> {
        if answer::normalize(submitted).is_empty() {
            return Err(RewardError::InvalidInput("answer must not be empty".to_string()));
        }
        if submitted.chars().count() > self.config.max_answer_length {
            return Err(RewardError::InvalidInput(format!(
                "answer exceeds {} characters",
                self.config.max_answer_length
            )));
        }
        Ok(())
    }
}

pub(crate) fn validate_user_id(user_id: &str) -> RewardResult<()> {
    if user_id.trim().is_empty() {
        return Err(RewardError::InvalidInput("user id must not be empty".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewMission, NewMissionSet};
    use crate::storage::SqliteStorage;

    async fn setup(required: i32) -> (MissionService, Arc<SqliteStorage>, Uuid, Vec<Uuid>) {
        let storage = Arc::new(SqliteStorage::in_memory().unwrap());
        let set = storage
            .insert_mission_set(&NewMissionSet {
                popup_id: "popup-7".to_string(),
                title: "Gallery walk".to_string(),
                required_success_count: required,
                staff_pin_hash: None,
            })
            .await
            .unwrap();
        let mut mission_ids = Vec::new();
        for (title, answer) in [("Color", "Deep Blue"), ("Artist", "Kim"), ("Year", "1999")] {
            let mission = storage
                .insert_mission(&NewMission {
                    mission_set_id: set.id,
                    title: title.to_string(),
                    description: String::new(),
                    answer: answer.to_string(),
                })
                .await
                .unwrap();
            mission_ids.push(mission.id);
        }
        let service = MissionService::new(storage.clone(), MissionsConfig::default());
        (service, storage, set.id, mission_ids)
    }

    #[tokio::test]
    async fn test_normalized_answer_passes() {
        let (service, _, _, missions) = setup(2).await;
        let outcome = service
            .submit_answer(missions[0], "alice", "  deep    BLUE ")
            .await
            .unwrap();
        assert!(outcome.passed);
        assert!(!outcome.already_passed);
        assert_eq!(outcome.success_count, 1);
        assert!(!outcome.cleared);
    }

    #[tokio::test]
    async fn test_wrong_answer_records_fail() {
        let (service, storage, _, missions) = setup(2).await;
        let outcome = service
            .submit_answer(missions[1], "alice", "Lee")
            .await
            .unwrap();
        assert!(!outcome.passed);
        assert_eq!(outcome.status, MissionStatus::Fail);
        let stored = storage.user_mission("alice", missions[1]).unwrap().unwrap();
        assert_eq!(stored.status, MissionStatus::Fail);
    }

    #[tokio::test]
    async fn test_success_is_idempotent() {
        let (service, storage, _, missions) = setup(2).await;
        service.submit_answer(missions[0], "alice", "deep blue").await.unwrap();
        let before = storage.user_mission("alice", missions[0]).unwrap().unwrap();

        let outcome = service
            .submit_answer(missions[0], "alice", "completely wrong")
            .await
            .unwrap();
        assert!(outcome.passed);
        assert!(outcome.already_passed);

        let after = storage.user_mission("alice", missions[0]).unwrap().unwrap();
        assert_eq!(after.status, MissionStatus::Success);
        assert_eq!(after.completed_at, before.completed_at);
        assert_eq!(after.attempts, before.attempts);
    }

    #[tokio::test]
    async fn test_threshold_reached_reports_cleared() {
        let (service, _, _, missions) = setup(2).await;
        service.submit_answer(missions[0], "bob", "deep blue").await.unwrap();
        let outcome = service.submit_answer(missions[2], "bob", "1999").await.unwrap();
        assert!(outcome.cleared);
        assert_eq!(outcome.success_count, 2);
        assert_eq!(outcome.required_count, 2);
    }

    #[tokio::test]
    async fn test_unknown_mission_and_bad_input() {
        let (service, _, _, missions) = setup(1).await;
        assert!(matches!(
            service.submit_answer(Uuid::new_v4(), "alice", "x").await,
            Err(RewardError::MissionNotFound(_))
        ));
        assert!(matches!(
            service.submit_answer(missions[0], "alice", "   ").await,
            Err(RewardError::InvalidInput(_))
        ));
        assert!(matches!(
            service.submit_answer(missions[0], " ", "kim").await,
            Err(RewardError::InvalidInput(_))
        ));
        let long = "a".repeat(201);
        assert!(matches!(
            service.submit_answer(missions[0], "alice", &long).await,
            Err(RewardError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_progress_lists_pending_missions() {
        let (service, _, set_id, missions) = setup(2).await;
        service.submit_answer(missions[1], "carol", "kim").await.unwrap();
        service.submit_answer(missions[2], "carol", "2000").await.unwrap();

        let progress = service.progress(set_id, "carol").await.unwrap();
        let statuses: Vec<MissionStatus> = progress.missions.iter().map(|m| m.status).collect();
        assert_eq!(
            statuses,
            vec![MissionStatus::Pending, MissionStatus::Success, MissionStatus::Fail]
        );
        assert_eq!(progress.success_count, 1);
        assert!(!progress.cleared);
        assert!(progress.reward.is_none());
    }
}
