//! Status command - a user's progress in a mission set

use crate::style::*;
use anyhow::Result;
use popup_rewards::RewardsApp;
use uuid::Uuid;

pub async fn run(app: &RewardsApp, set: Uuid, user: &str, json: bool) -> Result<()> {
    let progress = app.missions.progress(set, user).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&progress)?);
        return Ok(());
    }

    print_header(&format!("{} - {}", progress.title, user));
    for mission in &progress.missions {
        println!(
            "  {:<9} {}",
            style_mission_status(mission.status),
            mission.title
        );
    }
    println!();
    println!(
        "Completed: {}/{}",
        style_bold(&progress.success_count.to_string()),
        progress.required_count
    );

    match (&progress.reward, progress.cleared) {
        (Some(reward), _) => {
            println!("Reward:    {}", style_reward_status(reward.status));
        }
        (None, true) => print_success("Cleared - reward available to claim"),
        (None, false) => print_info("Not cleared yet"),
    }
    Ok(())
}
