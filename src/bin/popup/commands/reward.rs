//! Reward commands - claim, redeem and list

use crate::style::*;
use anyhow::Result;
use popup_rewards::RewardsApp;
use uuid::Uuid;

pub async fn claim(app: &RewardsApp, set: Uuid, option: Uuid, user: &str) -> Result<()> {
    let receipt = app.rewards.claim(set, option, user).await?;
    if receipt.newly_issued {
        print_success("Reward issued!");
    } else {
        print_info("Reward was already claimed for this mission set");
    }
    println!("Reward ID: {}", style_cyan(&receipt.reward.id.to_string()));
    println!("Option:    {}", receipt.reward.reward_option_id);
    println!("Status:    {}", style_reward_status(receipt.reward.status));
    Ok(())
}

pub async fn redeem(app: &RewardsApp, set: Uuid, user: &str, pin: &str) -> Result<()> {
    let reward = app.rewards.redeem(set, user, pin).await?;
    print_success("Reward redeemed");
    if let Some(at) = reward.redeemed_at {
        println!("Redeemed at: {}", style_dim(&at.to_rfc3339()));
    }
    Ok(())
}

pub async fn list(app: &RewardsApp, user: &str, json: bool) -> Result<()> {
    let rewards = app.rewards.user_rewards(user).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&rewards)?);
        return Ok(());
    }
    print_header(&format!("Rewards for {}", user));

    if rewards.is_empty() {
        println!("{}", style_dim("No rewards yet."));
        return Ok(());
    }
    for reward in &rewards {
        println!(
            "  {}  set {}  {}  {}",
            style_dim(&reward.id.to_string()),
            reward.mission_set_id,
            style_reward_status(reward.status),
            reward.issued_at.format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}
