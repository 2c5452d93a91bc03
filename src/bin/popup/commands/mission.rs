//! Answer command - submit a mission answer

use crate::style::*;
use anyhow::Result;
use popup_rewards::RewardsApp;
use uuid::Uuid;

pub async fn answer(app: &RewardsApp, mission: Uuid, user: &str, answer: &str) -> Result<()> {
    let outcome = app.missions.submit_answer(mission, user, answer).await?;

    if outcome.already_passed {
        print_info("Mission already passed");
    } else if outcome.passed {
        print_success("Correct answer!");
    } else {
        print_warning("Incorrect answer, try again");
    }

    println!(
        "Progress:  {}/{}",
        style_bold(&outcome.success_count.to_string()),
        outcome.required_count
    );
    if outcome.cleared {
        print_success("Mission set cleared - a reward can now be claimed");
    }
    Ok(())
}
