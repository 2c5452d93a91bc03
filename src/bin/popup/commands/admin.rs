//! Admin commands - mission sets, missions and reward options

use crate::style::*;
use anyhow::Result;
use popup_rewards::RewardsApp;
use uuid::Uuid;

pub async fn create_set(
    app: &RewardsApp,
    popup: &str,
    title: &str,
    required: i32,
    staff_pin: Option<&str>,
) -> Result<()> {
    let set = app
        .admin
        .create_mission_set(popup, title, required, staff_pin)
        .await?;
    print_success(&format!("Created mission set {}", style_bold(&set.title)));
    println!("Set ID:    {}", style_cyan(&set.id.to_string()));
    println!("Required:  {}", set.required_success_count);
    if staff_pin.is_none() {
        print_warning("No staff PIN set; rewards cannot be redeemed until one is configured");
    }
    Ok(())
}

pub async fn set_pin(app: &RewardsApp, set: Uuid, pin: &str) -> Result<()> {
    app.admin.set_staff_pin(set, pin).await?;
    print_success("Staff PIN updated");
    Ok(())
}

pub async fn add_mission(
    app: &RewardsApp,
    set: Uuid,
    title: &str,
    description: &str,
    answer: &str,
) -> Result<()> {
    let mission = app.admin.add_mission(set, title, description, answer).await?;
    print_success(&format!("Added mission {}", style_bold(&mission.title)));
    println!("Mission ID: {}", style_cyan(&mission.id.to_string()));
    Ok(())
}

pub async fn add_option(app: &RewardsApp, set: Uuid, name: &str, stock: i32) -> Result<()> {
    let option = app.admin.add_reward_option(set, name, stock).await?;
    print_success(&format!(
        "Added reward option {} ({} in stock)",
        style_bold(&option.name),
        option.total_stock
    ));
    println!("Option ID: {}", style_cyan(&option.id.to_string()));
    Ok(())
}

pub async fn restock(app: &RewardsApp, option: Uuid, total: i32) -> Result<()> {
    let option = app.admin.restock_option(option, total).await?;
    print_success(&format!(
        "{}: {} of {} remaining",
        option.name,
        option.remaining(),
        option.total_stock
    ));
    Ok(())
}

pub async fn show_set(app: &RewardsApp, set: Uuid) -> Result<()> {
    let overview = app.admin.mission_set_overview(set).await?;
    let ms = &overview.mission_set;

    print_header(&format!("Mission Set: {}", ms.title));
    println!("Set ID:     {}", style_cyan(&ms.id.to_string()));
    println!("Popup:      {}", ms.popup_id);
    println!(
        "Required:   {} of {} missions",
        ms.required_success_count,
        overview.missions.len()
    );
    println!(
        "Staff PIN:  {}",
        if overview.has_staff_pin {
            style_green("configured")
        } else {
            style_yellow("not set")
        }
    );

    print_header("Missions");
    if overview.missions.is_empty() {
        println!("{}", style_dim("(none)"));
    }
    for mission in &overview.missions {
        println!("  {}  {}", style_dim(&mission.id.to_string()), mission.title);
    }

    print_header("Reward Options");
    if overview.options.is_empty() {
        println!("{}", style_dim("(none)"));
    }
    for option in &overview.options {
        let remaining = option.remaining();
        let stock = format!("{}/{}", remaining, option.total_stock);
        println!(
            "  {}  {:<24} {}",
            style_dim(&option.id.to_string()),
            option.name,
            if remaining == 0 {
                style_red(&stock)
            } else {
                style_green(&stock)
            }
        );
    }
    Ok(())
}
