//! CLI `user` commands.

use anyhow::Result;

use habitus::config::HabitusConfig;

pub async fn add(config: &HabitusConfig, username: &str, email: Option<String>) -> Result<()> {
    let reconciler = super::open_reconciler(config)?;
    let user = reconciler.register_user(username, email).await?;
    println!("Created user {} ({})", user.username, user.id);
    Ok(())
}

pub async fn show(config: &HabitusConfig, user_id: &str) -> Result<()> {
    let reconciler = super::open_reconciler(config)?;
    let user = reconciler.get_user(user_id).await?;

    println!("ID:              {}", user.id);
    println!("Username:        {}", user.username);
    println!("Email:           {}", user.email.as_deref().unwrap_or("(none)"));
    println!("Engagement:      {} day(s)", user.total_streaks);
    println!("Created:         {}", user.created_at.format("%Y-%m-%d %H:%M UTC"));
    Ok(())
}

pub async fn remove(config: &HabitusConfig, user_id: &str) -> Result<()> {
    let reconciler = super::open_reconciler(config)?;
    reconciler.remove_user(user_id).await?;
    println!("Removed user {user_id} and their habits.");
    Ok(())
}
