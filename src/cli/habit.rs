//! CLI `habit` commands. Every command acts as the user given by `--user`.

use anyhow::Result;

use habitus::config::HabitusConfig;
use habitus::streak::{Habit, HabitEdit};

pub async fn add(
    config: &HabitusConfig,
    user_id: &str,
    title: &str,
    description: Option<String>,
) -> Result<()> {
    let reconciler = super::open_reconciler(config)?;
    let habit = reconciler.create_habit(user_id, title, description).await?;
    println!("Created habit \"{}\" ({})", habit.title, habit.id);
    Ok(())
}

pub async fn list(config: &HabitusConfig, user_id: &str, json: bool) -> Result<()> {
    let reconciler = super::open_reconciler(config)?;
    let habits = reconciler.list_habits(user_id).await?;
    let user = reconciler.get_user(user_id).await?;

    if json {
        let out = serde_json::json!({
            "habits": habits,
            "total_streaks": user.total_streaks,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    if habits.is_empty() {
        println!("No habits for {}.", user.username);
    } else {
        println!("{:<36}  {:>6}  {:<10}  TITLE", "ID", "STREAK", "LAST DONE");
        for habit in &habits {
            print_row(habit);
        }
    }
    println!();
    println!("Engagement streak: {} day(s)", user.total_streaks);
    Ok(())
}

fn print_row(habit: &Habit) {
    let last = habit
        .last_completed
        .map(|t| t.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".into());
    println!(
        "{:<36}  {:>6}  {:<10}  {}",
        habit.id, habit.current_streak, last, habit.title
    );
}

pub async fn complete(config: &HabitusConfig, user_id: &str, habit_id: &str) -> Result<()> {
    let reconciler = super::open_reconciler(config)?;
    let habit = reconciler.complete_habit(habit_id, user_id).await?;
    println!("\"{}\" done. Streak: {}", habit.title, habit.current_streak);
    Ok(())
}

pub async fn fail(config: &HabitusConfig, user_id: &str, habit_id: &str) -> Result<()> {
    let reconciler = super::open_reconciler(config)?;
    let habit = reconciler.fail_habit(habit_id, user_id).await?;
    println!("\"{}\" streak reset.", habit.title);
    Ok(())
}

pub async fn edit(
    config: &HabitusConfig,
    user_id: &str,
    habit_id: &str,
    title: Option<String>,
    description: Option<String>,
) -> Result<()> {
    let edit = HabitEdit::from_patch(title, description);
    anyhow::ensure!(!edit.is_empty(), "nothing to change: pass --title and/or --description");

    let reconciler = super::open_reconciler(config)?;
    let habit = reconciler.update_habit(habit_id, user_id, edit).await?;
    println!("Updated habit \"{}\" ({})", habit.title, habit.id);
    Ok(())
}

pub async fn remove(config: &HabitusConfig, user_id: &str, habit_id: &str) -> Result<()> {
    let reconciler = super::open_reconciler(config)?;
    reconciler.delete_habit(habit_id, user_id).await?;
    let user = reconciler.get_user(user_id).await?;
    println!("Deleted habit {habit_id}. Engagement streak: {} day(s)", user.total_streaks);
    Ok(())
}
