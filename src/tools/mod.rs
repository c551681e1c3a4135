pub mod complete_habit;
pub mod create_habit;
pub mod delete_habit;
pub mod leaderboard;
pub mod list_habits;
pub mod repair_streaks;
pub mod update_habit;

use complete_habit::HabitActionParams;
use create_habit::CreateHabitParams;
use delete_habit::DeleteHabitParams;
use habitus::streak::HabitEdit;
use habitus::{EngineError, Reconciler};
use leaderboard::LeaderboardParams;
use list_habits::ListHabitsParams;
use repair_streaks::RepairStreaksParams;
use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::{tool, tool_handler, tool_router, ServerHandler};
use serde::Serialize;
use std::sync::Arc;
use update_habit::UpdateHabitParams;

/// The habitus MCP tool handler. Holds the shared reconciler and exposes every
/// habit operation via the `#[tool_router]` macro.
#[derive(Clone)]
pub struct HabitusTools {
    tool_router: ToolRouter<Self>,
    reconciler: Arc<Reconciler>,
    leaderboard_size: usize,
}

/// Render an engine error with a stable kind prefix so clients can branch on it.
fn tool_error(e: EngineError) -> String {
    let kind = match &e {
        EngineError::NotFound { .. } => "not_found",
        EngineError::OwnershipViolation { .. } => "forbidden",
        EngineError::AlreadyCompletedToday { .. } => "already_completed",
        EngineError::InvalidInput(_) => "invalid_input",
        EngineError::StoreUnavailable(_) => "unavailable",
    };
    format!("{kind}: {e}")
}

fn to_json<T: Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string(value).map_err(|e| format!("serialization failed: {e}"))
}

#[tool_router]
impl HabitusTools {
    pub fn new(reconciler: Arc<Reconciler>, leaderboard_size: usize) -> Self {
        Self {
            tool_router: Self::tool_router(),
            reconciler,
            leaderboard_size,
        }
    }

    /// List a user's habits. Also resets lapsed streaks and refreshes the engagement streak.
    #[tool(description = "List a user's habits with current streaks. Lapsed habit streaks are reset and the user's engagement streak is recomputed as part of the read.")]
    async fn list_habits(
        &self,
        Parameters(params): Parameters<ListHabitsParams>,
    ) -> Result<String, String> {
        tracing::info!(user_id = %params.user_id, "list_habits called");
        let habits = self
            .reconciler
            .list_habits(&params.user_id)
            .await
            .map_err(tool_error)?;
        let user = self
            .reconciler
            .get_user(&params.user_id)
            .await
            .map_err(tool_error)?;

        Ok(serde_json::json!({
            "habits": habits,
            "total_streaks": user.total_streaks,
        })
        .to_string())
    }

    #[tool(description = "Create a new habit for a user. Starts with a streak of 0.")]
    async fn create_habit(
        &self,
        Parameters(params): Parameters<CreateHabitParams>,
    ) -> Result<String, String> {
        tracing::info!(user_id = %params.user_id, "create_habit called");
        let habit = self
            .reconciler
            .create_habit(&params.user_id, &params.title, params.description)
            .await
            .map_err(tool_error)?;
        to_json(&habit)
    }

    /// Mark a habit done for today.
    #[tool(description = "Mark a habit as completed today. Fails if it was already completed today. Recomputes the user's engagement streak.")]
    async fn complete_habit(
        &self,
        Parameters(params): Parameters<HabitActionParams>,
    ) -> Result<String, String> {
        tracing::info!(habit_id = %params.habit_id, user_id = %params.user_id, "complete_habit called");
        let habit = self
            .reconciler
            .complete_habit(&params.habit_id, &params.user_id)
            .await
            .map_err(tool_error)?;
        to_json(&habit)
    }

    #[tool(description = "Mark a habit as not done. Resets its streak to 0 and recomputes the user's engagement streak.")]
    async fn fail_habit(
        &self,
        Parameters(params): Parameters<HabitActionParams>,
    ) -> Result<String, String> {
        tracing::info!(habit_id = %params.habit_id, user_id = %params.user_id, "fail_habit called");
        let habit = self
            .reconciler
            .fail_habit(&params.habit_id, &params.user_id)
            .await
            .map_err(tool_error)?;
        to_json(&habit)
    }

    #[tool(description = "Edit a habit's title or description. Streak state is not affected.")]
    async fn update_habit(
        &self,
        Parameters(params): Parameters<UpdateHabitParams>,
    ) -> Result<String, String> {
        tracing::info!(habit_id = %params.habit_id, user_id = %params.user_id, "update_habit called");
        let edit = HabitEdit::from_patch(params.title, params.description);
        let habit = self
            .reconciler
            .update_habit(&params.habit_id, &params.user_id, edit)
            .await
            .map_err(tool_error)?;
        to_json(&habit)
    }

    #[tool(description = "Delete a habit. The user's engagement streak is recomputed from the remaining habits.")]
    async fn delete_habit(
        &self,
        Parameters(params): Parameters<DeleteHabitParams>,
    ) -> Result<String, String> {
        tracing::info!(habit_id = %params.habit_id, user_id = %params.user_id, "delete_habit called");
        self.reconciler
            .delete_habit(&params.habit_id, &params.user_id)
            .await
            .map_err(tool_error)?;
        Ok(serde_json::json!({ "deleted": params.habit_id }).to_string())
    }

    #[tool(description = "Top users by engagement streak (consecutive days with at least three distinct habits completed).")]
    async fn leaderboard(
        &self,
        Parameters(params): Parameters<LeaderboardParams>,
    ) -> Result<String, String> {
        let limit = params.limit.unwrap_or(self.leaderboard_size);
        tracing::info!(limit, "leaderboard called");
        let entries = self
            .reconciler
            .leaderboard(limit)
            .await
            .map_err(tool_error)?;
        to_json(&entries)
    }

    /// Administrative bulk repair.
    #[tool(description = "Recompute every user's engagement streak from their completion history. Per-user failures are reported, not fatal.")]
    async fn repair_all_streaks(
        &self,
        Parameters(_params): Parameters<RepairStreaksParams>,
    ) -> Result<String, String> {
        tracing::info!("repair_all_streaks called");
        let report = self
            .reconciler
            .repair_all_streaks()
            .await
            .map_err(tool_error)?;
        to_json(&report)
    }
}

#[tool_handler]
impl ServerHandler for HabitusTools {
    fn get_info(&self) -> rmcp::model::ServerInfo {
        rmcp::model::ServerInfo {
            instructions: Some(
                "habitus tracks daily habits. Use list_habits to see a user's habits and streaks, \
                 complete_habit to record today's completion, and leaderboard to compare users."
                    .into(),
            ),
            capabilities: rmcp::model::ServerCapabilities::builder()
                .enable_tools()
                .build(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_errors_carry_a_kind_prefix() {
        assert!(tool_error(EngineError::habit_not_found("h1")).starts_with("not_found: "));
        let forbidden = EngineError::OwnershipViolation {
            habit_id: "h1".into(),
            user_id: "u2".into(),
        };
        assert_eq!(tool_error(forbidden), "forbidden: user u2 does not own habit h1");
        assert!(tool_error(EngineError::InvalidInput("x".into())).starts_with("invalid_input: "));
    }
}
