use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Shared by `complete_habit` and `fail_habit`.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct HabitActionParams {
    #[schemars(description = "ID of the habit")]
    pub habit_id: String,

    #[schemars(description = "ID of the authenticated user. Must own the habit.")]
    pub user_id: String,
}
