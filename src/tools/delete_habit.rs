use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct DeleteHabitParams {
    #[schemars(description = "ID of the habit to delete")]
    pub habit_id: String,

    #[schemars(description = "ID of the authenticated user. Must own the habit.")]
    pub user_id: String,
}
