use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct UpdateHabitParams {
    #[schemars(description = "ID of the habit to edit")]
    pub habit_id: String,

    #[schemars(description = "ID of the authenticated user. Must own the habit.")]
    pub user_id: String,

    #[schemars(description = "New title. Omit to keep the current one.")]
    pub title: Option<String>,

    #[schemars(description = "New description. Omit to keep it, pass an empty string to clear it.")]
    pub description: Option<String>,
}
