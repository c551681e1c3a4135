use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct CreateHabitParams {
    #[schemars(description = "ID of the authenticated user who owns the new habit")]
    pub user_id: String,

    #[schemars(description = "Short name of the habit, e.g. 'Read 20 pages'")]
    pub title: String,

    #[schemars(description = "Optional longer description")]
    pub description: Option<String>,
}
