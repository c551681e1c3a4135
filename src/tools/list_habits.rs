use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ListHabitsParams {
    #[schemars(description = "ID of the authenticated user whose habits to list")]
    pub user_id: String,
}
