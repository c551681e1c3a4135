use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct LeaderboardParams {
    #[schemars(description = "Number of users to return. Defaults to the configured leaderboard size.")]
    pub limit: Option<usize>,
}
