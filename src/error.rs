//! Errors surfaced by reconciling operations.

use thiserror::Error;

use crate::store::StoreError;
use crate::streak::DayKey;

/// Kind of record an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Habit,
    User,
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Habit => "habit",
            Self::User => "user",
        })
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: Entity, id: String },

    #[error("user {user_id} does not own habit {habit_id}")]
    OwnershipViolation { habit_id: String, user_id: String },

    #[error("habit {habit_id} already completed today ({day})")]
    AlreadyCompletedToday { habit_id: String, day: DayKey },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("record store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),
}

impl EngineError {
    pub fn habit_not_found(id: &str) -> Self {
        Self::NotFound {
            entity: Entity::Habit,
            id: id.to_string(),
        }
    }

    pub fn user_not_found(id: &str) -> Self {
        Self::NotFound {
            entity: Entity::User,
            id: id.to_string(),
        }
    }
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;
