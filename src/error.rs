use rusqlite::ErrorCode;
use thiserror::Error;

use crate::engine::ActivityOutcome;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[source] rusqlite::Error),

    #[error("corrupt stored value: {0}")]
    Corrupt(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("xp overflow: {total} + {amount}")]
    XpOverflow { total: u64, amount: u64 },

    #[error("counter overflow on {0}")]
    CounterOverflow(&'static str),

    #[error("no treat available: {progress}/{threshold} goal days")]
    TreatUnavailable { progress: u32, threshold: u32 },

    /// The activity itself was recorded but the achievement check hit a
    /// store failure. `outcome` holds everything that did land.
    #[error("achievement check interrupted: {source}")]
    Incomplete {
        outcome: Box<ActivityOutcome>,
        #[source]
        source: StoreError,
    },
}

/// Busy or locked databases are transient; everything else is a hard failure.
impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        match &e {
            rusqlite::Error::SqliteFailure(failure, _)
                if matches!(
                    failure.code,
                    ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked
                ) =>
            {
                StoreError::Unavailable(e.to_string())
            }
            _ => StoreError::Sqlite(e),
        }
    }
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;
