use thiserror::Error;

/// Errors raised by the Turn Arbiter.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TurnError {
    /// A host-only mutation was attempted from a mirror.
    #[error("{operation} is only allowed on the authoritative host")]
    AuthorityViolation { operation: &'static str },

    /// A replicated turn update was applied to the authoritative arbiter.
    #[error("the authoritative arbiter does not accept replicated turn updates")]
    NotAMirror,
}

/// Errors raised by the rule engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("invalid position: {0}")]
    InvalidPosition(String),

    #[error("invalid square: {0}")]
    InvalidSquare(String),

    #[error("invalid promotion piece: {0}")]
    InvalidPiece(String),
}

/// Errors raised by a game store.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error(
        "no saved state for match {match_id}{}",
        .move_index.map(|i| format!(" at move {i}")).unwrap_or_default()
    )]
    NotFound {
        match_id: String,
        move_index: Option<u32>,
    },

    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed game record: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("persistence worker unavailable: {0}")]
    Unavailable(String),
}

/// Errors raised while restoring a saved match on the host.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Turn(#[from] TurnError),
}

/// Errors raised while a participant mirror applies host messages.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MirrorError {
    #[error("got error from host: {0}")]
    ServerReturnedError(String),

    #[error("cannot apply host message: {0}")]
    CannotApply(String),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Turn(#[from] TurnError),
}
