use crate::ids::{FractureId, InstanceId, PieceId};

/// Lookup failures. The engine's public operations swallow these into falsy results; the
/// `try_*` accessors hand them out for callers that want to know why.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FractureError {
    #[error("no fracture data with id {0}")]
    UnknownFracture(FractureId),
    #[error("no destructible instance with id {0}")]
    UnknownInstance(InstanceId),
    #[error("instance {0} has no piece {1}")]
    UnknownPiece(InstanceId, PieceId),
}

pub type Result<T> = std::result::Result<T, FractureError>;
