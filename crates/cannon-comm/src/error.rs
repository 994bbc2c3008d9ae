use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommError {
    #[error("rank {rank} out of range for group of size {size}")]
    RankOutOfRange { rank: usize, size: usize },
    #[error("tag {0:#x} is reserved for collective operations")]
    ReservedTag(u32),
    #[error("peer {peer} disconnected")]
    Disconnected { peer: usize },
    #[error("message from rank {peer} with tag {tag:#x} has an unexpected payload type")]
    PayloadType { peer: usize, tag: u32 },
    #[error("buffer length mismatch: expected {expected}, got {got}")]
    LengthMismatch { expected: usize, got: usize },
    #[error("root {root} must supply a buffer")]
    MissingRootBuffer { root: usize },
    #[error("topology {dims:?} (periods {periods:?}) does not fit a group of {size}")]
    TopologyMismatch {
        dims: Vec<usize>,
        periods: Vec<bool>,
        size: usize,
    },
    #[error("coordinates {coords:?} lie outside topology {dims:?}")]
    CoordsOutOfRange { coords: Vec<usize>, dims: Vec<usize> },
    #[error("a process group needs at least one process")]
    EmptyWorld,
    #[error("failed to spawn rank {rank}: {reason}")]
    Spawn { rank: usize, reason: String },
    #[error("rank {rank} panicked")]
    RankPanicked { rank: usize },
}

pub type Result<T> = std::result::Result<T, CommError>;
