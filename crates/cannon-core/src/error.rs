use cannon_comm::CommError;
use cannon_matrix::MatrixError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CannonError {
    #[error("Number of processes ({processes}) is not a perfect square.")]
    NonSquareProcessCount { processes: usize },
    #[error("Matrix size {matrix_size} must be divisible by grid size {grid_size}.")]
    IndivisibleMatrixSize { matrix_size: usize, grid_size: usize },
    #[error("Matrix size must be positive.")]
    EmptyMatrix,
    #[error("coordinator must sit at grid position (0, 0), found it on world rank {world_rank}")]
    CoordinatorPlacement { world_rank: usize },
    #[error("run finished without the coordinator reporting a product")]
    MissingProduct,
    #[error("communication error: {0}")]
    Comm(#[from] CommError),
    #[error("matrix error: {0}")]
    Matrix(#[from] MatrixError),
}

impl CannonError {
    /// True for errors every rank detects identically before any
    /// collective is issued, so the whole group can exit together.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            CannonError::NonSquareProcessCount { .. }
                | CannonError::IndivisibleMatrixSize { .. }
                | CannonError::EmptyMatrix
        )
    }
}

pub type Result<T> = std::result::Result<T, CannonError>;
