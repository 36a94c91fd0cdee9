use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Training set is empty")]
    EmptyTrainingSet,
    #[error("Neighbor count must be at least 1")]
    NoNeighbors,
    #[error("Neighbor count {neighbors} exceeds sample count {samples}")]
    TooFewSamples { neighbors: usize, samples: usize },
}

pub type Result<T> = std::result::Result<T, ModelError>;
