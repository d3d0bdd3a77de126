use thiserror::Error;

/// CD+G decoder errors.
///
/// Decoding itself never fails; these cover the API around it.
#[derive(Debug, Error)]
pub enum CdgError {
    #[error("tile ({row}, {col}) is outside the 4x6 tile grid")]
    TileOutOfRange { row: usize, col: usize },
    #[error("invalid decoder state: {0}")]
    InvalidState(String),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
