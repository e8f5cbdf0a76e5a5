use thiserror::Error;

use crate::recipe::CompositionError;

/// Error types for the compute module
#[derive(Error, Debug)]
pub enum ComputeError {
    /// Error from the database operations
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// A recipe composition broke one of the tag/ingredient set rules
    #[error("Invalid recipe composition: {0}")]
    Composition(#[from] CompositionError),
}

/// Type alias for Result with ComputeError
pub type Result<T> = std::result::Result<T, ComputeError>;
