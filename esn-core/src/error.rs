use thiserror::Error;

/// The errors reported by reservoir generation, training and persistence.
///
/// Precondition violations (reservoir size of 1, mismatched weight-vector
/// lengths, trials sized against a different reservoir) are not represented
/// here: they abort immediately through assertions.
#[derive(Debug, Error)]
pub enum Error {
    /// Spectral normalization failed to converge or produced a zero radius
    /// for every retry of the generation loop.
    #[error("reservoir generation failed: no matrix with a non-zero spectral radius after {attempts} attempts")]
    Generation {
        /// Number of fresh random draws that were tried.
        attempts: usize,
    },

    /// The ridge-regression correlation matrix `A'A + lambda*I` could not
    /// be inverted. No readout weights are installed in this case.
    #[error("ridge regression requires a non-singular correlation matrix")]
    SingularMatrix,

    /// A training operation was invoked with an unusable configuration.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Checkpoint save/load failed. On load failure the network state is
    /// left unchanged.
    #[error("checkpoint i/o failed: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
