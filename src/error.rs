use thiserror::Error;

/// Error types for the eisfit-rs library.
#[derive(Error, Debug)]
pub enum EisFitError {
    /// Input outside the physical domain: non-positive frequency, non-finite
    /// impedance, empty spectrum.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A topology function hit a singular denominator or produced a non-finite value.
    #[error("Model evaluation error: {0}")]
    ModelEvaluation(String),

    /// Error indicating a mismatch in vector or matrix dimensions.
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// Error for parameter-related problems (unknown names, bad overrides).
    #[error("Parameter error: {0}")]
    ParameterError(String),

    /// Error for boundary constraint violations.
    #[error("Bounds error: {0}")]
    BoundsError(#[from] crate::parameters::BoundsError),

    /// Linear algebra error.
    #[error("Linear algebra error: {0}")]
    LinearAlgebraError(String),

    /// Error indicating the solver could not make progress at all.
    #[error("Algorithm failed to converge: {0}")]
    ConvergenceFailure(String),

    /// A malformed row in a spectrum file.
    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    /// Failure while rendering a plot.
    #[error("Plot error: {0}")]
    Plot(String),

    /// I/O error wrapper.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// CSV reader/writer error.
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
}

impl EisFitError {
    /// Process exit code used by the `eisfit` binary for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            EisFitError::InvalidInput(_)
            | EisFitError::Parse { .. }
            | EisFitError::ParameterError(_)
            | EisFitError::BoundsError(_)
            | EisFitError::CsvError(_) => 2,
            EisFitError::ModelEvaluation(_)
            | EisFitError::DimensionMismatch(_)
            | EisFitError::LinearAlgebraError(_)
            | EisFitError::ConvergenceFailure(_) => 3,
            EisFitError::Plot(_) | EisFitError::IoError(_) | EisFitError::JsonError(_) => 4,
        }
    }
}

/// Result type alias for eisfit-rs operations.
pub type Result<T> = std::result::Result<T, EisFitError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EisFitError::InvalidInput("frequency must be positive, got -1".to_string());
        assert!(format!("{}", err).contains("frequency must be positive"));

        let err = EisFitError::Parse {
            line: 7,
            message: "non-numeric Zreal".to_string(),
        };
        assert_eq!(format!("{}", err), "Parse error at line 7: non-numeric Zreal");
    }

    #[test]
    fn test_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: EisFitError = io_err.into();

        match err {
            EisFitError::IoError(_) => (),
            _ => panic!("Expected IoError variant"),
        }
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(EisFitError::InvalidInput(String::new()).exit_code(), 2);
        assert_eq!(EisFitError::ModelEvaluation(String::new()).exit_code(), 3);
        assert_eq!(EisFitError::Plot(String::new()).exit_code(), 4);
    }
}
