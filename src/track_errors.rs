use thiserror::Error;

/// Error type shared by every fallible operation of the crate.
///
/// Variants map one-to-one to the abstract error kinds of the engine;
/// NaN is never used to signal an error, only a missing per-observation datum.
#[derive(Error, Debug)]
pub enum TrackError {
    #[error("Wrong coordinate system: {0}")]
    WrongCoordinateSystem(String),

    #[error("Unknown analytical feature: {0}")]
    UnknownFeature(String),

    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    #[error("Kernel error: {0}")]
    KernelError(String),

    #[error("Index {index} out of range (size {len})")]
    OutOfRange { index: usize, len: usize },

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Unable to perform file operation: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("XML error: {0}")]
    XmlError(String),

    #[error("Size error: {0}")]
    SizeError(String),

    #[error("Recursion limit reached with {0} points")]
    RecursionLimit(usize),

    #[error("Not yet implemented: {0}")]
    NotYetImplemented(String),

    #[error("Analytical feature already exists: {0}")]
    FeatureAlreadyExists(String),

    #[error("Reserved feature name cannot be written: {0}")]
    ReservedFeature(String),

    #[error("Unknown node: {0}")]
    UnknownNode(String),

    #[error("Unknown edge: {0}")]
    UnknownEdge(String),

    #[error("Singular linear system: {0}")]
    SingularSystem(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Operation requires a non-empty track")]
    EmptyTrack,
}

impl TrackError {
    /// Process exit code used by the `trcvt` binary for this error.
    ///
    /// * `2` – bad input (parse errors, unknown names, out of range, …)
    /// * `3` – I/O error while reading or writing an external format
    /// * `4` – configuration error
    pub fn exit_code(&self) -> i32 {
        use TrackError::*;
        match self {
            IoError(_) | CsvError(_) | XmlError(_) => 3,
            ConfigError(_) | RecursionLimit(_) | SingularSystem(_) | NotYetImplemented(_) => 4,
            _ => 2,
        }
    }
}

impl From<quick_xml::Error> for TrackError {
    fn from(err: quick_xml::Error) -> Self {
        TrackError::XmlError(err.to_string())
    }
}

impl From<std::num::ParseFloatError> for TrackError {
    fn from(err: std::num::ParseFloatError) -> Self {
        TrackError::ParseError(err.to_string())
    }
}

impl From<std::num::ParseIntError> for TrackError {
    fn from(err: std::num::ParseIntError) -> Self {
        TrackError::ParseError(err.to_string())
    }
}

impl PartialEq for TrackError {
    fn eq(&self, other: &Self) -> bool {
        use TrackError::*;
        match (self, other) {
            (WrongCoordinateSystem(a), WrongCoordinateSystem(b)) => a == b,
            (UnknownFeature(a), UnknownFeature(b)) => a == b,
            (UnknownFunction(a), UnknownFunction(b)) => a == b,
            (KernelError(a), KernelError(b)) => a == b,
            (
                OutOfRange { index: i, len: l },
                OutOfRange {
                    index: j,
                    len: m,
                },
            ) => i == j && l == m,
            (ParseError(a), ParseError(b)) => a == b,

            // Wrapped foreign errors only compare by variant
            (IoError(_), IoError(_)) => true,
            (CsvError(_), CsvError(_)) => true,
            (XmlError(_), XmlError(_)) => true,

            (SizeError(a), SizeError(b)) => a == b,
            (RecursionLimit(a), RecursionLimit(b)) => a == b,
            (NotYetImplemented(a), NotYetImplemented(b)) => a == b,
            (FeatureAlreadyExists(a), FeatureAlreadyExists(b)) => a == b,
            (ReservedFeature(a), ReservedFeature(b)) => a == b,
            (UnknownNode(a), UnknownNode(b)) => a == b,
            (UnknownEdge(a), UnknownEdge(b)) => a == b,
            (SingularSystem(a), SingularSystem(b)) => a == b,
            (ConfigError(a), ConfigError(b)) => a == b,
            (EmptyTrack, EmptyTrack) => true,

            _ => false,
        }
    }
}

#[cfg(test)]
mod track_errors_test {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(TrackError::ParseError("x".into()).exit_code(), 2);
        assert_eq!(TrackError::UnknownFeature("speed".into()).exit_code(), 2);
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        assert_eq!(TrackError::from(io).exit_code(), 3);
        assert_eq!(TrackError::ConfigError("grid".into()).exit_code(), 4);
    }

    #[test]
    fn test_partial_eq_by_variant() {
        let a = TrackError::IoError(std::io::Error::other("a"));
        let b = TrackError::IoError(std::io::Error::other("b"));
        assert_eq!(a, b);
        assert_ne!(
            TrackError::UnknownFeature("a".into()),
            TrackError::UnknownFeature("b".into())
        );
        assert_eq!(
            TrackError::OutOfRange { index: 3, len: 2 },
            TrackError::OutOfRange { index: 3, len: 2 }
        );
    }
}
