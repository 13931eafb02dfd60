// src/core/errors.rs
use std::fmt;

#[derive(Debug)]
pub enum LimeError {
    InvalidInput(String),
    IncompatibleDimensions(String),
    /// A replacement pool that must be non-empty was empty.
    EmptyPool(String),
    /// Propagated unchanged from the external segmentation function.
    SegmentationError(String),
    /// Propagated unchanged from the external classifier.
    ClassifierError(String),
    /// A label was requested from an explanation that never explained it.
    LabelNotFound(usize),
    InternalError(String),
    NdarrayError(String),
}

impl fmt::Display for LimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LimeError::InvalidInput(msg) => write!(f, "Invalid Input: {}", msg),
            LimeError::IncompatibleDimensions(msg) => {
                write!(f, "Incompatible Dimensions: {}", msg)
            }
            LimeError::EmptyPool(msg) => write!(f, "Empty Pool: {}", msg),
            LimeError::SegmentationError(msg) => write!(f, "Segmentation Error: {}", msg),
            LimeError::ClassifierError(msg) => write!(f, "Classifier Error: {}", msg),
            LimeError::LabelNotFound(label) => write!(f, "Label {} not in explanation", label),
            LimeError::InternalError(msg) => write!(f, "Internal Error: {}", msg),
            LimeError::NdarrayError(msg) => write!(f, "Ndarray Error: {}", msg),
        }
    }
}

impl std::error::Error for LimeError {} // Allow ? operator with this error type

impl From<ndarray::ShapeError> for LimeError {
    fn from(err: ndarray::ShapeError) -> Self {
        LimeError::NdarrayError(format!("ndarray ShapeError: {}", err))
    }
}

/// Convenience type alias for Result
pub type Result<T> = std::result::Result<T, LimeError>;
