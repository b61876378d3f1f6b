use thiserror::Error;

/// Field result type
pub type Result<T> = std::result::Result<T, FieldError>;

/// Errors raised by [`crate::Field`] and its queries.
///
/// Overwriting an occupied cell is not an error: it is logged and reported
/// in the returned [`crate::Placement`].
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FieldError {
    /// Construction parameters are unusable.
    #[error("invalid field configuration: {message}")]
    InvalidConfig { message: String },

    /// A coordinate lies outside `[0, size)` on some axis.
    #[error("coordinate {point:?} is outside field bounds {size:?}")]
    OutOfBounds { point: [i64; 3], size: [usize; 3] },

    /// A source frequency is NaN or infinite.
    #[error("source frequency must be finite, got {0}")]
    InvalidFrequency(f64),

    /// A query needs at least one source.
    #[error("field has no sound sources")]
    EmptyField,

    /// The far-field approximation was asked to infer a frequency from a
    /// field whose sources do not share one.
    #[error("far-field approximation needs a single frequency, field has {frequencies:?}")]
    MixedFrequencies { frequencies: Vec<f64> },

    /// The uninterfered pressure summed over the observer disc is zero, so
    /// no cancellation ratio exists.
    #[error("uninterfered pressure over the observer disc is zero")]
    NoReferencePressure,

    /// The `(2r + 1)²` observer box around a disc of this radius cannot
    /// be allocated.
    #[error("observer radius {radius} is too large to grid")]
    RadiusTooLarge { radius: usize },
}
