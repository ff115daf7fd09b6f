//! Error types for filter construction.

use thiserror::Error;

/// Error type for filter construction.
///
/// All variants are raised at construction time, before a filter can be
/// installed into a configuration; a constructed [`crate::CpuFilter`] never
/// fails during application.
#[derive(Error, Debug)]
pub enum FilterError {
    /// Numeric parameter outside its documented domain.
    #[error("parameter out of range: {0}")]
    ParameterRange(String),

    /// Morphology/convolution window size must be odd.
    #[error("kernel size must be an odd number, got {0}")]
    EvenKernelSize(u32),

    /// Convolution kernel length must be an odd perfect square.
    #[error("kernel length {0} is not an odd square")]
    NonSquareKernel(usize),

    /// Colormap needs at least one color stop.
    #[error("colormap requires at least one color stop")]
    EmptyColorStops,
}

/// Result type for filter construction.
pub type FilterResult<T> = Result<T, FilterError>;
