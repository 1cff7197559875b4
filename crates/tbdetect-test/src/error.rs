//! Error types for the test framework

use thiserror::Error;

/// Errors that can occur while building fixtures
#[derive(Debug, Error)]
pub enum TestError {
    /// Core library error
    #[error("core error: {0}")]
    Core(#[from] tbdetect_core::Error),

    /// ASCII-art fixture rows of different lengths
    #[error("ragged fixture: row {row} has {actual} columns, expected {expected}")]
    RaggedFixture {
        row: usize,
        expected: usize,
        actual: usize,
    },

    /// Unknown character in an ASCII-art fixture
    #[error("unknown fixture character '{0}'")]
    UnknownGlyph(char),
}

/// Result type for test helpers
pub type TestResult<T> = Result<T, TestError>;
