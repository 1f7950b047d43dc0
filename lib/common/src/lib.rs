pub mod error;

pub use error::{CompileError, DecodeError, StorageError};

pub type CompileResult<T> = Result<T, CompileError>;
pub type StorageResult<T> = Result<T, StorageError>;

/// Returns an [CompileError::UnsupportedQueryShape] error wrapped in [Err].
#[macro_export]
macro_rules! unsupported_err {
    ($($arg:tt)*) => {
        Err($crate::error::CompileError::UnsupportedQueryShape(format!($($arg)*)))
    };
}
