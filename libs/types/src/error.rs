//! Error types for record construction and field conversion.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TypeError {
    #[error("malformed 256-bit value: {len} bytes after decoding")]
    MalformedUint256 { len: usize },
}
