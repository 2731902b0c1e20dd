pub mod recording;
pub mod review;
pub mod sentence;
pub mod user;

use thiserror::Error;

/// Raised when a TEXT column holds a value outside its CHECK-constrained set.
#[derive(Debug, Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownVariant {
    pub fn new(kind: &'static str, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}
