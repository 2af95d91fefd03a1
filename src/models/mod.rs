pub mod principal;
pub mod rows;
pub mod share;
pub mod status;
pub mod translation;
pub mod verification;

#[cfg(test)]
mod tests;

pub use principal::*;
pub use rows::*;
pub use share::*;
pub use status::*;
pub use verification::*;

/// A stored or submitted string that names no known enum variant
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value:?}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownVariant {
    pub fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}
