//! Domain layer - Input schema and the classifier port
//!
//! The HTTP layer depends only on these types; concrete model artifacts
//! implement [`Classifier`].

pub mod digit;
pub mod ports;

pub use digit::*;
pub use ports::*;
