#![deny(missing_docs)]
#![doc = "Shared error and randomness types for the alignment distance sampler."]

pub mod errors;
pub mod rng;

pub use errors::{AmaError, ErrorInfo};
pub use rng::RngHandle;
