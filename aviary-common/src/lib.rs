//! Domain types shared between the aviary backend library and the server.

pub mod types;

pub use types::{Attribution, Bird, ImageCandidate, ImageSource, ResolvedImageSet};
