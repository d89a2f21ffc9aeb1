///! Aviary backend
///!
///! Bird catalog, multi-source image resolution and the gallery state the
///! server renders from.

pub mod config;
pub mod logging;
pub mod model;
pub mod module;
