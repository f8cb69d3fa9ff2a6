//! API Module
//!
//! REST endpoint for digit prediction and the server that hosts it.

pub mod rest;
pub mod server;

pub use rest::*;
pub use server::*;
