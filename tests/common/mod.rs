//! Shared fixtures for integration tests: scripted fakes for the gateway,
//! queue and store seams plus small builders.

#![allow(dead_code)]

pub mod builders;
pub mod fakes;

pub use builders::*;
pub use fakes::*;
