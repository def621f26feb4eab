#![allow(dead_code)]

pub mod fixtures;
pub mod sources;
pub mod strategies;

pub use fixtures::*;
pub use sources::*;
