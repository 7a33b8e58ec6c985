//! Data models shared across the engine.
//!
//! This module contains the captured response snapshot used for request
//! chaining and the tagged scalar value used for loosely typed inputs.

pub mod response;
pub mod value;

pub use response::RequestResult;
pub use value::Value;
