//! proctor.frame_signal.v1 schema
//!
//! This module defines the serialized form of per-frame perception output, used
//! when replaying recorded signal streams and at the FFI boundary.

mod adapter;
mod frame_record;

pub use adapter::*;
pub use frame_record::*;
