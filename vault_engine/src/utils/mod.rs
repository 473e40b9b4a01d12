//! Utility and helper functions needed for:
//! - Error handling
//! - Type casting and hex decoding
//! - Checked fixed point arithmetic

pub mod common;
pub mod error;
