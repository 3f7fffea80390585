//! Common types shared across crates.

pub mod id;

pub use id::VoucherId;
