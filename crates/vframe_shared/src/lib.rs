//! # VFRAME Shared
//!
//! Value types used across the scene kernel.
//!
//! ## CRITICAL RULE
//!
//! Everything in here is `Copy` + `Pod`. These types are written straight into
//! tank allocator fields, so they must never carry heap data or pointers.

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod constants;
pub mod math;

pub use constants::{
    BUFFER_SIZE_INCREMENT, BUFFER_SIZE_INIT, DEFAULT_TICK_RATE, MAX_CHILDREN,
    PARENT_SEARCH_THRESHOLD,
};
pub use math::{Color, Rect, Vector};
