#![no_std]

pub mod binary128;
pub mod binary64;
pub mod wide;
pub mod yield_math;

pub use yield_math::*;
