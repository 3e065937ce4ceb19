//! Listing display outputs and controlling their brightness
pub mod interface;
pub mod mock;
pub mod xrandr;

pub use interface::*;
