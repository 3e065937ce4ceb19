//! Provides abstractions over the programs and services that actually drive
//! the displays

pub mod display;
