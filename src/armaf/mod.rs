//! Minimal actor primitives on top of Tokio tasks.
//!
//! The panel controller runs as a single actor: every change to the panel's
//! state is made inside its task, one request at a time, which gives the
//! single-threaded "UI event loop" semantics the rest of the crate relies on.

mod ports;
mod server;

#[doc(inline)]
pub use ports::*;

#[doc(inline)]
pub use server::*;

#[cfg(test)]
mod test_ports;

#[cfg(test)]
mod test_server;
