//! The brightness panel's controller and the queue that carries its
//! decisions to the backend

pub mod apply_queue;
pub mod panel;
