//! Front-ends presenting the brightness panel to the user
pub mod console;
