//! Small helpers shared by CLI components.

pub mod input;
