//! Passive time tracker. Watches which window has focus, attributes it to a project based on
//! the window title and keeps a per-project history of work sessions in a JSON file.
//!

pub mod cli;
pub mod tracker;
pub mod utils;
pub mod window_api;
