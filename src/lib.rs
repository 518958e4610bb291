pub mod catalog;
pub mod config;
pub mod grading;
pub mod output;
pub mod roster;
pub mod server;
