// clause-daemon library entry point.

pub mod agent;
pub mod config;
pub mod control;
pub mod document;
pub mod fs;
pub mod runtime;
pub mod transcript;
pub mod watcher;
