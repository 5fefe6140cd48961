pub mod config;
pub mod habit;
pub mod stats;
pub mod task;
pub mod timer;
