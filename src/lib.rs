pub mod cli;
pub mod conditions;
pub mod config;
pub mod math;
pub mod plugin;
pub mod protocol;
pub mod weather;
