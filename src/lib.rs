pub mod cli;
pub mod combat;
pub mod config;
pub mod data;
pub mod error;
pub mod optimizer;
pub mod parallel;
