pub mod agent;
pub mod backend;
pub mod config;
pub mod errors;
