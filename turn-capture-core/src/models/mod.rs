pub mod chunk;
pub mod config;
pub mod error;
pub mod recognition;
pub mod state;
