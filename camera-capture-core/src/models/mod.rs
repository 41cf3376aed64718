pub mod buffer;
pub mod clip;
pub mod config;
pub mod error;
pub mod photo;
pub mod state;
pub mod time;
