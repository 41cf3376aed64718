pub mod clip_store;
pub mod metadata;
