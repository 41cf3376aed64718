pub mod asset_inspector;
pub mod capture_service;
pub mod media_reader;
pub mod media_writer;
pub mod recorder_delegate;
