pub mod recorder;
pub mod recording;
