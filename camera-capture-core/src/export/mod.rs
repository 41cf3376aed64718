pub mod exporter;
pub mod trimmer;
