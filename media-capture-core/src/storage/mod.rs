pub mod artifact_writer;
pub mod metadata;
