//! Transcode job model shared by transcoder backends.

pub mod job;
pub mod progress;
