pub mod chunks;
pub mod recorder;
