pub mod capture_provider;
pub mod delegate;
pub mod encoder;
pub mod source_selector;
pub mod transcoder;
