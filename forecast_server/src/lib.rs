pub mod artifacts;
pub mod config;
pub mod features;
pub mod http;
pub mod inference;
pub mod jobs;
pub mod request;
pub mod source;
pub mod training;
