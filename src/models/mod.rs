// Data models for the C2M API

pub mod job;

pub use job::{Address, JobRequest, Recipient};
