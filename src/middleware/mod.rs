//! Request middleware and extractors

pub mod features;
pub mod recover;
pub mod request_log;
