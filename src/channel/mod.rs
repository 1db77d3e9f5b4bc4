pub mod models;
pub mod service;

pub use models::{Channel, CodeIssue, Verified};
pub use service::ChannelVerifier;
