pub mod models;
pub mod service;

pub use models::{SetupComplete, SetupStart, TotpState};
pub use service::TotpManager;
