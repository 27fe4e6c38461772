pub mod config;
pub mod error;
pub mod types;

pub use config::WattwiseConfig;
pub use error::{Result, WattwiseError};
pub use types::*;
