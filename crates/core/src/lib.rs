pub mod config;
pub mod error;
pub mod occurrence;

pub use config::Config;
pub use error::*;
pub use occurrence::*;
