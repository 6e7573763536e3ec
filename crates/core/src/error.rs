use thiserror::Error;

#[derive(Error, Debug)]
pub enum HeraldError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid schedule source '{0}': expected <type>=<file>")]
    InvalidSource(String),
}

pub type Result<T> = std::result::Result<T, HeraldError>;
