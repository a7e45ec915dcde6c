use thiserror::Error;

#[derive(Error, Debug)]
pub enum PulseGraphError {
    #[error("Configuration error: {0}")]
    Config(String),
}
