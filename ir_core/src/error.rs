use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IrError {
    #[error("serial transport error: {0}")]
    Transport(String),
    #[error("display error: {0}")]
    Display(String),
    #[error("operator input error: {0}")]
    Input(String),
    #[error("reading handler failed: {0}")]
    Handler(String),
    #[error("hardware fault: {0}")]
    HardwareFault(String),
    #[error("invalid state: {0}")]
    State(String),
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing display")]
    MissingDisplay,
    #[error("missing push-button")]
    MissingButton,
}

pub type Result<T> = std::result::Result<T, IrError>;
pub use eyre::Report;
