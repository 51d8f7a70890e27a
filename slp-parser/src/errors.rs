use thiserror::Error;

pub type Result<T> = std::result::Result<T, SlpError>;

#[derive(Debug, Error)]
pub enum SlpError {
    #[error("config io error: {0}")]
    ConfigIo(String),
    #[error("config parse error: {0}")]
    ConfigParse(String),
    #[error("invalid replay source: {0}")]
    InvalidSource(String),
    #[error("replay io error: {0}")]
    ReplayIo(String),
    #[error("replay parse error: {0}")]
    ReplayParse(String),
    #[error("malformed record header at byte {position}: {reason}")]
    MalformedHeader { position: usize, reason: String },
    #[error("metadata parse error: {0}")]
    MetadataParse(String),
    #[error("replay data can only be pushed into a buffer source")]
    NotBuffered,
}
