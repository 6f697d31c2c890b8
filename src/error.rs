use thiserror::Error;

/// Error type for TLV codec operations.
#[derive(Error, Debug)]
pub enum TlvError {
    #[error("truncated: {0}")]
    Truncated(String),

    #[error("indefinite length encountered: {0}")]
    IndefiniteLength(String),

    #[error("invalid tag: {0}")]
    InvalidTag(String),

    #[error("tag mismatch: {0}")]
    TagMismatch(String),

    #[error("sequence mismatch: {0}")]
    SequenceMismatch(String),

    #[error("missing required field: {0}")]
    MissingRequired(String),

    #[error("unexpected extra child: {0}")]
    UnexpectedExtraChild(String),

    #[error("unknown child in SET: {0}")]
    UnknownChild(String),

    #[error("SET children not in DER canonical order: {0}")]
    DerOrder(String),

    #[error("no CHOICE alternative matched: {0}")]
    NoChoiceMatch(String),

    #[error("trailing bytes after strict parse: {0}")]
    TrailingBytes(String),

    #[error("maximum nesting depth exceeded: {0}")]
    DepthExceeded(String),

    #[error("async decoder result in synchronous call: {0}")]
    AsyncInSync(String),

    #[error("content length overflows length-of-length encoding: {0}")]
    LengthOverflow(String),

    #[error("required field missing for build: {0}")]
    MissingRequiredBuild(String),

    #[error("value is not a List for a Repeated field: {0}")]
    NonArrayForRepeated(String),

    #[error("encode failed: {0}")]
    EncodeFailed(String),

    #[error("decode failed: {0}")]
    DecodeFailed(String),
}

/// Result type alias for TLV codec operations.
pub type TlvResult<T> = Result<T, TlvError>;
