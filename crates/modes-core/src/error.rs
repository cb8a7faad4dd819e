use thiserror::Error;

/// Startup-time and I/O errors. Per-frame decode faults are not errors in
/// this sense: they are counted and recovered in place (see
/// [`crate::message`] and the receiver's error-handling design) and never
/// constructed as an [`Error`].
#[derive(Debug, Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid DUMP1090_HOMEPOS {0:?}: expected \"<lat>,<lon>\" with |lat|<=90 and |lon|<=180")]
    InvalidHomePosition(String),

    #[error("sample source exhausted")]
    SourceExhausted,
}
