/// Errors raised while splitting the inbound byte stream into lines.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// A request line grew past the configured limit before its delimiter arrived.
    #[error("request line too long ({len} bytes, max {max})")]
    LineTooLong { len: usize, max: usize },
}

/// Errors raised while interpreting a request line.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    /// `DRIFT` keyword without any parameters.
    #[error("Malformed DRIFT request")]
    MalformedDrift,

    /// A mandatory Drift parameter is absent or unparsable.
    #[error("Missing size or token in DRIFT")]
    MissingDriftParam,

    /// An absolute locator that does not parse as a URL.
    #[error("Invalid URL format")]
    InvalidLocator,

    /// The request line could not be framed.
    #[error(transparent)]
    Frame(#[from] FrameError),
}
