//! Response wire format.
//!
//! ```text
//! <Status SP Meta CRLF> [HeaderLine CRLF]* CRLF <Body>
//! ```

use bytes::{BufMut, Bytes, BytesMut};

/// MIME type of the protocol's native documents.
pub const SKY_MIME: &str = "text/sky";

/// Body returned once a Drift upload has been stored.
pub const DRIFT_ACCEPTED_BODY: &str = "Drift Upload Successful";

const CRLF: &[u8] = b"\r\n";

/// Two-digit response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// Meta carries the body's MIME type.
    Success,
    /// No resource at the requested path.
    NotFound,
    /// Authorization failure or internal fault. Do not retry as-is.
    PermanentFailure,
    /// The request line could not be understood.
    BadRequest,
}

impl Status {
    /// Wire representation.
    pub fn code(self) -> &'static str {
        match self {
            Status::Success => "20",
            Status::NotFound => "40",
            Status::PermanentFailure => "50",
            Status::BadRequest => "59",
        }
    }

    /// Default meta text for non-success statuses.
    pub fn reason(self) -> &'static str {
        match self {
            Status::Success => SKY_MIME,
            Status::NotFound => "Not Found",
            Status::PermanentFailure => "Permanent failure",
            Status::BadRequest => "Bad Request",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// A complete response, written once before the connection closes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: Status,
    pub meta: String,
    pub headers: Vec<String>,
    pub body: Bytes,
}

impl Response {
    /// Successful fetch.
    pub fn success(mime: impl Into<String>, headers: Vec<String>, body: impl Into<Bytes>) -> Self {
        Self {
            status: Status::Success,
            meta: mime.into(),
            headers,
            body: body.into(),
        }
    }

    /// Upload stored.
    pub fn drift_accepted() -> Self {
        Self::success(SKY_MIME, Vec::new(), Bytes::from_static(DRIFT_ACCEPTED_BODY.as_bytes()))
    }

    /// Nothing at `path`.
    pub fn not_found(path: &str) -> Self {
        Self::message(Status::NotFound, format!("Resource not found: {path}"))
    }

    pub fn permanent_failure(message: impl Into<String>) -> Self {
        Self::message(Status::PermanentFailure, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::message(Status::BadRequest, message)
    }

    fn message(status: Status, body: impl Into<String>) -> Self {
        Self {
            status,
            meta: status.reason().to_string(),
            headers: Vec::new(),
            body: Bytes::from(body.into()),
        }
    }

    /// Render the full response into wire bytes.
    pub fn render(&self) -> Bytes {
        let head_len = 2
            + 1
            + self.meta.len()
            + CRLF.len()
            + self.headers.iter().map(|h| h.len() + CRLF.len()).sum::<usize>()
            + CRLF.len();

        let mut out = BytesMut::with_capacity(head_len + self.body.len());
        out.put_slice(self.status.code().as_bytes());
        out.put_u8(b' ');
        out.put_slice(self.meta.as_bytes());
        out.put_slice(CRLF);
        for header in &self.headers {
            out.put_slice(header.as_bytes());
            out.put_slice(CRLF);
        }
        out.put_slice(CRLF);
        out.put_slice(&self.body);
        out.freeze()
    }
}
