//! Request definitions
//!
//! Represents one already-framed request from a client.

/// A request as handed over by the listener
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Request {
    /// Fingerprint of the client certificate, if one was presented
    pub fingerprint: Option<String>,

    /// Escaped request path, e.g. `/thread/12/`
    pub path: String,

    /// Raw query string without the leading `?`, not yet unescaped
    pub query: String,

    /// Peer address, used in report notifications
    pub peer: String,
}

impl Request {
    /// Create a request for a path with no query and no certificate
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = query.into();
        self
    }

    pub fn with_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.fingerprint = Some(fingerprint.into());
        self
    }

    pub fn with_peer(mut self, peer: impl Into<String>) -> Self {
        self.peer = peer.into();
        self
    }

    /// Non-empty path segments, still escaped
    pub fn segments(&self) -> Vec<&str> {
        self.path.split('/').filter(|s| !s.is_empty()).collect()
    }

    pub fn has_query(&self) -> bool {
        !self.query.is_empty()
    }
}
