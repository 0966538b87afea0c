use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE};

use crate::error::{MatchError, TransportError};

/// Status and body of one HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpReply {
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Adapter that carries a JSON body to the service and hands back the reply.
///
/// Implementations own whatever connection state they need; every reply is
/// fully read before returning so nothing stays checked out between attempts.
pub trait Transport: Send + Sync {
    fn post_json(&self, url: &str, body: &[u8], timeout: Duration)
        -> Result<HttpReply, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn post_json(
        &self,
        url: &str,
        body: &[u8],
        timeout: Duration,
    ) -> Result<HttpReply, TransportError> {
        (**self).post_json(url, body, timeout)
    }
}

/// Blocking reqwest transport with a pooled client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(connect_timeout: Duration) -> Result<Self, MatchError> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| MatchError::ClientBuild(e.to_string()))?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn post_json(
        &self,
        url: &str,
        body: &[u8],
        timeout: Duration,
    ) -> Result<HttpReply, TransportError> {
        let classify = |e: reqwest::Error| {
            if e.is_timeout() {
                TransportError::Timeout(timeout)
            } else if e.is_connect() {
                TransportError::Connect(e.to_string())
            } else {
                TransportError::Other(e.to_string())
            }
        };

        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .timeout(timeout)
            .body(body.to_vec())
            .send()
            .map_err(classify)?;

        let status = response.status().as_u16();
        let body = response.bytes().map_err(classify)?.to_vec();
        Ok(HttpReply { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_text_is_lossy() {
        let reply = HttpReply {
            status: 503,
            body: b"busy \xff".to_vec(),
        };
        assert!(reply.body_text().starts_with("busy "));
    }

    #[test]
    fn refused_connection_is_classified() {
        let transport = HttpTransport::new(Duration::from_secs(1)).unwrap();
        // port 9 (discard) is closed on any sane test host
        let err = transport
            .post_json("http://127.0.0.1:9/api/match", b"{}", Duration::from_secs(2))
            .unwrap_err();
        assert!(matches!(
            err,
            TransportError::Connect(_) | TransportError::Other(_)
        ));
    }
}
