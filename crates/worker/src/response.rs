//! Responses handed back to the interception hook.

use bytes::Bytes;
use serde::Serialize;
use shelter_client::FetchResponse;
use shelter_core::CachedResponse;

/// Where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseSource {
    Network,
    Cache,
    Synthesized,
}

impl ResponseSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseSource::Network => "network",
            ResponseSource::Cache => "cache",
            ResponseSource::Synthesized => "synthesized",
        }
    }
}

/// A response produced by the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    pub source: ResponseSource,
}

impl Response {
    pub fn from_network(response: FetchResponse) -> Self {
        let headers = response.header_pairs();
        Self { status: response.status.as_u16(), headers, body: response.bytes, source: ResponseSource::Network }
    }

    pub fn from_cache(response: CachedResponse) -> Self {
        Self {
            status: response.status,
            headers: response.headers,
            body: Bytes::from(response.body),
            source: ResponseSource::Cache,
        }
    }

    pub fn synthesized(status: u16, headers: &[(&str, &str)], body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: headers.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            body: body.into(),
            source: ResponseSource::Synthesized,
        }
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Body decoded as UTF-8, lossily.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// What the interception hook should do with a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchDecision {
    /// The controller produced a response.
    Respond(Response),
    /// Not intercepted: send the request to the network unmodified.
    Passthrough,
}

impl FetchDecision {
    pub fn response(&self) -> Option<&Response> {
        match self {
            FetchDecision::Respond(response) => Some(response),
            FetchDecision::Passthrough => None,
        }
    }

    pub fn into_response(self) -> Option<Response> {
        match self {
            FetchDecision::Respond(response) => Some(response),
            FetchDecision::Passthrough => None,
        }
    }
}
