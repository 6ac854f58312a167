//! Stateless evaluation through the online calculator.
//!
//! The calculator takes the source as the `input` query parameter of a GET
//! request and answers with `<results><line>...</line>...</results>`.

use crate::error::{BabelError, Result};
use crate::literal;
use crate::params::ResultMode;
use crate::value::Value;
use std::time::Duration;
use url::Url;

/// Public Magma calculator endpoint.
pub const DEFAULT_ENDPOINT: &str = "http://magma.maths.usyd.edu.au/xml/calculator.xml";

/// Synchronous HTTP GET returning the raw payload: header block, a blank
/// line, then the body.
///
/// The executor strips the header block itself with [`split_http_payload`],
/// so every transport, including in-memory ones, goes through the same
/// header handling.
pub trait HttpTransport: Send + Sync {
    /// Fetch `url`. Non-success statuses are errors.
    fn get(&self, url: &Url) -> Result<String>;
}

/// [`HttpTransport`] backed by a blocking `reqwest` client.
pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
}

impl ReqwestTransport {
    /// Build a client, optionally with a whole-request timeout.
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::blocking::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|err| BabelError::Remote(format!("failed to construct HTTP client: {err}")))?;
        Ok(Self { client })
    }
}

impl HttpTransport for ReqwestTransport {
    fn get(&self, url: &Url) -> Result<String> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .map_err(|err| BabelError::Remote(format!("request to {url} failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response
                .text()
                .unwrap_or_else(|_| "<failed to read error body>".to_string());
            return Err(BabelError::Remote(format!(
                "endpoint {url} returned {status}: {text}"
            )));
        }

        // Re-serialise the header block; reqwest has already parsed it off.
        let mut payload = format!("{:?} {}\n", response.version(), status);
        for (name, value) in response.headers() {
            payload.push_str(name.as_str());
            payload.push_str(": ");
            payload.push_str(&String::from_utf8_lossy(value.as_bytes()));
            payload.push('\n');
        }
        payload.push('\n');
        payload.push_str(&response.text()?);
        Ok(payload)
    }
}

/// Evaluates expanded block text against a calculator endpoint.
pub struct RemoteExecutor {
    endpoint: Url,
    transport: Box<dyn HttpTransport>,
}

impl RemoteExecutor {
    /// Executor for `endpoint` using `transport`.
    pub fn new(endpoint: &str, transport: Box<dyn HttpTransport>) -> Result<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|err| BabelError::Config(format!("invalid endpoint '{endpoint}': {err}")))?;
        Ok(Self {
            endpoint,
            transport,
        })
    }

    /// Endpoint requests are sent to.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Request URL carrying `expanded` as the `input` parameter.
    pub fn request_url(&self, expanded: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut().append_pair("input", expanded);
        url
    }

    /// Evaluate `expanded` remotely.
    ///
    /// `value` mode always attempts a literal decode of the joined lines;
    /// there is no classification round-trip on this path.
    pub fn execute(&self, expanded: &str, mode: ResultMode) -> Result<Value> {
        let url = self.request_url(expanded);
        tracing::debug!(endpoint = %self.endpoint, bytes = expanded.len(), "remote evaluation");
        let payload = self.transport.get(&url)?;
        let body = split_http_payload(&payload)?;
        let text = parse_results_xml(body)?;
        match mode {
            ResultMode::Value => Ok(literal::decode_result(&text)),
            ResultMode::Output | ResultMode::Eval => Ok(Value::String(text)),
        }
    }
}

/// Body of a raw HTTP payload: everything after the first blank line.
pub fn split_http_payload(payload: &str) -> Result<&str> {
    let lf = payload.find("\n\n").map(|idx| (idx, 2));
    let crlf = payload.find("\r\n\r\n").map(|idx| (idx, 4));
    let split = match (lf, crlf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    };
    let (idx, len) = split.ok_or_else(|| {
        BabelError::MalformedResponse("payload has no blank line after its headers".into())
    })?;
    Ok(&payload[idx + len..])
}

/// Join the text of every `<line>` under `<results>` with newlines.
pub fn parse_results_xml(body: &str) -> Result<String> {
    let document = roxmltree::Document::parse(body.trim())?;
    let results = document
        .descendants()
        .find(|node| node.has_tag_name("results"))
        .ok_or_else(|| BabelError::MalformedResponse("response has no <results> element".into()))?;

    let lines: Vec<String> = results
        .children()
        .filter(|node| node.has_tag_name("line"))
        .map(|line| {
            line.descendants()
                .filter(|node| node.is_text())
                .filter_map(|node| node.text())
                .collect::<String>()
        })
        .collect();
    Ok(lines.join("\n"))
}
