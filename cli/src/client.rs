use std::io::{self, Write};
use std::time::Duration;

use reqwest::Method;
use serde_json::{Map, Value};
use tracing::debug;
use uuid::Uuid;

use crate::error::ClientError;
use crate::render;

/// Outcome of one wire exchange with the inspector endpoint.
///
/// `Handled` means raw mode already wrote the result to stdout and the
/// caller must not render anything further.
#[derive(Debug)]
pub enum Response {
    Handled,
    Envelope(Value),
}

/// Client bound to one inspector endpoint for its lifetime.
pub struct InspectorClient {
    base_url: String,
    raw: bool,
    api_key: Option<String>,
    http: reqwest::Client,
    user_agent: String,
}

impl InspectorClient {
    /// Bind a client to `host:port`.
    ///
    /// A `http://` or `https://` prefix embedded in `host` wins over the
    /// `secure` flag and is stripped from the stored host.
    pub fn new(
        host: &str,
        port: u16,
        secure: bool,
        raw: bool,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let mut scheme = if secure { "https" } else { "http" };
        let mut host = host.to_string();
        for candidate in ["http", "https"] {
            let prefix = format!("{candidate}://");
            if let Some(stripped) = host.strip_prefix(&prefix) {
                scheme = candidate;
                host = stripped.to_string();
            }
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ClientError::Build)?;

        Ok(Self {
            base_url: format!("{scheme}://{host}:{port}"),
            raw,
            api_key,
            http,
            user_agent: format!("kilnctl/{}", env!("CARGO_PKG_VERSION")),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Invoke `action` against the endpoint and render its result.
    ///
    /// The status action delegates to [`info`](Self::info); any other
    /// action is POSTed through and its truthy `result` written as one
    /// stdout line. A falsy result means nothing to display.
    pub async fn run(
        &self,
        action: &str,
        as_json: bool,
        args: Map<String, Value>,
    ) -> Result<(), ClientError> {
        if action.is_empty() || action == "info" {
            return self.info(as_json).await;
        }
        let envelope = match self.request(action, Method::POST, &args).await? {
            Response::Handled => return Ok(()),
            Response::Envelope(envelope) => envelope,
        };
        let result = envelope.get("result").unwrap_or(&Value::Null);
        if render::is_truthy(result) {
            let mut out = io::stdout().lock();
            writeln!(out, "{}", render::display_value(result))?;
        }
        Ok(())
    }

    /// Query server status and render the deployment report.
    pub async fn info(&self, as_json: bool) -> Result<(), ClientError> {
        let envelope = match self.request("", Method::GET, &Map::new()).await? {
            Response::Handled => return Ok(()),
            Response::Envelope(envelope) => envelope,
        };
        let Value::Object(mut envelope) = envelope else {
            return Err(ClientError::NotAnObject("response"));
        };
        let result = envelope
            .remove("result")
            .ok_or(ClientError::MissingField("result"))?;
        let Value::Object(mut data) = result else {
            return Err(ClientError::NotAnObject("result"));
        };
        let display = match data.remove("info") {
            Some(Value::Object(display)) => display,
            Some(_) => return Err(ClientError::NotAnObject("info")),
            None => return Err(ClientError::MissingField("info")),
        };
        let nodes = match data.remove("nodes") {
            Some(Value::Object(nodes)) => nodes,
            Some(Value::Null) | None => Map::new(),
            Some(_) => return Err(ClientError::NotAnObject("nodes")),
        };

        let mut out = io::stdout().lock();
        if as_json {
            let report = render::flatten_report(display, data, &nodes);
            writeln!(out, "{}", Value::Object(report))?;
            return Ok(());
        }

        render::info_panel(&mut out, &self.base_url, display)?;
        if let Some(Value::Object(workers)) = data.get("workers") {
            render::worker_list(&mut out, workers, None)?;
        }
        for (name, node) in &nodes {
            if let Some(Value::Object(workers)) = node.get("workers") {
                render::worker_list(&mut out, workers, Some(name))?;
            }
        }
        Ok(())
    }

    /// One request/response cycle against `{base_url}/{action}`.
    ///
    /// The body and content-type header are only attached for a non-empty
    /// args mapping. Transport failures and HTTP error statuses classify
    /// as [`ClientError::Unreachable`]; a received body that is not valid
    /// JSON propagates as its own error.
    pub async fn request(
        &self,
        action: &str,
        method: Method,
        args: &Map<String, Value>,
    ) -> Result<Response, ClientError> {
        let url = format!("{}/{}", self.base_url, action);
        let mut req = self
            .http
            .request(method.clone(), &url)
            .header("user-agent", &self.user_agent)
            .header("x-request-id", Uuid::new_v4().to_string());
        if !args.is_empty() {
            req = req.json(args);
        }
        if let Some(key) = &self.api_key {
            req = req.header("authorization", format!("Bearer {key}"));
        }

        debug!("HTTP {} {}", method, url);
        let unreachable = |source: reqwest::Error| ClientError::Unreachable {
            url: self.base_url.clone(),
            source,
        };
        let resp = req
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .map_err(unreachable)?;
        let body = resp.bytes().await.map_err(unreachable)?;
        let envelope: Value = serde_json::from_slice(&body)?;

        if self.raw {
            let result = envelope.get("result").unwrap_or(&Value::Null);
            let mut out = io::stdout().lock();
            writeln!(out, "{result}")?;
            return Ok(Response::Handled);
        }
        Ok(Response::Envelope(envelope))
    }
}
