//! Request descriptions and completion listeners.

use crate::client::HttpError;
use crate::registry::CallKey;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Completion capability for one request.
///
/// Exactly one of the two methods is invoked per non-cancelled call;
/// cancelled calls invoke neither.
pub trait Listener: Send + Sync {
    /// The call succeeded with the given body.
    fn on_success(&self, body: String);
    /// The call failed.
    fn on_error(&self, error: HttpError);
}

/// Channel-based listener: completions arrive as `Result` values on the
/// receiving end.
impl Listener for mpsc::UnboundedSender<Result<String, HttpError>> {
    fn on_success(&self, body: String) {
        let _ = self.send(Ok(body));
    }

    fn on_error(&self, error: HttpError) {
        let _ = self.send(Err(error));
    }
}

/// Immutable description of one outbound GET.
///
/// Built once via [`RequestSpec::builder`]; the headers and params here are
/// the per-request overrides, merged with process defaults at dispatch time.
#[derive(Clone)]
pub struct RequestSpec {
    tag: Option<String>,
    url: String,
    headers: HashMap<String, String>,
    params: HashMap<String, String>,
    listener: Option<Arc<dyn Listener>>,
}

impl RequestSpec {
    /// Start building a request for the given URL.
    pub fn builder(url: impl Into<String>) -> Builder {
        Builder {
            tag: None,
            url: url.into(),
            headers: HashMap::new(),
            params: HashMap::new(),
            listener: None,
        }
    }

    /// Cancellation grouping tag, if any.
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    /// Request URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Per-request header overrides.
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Per-request query parameter overrides.
    pub fn params(&self) -> &HashMap<String, String> {
        &self.params
    }

    /// Completion listener, if any.
    pub fn listener(&self) -> Option<&Arc<dyn Listener>> {
        self.listener.as_ref()
    }

    /// Registry key for this request.
    pub(crate) fn key(&self) -> CallKey {
        CallKey::new(self.tag.clone(), self.url.clone())
    }
}

impl std::fmt::Debug for RequestSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSpec")
            .field("tag", &self.tag)
            .field("url", &self.url)
            .field("headers", &self.headers)
            .field("params", &self.params)
            .field("listener", &self.listener.is_some())
            .finish()
    }
}

/// Builder for [`RequestSpec`].
#[derive(Clone)]
pub struct Builder {
    tag: Option<String>,
    url: String,
    headers: HashMap<String, String>,
    params: HashMap<String, String>,
    listener: Option<Arc<dyn Listener>>,
}

impl Builder {
    /// Tag the request for grouped cancellation.
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Add one header override. Repeats with the same key overwrite.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Add a set of header overrides.
    pub fn headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers.extend(headers);
        self
    }

    /// Add one query parameter override. Repeats with the same key overwrite.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Add a set of query parameter overrides.
    pub fn params(mut self, params: HashMap<String, String>) -> Self {
        self.params.extend(params);
        self
    }

    /// Set the completion listener. Requests without one still run; their
    /// deliveries become no-ops.
    pub fn listener(mut self, listener: impl Listener + 'static) -> Self {
        self.listener = Some(Arc::new(listener));
        self
    }

    /// Finalize the immutable request description.
    pub fn build(self) -> RequestSpec {
        RequestSpec {
            tag: self.tag,
            url: self.url,
            headers: self.headers,
            params: self.params,
            listener: self.listener,
        }
    }
}
