//! Asynchronous request execution over the shared transport.

use crate::client::{HttpError, TransportFactory};
use crate::delivery::DeliveryContext;
use crate::merge::merge;
use crate::outcome::{classify, Outcome};
use crate::registry::{CallHandle, CallRegistry};
use crate::request::{Listener, RequestSpec};
use bytes::BytesMut;
use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::collections::HashMap;
use std::sync::Arc;

/// Executes requests against the shared transport and routes completions.
///
/// Effective headers and params for each call are the process-wide defaults
/// held here, overlaid with the per-request values (request wins on shared
/// keys). Every dispatched call is tracked in the [`CallRegistry`] from
/// issuance until completion or cancellation.
pub struct Dispatcher {
    transport: Arc<TransportFactory>,
    registry: Arc<CallRegistry>,
    default_headers: HashMap<String, String>,
    default_params: HashMap<String, String>,
    delivery: DeliveryContext,
}

impl Dispatcher {
    /// Create a dispatcher over the given transport factory, with inline
    /// delivery and no defaults.
    pub fn new(transport: TransportFactory) -> Self {
        Self::with_shared_transport(Arc::new(transport))
    }

    /// Create a dispatcher sharing an already-wrapped transport factory.
    pub fn with_shared_transport(transport: Arc<TransportFactory>) -> Self {
        Self {
            transport,
            registry: Arc::new(CallRegistry::new()),
            default_headers: HashMap::new(),
            default_params: HashMap::new(),
            delivery: DeliveryContext::inline(),
        }
    }

    /// Route completions through the given delivery context.
    pub fn with_delivery(mut self, delivery: DeliveryContext) -> Self {
        self.delivery = delivery;
        self
    }

    /// Add a process-default header sent with every request unless the
    /// request overrides the key.
    pub fn default_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(key.into(), value.into());
        self
    }

    /// Add a set of process-default headers.
    pub fn default_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.default_headers.extend(headers);
        self
    }

    /// Add a process-default query parameter.
    pub fn default_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_params.insert(key.into(), value.into());
        self
    }

    /// Add a set of process-default query parameters.
    pub fn default_params(mut self, params: HashMap<String, String>) -> Self {
        self.default_params.extend(params);
        self
    }

    /// The registry tracking this dispatcher's in-flight calls.
    pub fn registry(&self) -> &CallRegistry {
        &self.registry
    }

    /// Cancel every in-flight call registered under the tag.
    pub fn cancel_by_tag(&self, tag: &str) {
        self.registry.cancel_by_tag(tag);
    }

    /// Cancel every in-flight call.
    pub fn cancel_all(&self) {
        self.registry.cancel_all();
    }

    /// Issue a GET asynchronously. Never blocks the caller; the completion
    /// reaches the request's listener through the delivery context. Returns a
    /// handle that cancels just this call.
    ///
    /// Must be called within a tokio runtime.
    pub fn get(&self, spec: RequestSpec) -> CallHandle {
        self.dispatch(spec, false)
    }

    /// Issue a GET as a cancellable subscription: the body is consumed
    /// incrementally from the transport and delivered once complete.
    /// Cancellation stops the stream mid-flight and suppresses delivery.
    ///
    /// Must be called within a tokio runtime.
    pub fn stream_get(&self, spec: RequestSpec) -> CallHandle {
        self.dispatch(spec, true)
    }

    fn dispatch(&self, spec: RequestSpec, streaming: bool) -> CallHandle {
        let headers = merge(&self.default_headers, spec.headers());
        let params = merge(&self.default_params, spec.params());
        let key = spec.key();
        let url = spec.url().to_string();
        let listener = spec.listener().cloned();

        let handle = CallHandle::new();
        // registered before the I/O task starts so a completion can never
        // race an unregistered call
        self.registry.register(key.clone(), handle.clone());

        let transport = Arc::clone(&self.transport);
        let registry = Arc::clone(&self.registry);
        let delivery = self.delivery.clone();
        let task = handle.clone();

        tokio::spawn(async move {
            let attempt = async {
                let client = transport.client().await?;
                tracing::debug!(url = %url, streaming, "issuing GET");

                let response = client
                    .get(&url)
                    .query(&params)
                    .headers(to_header_map(&headers))
                    .send()
                    .await
                    .map_err(HttpError::Transport)?;

                let status = response.status().as_u16();
                let body = if streaming {
                    read_streaming_body(response).await?
                } else {
                    response.text().await.map_err(HttpError::Transport)?
                };
                tracing::debug!(url = %url, status, "GET completed");
                Ok::<Outcome, HttpError>(classify(status, body))
            };

            tokio::select! {
                _ = task.cancelled_wait() => {
                    tracing::debug!(url = %url, "GET cancelled");
                    registry.deregister(&key, &task);
                }
                result = attempt => {
                    let outcome = result.unwrap_or_else(Outcome::Failure);
                    // a cancel between completion and delivery suppresses
                    // the listener call but still deregisters
                    if !task.is_cancelled() {
                        deliver(&delivery, listener, outcome);
                    }
                    registry.deregister(&key, &task);
                }
            }
        });

        handle
    }
}

fn deliver(delivery: &DeliveryContext, listener: Option<Arc<dyn Listener>>, outcome: Outcome) {
    let Some(listener) = listener else { return };
    delivery.dispatch(Box::new(move || match outcome.into_result() {
        Ok(body) => listener.on_success(body),
        Err(error) => listener.on_error(error),
    }));
}

async fn read_streaming_body(response: reqwest::Response) -> Result<String, HttpError> {
    let mut stream = response.bytes_stream();
    let mut buf = BytesMut::new();
    while let Some(chunk) = stream.next().await {
        buf.extend_from_slice(&chunk.map_err(HttpError::Transport)?);
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Convert merged string pairs into a reqwest header map, skipping pairs
/// that are not representable on the wire.
fn to_header_map(headers: &HashMap<String, String>) -> HeaderMap {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        match (
            HeaderName::try_from(name.as_str()),
            HeaderValue::try_from(value.as_str()),
        ) {
            (Ok(name), Ok(value)) => {
                map.insert(name, value);
            }
            _ => tracing::warn!(header = %name, "skipping invalid header pair"),
        }
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_header_map_keeps_valid_pairs() {
        let mut headers = HashMap::new();
        headers.insert("x-token".to_string(), "abc".to_string());
        headers.insert("accept".to_string(), "text/plain".to_string());

        let map = to_header_map(&headers);
        assert_eq!(map.len(), 2);
        assert_eq!(map["x-token"], "abc");
    }

    #[test]
    fn test_to_header_map_skips_invalid_pairs() {
        let mut headers = HashMap::new();
        headers.insert("bad name".to_string(), "v".to_string());
        headers.insert("bad-value".to_string(), "line\nbreak".to_string());
        headers.insert("good".to_string(), "v".to_string());

        let map = to_header_map(&headers);
        assert_eq!(map.len(), 1);
        assert!(map.contains_key("good"));
    }

    #[test]
    fn test_dispatcher_builder_defaults() {
        let dispatcher = Dispatcher::new(TransportFactory::default())
            .default_header("x-app", "fetchling")
            .default_param("lang", "en");

        assert_eq!(dispatcher.default_headers["x-app"], "fetchling");
        assert_eq!(dispatcher.default_params["lang"], "en");
        assert!(dispatcher.registry().is_empty());
    }
}
