//! Tagged, cancellable HTTP GET dispatch over a shared reqwest client.
//!
//! Build an immutable [`RequestSpec`], hand it to a [`Dispatcher`], and the
//! completion reaches the request's [`Listener`] on the delivery context of
//! your choosing. In-flight calls are tracked by (tag, url) so related
//! requests can be cancelled in bulk.

pub mod client;
pub mod delivery;
pub mod dispatch;
pub mod merge;
pub mod outcome;
pub mod registry;
pub mod request;

pub use client::{build_client, HttpConfig, HttpError, TransportFactory};
pub use delivery::{DeliveryContext, DeliveryLoop};
pub use dispatch::Dispatcher;
pub use merge::merge;
pub use outcome::{classify, Outcome};
pub use registry::{CallHandle, CallKey, CallRegistry};
pub use request::{Builder, Listener, RequestSpec};
