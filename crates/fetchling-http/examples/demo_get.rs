//! Fetch a URL and print the delivered body.
//!
//! ```sh
//! cargo run --example demo_get -- https://httpbin.org/get
//! ```

use fetchling_http::{Dispatcher, HttpConfig, RequestSpec, TransportFactory};
use tokio::sync::mpsc;

#[tokio::main]
async fn main() {
    fetchling_common_log::init(fetchling_common_log::LogConfig::from_env())
        .expect("logging init");

    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "https://httpbin.org/get".to_string());

    let dispatcher = Dispatcher::new(TransportFactory::new(HttpConfig::default()))
        .default_header("x-app", "fetchling-demo")
        .default_param("source", "demo");

    let (tx, mut rx) = mpsc::unbounded_channel();
    dispatcher.get(
        RequestSpec::builder(url)
            .tag("demo")
            .listener(tx)
            .build(),
    );

    match rx.recv().await {
        Some(Ok(body)) => println!("{body}"),
        Some(Err(error)) => eprintln!("request failed: {error}"),
        None => eprintln!("dispatcher dropped without delivering"),
    }
}
