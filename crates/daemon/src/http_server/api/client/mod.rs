mod client;
mod error;

use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;

pub use client::ApiClient;
pub use error::ApiError;

/// One API operation: knows how to turn itself into an HTTP request and what
/// the response deserializes to. Implemented next to each handler so the CLI
/// client and the server always agree on the wire shape.
pub trait ApiRequest {
    type Response: DeserializeOwned;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder;
}
