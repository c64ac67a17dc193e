//! Render/extraction backend client.

mod http;

pub use http::{
    BackendConfig, ClientError, DrawingBackend, TakeoffClient, DEFAULT_BASE_URL,
    DEFAULT_CONNECT_TIMEOUT_SECS,
};
