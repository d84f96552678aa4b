//! Request/response model and the network path.
//!
//! `Network` is the seam the cache manager sends cache misses through.
//! `HttpNetwork` implements it on top of `reqwest`; tests substitute stubs.

pub mod client;
pub mod error;
pub mod request;
pub mod response;

pub use client::{HttpNetwork, Network};
pub use error::FetchError;
pub use request::{Destination, Request, RequestKey};
pub use reqwest::{Method, StatusCode};
pub use response::{Response, ResponseType};
