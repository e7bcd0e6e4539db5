//! # MCD Core
//!
//! HTTP primitives shared by the MCD beacon crates: request/response
//! wrappers, the error type, logging setup, and a small hyper server that
//! passes every request through a chain of [`RequestHook`]s.
//!
//! ```rust
//! use mcd_core::{HttpRequest, HttpResponse};
//!
//! let req = HttpRequest::from_target("POST", "/?mcd=report&nonce=abc");
//! assert_eq!(req.query("mcd").map(String::as_str), Some("report"));
//!
//! let res = HttpResponse::no_content();
//! assert_eq!(res.status, 204);
//! ```

pub mod error;
pub mod http;
pub mod logging;
pub mod server;

pub use error::{Error, Result};
pub use http::{HttpRequest, HttpResponse, parse_query};
pub use server::{DEFAULT_BODY_LIMIT, Dispatch, Fallback, RequestHook, Server};
