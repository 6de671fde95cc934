//! A reusable HTTP client layer for web console-style backends.
//!
//! [`build_client`] produces a pooled, timeout-configured client that
//! presents a fixed browser-like identity on every request and
//! transparently decompresses gzip responses. [`classify`] turns a
//! completed response into decoded body text or an error of the caller's
//! chosen kind.

pub mod body;
pub mod classify;
pub mod client;
pub mod identity;

pub use body::{ConsoleResponse, ResponseBody};
pub use classify::{classify, status_line};
pub use client::{ConsoleClient, build_client};
pub use identity::BrowserIdentity;
