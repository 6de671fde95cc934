//! Uniform classification of completed responses into text or errors.

use anyhow::Result;
use log::debug;
use reqwest::{StatusCode, Version};

use crate::body::ConsoleResponse;

/// Converts a completed response into decoded body text or an error of
/// the caller's choosing.
///
/// Anything other than `200 OK` becomes an error built by `make_error`
/// from a `"Server error: <status line>"` message, wrapped in
/// [`anyhow::Error`] so callers can recover their kind with
/// [`downcast_ref`](anyhow::Error::downcast_ref). The body was already
/// fully read when the response was collected, so the pooled connection
/// stays reusable whichever way classification goes.
///
/// A `200 OK` with no body yields `Ok(None)`, distinct from an empty
/// body's `Ok(Some(""))`.
#[tracing::instrument(skip_all)]
pub fn classify<E, F>(response: ConsoleResponse, make_error: F) -> Result<Option<String>>
where
    E: std::error::Error + Send + Sync + 'static,
    F: FnOnce(String) -> E,
{
    if response.status != StatusCode::OK {
        let line = status_line(response.version, response.status);
        debug!("Request rejected: {}", line);
        drop(response);

        return Err(anyhow::Error::new(make_error(format!(
            "Server error: {}",
            line
        ))));
    }

    response.text()
}

/// Reconstructs the status line of a response, e.g. `HTTP/1.1 404 Not Found`.
/// The reason phrase is omitted for codes without a canonical one.
pub fn status_line(version: Version, status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("{:?} {} {}", version, status.as_u16(), reason),
        None => format!("{:?} {}", version, status.as_u16()),
    }
}
