//! Endpoint URL construction.

use url::Url;

use crate::error::{Error, Result};

/// Builds the connect URL: `server_url` with `token` appended as the
/// percent-encoded `token` query parameter.
///
/// # Errors
///
/// Returns [`Error::InvalidEndpoint`] if `server_url` does not parse or its
/// scheme is not `ws`/`wss`.
pub fn authenticated_url(server_url: &str, token: &str) -> Result<Url> {
    let base = Url::parse(server_url.trim())
        .map_err(|e| Error::invalid_endpoint(server_url, e.to_string()))?;

    match base.scheme() {
        "ws" | "wss" => {}
        other => {
            return Err(Error::invalid_endpoint(
                server_url,
                format!("unsupported scheme '{other}', expected ws or wss"),
            ));
        }
    }

    let separator = if base.query().is_some() { '&' } else { '?' };
    let full = format!(
        "{}{separator}token={}",
        base.as_str(),
        urlencoding::encode(token)
    );

    Url::parse(&full).map_err(|e| Error::invalid_endpoint(server_url, e.to_string()))
}
