use tracing::debug;
use url::Url;

use crate::{
    error::{DownloadError, Result},
    http_client::SHARED_AGENT,
};

pub struct Http;

impl Http {
    /// Downloads `url` fully into memory.
    ///
    /// Fails on malformed URLs, transport errors, non-2xx statuses and empty bodies.
    pub fn fetch_bytes(url: &str) -> Result<Vec<u8>> {
        let parsed = Url::parse(url).map_err(|source| {
            DownloadError::InvalidUrl {
                url: url.to_string(),
                source,
            }
        })?;

        debug!("fetching {}", parsed);
        let mut response = SHARED_AGENT.get(parsed.as_str()).call()?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::HttpError {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.body_mut().read_to_vec()?;
        if body.is_empty() {
            return Err(DownloadError::EmptyBody {
                url: url.to_string(),
            });
        }

        debug!("fetched {} bytes from {}", body.len(), parsed);
        Ok(body)
    }
}
