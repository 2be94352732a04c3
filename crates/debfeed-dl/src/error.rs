use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum DownloadError {
    #[error("Invalid URL: {url}")]
    #[diagnostic(code(debfeed_dl::invalid_url))]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error(transparent)]
    #[diagnostic(
        code(debfeed_dl::network),
        help("Check your internet connection or try again later")
    )]
    Network(#[from] Box<ureq::Error>),

    #[error("HTTP {status}: {url}")]
    #[diagnostic(
        code(debfeed_dl::http_error),
        help("Check that the key URL is correct and publicly reachable")
    )]
    HttpError { status: u16, url: String },

    #[error("Empty response body from {url}")]
    #[diagnostic(code(debfeed_dl::empty_body))]
    EmptyBody { url: String },
}

pub type Result<T> = std::result::Result<T, DownloadError>;

impl From<ureq::Error> for DownloadError {
    fn from(e: ureq::Error) -> Self {
        Self::Network(Box::new(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_error_invalid_url() {
        let err = DownloadError::InvalidUrl {
            url: "invalid".to_string(),
            source: url::ParseError::RelativeUrlWithoutBase,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("Invalid URL"));
        assert!(msg.contains("invalid"));
    }

    #[test]
    fn test_download_error_http_error() {
        let err = DownloadError::HttpError {
            status: 404,
            url: "https://example.com/gpg.key".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 404: https://example.com/gpg.key");
    }

    #[test]
    fn test_download_error_empty_body() {
        let err = DownloadError::EmptyBody {
            url: "https://example.com/gpg.key".to_string(),
        };
        assert!(err.to_string().contains("Empty response body"));
    }
}
