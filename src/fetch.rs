use crate::error::StampError;
use image::DynamicImage;
use std::fmt;
use std::time::Duration;

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Where per-record photos come from. Failures are absorbed here: callers only
/// see whether an image is available.
pub trait ImageSource: Sync {
    fn fetch(&self, url: &str) -> Option<DynamicImage>;
}

#[derive(Debug)]
enum FetchError {
    Transport(reqwest::Error),
    Status(reqwest::StatusCode),
    Decode(image::ImageError),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Transport(err) => write!(f, "{}", err),
            FetchError::Status(status) => write!(f, "unexpected status {}", status),
            FetchError::Decode(err) => write!(f, "decode failed: {}", err),
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(value: reqwest::Error) -> Self {
        FetchError::Transport(value)
    }
}

impl From<image::ImageError> for FetchError {
    fn from(value: image::ImageError) -> Self {
        FetchError::Decode(value)
    }
}

/// Blocking HTTP GET with a bounded timeout. One client is shared by every
/// worker.
pub struct HttpImageSource {
    client: reqwest::blocking::Client,
}

impl HttpImageSource {
    pub fn new(timeout: Duration) -> Result<Self, StampError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| {
                StampError::InvalidConfiguration(format!("http client: {}", err))
            })?;
        Ok(Self { client })
    }

    fn try_fetch(&self, url: &str) -> Result<DynamicImage, FetchError> {
        let response = self.client.get(url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }
        let bytes = response.bytes()?;
        Ok(image::load_from_memory(&bytes)?)
    }
}

impl ImageSource for HttpImageSource {
    fn fetch(&self, url: &str) -> Option<DynamicImage> {
        match self.try_fetch(url) {
            Ok(image) => Some(image),
            Err(err) => {
                log::warn!("error downloading image from {}: {}", url, err);
                None
            }
        }
    }
}
