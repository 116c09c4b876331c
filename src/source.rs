//! Remote archive source.

use crate::error::PipelineError;

use async_trait::async_trait;
use bytes::Bytes;
use url::Url;

/// Archive source trait.
///
/// Defines the interface used by the pipeline to list and download yearly archives. Connection
/// details belong to the implementation.
#[async_trait]
pub trait ArchiveSource: Send + Sync {
    /// Fetch the directory listing as text.
    async fn listing(&self) -> Result<String, PipelineError>;

    /// Download the compressed contents of one archive.
    ///
    /// # Arguments
    ///
    /// * `file_name`: Archive name relative to the listing, e.g. `2020.csv.gz`
    async fn download(&self, file_name: &str) -> Result<Bytes, PipelineError>;
}

/// HTTP archive source.
///
/// Implements [ArchiveSource] for a directory served over HTTP(S).
#[derive(Debug)]
pub struct HttpSource {
    reqwest_client: reqwest::Client,
    /// URL of the directory listing. Archive URLs are resolved relative to it.
    listing_url: Url,
}

impl HttpSource {
    /// Create a new HTTP source.
    ///
    /// # Arguments
    ///
    /// * `base_url`: Scheme and host, e.g. `https://www.ncei.noaa.gov`
    /// * `listing_path`: Path of the directory, e.g. `/pub/data/ghcn/daily/by_year/`
    pub fn new(base_url: &Url, listing_path: &str) -> Result<Self, PipelineError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            reqwest_client: client,
            listing_url: listing_url(base_url, listing_path)?,
        })
    }

    /// Returns the URL of an archive.
    pub fn archive_url(&self, file_name: &str) -> Result<Url, PipelineError> {
        Ok(self.listing_url.join(file_name)?)
    }

    async fn get(&self, url: &Url) -> Result<reqwest::Response, PipelineError> {
        let response = self.reqwest_client.get(url.as_str()).send().await?;
        match response.status() {
            reqwest::StatusCode::OK => Ok(response),
            status => Err(PipelineError::HTTPRequestError {
                url: url.to_string(),
                status: status.as_u16(),
            }),
        }
    }
}

/// Join a base URL and a directory path, making sure the result ends in a slash so that archive
/// names resolve inside the directory.
fn listing_url(base_url: &Url, listing_path: &str) -> Result<Url, PipelineError> {
    let mut path = listing_path.to_string();
    if !path.ends_with('/') {
        path.push('/');
    }
    Ok(base_url.join(&path)?)
}

#[async_trait]
impl ArchiveSource for HttpSource {
    #[tracing::instrument(level = "DEBUG", skip(self))]
    async fn listing(&self) -> Result<String, PipelineError> {
        let response = self.get(&self.listing_url).await?;
        tracing::debug!(url = %self.listing_url, status = %response.status(), "listing response");
        Ok(response.text().await?)
    }

    #[tracing::instrument(level = "DEBUG", skip(self))]
    async fn download(&self, file_name: &str) -> Result<Bytes, PipelineError> {
        let url = self.archive_url(file_name)?;
        tracing::info!(%url, "downloading archive");
        let response = self.get(&url).await?;
        let data = response.bytes().await?;
        tracing::info!(%url, bytes = data.len(), "download complete");
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(base: &str, path: &str) -> HttpSource {
        HttpSource::new(&Url::parse(base).unwrap(), path).unwrap()
    }

    #[test]
    fn archive_url_under_listing() {
        let source = source("https://www.ncei.noaa.gov", "/pub/data/ghcn/daily/by_year/");
        assert_eq!(
            "https://www.ncei.noaa.gov/pub/data/ghcn/daily/by_year/2020.csv.gz",
            source.archive_url("2020.csv.gz").unwrap().as_str()
        );
    }

    #[test]
    fn listing_path_without_trailing_slash() {
        let source = source("http://localhost:8000", "/by_year");
        assert_eq!("http://localhost:8000/by_year/", source.listing_url.as_str());
        assert_eq!(
            "http://localhost:8000/by_year/2021.csv.gz",
            source.archive_url("2021.csv.gz").unwrap().as_str()
        );
    }
}
