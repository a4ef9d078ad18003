//! HTTP adapter for the add-file flow: downloads a linked file and names it
//! from the `Content-Disposition` header when present, the URL path
//! otherwise.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE};

use classbot_slack::assistant::{FetchError, FetchedFile, FileFetcher};

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);
const FALLBACK_MIME: &str = "application/octet-stream";
const FALLBACK_NAME: &str = "download";

pub struct UrlFileFetcher {
    client: reqwest::Client,
}

impl UrlFileFetcher {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(FETCH_TIMEOUT).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl FileFetcher for UrlFileFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedFile, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|error| FetchError::Unavailable(error.to_string()))?;

        let mime_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(mime_essence)
            .unwrap_or_else(|| FALLBACK_MIME.to_owned());

        let file_name = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .and_then(disposition_file_name)
            .or_else(|| url_file_name(url))
            .unwrap_or_else(|| FALLBACK_NAME.to_owned());

        let bytes = response
            .bytes()
            .await
            .map_err(|error| FetchError::Unavailable(error.to_string()))?
            .to_vec();

        Ok(FetchedFile { file_name, mime_type, bytes })
    }
}

/// `text/csv; charset=utf-8` carries the charset parameter the knowledge
/// type lookup does not expect.
fn mime_essence(value: &str) -> String {
    value.split(';').next().unwrap_or(value).trim().to_ascii_lowercase()
}

fn disposition_file_name(value: &str) -> Option<String> {
    value
        .split(';')
        .map(str::trim)
        .find_map(|part| part.strip_prefix("filename="))
        .map(|name| name.trim_matches('"').to_owned())
        .filter(|name| !name.is_empty())
}

fn url_file_name(url: &str) -> Option<String> {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    let after_scheme =
        without_query.split_once("://").map(|(_, rest)| rest).unwrap_or(without_query);
    let (_, path) = after_scheme.split_once('/')?;
    let name = path.rsplit('/').next()?;
    (!name.is_empty()).then(|| name.to_owned())
}
