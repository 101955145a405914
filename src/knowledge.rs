use std::path::Path;
use std::time::Duration;

use camino::Utf8PathBuf;
use directories::BaseDirs;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::Serialize;

use crate::error::KiraError;
use crate::fs_util::replace_file_atomic;

pub const HPO_OBO_URL: &str = "http://purl.obolibrary.org/obo/hp.obo";

pub trait HpoClient: Send + Sync {
    /// Fetches `hp.obo` into `destination` and returns its bytes.
    fn download_hpo(&self, destination: &Path) -> Result<Vec<u8>, KiraError>;
}

#[derive(Clone)]
pub struct HpoHttpClient {
    client: Client,
}

impl HpoHttpClient {
    pub fn new() -> Result<Self, KiraError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("kira-gp/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| KiraError::KnowledgeHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|err| KiraError::KnowledgeHttp(err.to_string()))?;
        Ok(Self { client })
    }
}

impl HpoClient for HpoHttpClient {
    fn download_hpo(&self, destination: &Path) -> Result<Vec<u8>, KiraError> {
        let response = self
            .client
            .get(HPO_OBO_URL)
            .send()
            .map_err(|err| KiraError::KnowledgeHttp(err.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "ontology request failed".to_string());
            return Err(KiraError::KnowledgeStatus { status, message });
        }
        let bytes = response
            .bytes()
            .map_err(|err| KiraError::KnowledgeHttp(err.to_string()))?;
        replace_file_atomic(destination, &bytes)?;
        Ok(bytes.to_vec())
    }
}

/// Where `fetch-hpo` stores the ontology when no destination is given.
pub fn default_hpo_path() -> Result<Utf8PathBuf, KiraError> {
    BaseDirs::new()
        .and_then(|dirs| {
            Utf8PathBuf::from_path_buf(
                dirs.home_dir()
                    .join(".cache")
                    .join("kira-gene-prioritizer")
                    .join("hp.obo"),
            )
            .ok()
        })
        .ok_or_else(|| KiraError::Filesystem("unable to resolve cache directory".to_string()))
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OboHeader {
    pub format_version: Option<String>,
    pub data_version: Option<String>,
    pub date: Option<String>,
}

/// Reads the header tags that precede the first stanza.
pub fn parse_obo_header(content: &[u8]) -> OboHeader {
    let mut header = OboHeader::default();
    let text = String::from_utf8_lossy(content);
    for line in text.lines().take(50) {
        if line.starts_with('[') {
            break;
        }
        if let Some(value) = line.strip_prefix("format-version:") {
            header.format_version = Some(value.trim().to_string());
        }
        if let Some(value) = line.strip_prefix("data-version:") {
            header.data_version = Some(value.trim().to_string());
        }
        if let Some(value) = line.strip_prefix("date:") {
            header.date = Some(value.trim().to_string());
        }
    }
    header
}

#[derive(Debug, Clone, Serialize)]
pub struct FetchHpoResult {
    pub path: String,
    pub bytes: usize,
    #[serde(flatten)]
    pub header: OboHeader,
}

/// Downloads the ontology with `client` and summarizes what was stored.
pub fn fetch_hpo<C: HpoClient + ?Sized>(
    client: &C,
    destination: &Path,
) -> Result<FetchHpoResult, KiraError> {
    let content = client.download_hpo(destination)?;
    let header = parse_obo_header(&content);
    tracing::info!(
        path = %destination.display(),
        version = header.data_version.as_deref().unwrap_or("unknown"),
        "downloaded HPO ontology"
    );
    Ok(FetchHpoResult {
        path: destination.display().to_string(),
        bytes: content.len(),
        header,
    })
}
