//! Download transport.
//!
//! Locations are either http(s) URLs or local paths; local paths let mirrors
//! on disk and tests stand in for remote sources.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use reqwest::{Certificate, Client};
use romdb_core::{RomDbError, RomDbResult};
use tokio::io::AsyncWriteExt;
use tracing::debug;
use url::Url;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Fetch bytes from a location.
#[allow(async_fn_in_trait)]
pub trait Transport {
    async fn fetch_bytes(&self, location: &str) -> RomDbResult<Vec<u8>>;

    /// Stream `location` into `dest`, replacing it. Returns the byte count.
    async fn download_to(&self, location: &str, dest: &Path) -> RomDbResult<u64>;
}

/// Transport security settings, parsed from curl-style flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportOptions {
    pub ca_file: Option<PathBuf>,
    pub insecure: bool,
}

impl TransportOptions {
    pub fn parse(flags: Option<&str>) -> Result<Self> {
        let mut out = Self::default();
        let Some(flags) = flags else {
            return Ok(out);
        };
        let mut tokens = flags.split_whitespace();
        while let Some(token) = tokens.next() {
            match token {
                "--cacert" => {
                    let path = tokens
                        .next()
                        .ok_or_else(|| anyhow!("--cacert needs a file argument"))?;
                    out.ca_file = Some(PathBuf::from(path));
                }
                "--insecure" | "-k" => out.insecure = true,
                other => return Err(anyhow!("unsupported transport flag: {other}")),
            }
        }
        Ok(out)
    }
}

fn looks_like_url(s: &str) -> bool {
    Url::parse(s).is_ok_and(|u| matches!(u.scheme(), "http" | "https"))
}

fn transport_err(location: &str, e: impl std::fmt::Display) -> RomDbError {
    RomDbError::transport(format!("{location}: {e}"))
}

pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(options: &TransportOptions) -> Result<Self> {
        let mut builder = Client::builder()
            .user_agent(concat!("romdb/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(CONNECT_TIMEOUT);

        if let Some(ca) = &options.ca_file {
            let pem = std::fs::read(ca)
                .with_context(|| format!("failed to read CA file {}", ca.display()))?;
            builder = builder.add_root_certificate(Certificate::from_pem(&pem)?);
        }
        if options.insecure {
            builder = builder.danger_accept_invalid_certs(true);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }

    async fn get(&self, url: &str) -> RomDbResult<reqwest::Response> {
        debug!(url, "GET");
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| transport_err(url, e))?;
        debug!(url, status = %resp.status(), "response");
        resp.error_for_status().map_err(|e| transport_err(url, e))
    }
}

impl Transport for HttpTransport {
    async fn fetch_bytes(&self, location: &str) -> RomDbResult<Vec<u8>> {
        if !looks_like_url(location) {
            debug!(path = location, "reading local source");
            return Ok(tokio::fs::read(location).await?);
        }
        let resp = self.get(location).await?;
        let bytes = resp.bytes().await.map_err(|e| transport_err(location, e))?;
        Ok(bytes.to_vec())
    }

    async fn download_to(&self, location: &str, dest: &Path) -> RomDbResult<u64> {
        if !looks_like_url(location) {
            return Ok(tokio::fs::copy(location, dest).await?);
        }
        let mut resp = self.get(location).await?;
        let mut file = tokio::fs::File::create(dest).await?;
        let mut written = 0u64;
        while let Some(chunk) = resp.chunk().await.map_err(|e| transport_err(location, e))? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        debug!(url = location, bytes = written, "downloaded");
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_curl_flags() {
        assert_eq!(TransportOptions::parse(None).unwrap(), TransportOptions::default());
        let o = TransportOptions::parse(Some("--cacert /etc/ca.pem -k")).unwrap();
        assert_eq!(o.ca_file.as_deref(), Some(Path::new("/etc/ca.pem")));
        assert!(o.insecure);
        assert!(TransportOptions::parse(Some("--cacert")).is_err());
        assert!(TransportOptions::parse(Some("--proxy x")).is_err());
    }

    #[test]
    fn only_http_counts_as_url() {
        assert!(looks_like_url("https://archive.org/metadata/x"));
        assert!(!looks_like_url("/tmp/bundle.zip"));
        assert!(!looks_like_url("C:\\bundle.zip"));
        assert!(!looks_like_url("hash_dbs/mame_0217.json"));
    }

    #[tokio::test]
    async fn local_paths_bypass_http() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src.zip");
        std::fs::write(&src, b"0123456789").unwrap();
        let t = HttpTransport::new(&TransportOptions::default()).unwrap();

        let src = src.to_str().unwrap();
        assert_eq!(t.fetch_bytes(src).await.unwrap(), b"0123456789");
        let dest = dir.path().join("dest.zip");
        assert_eq!(t.download_to(src, &dest).await.unwrap(), 10);
    }
}
