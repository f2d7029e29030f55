//! Binary cache client: `.narinfo` lookups and archive downloads.

use reqwest::blocking::Client;

use crate::resolver::errors::ResolveError;
use crate::sources::narinfo::NarInfo;
use crate::sources::source::ArchiveStream;
use crate::store::errors::FetchError;

/// HTTP client for a Nix binary cache such as `https://cache.nixos.org`.
#[derive(Debug, Clone)]
pub struct BinaryCache {
    client: Client,
    base_url: String,
}

impl BinaryCache {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        BinaryCache { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL of the narinfo for a content hash.
    pub fn narinfo_url(&self, hash: &str) -> String {
        format!("{}/{}.narinfo", self.base_url, hash)
    }

    /// Absolute URL of an archive, given its cache-relative URL.
    pub fn archive_url(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else {
            format!("{}/{}", self.base_url, url.trim_start_matches('/'))
        }
    }

    /// Fetch and parse the narinfo for `hash`.
    pub fn narinfo(&self, hash: &str) -> Result<NarInfo, ResolveError> {
        let url = self.narinfo_url(hash);
        tracing::debug!("GET {}", url);

        let unavailable = |reason: String| ResolveError::MetadataUnavailable {
            hash: hash.to_string(),
            reason,
        };

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(unavailable(format!("HTTP {} from {}", response.status(), url)));
        }

        let body = response.text().map_err(|e| unavailable(e.to_string()))?;
        let info = NarInfo::parse(&body);

        if info.store_path.is_empty() {
            return Err(unavailable(format!("{} has no StorePath", url)));
        }

        Ok(info)
    }

    /// Start downloading an archive; the body streams from the response.
    pub fn download(&self, url: &str) -> Result<ArchiveStream, FetchError> {
        let full_url = self.archive_url(url);
        tracing::debug!("GET {}", full_url);

        let failed = |reason: String| FetchError::DownloadFailed {
            url: full_url.clone(),
            reason,
        };

        let response = self
            .client
            .get(&full_url)
            .send()
            .map_err(|e| failed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(failed(format!("HTTP {}", response.status())));
        }

        Ok(Box::new(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls() {
        let cache = BinaryCache::new(Client::new(), "https://cache.nixos.org/");

        assert_eq!(
            cache.narinfo_url("0ffakeaaaaaaaaaaaaaaaaaaaaaaaaaa"),
            "https://cache.nixos.org/0ffakeaaaaaaaaaaaaaaaaaaaaaaaaaa.narinfo"
        );
        assert_eq!(
            cache.archive_url("nar/abc.nar.xz"),
            "https://cache.nixos.org/nar/abc.nar.xz"
        );
        assert_eq!(
            cache.archive_url("https://mirror.example/nar/abc.nar.xz"),
            "https://mirror.example/nar/abc.nar.xz"
        );
    }
}
