//! The networked source: a binary cache plus a Hydra instance.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use url::Url;

use crate::resolver::errors::ResolveError;
use crate::sources::binary_cache::BinaryCache;
use crate::sources::hydra::Hydra;
use crate::sources::narinfo::NarInfo;
use crate::sources::source::{ArchiveStream, Source};
use crate::store::errors::FetchError;
use crate::util::Config;

const USER_AGENT: &str = concat!("nixbazel/", env!("CARGO_PKG_VERSION"));

/// Source backed by `cache.nixos.org` and `hydra.nixos.org` (or mirrors).
#[derive(Debug, Clone)]
pub struct NixSource {
    cache: BinaryCache,
    hydra: Hydra,
}

impl NixSource {
    /// Build a source from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let cache_url = validate_url(config.cache_url()).context("invalid `net.cache_url`")?;
        let hydra_url = validate_url(config.hydra_url()).context("invalid `net.hydra_url`")?;

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(30))
            .build()
            .context("failed to build HTTP client")?;

        Ok(NixSource {
            cache: BinaryCache::new(client.clone(), cache_url),
            hydra: Hydra::new(client, hydra_url, config.jobsets()),
        })
    }
}

fn validate_url(raw: &str) -> Result<String> {
    let url = Url::parse(raw).with_context(|| format!("`{}` is not a URL", raw))?;
    if !matches!(url.scheme(), "http" | "https") {
        anyhow::bail!("`{}` must use http or https", raw);
    }
    Ok(raw.trim_end_matches('/').to_string())
}

impl Source for NixSource {
    fn name(&self) -> &str {
        self.cache.base_url()
    }

    fn narinfo(&self, hash: &str) -> Result<NarInfo, ResolveError> {
        self.cache.narinfo(hash)
    }

    fn resolve_name(&self, package: &str, channel: Option<&str>) -> Result<String, ResolveError> {
        self.hydra.resolve(package, channel)
    }

    fn download(&self, url: &str) -> Result<ArchiveStream, FetchError> {
        self.cache.download(url)
    }
}
