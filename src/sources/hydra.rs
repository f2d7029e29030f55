//! Hydra client: resolves package names to the store path of the latest
//! successful build.

use reqwest::blocking::Client;
use reqwest::header::ACCEPT;
use serde::Deserialize;

use crate::core::store_path;
use crate::resolver::errors::ResolveError;

#[derive(Debug, Deserialize)]
struct HydraBuild {
    buildoutputs: BuildOutputs,
}

#[derive(Debug, Deserialize)]
struct BuildOutputs {
    out: Option<BuildOutput>,
}

#[derive(Debug, Deserialize)]
struct BuildOutput {
    #[serde(default)]
    path: String,
}

/// HTTP client for a Hydra instance such as `https://hydra.nixos.org`.
#[derive(Debug, Clone)]
pub struct Hydra {
    client: Client,
    base_url: String,
    jobsets: Vec<String>,
}

impl Hydra {
    pub fn new(client: Client, base_url: impl Into<String>, jobsets: Vec<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Hydra {
            client,
            base_url,
            jobsets,
        }
    }

    /// Jobsets tried for a lookup, in priority order.
    pub fn jobsets_for(&self, channel: Option<&str>) -> Vec<String> {
        match channel {
            Some(channel) if !channel.is_empty() => vec![channel.to_string()],
            _ => self.jobsets.clone(),
        }
    }

    /// URL of the latest build of `package` in `jobset`.
    pub fn latest_url(&self, jobset: &str, package: &str) -> String {
        format!(
            "{}/job/{}/{}/latest",
            self.base_url,
            jobset,
            job_name(jobset, package)
        )
    }

    /// Resolve `package` to a store path.
    pub fn resolve(&self, package: &str, channel: Option<&str>) -> Result<String, ResolveError> {
        let jobsets = self.jobsets_for(channel);
        let mut last_error = String::from("no jobsets configured");

        for jobset in &jobsets {
            let url = self.latest_url(jobset, package);
            tracing::info!("Resolving {} via Hydra ({})", package, url);

            match self.fetch_latest(&url) {
                Ok(path) => {
                    tracing::info!("Resolved {} to {}", package, path);
                    return Ok(path);
                }
                Err(reason) => {
                    tracing::debug!("{}: {}", url, reason);
                    last_error = reason;
                }
            }
        }

        Err(ResolveError::ResolutionNotFound {
            package: package.to_string(),
            jobsets,
            reason: last_error,
        })
    }

    fn fetch_latest(&self, url: &str) -> Result<String, String> {
        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            return Err(format!("HTTP {}", response.status()));
        }

        let body = response.text().map_err(|e| e.to_string())?;
        parse_latest_build(&body)
    }
}

/// Job name of `package` within `jobset`.
///
/// Jobsets of the `nixpkgs` project name jobs without the `nixpkgs.`
/// attribute prefix.
pub fn job_name<'a>(jobset: &str, package: &'a str) -> &'a str {
    if jobset.starts_with("nixpkgs/") {
        package.strip_prefix("nixpkgs.").unwrap_or(package)
    } else {
        package
    }
}

/// Extract `buildoutputs.out.path` from a Hydra build JSON body.
pub fn parse_latest_build(body: &str) -> Result<String, String> {
    let build: HydraBuild =
        serde_json::from_str(body).map_err(|e| format!("invalid Hydra response: {}", e))?;

    let path = build.buildoutputs.out.map(|out| out.path).unwrap_or_default();

    if path.is_empty() {
        return Err("no output path in Hydra response".to_string());
    }
    if !store_path::is_store_path(&path) {
        return Err(format!("malformed store path `{}` in Hydra response", path));
    }
    Ok(path)
}
