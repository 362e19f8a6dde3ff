use anyhow::{Context, Result};
use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use std::time::Duration;

use super::{extract_doi, Citation, MatchedRecord, ResolutionResult, ResolutionSource, Resolver};

/// Confidence assigned when doi.org confirms a DOI taken from the citation text
pub const DOI_ORG_CONFIDENCE: f64 = 0.95;

/// Check whether a DOI is registered, via an HTTP HEAD against doi.org.
///
/// Returns `Ok(false)` when doi.org answers with a non-success status and
/// `Err` when the request itself fails.
pub async fn check_doi_resolves(client: &Client, doi: &str, timeout: Duration) -> Result<bool> {
    let url = format!("https://doi.org/{}", doi);

    let resp = client
        .head(&url)
        .timeout(timeout)
        .send()
        .await
        .with_context(|| format!("HEAD {} failed", url))?;

    let status = resp.status();
    debug!("doi.org answered {} for {}", status, doi);
    Ok(status.is_redirection() || status.is_success())
}

/// Create an HTTP client configured for DOI resolution
pub fn create_doi_client() -> reqwest::Result<Client> {
    Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
}

/// Resolves citations that carry a DOI in their raw text.
///
/// Citations without a DOI come back `Unresolved`; the title and author
/// fields are not searched.
pub struct DoiResolver {
    client: Client,
    request_timeout: Duration,
}

impl DoiResolver {
    pub fn new(request_timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: create_doi_client().context("Failed to build HTTP client")?,
            request_timeout,
        })
    }
}

#[async_trait]
impl Resolver for DoiResolver {
    async fn resolve(&self, citation: &Citation) -> Result<ResolutionResult> {
        let Some(doi) = extract_doi(&citation.raw_text) else {
            return Ok(ResolutionResult::unresolved(citation.clone(), Vec::new()));
        };

        if check_doi_resolves(&self.client, &doi, self.request_timeout).await? {
            let matched = MatchedRecord {
                doi: Some(doi),
                title: Some(citation.title.clone()),
                authors: citation.authors.clone(),
                ..Default::default()
            };
            Ok(ResolutionResult::resolved(
                citation.clone(),
                ResolutionSource::DoiOrg,
                matched,
                DOI_ORG_CONFIDENCE,
            ))
        } else {
            Ok(ResolutionResult::unresolved(
                citation.clone(),
                vec![ResolutionSource::DoiOrg],
            ))
        }
    }

    fn sources(&self) -> Vec<ResolutionSource> {
        vec![ResolutionSource::DoiOrg]
    }

    fn name(&self) -> &str {
        "doi.org"
    }
}
