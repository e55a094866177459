//! Analysis orchestration.
//!
//! `Analyzer` ties the pieces together for one request:
//! rate limit, optional profile resolution, safe fetch, forensics, storage.
//! It also re-checks stored URLs and records the outcome as a change event.
//! All request state is local to the call; only the limiter is shared.

mod error;

pub use error::AnalysisError;

use std::sync::Arc;

use chrono::Utc;
use log::{debug, info};
use serde::Serialize;

use crate::change::{classify, ChangeEvent, ChangeType, Fingerprint};
use crate::config::Config;
use crate::fetch::{fetch_safely, FetchedImage, RedirectChain, Transport};
use crate::forensics::{content_hash, summarize, Provenance};
use crate::rate_limit::RateLimiter;
use crate::resolve::{resolve_profile_image, ProfileImage};
use crate::storage::{NewChangeEvent, NewReport, Report, ReportSource, ReportStore};

/// A stored report together with the event recorded alongside it.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOutcome {
    /// The persisted report
    pub report: Report,
    /// The `initial` event for URL reports; uploads have no history
    pub initial_event: Option<ChangeEvent>,
}

/// Runs analyses against injected transport, storage and rate limiter.
pub struct Analyzer {
    config: Config,
    transport: Arc<dyn Transport>,
    store: Arc<dyn ReportStore>,
    limiter: Arc<dyn RateLimiter>,
}

impl Analyzer {
    /// Builds an analyzer. The transport must not follow redirects.
    pub fn new(
        config: Config,
        transport: Arc<dyn Transport>,
        store: Arc<dyn ReportStore>,
        limiter: Arc<dyn RateLimiter>,
    ) -> Self {
        Analyzer {
            config,
            transport,
            store,
            limiter,
        }
    }

    /// Configuration in effect.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Fetches and analyzes a remote image, storing a report and its
    /// `initial` change event. Both are written in one transaction.
    ///
    /// When profile resolution is enabled and the URL is a page advertising
    /// an image, the advertised image is analyzed instead and recorded as
    /// `resolved_url`.
    ///
    /// # Errors
    ///
    /// - `RateLimited` if `client_key` is over its budget (nothing is fetched)
    /// - `Fetch` with the redirect chain reached if the fetch fails
    /// - `Storage` on database failure
    pub async fn analyze_url(
        &self,
        client_key: &str,
        url: &str,
    ) -> Result<AnalysisOutcome, AnalysisError> {
        self.admit(client_key)?;

        let resolved_url = if self.config.resolve_profiles {
            match resolve_profile_image(self.transport.as_ref(), url).await {
                ProfileImage::Found(image_url) if image_url != url => Some(image_url),
                other => {
                    debug!("No profile image substitution for {url}: {other:?}");
                    None
                }
            }
        } else {
            None
        };
        let target = resolved_url.as_deref().unwrap_or(url);

        let (image, redirect_chain) = self.fetch(target).await?;
        let summary = summarize(&image.bytes);

        let new_report = NewReport {
            source: ReportSource::Url,
            source_url: Some(url.to_string()),
            resolved_url,
            final_url: Some(image.final_url.to_string()),
            filename: None,
            redirect_chain,
            http_status: Some(image.status),
            content_hash: summary.content_hash.clone(),
            byte_size: summary.stats.size,
            detected_format: summary.format,
            entropy: summary.stats.entropy,
            provenance: Provenance::from_headers(&image.headers),
            headers: image.headers.truncated_for_storage(),
            created_at: Utc::now(),
        };
        let fingerprint = Fingerprint::from_headers(summary.content_hash, &image.headers);
        let (id, event) = self
            .store
            .insert_report_with_event(
                new_report,
                new_event(0, fingerprint, ChangeType::Initial),
            )
            .await?;
        let report = self.load(id).await?;

        info!(
            "Analyzed {} as report {} ({} bytes, {})",
            url,
            report.id,
            report.byte_size,
            report
                .detected_format
                .map(|f| f.to_string())
                .unwrap_or_else(|| "unknown format".to_string())
        );

        Ok(AnalysisOutcome {
            report,
            initial_event: Some(event),
        })
    }

    /// Analyzes uploaded bytes and stores the report.
    ///
    /// # Errors
    ///
    /// - `RateLimited` if `client_key` is over its budget
    /// - `EmptyUpload` for zero bytes
    /// - `UploadTooLarge` above the configured size budget
    /// - `Storage` on database failure
    pub async fn analyze_upload(
        &self,
        client_key: &str,
        filename: Option<&str>,
        bytes: &[u8],
    ) -> Result<AnalysisOutcome, AnalysisError> {
        self.admit(client_key)?;

        if bytes.is_empty() {
            return Err(AnalysisError::EmptyUpload);
        }
        let limit = self.config.fetch.max_bytes();
        let size = bytes.len() as u64;
        if size > limit {
            return Err(AnalysisError::UploadTooLarge { size, limit });
        }

        let summary = summarize(bytes);
        let report = self
            .store_report(NewReport {
                source: ReportSource::Upload,
                source_url: None,
                resolved_url: None,
                final_url: None,
                filename: filename.map(str::to_string),
                redirect_chain: RedirectChain::default(),
                http_status: None,
                content_hash: summary.content_hash,
                byte_size: summary.stats.size,
                detected_format: summary.format,
                entropy: summary.stats.entropy,
                provenance: Provenance::default(),
                headers: Default::default(),
                created_at: Utc::now(),
            })
            .await?;

        info!("Analyzed upload as report {} ({size} bytes)", report.id);
        Ok(AnalysisOutcome {
            report,
            initial_event: None,
        })
    }

    /// Fetches a stored report's URL again and appends exactly one change
    /// event describing what changed since the latest observation.
    ///
    /// A failed fetch returns the error and records nothing. Re-checks count
    /// against `client_key`'s rate budget like any other fetch.
    ///
    /// # Errors
    ///
    /// - `RateLimited` if `client_key` is over its budget (nothing is fetched)
    /// - `ReportNotFound` for an unknown id
    /// - `NotRecheckable` for uploads
    /// - `Fetch` when the URL can no longer be fetched
    /// - `Storage` on database failure
    pub async fn recheck(
        &self,
        client_key: &str,
        report_id: i64,
    ) -> Result<ChangeEvent, AnalysisError> {
        self.admit(client_key)?;

        let report = self
            .store
            .get_report(report_id)
            .await?
            .ok_or(AnalysisError::ReportNotFound(report_id))?;
        let target = report
            .recheck_target()
            .ok_or(AnalysisError::NotRecheckable(report_id))?
            .to_string();

        let (image, _) = self.fetch(&target).await?;
        let current = Fingerprint::from_headers(content_hash(&image.bytes), &image.headers);

        let previous = match self.store.latest_change_event(report_id).await? {
            Some(event) => event.fingerprint(),
            None => Fingerprint {
                content_hash: report.content_hash.clone(),
                etag: report.provenance.etag.clone(),
                last_modified: report.provenance.last_modified.clone(),
            },
        };

        let change_type = classify(&previous, &current);
        info!("Re-check of report {report_id} ({target}): {change_type}");
        self.record(report_id, current, change_type).await
    }

    /// Change history of a report, oldest first.
    ///
    /// # Errors
    ///
    /// `ReportNotFound` for an unknown id; `Storage` on database failure.
    pub async fn history(&self, report_id: i64) -> Result<Vec<ChangeEvent>, AnalysisError> {
        if self.store.get_report(report_id).await?.is_none() {
            return Err(AnalysisError::ReportNotFound(report_id));
        }
        Ok(self.store.change_history(report_id).await?)
    }

    /// Loads a stored report.
    pub async fn report(&self, report_id: i64) -> Result<Report, AnalysisError> {
        self.load(report_id).await
    }

    fn admit(&self, client_key: &str) -> Result<(), AnalysisError> {
        if self.limiter.allow(client_key) {
            Ok(())
        } else {
            Err(AnalysisError::RateLimited {
                client: client_key.to_string(),
            })
        }
    }

    async fn fetch(&self, url: &str) -> Result<(FetchedImage, RedirectChain), AnalysisError> {
        let result = fetch_safely(self.transport.as_ref(), url, &self.config.fetch).await;
        match result.outcome {
            Ok(image) => Ok((image, result.redirect_chain)),
            Err(error) => Err(AnalysisError::Fetch {
                error,
                redirect_chain: result.redirect_chain,
            }),
        }
    }

    async fn store_report(&self, new_report: NewReport) -> Result<Report, AnalysisError> {
        let id = self.store.insert_report(new_report).await?;
        self.load(id).await
    }

    async fn load(&self, id: i64) -> Result<Report, AnalysisError> {
        self.store
            .get_report(id)
            .await?
            .ok_or(AnalysisError::ReportNotFound(id))
    }

    async fn record(
        &self,
        report_id: i64,
        fingerprint: Fingerprint,
        change_type: ChangeType,
    ) -> Result<ChangeEvent, AnalysisError> {
        let event = self
            .store
            .append_change_event(new_event(report_id, fingerprint, change_type))
            .await?;
        Ok(event)
    }
}

fn new_event(report_id: i64, fingerprint: Fingerprint, change_type: ChangeType) -> NewChangeEvent {
    NewChangeEvent {
        report_id,
        checked_at: Utc::now(),
        content_hash: fingerprint.content_hash,
        change_type,
        etag: fingerprint.etag,
        last_modified: fingerprint.last_modified,
    }
}
