//! Grade submission client
//!
//! One call sends one batch, once. The client never retries; callers inspect
//! the returned error or outcome and decide whether to resubmit.

use chrono::NaiveDate;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use tracing::{debug, info, warn};
use url::Url;

use crate::attribution::{SubmissionOutcome, attribute_errors};
use crate::config::Config;
use crate::envelope::EnvelopeBuilder;
use crate::error::{Error, Result};
use crate::response::{SubmissionResponse, classify_status};
use crate::types::SubmissionBatch;

/// Content type the SOAP endpoint expects
const SOAP_CONTENT_TYPE: &str = "text/xml; charset=utf-8";

/// Client for the grade-posting operations
#[derive(Clone)]
pub struct GradeClient {
    http_client: reqwest::Client,
    envelopes: EnvelopeBuilder,
    service_url: Url,
    username: String,
    password: String,
}

impl std::fmt::Debug for GradeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GradeClient")
            .field("service_url", &self.service_url.as_str())
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl GradeClient {
    /// Create a client from validated configuration
    ///
    /// # Errors
    /// Returns a configuration error if the settings are incomplete, or if the
    /// HTTP client cannot be created.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let http_client = reqwest::Client::builder()
            .timeout(config.http.timeout)
            .user_agent(config.http.user_agent.as_str())
            .build()
            .map_err(|e| Error::config("http", format!("failed to create HTTP client: {}", e)))?;

        let service_url = config.endpoint.service_url()?;
        info!(url = %service_url, "grade client configured");

        Ok(Self {
            http_client,
            envelopes: EnvelopeBuilder::from_config(&config),
            service_url,
            username: config.credentials.qualified_username(),
            password: config.credentials.password,
        })
    }

    /// Endpoint every request is posted to
    pub fn service_url(&self) -> &Url {
        &self.service_url
    }

    /// Build the request document without sending it
    pub fn build_envelope(&self, batch: &SubmissionBatch, today: NaiveDate) -> Result<String> {
        self.envelopes.build(batch, today)
    }

    /// Post a batch, stamping interim records with today's local date
    pub async fn post_grades(&self, batch: &SubmissionBatch) -> Result<SubmissionResponse> {
        self.post_grades_on(batch, chrono::Local::now().date_naive()).await
    }

    /// Post a batch with an explicit submission date
    ///
    /// # Errors
    /// - [`Error::MalformedPayload`] if the envelope cannot be built (nothing is sent)
    /// - [`Error::Transport`] on connection, TLS or timeout failure
    /// - [`Error::Server`] for any status other than 200 or 500
    pub async fn post_grades_on(
        &self,
        batch: &SubmissionBatch,
        today: NaiveDate,
    ) -> Result<SubmissionResponse> {
        if batch.is_empty() {
            warn!(
                section = %batch.section_listing_id(),
                "posting an empty grade batch"
            );
        }

        let envelope = self.envelopes.build(batch, today)?;

        info!(
            section = %batch.section_listing_id(),
            grade_type = %batch.grade_type(),
            records = batch.len(),
            "posting grades"
        );

        let response = self
            .http_client
            .post(self.service_url.clone())
            .basic_auth(&self.username, Some(&self.password))
            .header(CONTENT_TYPE, SOAP_CONTENT_TYPE)
            .header(CONTENT_LENGTH, envelope.len())
            .body(envelope)
            .send()
            .await
            .map_err(|e| {
                warn!(
                    section = %batch.section_listing_id(),
                    error = %e,
                    "grade submission transport failure"
                );
                Error::Transport(e)
            })?;

        let status = response.status().as_u16();
        debug!(section = %batch.section_listing_id(), status, "grade service responded");

        let kind = classify_status(status)?;
        let body = response.text().await?;
        let classified = kind.with_body(&body);

        match &classified {
            SubmissionResponse::Accepted { .. } => info!(
                section = %batch.section_listing_id(),
                "grades accepted"
            ),
            SubmissionResponse::Rejected { .. } => warn!(
                section = %batch.section_listing_id(),
                "grades rejected, fault returned"
            ),
        }

        Ok(classified)
    }

    /// Post a batch and attribute any fault to its submissions
    pub async fn submit(&self, batch: &SubmissionBatch) -> Result<SubmissionOutcome> {
        self.submit_on(batch, chrono::Local::now().date_naive()).await
    }

    /// [`submit`](Self::submit) with an explicit submission date
    pub async fn submit_on(
        &self,
        batch: &SubmissionBatch,
        today: NaiveDate,
    ) -> Result<SubmissionOutcome> {
        Ok(match self.post_grades_on(batch, today).await? {
            SubmissionResponse::Accepted { .. } => SubmissionOutcome::accepted(batch),
            SubmissionResponse::Rejected { xml } => attribute_errors(batch, &xml),
        })
    }
}
