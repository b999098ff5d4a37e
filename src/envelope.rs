//! Authenticated SOAP envelope for the grade-posting operations

use chrono::NaiveDate;
use tracing::debug;

use crate::config::Config;
use crate::error::Result;
use crate::payload::{wd, write_grade_records};
use crate::types::{GradeType, SubmissionBatch};
use crate::xml::{XmlWriter, check_well_formed};

const SOAP_ENV_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";
const XSD_NS: &str = "http://www.w3.org/2001/XMLSchema";
const WSSE_NS: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-secext-1.0.xsd";
const PASSWORD_TEXT: &str = "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-username-token-profile-1.0#PasswordText";
/// Namespace of the student-records web service
pub const WD_NS: &str = "urn:com.workday/bsvc";

/// Builds complete request documents for one set of credentials and API version
#[derive(Clone)]
pub struct EnvelopeBuilder {
    username: String,
    password: String,
    version: String,
}

impl std::fmt::Debug for EnvelopeBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvelopeBuilder")
            .field("username", &self.username)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

impl EnvelopeBuilder {
    /// Create a builder from explicit values
    ///
    /// `username` is used verbatim in the security header; `version` is the
    /// `wd:version` attribute (e.g. "v44.0").
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            version: version.into(),
        }
    }

    /// Create a builder from the client configuration
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.credentials.qualified_username(),
            config.credentials.password.clone(),
            config.endpoint.version_tag(),
        )
    }

    /// Build the pretty-printed request for a batch
    ///
    /// Identical inputs always produce identical bytes; the only moving part
    /// is `today`, which interim records carry as their submission date.
    ///
    /// # Errors
    /// Returns [`Error::MalformedPayload`](crate::Error::MalformedPayload) if
    /// the document cannot be written or does not re-parse as well-formed XML.
    pub fn build(&self, batch: &SubmissionBatch, today: NaiveDate) -> Result<String> {
        let grade_type = batch.grade_type();
        let operation = wd(grade_type.operation());
        let data_wrapper = wd(grade_type.data_wrapper());

        let mut w = XmlWriter::new();
        w.declaration()?;
        w.start(
            "env:Envelope",
            &[
                ("xmlns:env", SOAP_ENV_NS),
                ("xmlns:xsd", XSD_NS),
                ("xmlns:wsse", WSSE_NS),
            ],
        )?;

        w.start("env:Header", &[])?;
        w.start("wsse:Security", &[("env:mustUnderstand", "1")])?;
        w.start("wsse:UsernameToken", &[])?;
        w.verbatim_text_element("wsse:Username", &[], &self.username)?;
        w.verbatim_text_element("wsse:Password", &[("Type", PASSWORD_TEXT)], &self.password)?;
        w.end("wsse:UsernameToken")?;
        w.end("wsse:Security")?;
        w.end("env:Header")?;

        w.start("env:Body", &[])?;
        w.start(
            &operation,
            &[("xmlns:wd", WD_NS), ("wd:version", self.version.as_str())],
        )?;

        if grade_type == GradeType::Final {
            w.start("wd:Business_Process_Parameters", &[])?;
            w.text_element("wd:Auto_Complete", &[], "true")?;
            w.text_element("wd:Run_Now", &[], "true")?;
            w.end("wd:Business_Process_Parameters")?;
        }

        w.start(&data_wrapper, &[])?;
        w.start("wd:Section_Listing_Reference", &[])?;
        w.text_element(
            "wd:ID",
            &[("wd:type", "Section_Listing_ID")],
            batch.section_listing_id().as_str(),
        )?;
        w.end("wd:Section_Listing_Reference")?;
        write_grade_records(&mut w, batch, today)?;
        w.end(&data_wrapper)?;

        w.end(&operation)?;
        w.end("env:Body")?;
        w.end("env:Envelope")?;

        let xml = w.finish()?;
        check_well_formed(&xml)?;

        debug!(
            section = %batch.section_listing_id(),
            grade_type = %grade_type,
            records = batch.len(),
            bytes = xml.len(),
            "built grade submission envelope"
        );

        Ok(xml)
    }
}
