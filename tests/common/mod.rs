//! Shared fixtures for grade submission tests

#![allow(dead_code)]

use std::time::Duration;

use chrono::NaiveDate;
use wds_postgrades::{
    Config, CredentialsConfig, EndpointConfig, GradeClient, GradeSubmission, GradeType,
    HttpConfig, SubmissionBatch,
};

pub const USERNAME: &str = "ISU_Grades";
pub const QUALIFIED_USERNAME: &str = "ISU_Grades@lsu14";
pub const PASSWORD: &str = "s3cret&pw";
pub const SECTION: &str = "SECTION_LISTING_4401";
pub const SERVICE_PATH: &str = "/ccx/service/lsu/Student_Records/v44.0";

/// Configuration pointing at a mock server
pub fn config_for(base_url: &str) -> Config {
    Config {
        credentials: CredentialsConfig {
            username: USERNAME.to_string(),
            password: PASSWORD.to_string(),
            username_suffix: "@lsu14".to_string(),
        },
        endpoint: EndpointConfig {
            base_url: base_url.to_string(),
            api_version: "44.0".to_string(),
            ..EndpointConfig::default()
        },
        http: HttpConfig::default(),
    }
}

/// Client pointing at a mock server
pub fn client_for(base_url: &str) -> GradeClient {
    GradeClient::new(config_for(base_url)).unwrap()
}

/// Client with a short request timeout
pub fn client_with_timeout(base_url: &str, timeout: Duration) -> GradeClient {
    let mut config = config_for(base_url);
    config.http.timeout = timeout;
    GradeClient::new(config).unwrap()
}

pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 5, 9).unwrap()
}

/// Batch of `count` students with sequential IDs U1, U2, ...
pub fn batch(grade_type: GradeType, count: usize) -> SubmissionBatch {
    SubmissionBatch::from_submissions(
        SECTION,
        grade_type,
        (1..=count).map(|i| GradeSubmission::new(format!("U{}", i), format!("GRADE_{}", i), SECTION)),
    )
    .unwrap()
}

pub const ACCEPTED_BODY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<env:Envelope xmlns:env="http://schemas.xmlsoap.org/soap/envelope/">
  <env:Body>
    <wd:Submit_Grades_for_Registrations_Response xmlns:wd="urn:com.workday/bsvc" wd:version="v44.0">
      <wd:Event_Reference>
        <wd:ID wd:type="WID">{a1b2c3}</wd:ID>
      </wd:Event_Reference>
    </wd:Submit_Grades_for_Registrations_Response>
  </env:Body>
</env:Envelope>"#;

/// Validation fault naming the given 1-based record positions
pub fn validation_fault(positions: &[usize]) -> String {
    let errors: String = positions
        .iter()
        .map(|p| {
            format!(
                r#"<wd:Validation_Error>
  <wd:Message>Grade is not valid for student</wd:Message>
  <wd:Detail_Message>Record {p} refused</wd:Detail_Message>
  <wd:Xpath>/wd:Submit_Grades_for_Registrations_Request[1]/wd:Submit_Grades_for_Registrations_Data[1]/wd:Student_Grades_Data[{p}]/wd:Student_Grade_Reference[1]</wd:Xpath>
</wd:Validation_Error>"#
            )
        })
        .collect();

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<SOAP-ENV:Envelope xmlns:SOAP-ENV="http://schemas.xmlsoap.org/soap/envelope/">
  <SOAP-ENV:Body>
    <SOAP-ENV:Fault xmlns:wd="urn:com.workday/bsvc">
      <faultcode>SOAP-ENV:Client.validationError</faultcode>
      <faultstring>Validation error occurred. Grade is not valid for student</faultstring>
      <detail>
        <wd:Validation_Fault>{errors}</wd:Validation_Fault>
      </detail>
    </SOAP-ENV:Fault>
  </SOAP-ENV:Body>
</SOAP-ENV:Envelope>"#
    )
}

pub const SECTION_GRADED_FAULT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<SOAP-ENV:Envelope xmlns:SOAP-ENV="http://schemas.xmlsoap.org/soap/envelope/">
  <SOAP-ENV:Body>
    <SOAP-ENV:Fault>
      <faultcode>SOAP-ENV:Client.processingFault</faultcode>
      <faultstring>All students in this section already have grades</faultstring>
    </SOAP-ENV:Fault>
  </SOAP-ENV:Body>
</SOAP-ENV:Envelope>"#;
