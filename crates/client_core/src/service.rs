//! Single round-trip to the remote watermarking service.

use std::{sync::Arc, time::Duration};

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{
    header::CONTENT_TYPE,
    multipart::{Form, Part},
    Client, StatusCode,
};
use shared::{
    error::{ErrorCode, OperationError},
    protocol::{MatchReportResponse, ServiceErrorBody},
};
use thiserror::Error;
use tracing::{info, warn};

use crate::{
    config::Settings,
    request::{OperationRequest, ResponseShape},
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ServiceError {
    pub code: ErrorCode,
    pub message: String,
}

impl ServiceError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::TransportFailure,
            message: message.into(),
        }
    }

    pub fn service(message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::ServiceFailure,
            message: message.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::MalformedResponse,
            message: message.into(),
        }
    }

    fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::transport("request to the watermark service timed out")
        } else if err.is_connect() {
            Self::transport(format!("could not connect to the watermark service: {err}"))
        } else if err.is_decode() || err.is_body() {
            Self::malformed(format!("failed to read the service response: {err}"))
        } else {
            Self::transport(format!("request to the watermark service failed: {err}"))
        }
    }

    fn from_status(status: StatusCode, body: &str) -> Self {
        let detail = serde_json::from_str::<ServiceErrorBody>(body)
            .ok()
            .map(|parsed| parsed.error)
            .filter(|text| !text.trim().is_empty());
        match detail {
            Some(detail) => Self::service(format!("service returned {status}: {detail}")),
            None => Self::service(format!("service returned {status}")),
        }
    }
}

impl From<ServiceError> for OperationError {
    fn from(value: ServiceError) -> Self {
        OperationError::new(value.code, value.message)
    }
}

/// Binary image returned by the service.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageArtifact {
    pub bytes: Arc<[u8]>,
    pub extension: &'static str,
}

impl ImageArtifact {
    /// Accepts `bytes` only if they look like an image, sniffing the format
    /// first and falling back to the declared content type.
    pub fn from_response(bytes: Vec<u8>, content_type: Option<&str>) -> Result<Self, ServiceError> {
        if bytes.is_empty() {
            return Err(ServiceError::malformed("service returned an empty image body"));
        }

        let extension = match image::guess_format(&bytes) {
            Ok(format) => format.extensions_str().first().copied().unwrap_or("png"),
            Err(_) => match content_type.and_then(extension_for_content_type) {
                Some(extension) => extension,
                None => {
                    return Err(ServiceError::malformed(format!(
                        "expected an image but received {}",
                        content_type.unwrap_or("an unrecognized body")
                    )))
                }
            },
        };

        Ok(Self {
            bytes: bytes.into(),
            extension,
        })
    }
}

fn extension_for_content_type(content_type: &str) -> Option<&'static str> {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    match essence.as_str() {
        "image/png" => Some("png"),
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/bmp" => Some("bmp"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        "image/tiff" => Some("tiff"),
        _ => None,
    }
}

/// Match verdict as reported by the service. The client never recomputes
/// `is_match`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchReport {
    pub is_match: bool,
    pub ber_percent: f64,
    pub bit_errors: u64,
    pub total_bits: u64,
}

impl TryFrom<MatchReportResponse> for MatchReport {
    type Error = ServiceError;

    fn try_from(value: MatchReportResponse) -> Result<Self, Self::Error> {
        if let Some(problem) = value.inconsistency() {
            return Err(ServiceError::malformed(problem));
        }
        Ok(Self {
            is_match: value.is_match,
            ber_percent: value.ber,
            bit_errors: value.bit_errors,
            total_bits: value.total_bits,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ServiceResponse {
    Image(ImageArtifact),
    MatchReport(MatchReport),
}

#[async_trait]
pub trait WatermarkService: Send + Sync {
    /// Performs exactly one attempt; callers decide whether to try again.
    async fn send(&self, request: &OperationRequest) -> Result<ServiceResponse, ServiceError>;
}

/// Sends `request` once, converting an expired `timeout` into a transport failure.
pub async fn send_with_timeout<W>(
    service: &W,
    request: &OperationRequest,
    timeout: Duration,
) -> Result<ServiceResponse, ServiceError>
where
    W: WatermarkService + ?Sized,
{
    match tokio::time::timeout(timeout, service.send(request)).await {
        Ok(outcome) => outcome,
        Err(_) => {
            warn!(operation = request.name(), "watermark request timed out");
            Err(ServiceError::transport(format!(
                "no response from the watermark service within {}s",
                timeout.as_secs_f32()
            )))
        }
    }
}

pub struct HttpWatermarkService {
    http: Client,
    base_url: String,
}

impl HttpWatermarkService {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let base_url = settings.service_base_url()?;
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(settings.request_timeout_secs))
            .user_agent(concat!("watermark-client/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self::with_client(http, base_url.as_str()))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn multipart_form(request: &OperationRequest) -> Result<Form, ServiceError> {
        let mut form = Form::new();
        for (field, file) in request.parts() {
            let part = Part::bytes(file.bytes.to_vec())
                .file_name(file.file_name.clone())
                .mime_str(&file.mime_type)
                .map_err(|err| {
                    ServiceError::transport(format!("failed to encode {field} part: {err}"))
                })?;
            form = form.part(field, part);
        }
        Ok(form)
    }
}

#[async_trait]
impl WatermarkService for HttpWatermarkService {
    async fn send(&self, request: &OperationRequest) -> Result<ServiceResponse, ServiceError> {
        let url = format!("{}{}", self.base_url, request.endpoint_path());
        let form = Self::multipart_form(request)?;
        info!(operation = request.name(), %url, "dispatching watermark request");

        let response = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(ServiceError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = ServiceError::from_status(status, &body);
            warn!(operation = request.name(), %status, "watermark service rejected request");
            return Err(err);
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response
            .bytes()
            .await
            .map_err(ServiceError::from_reqwest)?;

        match request.expected_response() {
            ResponseShape::Image => {
                ImageArtifact::from_response(body.to_vec(), content_type.as_deref())
                    .map(ServiceResponse::Image)
            }
            ResponseShape::MatchReport => {
                let parsed: MatchReportResponse = serde_json::from_slice(&body).map_err(|err| {
                    ServiceError::malformed(format!("match report was not valid JSON: {err}"))
                })?;
                MatchReport::try_from(parsed).map(ServiceResponse::MatchReport)
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/service_tests.rs"]
mod tests;
