//! Error handling.

use axum::{
    extract::rejection::JsonRejection,
    http::header,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::AcquireError;
use tracing::{event, Level};

/// Pipeline and service error type
///
/// This type encapsulates the various errors that may occur while summarising archives or
/// serving requests. Each variant may result in a different API error response.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Error decompressing data
    #[error("failed to decompress data")]
    Decompression(#[source] std::io::Error),

    /// Error parsing the delimited table
    #[error("failed to parse table")]
    Csv(#[source] csv::Error),

    /// Observation date that is not eight digits
    #[error("invalid observation date {date:?}")]
    InvalidDate { date: String },

    /// Observation date that is not a valid `YYYYMMDD` calendar date
    #[error("invalid observation date {date:?}")]
    DateParse {
        date: String,
        #[source]
        source: chrono::ParseError,
    },

    /// Error while retrieving data over HTTP
    #[error("error retrieving data over HTTP")]
    Http(#[from] reqwest::Error),

    /// URL that cannot be resolved
    #[error("invalid URL")]
    InvalidUrl(#[from] url::ParseError),

    /// Non-success HTTP status
    #[error("HTTP request to {url} failed with status {status}")]
    HTTPRequestError { url: String, status: u16 },

    /// Transfer exceeded the configured wait
    #[error("{operation} of {target} did not complete within {timeout:?}")]
    Timeout {
        operation: &'static str,
        target: String,
        timeout: Duration,
    },

    /// Error writing a summary file
    #[error("failed to write summary to {}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error serialising JSON
    #[error("failed to serialise JSON")]
    Json(#[from] serde_json::Error),

    /// Invalid pipeline configuration
    #[error("pipeline configuration is not valid")]
    InvalidConfig(#[source] validator::ValidationErrors),

    /// Invalid listen address
    #[error("invalid host name, IP address or port number")]
    InvalidAddress(#[from] std::net::AddrParseError),

    /// Error running the web server
    #[error("web server error")]
    Server(#[source] std::io::Error),

    /// Error encoding metrics
    #[error("failed to encode metrics")]
    Metrics(#[from] prometheus::Error),

    /// Error deserialising request data
    #[error("request data is not valid")]
    RequestDataJsonRejection(#[from] JsonRejection),

    /// Error validating request data (single error)
    #[error("request data is not valid")]
    RequestDataValidationSingle(#[from] validator::ValidationError),

    /// Error validating request data (multiple errors)
    #[error("request data is not valid")]
    RequestDataValidation(#[from] validator::ValidationErrors),

    /// Error acquiring a semaphore
    #[error("error acquiring resources")]
    SemaphoreAcquireError(#[from] AcquireError),

    /// A worker task panicked or was cancelled
    #[error("worker task failed")]
    TaskJoin(#[from] tokio::task::JoinError),

    /// Failure processing a single archive
    #[error("failed to process {file_name}: {source}")]
    File {
        file_name: String,
        #[source]
        source: Box<PipelineError>,
    },
}

impl From<csv::Error> for PipelineError {
    /// I/O errors raised through the CSV reader originate in the gzip decoder.
    fn from(error: csv::Error) -> Self {
        let io_error = match error.kind() {
            csv::ErrorKind::Io(io_error) => {
                Some(std::io::Error::new(io_error.kind(), io_error.to_string()))
            }
            _ => None,
        };
        match io_error {
            Some(io_error) => PipelineError::Decompression(io_error),
            None => PipelineError::Csv(error),
        }
    }
}

impl PipelineError {
    /// Attach the name of the archive being processed to an error.
    pub fn in_file(self, file_name: &str) -> Self {
        PipelineError::File {
            file_name: file_name.to_string(),
            source: Box::new(self),
        }
    }
}

impl IntoResponse for PipelineError {
    /// Convert from a `PipelineError` into an [axum::response::Response].
    fn into_response(self) -> Response {
        ErrorResponse::from(self).into_response()
    }
}

/// Body of error response
///
/// Implements serde (de)serialise.
#[derive(Deserialize, Serialize)]
struct ErrorBody {
    /// Main error message
    message: String,

    /// Optional list of causes
    #[serde(skip_serializing_if = "Option::is_none")]
    caused_by: Option<Vec<String>>,
}

impl ErrorBody {
    /// Return a new ErrorBody
    ///
    /// # Arguments
    ///
    /// * `error`: The error that occurred
    fn new<E>(error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        let message = error.to_string();
        let mut causes = Vec::new();
        let mut current = error.source();
        while let Some(source) = current {
            causes.push(source.to_string());
            current = source.source();
        }
        // Remove duplicate entries.
        causes.dedup();
        let caused_by = (!causes.is_empty()).then_some(causes);
        ErrorBody { message, caused_by }
    }
}

/// A response to send in error cases
#[derive(Deserialize, Serialize)]
struct ErrorResponse {
    /// HTTP status of the response
    #[serde(skip)]
    status: StatusCode,

    /// Response body
    error: ErrorBody,
}

impl ErrorResponse {
    fn new<E>(status: StatusCode, error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        ErrorResponse {
            status,
            error: ErrorBody::new(error),
        }
    }
}

impl From<PipelineError> for ErrorResponse {
    /// Convert from a `PipelineError` into an `ErrorResponse`.
    fn from(error: PipelineError) -> Self {
        let status = match &error {
            PipelineError::RequestDataJsonRejection(_)
            | PipelineError::RequestDataValidationSingle(_)
            | PipelineError::RequestDataValidation(_) => StatusCode::BAD_REQUEST,

            PipelineError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,

            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let response = Self::new(status, &error);

        // Log server errors.
        if response.status.is_server_error() {
            log_error_chain(&error);
        }

        response
    }
}

impl IntoResponse for ErrorResponse {
    /// Renders the response as JSON.
    fn into_response(self) -> Response {
        match serde_json::to_string_pretty(&self) {
            Err(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to serialise error response: {}", err),
            )
                .into_response(),
            Ok(json_body) => (
                self.status,
                [(&header::CONTENT_TYPE, mime::APPLICATION_JSON.to_string())],
                json_body,
            )
                .into_response(),
        }
    }
}

/// Log an error followed by each of its causes.
pub fn log_error_chain(error: &dyn Error) {
    event!(Level::ERROR, "{}", error);
    let mut current = error.source();
    while let Some(source) = current {
        event!(Level::ERROR, "Caused by: {}", source);
        current = source.source();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use hyper::HeaderMap;

    // Jump through the hoops to get the body as a string.
    async fn body_string(response: Response) -> String {
        String::from_utf8(
            hyper::body::to_bytes(response.into_body())
                .await
                .unwrap()
                .to_vec(),
        )
        .unwrap()
    }

    async fn test_pipeline_error(
        error: PipelineError,
        status: StatusCode,
        message: &str,
        caused_by: Option<Vec<&'static str>>,
    ) {
        let response = error.into_response();
        assert_eq!(status, response.status());
        let mut headers = HeaderMap::new();
        headers.insert(&header::CONTENT_TYPE, "application/json".parse().unwrap());
        assert_eq!(headers, *response.headers());
        let error_response: ErrorResponse =
            serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(message.to_string(), error_response.error.message);
        let caused_by = caused_by.map(|cb| cb.iter().map(|s| s.to_string()).collect());
        assert_eq!(caused_by, error_response.error.caused_by);
    }

    #[tokio::test]
    async fn decompression_error() {
        let io_error = std::io::Error::new(std::io::ErrorKind::InvalidInput, "invalid gzip header");
        let error = PipelineError::Decompression(io_error);
        let caused_by = Some(vec!["invalid gzip header"]);
        test_pipeline_error(
            error,
            StatusCode::INTERNAL_SERVER_ERROR,
            "failed to decompress data",
            caused_by,
        )
        .await;
    }

    #[tokio::test]
    async fn invalid_date_error() {
        let error = PipelineError::InvalidDate {
            date: "2020011".to_string(),
        };
        let message = "invalid observation date \"2020011\"";
        test_pipeline_error(error, StatusCode::INTERNAL_SERVER_ERROR, message, None).await;
    }

    #[tokio::test]
    async fn http_status_error() {
        let error = PipelineError::HTTPRequestError {
            url: "http://example.com/2020.csv.gz".to_string(),
            status: 404,
        };
        let message = "HTTP request to http://example.com/2020.csv.gz failed with status 404";
        test_pipeline_error(error, StatusCode::INTERNAL_SERVER_ERROR, message, None).await;
    }

    #[tokio::test]
    async fn timeout_error() {
        let error = PipelineError::Timeout {
            operation: "download",
            target: "2020.csv.gz".to_string(),
            timeout: Duration::from_secs(600),
        };
        let message = "download of 2020.csv.gz did not complete within 600s";
        test_pipeline_error(error, StatusCode::GATEWAY_TIMEOUT, message, None).await;
    }

    #[tokio::test]
    async fn request_data_validation_single() {
        let validation_error = validator::ValidationError::new("foo");
        let error = PipelineError::RequestDataValidationSingle(validation_error);
        let message = "request data is not valid";
        let caused_by = Some(vec!["Validation error: foo [{}]"]);
        test_pipeline_error(error, StatusCode::BAD_REQUEST, message, caused_by).await;
    }

    #[tokio::test]
    async fn request_data_validation() {
        let mut validation_errors = validator::ValidationErrors::new();
        let validation_error = validator::ValidationError::new("foo");
        validation_errors.add("length", validation_error);
        let error = PipelineError::RequestDataValidation(validation_errors);
        let message = "request data is not valid";
        let caused_by = Some(vec!["length: Validation error: foo [{}]"]);
        test_pipeline_error(error, StatusCode::BAD_REQUEST, message, caused_by).await;
    }

    #[tokio::test]
    async fn semaphore_acquire_error() {
        let sem = tokio::sync::Semaphore::new(1);
        sem.close();
        let error = PipelineError::SemaphoreAcquireError(sem.acquire().await.unwrap_err());
        let message = "error acquiring resources";
        let caused_by = Some(vec!["semaphore closed"]);
        test_pipeline_error(error, StatusCode::INTERNAL_SERVER_ERROR, message, caused_by).await;
    }

    #[tokio::test]
    async fn file_error_names_file_and_cause() {
        let error = PipelineError::HTTPRequestError {
            url: "http://example.com/2021.csv.gz".to_string(),
            status: 503,
        }
        .in_file("2021.csv.gz");
        let message = "failed to process 2021.csv.gz: HTTP request to http://example.com/2021.csv.gz failed with status 503";
        let caused_by = Some(vec![
            "HTTP request to http://example.com/2021.csv.gz failed with status 503",
        ]);
        test_pipeline_error(error, StatusCode::INTERNAL_SERVER_ERROR, message, caused_by).await;
    }

    #[test]
    fn csv_io_error_is_decompression() {
        let io_error = std::io::Error::new(std::io::ErrorKind::InvalidInput, "corrupt deflate stream");
        let error = PipelineError::from(csv::Error::from(io_error));
        match error {
            PipelineError::Decompression(source) => {
                assert_eq!(std::io::ErrorKind::InvalidInput, source.kind());
                assert_eq!("corrupt deflate stream", source.to_string());
            }
            error => panic!("unexpected error {}", error),
        }
    }

    #[test]
    fn csv_parse_error_stays_csv() {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_reader("a,b\nc\n".as_bytes());
        let csv_error = reader
            .records()
            .find_map(Result::err)
            .expect("unequal row lengths");
        let error = PipelineError::from(csv_error);
        assert!(matches!(error, PipelineError::Csv(_)), "{error:?}");
    }
}
