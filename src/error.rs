//! Error types for the filter pipeline

use aws_sdk_s3::{error::SdkError, operation::put_object::PutObjectError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Body returned with every 400 response
pub const MISSING_IMAGE_URL_MESSAGE: &str = "image_url query parameter is required";

/// Body returned with every 422 response
pub const UNPROCESSABLE_MESSAGE: &str =
    "Unable to process the image. Please check the image URL and try again.";

/// Result type for pipeline operations
pub type FilterResult<T> = Result<T, FilterError>;

/// Errors that can occur while resolving configuration or serving a request
#[derive(Error, Debug)]
pub enum FilterError {
    /// Missing or unusable startup configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Caller supplied an invalid request
    #[error("Validation error: {0}")]
    Validation(String),

    /// Fetching, decoding, transforming or writing the image failed
    #[error("Image processing error: {0}")]
    ImageProcessing(String),

    /// Storing the filtered image failed
    #[error("Upload error: {0}")]
    Upload(String),
}

impl FilterError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::ImageProcessing(_) | Self::Upload(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<reqwest::Error> for FilterError {
    fn from(error: reqwest::Error) -> Self {
        Self::ImageProcessing(format!("failed to fetch image: {error}"))
    }
}

impl From<url::ParseError> for FilterError {
    fn from(error: url::ParseError) -> Self {
        Self::ImageProcessing(format!("invalid image URL: {error}"))
    }
}

impl From<image::ImageError> for FilterError {
    fn from(error: image::ImageError) -> Self {
        Self::ImageProcessing(error.to_string())
    }
}

impl From<SdkError<PutObjectError>> for FilterError {
    fn from(error: SdkError<PutObjectError>) -> Self {
        match error {
            SdkError::ServiceError(err) => Self::Upload(format!("{:?}", err.err())),
            _ => Self::Upload(error.to_string()),
        }
    }
}

impl IntoResponse for FilterError {
    fn into_response(self) -> Response {
        // Internal detail stays in the logs; callers get a fixed message
        let status = self.status_code();
        let body = match self {
            Self::Validation(_) => MISSING_IMAGE_URL_MESSAGE,
            Self::ImageProcessing(_) | Self::Upload(_) => UNPROCESSABLE_MESSAGE,
            Self::Configuration(_) => "Service is not configured",
        };
        (status, body).into_response()
    }
}
