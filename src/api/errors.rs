// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::IndexError;

/// JSON error body shared by every failing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

/// Response wrapper mapping [`IndexError`] onto HTTP statuses.
pub struct ApiFailure(pub IndexError);

impl ApiFailure {
    fn status_code(&self) -> StatusCode {
        match self.0 {
            IndexError::UnsupportedType(_) | IndexError::EmptyDocument => StatusCode::BAD_REQUEST,
            IndexError::Provider(_) => StatusCode::BAD_GATEWAY,
            IndexError::Retrieval(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(ErrorBody::new(self.0.to_string()))).into_response()
    }
}

impl From<IndexError> for ApiFailure {
    fn from(err: IndexError) -> Self {
        ApiFailure(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiFailure(IndexError::EmptyDocument).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiFailure(IndexError::Provider("x".to_string())).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ApiFailure(IndexError::Retrieval("x".to_string())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
