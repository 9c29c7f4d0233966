//! The JSON response envelope.
//!
//! Every endpoint answers `{"success": bool, "message"?: string, ...payload}`.
//! The payload's fields are flattened into the top-level object.

use axum::{
    Json,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Marker payload for responses that carry only a message.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct Empty {}

/// `{success, message?, ...data}`.
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T = Empty> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(flatten)]
    data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// A successful response carrying `data`.
    pub const fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data,
        }
    }

    /// Attach a human-readable message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl ApiResponse {
    /// A successful response with only a message.
    pub fn message(message: impl Into<String>) -> Self {
        Self::ok(Empty {}).with_message(message)
    }

    /// A failed response with a message.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            data: Empty {},
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Payload {
        url: &'static str,
    }

    #[test]
    fn test_payload_is_flattened() {
        let json = serde_json::to_value(ApiResponse::ok(Payload {
            url: "https://checkout.stripe.test/c/pay/cs_1",
        }))
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "success": true,
                "url": "https://checkout.stripe.test/c/pay/cs_1"
            })
        );
    }

    #[test]
    fn test_message_only() {
        let json = serde_json::to_value(ApiResponse::message("Logged Out")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "success": true, "message": "Logged Out" })
        );
    }

    #[test]
    fn test_failure() {
        let json = serde_json::to_value(ApiResponse::failure("Not Authorized")).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "Not Authorized");
    }
}
