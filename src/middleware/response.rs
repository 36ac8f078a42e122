use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::{json, Value};

/// Success envelope: `{ success: true, message, data? }`
#[derive(Debug)]
pub struct ApiResponse<T: Serialize> {
    pub message: &'static str,
    pub data: Option<T>,
    pub status_code: StatusCode,
}

impl<T: Serialize> ApiResponse<T> {
    /// 200 with data
    pub fn success(message: &'static str, data: T) -> Self {
        Self::with_status(message, data, StatusCode::OK)
    }

    pub fn with_status(message: &'static str, data: T, status_code: StatusCode) -> Self {
        Self {
            message,
            data: Some(data),
            status_code,
        }
    }

    /// 201 with data
    pub fn created(message: &'static str, data: T) -> Self {
        Self::with_status(message, data, StatusCode::CREATED)
    }
}

impl ApiResponse<()> {
    /// 200 without a `data` member
    pub fn message(message: &'static str) -> Self {
        Self {
            message,
            data: None,
            status_code: StatusCode::OK,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let mut envelope = json!({
            "success": true,
            "message": self.message
        });

        if let Some(data) = &self.data {
            match serde_json::to_value(data) {
                Ok(value) => envelope["data"] = value,
                Err(e) => {
                    tracing::error!("Failed to serialize response data: {}", e);
                    return (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        Json(json!({
                            "success": false,
                            "message": "Failed to serialize response data",
                            "code": "INTERNAL_SERVER_ERROR"
                        })),
                    )
                        .into_response();
                }
            }
        }

        (self.status_code, Json::<Value>(envelope)).into_response()
    }
}

pub type ApiResult<T> = Result<ApiResponse<T>, crate::error::ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_of(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn wraps_data_in_envelope() {
        let response = ApiResponse::created("Job posted successfully", json!({ "id": 3 })).into_response();
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = body_of(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "Job posted successfully");
        assert_eq!(body["data"]["id"], 3);
    }

    #[tokio::test]
    async fn message_only_has_no_data() {
        let body = body_of(ApiResponse::message("Job deleted successfully").into_response()).await;
        assert!(body.get("data").is_none());
    }
}
