use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use chrono::{DateTime, Utc};
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sea_orm::DbErr),

    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("User not found: {0}")]
    UserNotFound(String),

    /// 冷却未结束；属于预期内的业务拒绝，附带下次可用时间
    #[error("Roulette is available once per 24 hours, next spin at {next_eligible_at}")]
    CooldownActive {
        next_eligible_at: DateTime<Utc>,
        hours_remaining: i64,
    },

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl AppError {
    fn code(&self) -> &'static str {
        match self {
            AppError::MalformedRequest(_) => "malformed_request",
            AppError::NotAuthenticated => "not_authenticated",
            AppError::UserNotFound(_) => "user_not_found",
            AppError::CooldownActive { .. } => "cooldown",
            AppError::DatabaseError(_) => "database_error",
            _ => "internal_error",
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::MalformedRequest(_) | AppError::CooldownActive { .. } => {
                StatusCode::BAD_REQUEST
            }
            AppError::NotAuthenticated => StatusCode::FORBIDDEN,
            AppError::UserNotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            AppError::MalformedRequest(msg) => {
                log::warn!("Malformed request: {msg}");
                msg.clone()
            }
            AppError::NotAuthenticated => {
                log::warn!("Rejected unauthenticated request");
                "Forbidden".to_string()
            }
            AppError::UserNotFound(user_id) => {
                log::debug!("User not found: {user_id}");
                "User not found".to_string()
            }
            AppError::CooldownActive { .. } => self.to_string(),
            AppError::DatabaseError(err) => {
                log::error!("Database error: {err}");
                "Database error".to_string()
            }
            _ => {
                log::error!("Internal error: {self}");
                "Internal server error".to_string()
            }
        };

        let mut body = json!({
            "success": false,
            "error": self.code(),
            "message": message,
        });
        if let AppError::CooldownActive {
            next_eligible_at,
            hours_remaining,
        } = self
        {
            body["nextEligibleAt"] = json!(next_eligible_at);
            body["hoursRemaining"] = json!(hours_remaining);
        }

        HttpResponse::build(self.status_code()).json(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;
    use chrono::TimeZone;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::NotAuthenticated.status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::UserNotFound("42".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::MalformedRequest("userId is required".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::InternalError("boom".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[actix_web::test]
    async fn test_cooldown_body_carries_next_time() {
        let next = Utc.with_ymd_and_hms(2025, 1, 2, 12, 0, 0).unwrap();
        let err = AppError::CooldownActive {
            next_eligible_at: next,
            hours_remaining: 5,
        };
        let resp = err.error_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let bytes = to_bytes(resp.into_body()).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "cooldown");
        assert_eq!(body["hoursRemaining"], 5);
        assert_eq!(body["nextEligibleAt"], json!(next));
    }
}
