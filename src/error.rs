use axum::extract::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use std::env;
use std::fmt::Debug;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct Error {
    pub code: i32,
    pub message: String,
}

impl Error {
    pub fn is_not_found_error(&self) -> bool {
        self.code == 102
    }

    pub fn is_invalid_state_transition_error(&self) -> bool {
        self.code == 100
    }

    pub fn is_already_accepted_error(&self) -> bool {
        self.code == 103
    }

    pub fn is_validation_error(&self) -> bool {
        self.code == 101
    }

    pub fn is_concurrent_modification_error(&self) -> bool {
        self.code == 104
    }

    pub fn is_subscription_failed_error(&self) -> bool {
        self.code == 106
    }
}

impl From<env::VarError> for Error {
    fn from(err: env::VarError) -> Self {
        env_var_error(err)
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        database_error(err)
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        reqwest_error(err)
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_message) = match self.code {
            1..=99 => (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error"),
            102 => (StatusCode::NOT_FOUND, self.message.as_str()),
            100 | 103 | 104 => (StatusCode::CONFLICT, self.message.as_str()),
            105 | 106 => (StatusCode::BAD_GATEWAY, self.message.as_str()),
            _ => (StatusCode::BAD_REQUEST, self.message.as_str()),
        };

        let body = Json(json!({
            "code": self.code,
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

pub fn invalid_state_transition_error(ride_id: Uuid, operation: &str, actual: &str) -> Error {
    Error {
        code: 100,
        message: format!("ride {}: cannot {} while {}", ride_id, operation, actual),
    }
}

pub fn validation_error(message: &str) -> Error {
    Error {
        code: 101,
        message: message.into(),
    }
}

pub fn not_found_error() -> Error {
    Error {
        code: 102,
        message: "not found".into(),
    }
}

pub fn already_accepted_error(ride_id: Uuid) -> Error {
    Error {
        code: 103,
        message: format!("ride {} is already taken", ride_id),
    }
}

pub fn concurrent_modification_error(ride_id: Uuid) -> Error {
    Error {
        code: 104,
        message: format!("ride {} was modified concurrently", ride_id),
    }
}

pub fn transport_failure_error() -> Error {
    Error {
        code: 105,
        message: "transport connection lost".into(),
    }
}

pub fn subscription_failed_error(topic: &str) -> Error {
    Error {
        code: 106,
        message: format!("subscription to {} failed after retries", topic),
    }
}

pub fn env_var_error(_: env::VarError) -> Error {
    Error {
        code: 1,
        message: "environment variable error".into(),
    }
}

pub fn database_error<T: Debug>(_: T) -> Error {
    Error {
        code: 2,
        message: "database error".into(),
    }
}

pub fn reqwest_error(_: reqwest::Error) -> Error {
    Error {
        code: 3,
        message: "reqwest error".into(),
    }
}

pub fn upstream_error() -> Error {
    Error {
        code: 4,
        message: "upstream error".into(),
    }
}

pub fn unexpected_error() -> Error {
    Error {
        code: 5,
        message: "unexpected error".into(),
    }
}
