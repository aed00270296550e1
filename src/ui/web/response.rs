use std::net::IpAddr;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};

use crate::service::{ConnectRequest, ErrorKind, Operation, ServiceError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestError {
    pub code: u32,
    pub message: String,
}

/// Uniform body of every control API response.
#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub error: Option<RestError>,
    pub result: Option<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connect {
    pub id: u64,
    pub info: String,
    pub keys: Vec<String>,
    #[serde(default)]
    pub resolvers: Vec<IpAddr>,
}

impl TryFrom<Connect> for ConnectRequest {
    type Error = ServiceError;

    fn try_from(c: Connect) -> Result<Self, Self::Error> {
        let decode = |field: &str, s: &str| {
            STANDARD
                .decode(s)
                .map_err(|e| ServiceError::Validation(format!("invalid base64 in {field}: {e}")))
        };

        Ok(Self {
            id: c.id,
            info: decode("info", &c.info)?,
            keys: c
                .keys
                .iter()
                .map(|k| decode("keys", k))
                .collect::<Result<_, _>>()?,
            resolvers: c.resolvers,
        })
    }
}

pub struct Reply<T> {
    status: StatusCode,
    body: Envelope<T>,
}

impl<T> From<(Operation, Result<Option<T>, ServiceError>)> for Reply<T> {
    fn from((op, r): (Operation, Result<Option<T>, ServiceError>)) -> Self {
        match r {
            Ok(result) => Self {
                status: StatusCode::OK,
                body: Envelope {
                    success: true,
                    error: None,
                    result,
                },
            },
            Err(e) => Self {
                status: match e.kind() {
                    ErrorKind::Validation => StatusCode::BAD_REQUEST,
                    ErrorKind::Conflict => StatusCode::CONFLICT,
                    ErrorKind::Resource | ErrorKind::Hook => StatusCode::INTERNAL_SERVER_ERROR,
                },
                body: Envelope {
                    success: false,
                    error: Some(RestError {
                        code: e.code(op),
                        message: e.to_string(),
                    }),
                    result: None,
                },
            },
        }
    }
}

impl<T: Serialize> IntoResponse for Reply<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
