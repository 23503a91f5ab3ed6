//! Error translator
//!
//! Handlers answer expected outcomes (validation, not found) themselves. Any
//! other failure is returned as a [`Failure`], which renders as a bare status
//! response carrying itself in the response extensions. The
//! [`translate_failures`] middleware wraps every request, assigns a trace id,
//! and swaps such responses for the JSON [`ErrorEnvelope`].

use std::any::Any;
use std::error::Error as StdError;
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::Instrument;

use crate::application::error::AppError;
use crate::config::RunMode;
use crate::domain::error::DomainError;

pub const TRACE_ID_HEADER: &str = "x-trace-id";
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// 想定外の失敗の分類。ステータスとクライアント向けメッセージが決まる。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    ResourceMissing,
    /// null引数もここに含む
    InvalidArgument,
    InvalidOperationState,
    Unauthorized,
    NotImplemented,
    Unclassified,
}

impl FailureKind {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::ResourceMissing => StatusCode::NOT_FOUND,
            Self::InvalidArgument | Self::InvalidOperationState => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotImplemented => StatusCode::NOT_IMPLEMENTED,
            Self::Unclassified => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::ResourceMissing => "The requested resource was not found.",
            Self::InvalidArgument => "Invalid arguments provided.",
            Self::InvalidOperationState => "The requested operation is invalid.",
            Self::Unauthorized => "You are not authorized to access this resource.",
            Self::NotImplemented => "This functionality is not implemented yet.",
            Self::Unclassified => "An unexpected error occurred. Please try again later.",
        }
    }
}

/// ハンドラが処理しきれなかった失敗。
#[derive(Debug)]
pub struct Failure {
    kind: FailureKind,
    error: anyhow::Error,
}

impl Failure {
    pub fn new(kind: FailureKind, error: impl Into<anyhow::Error>) -> Self {
        Self {
            kind,
            error: error.into(),
        }
    }

    pub fn kind(&self) -> FailureKind {
        self.kind
    }

    pub fn error(&self) -> &anyhow::Error {
        &self.error
    }

    /// panic payload を Unclassified として包む。
    pub fn from_panic(payload: Box<dyn Any + Send + 'static>) -> Self {
        let detail = if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else {
            "non-string panic payload".to_string()
        };
        Self::new(
            FailureKind::Unclassified,
            anyhow::anyhow!("handler panicked: {detail}"),
        )
    }
}

impl From<AppError> for Failure {
    fn from(err: AppError) -> Self {
        let kind = match &err {
            AppError::Domain(DomainError::NotFound(_) | DomainError::PageOutOfRange { .. }) => {
                FailureKind::ResourceMissing
            }
            AppError::Domain(DomainError::InvalidArgument(_) | DomainError::Validation(_)) => {
                FailureKind::InvalidArgument
            }
            AppError::Storage(source) => classify_storage(source.as_ref()),
        };
        Self::new(kind, err)
    }
}

/// エラーチェーンから `sqlx::Error` を探して分類する。
fn classify_storage(err: &(dyn StdError + 'static)) -> FailureKind {
    let db_error = std::iter::successors(Some(err), |&e| e.source())
        .find_map(|e| e.downcast_ref::<sqlx::Error>());

    match db_error {
        Some(sqlx::Error::RowNotFound) => FailureKind::ResourceMissing,
        Some(sqlx::Error::Database(db)) => match db.kind() {
            sqlx::error::ErrorKind::Other => FailureKind::Unclassified,
            _ => FailureKind::InvalidArgument,
        },
        Some(sqlx::Error::PoolClosed) => FailureKind::InvalidOperationState,
        _ => FailureKind::Unclassified,
    }
}

#[derive(Clone)]
struct Captured(Arc<Failure>);

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        let mut response = self.kind.status().into_response();
        response.extensions_mut().insert(Captured(Arc::new(self)));
        response
    }
}

/// `tower_http::catch_panic` 用のハンドラ。
pub fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    Failure::from_panic(payload).into_response()
}

/// 統一エラーレスポンス。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEnvelope {
    pub status_code: u16,
    pub message: String,
    pub details: Option<String>,
    pub trace_id: String,
    pub timestamp: DateTime<Utc>,
}

impl ErrorEnvelope {
    pub fn new(failure: &Failure, trace_id: &str, run_mode: RunMode) -> Self {
        let kind = failure.kind();
        Self {
            status_code: kind.status().as_u16(),
            message: kind.message().to_string(),
            details: run_mode
                .is_development()
                .then(|| format!("{:?}", failure.error())),
            trace_id: trace_id.to_string(),
            timestamp: Utc::now(),
        }
    }
}

/// 全リクエストを包むミドルウェア。
pub async fn translate_failures(
    State(run_mode): State<RunMode>,
    request: Request,
    next: Next,
) -> Response {
    let trace_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let span = tracing::info_span!("request", trace_id = %trace_id);
    let mut response = next.run(request).instrument(span).await;

    if let Some(Captured(failure)) = response.extensions_mut().remove::<Captured>() {
        tracing::error!(
            trace_id = %trace_id,
            kind = ?failure.kind(),
            error = ?failure.error(),
            "unhandled failure while serving request"
        );
        let envelope = ErrorEnvelope::new(&failure, &trace_id, run_mode);
        response = (failure.kind().status(), Json(envelope)).into_response();
    }

    if let Ok(value) = HeaderValue::from_str(&trace_id) {
        response.headers_mut().insert(TRACE_ID_HEADER, value);
    }
    response
}
