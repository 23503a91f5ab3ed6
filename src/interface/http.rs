//! HTTP surface for books-api
//!
//! axum Router <-> application::BookService
//!
//! Routes: `/api/books` (list, create), `/api/books/search`,
//! `/api/books/{id}` (get, update, delete), `/health`.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{middleware, Json, Router};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

use super::failure::{panic_response, translate_failures, Failure};
use crate::application::error::AppError;
use crate::application::service::BookService;
use crate::config::{RunMode, Settings};
use crate::domain::error::DomainError;
use crate::domain::model::book::BookDraft;
use crate::domain::model::id::BookId;
use crate::domain::model::page::{PageRequest, DEFAULT_PAGE, DEFAULT_PAGE_SIZE};
use crate::domain::repository::BookRepository;
use crate::domain::validation::Violation;
use crate::infra::sqlite_store::SqliteBookRepository;

// =============================================================================
// Public entry point
// =============================================================================

/// DBに接続してHTTPサーバを起動する。Ctrl-Cで停止。
pub async fn run(settings: Settings) -> anyhow::Result<()> {
    let repo =
        SqliteBookRepository::connect(&settings.database_url, settings.max_connections).await?;
    tracing::info!(database = %settings.database_url, "database ready");

    let app = router(BookService::new(repo), settings.run_mode);
    let listener = TcpListener::bind(settings.socket_addr()).await?;
    tracing::info!(
        addr = %listener.local_addr()?,
        run_mode = %settings.run_mode,
        "books-api listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for ctrl-c: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

/// ルーティングとミドルウェアを組み立てる。
///
/// Layer order, outermost first: access trace, error translator, panic
/// catcher, handlers.
pub fn router<R: BookRepository>(books: BookService<R>, run_mode: RunMode) -> Router {
    let state = ApiState {
        books: Arc::new(books),
    };

    Router::new()
        .route("/health", get(health::<R>))
        .route("/api/books", get(list_books::<R>).post(create_book::<R>))
        .route("/api/books/search", get(search_books::<R>))
        .route(
            "/api/books/{id}",
            get(get_book::<R>)
                .put(update_book::<R>)
                .delete(delete_book::<R>),
        )
        .with_state(state)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(middleware::from_fn_with_state(run_mode, translate_failures))
        .layer(TraceLayer::new_for_http())
}

// =============================================================================
// State
// =============================================================================

struct ApiState<R: BookRepository> {
    books: Arc<BookService<R>>,
}

impl<R: BookRepository> Clone for ApiState<R> {
    fn clone(&self) -> Self {
        Self {
            books: Arc::clone(&self.books),
        }
    }
}

// =============================================================================
// Request / response types
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListParams {
    #[serde(default = "default_page")]
    page: i64,
    #[serde(default = "default_page_size")]
    page_size: i64,
}

fn default_page() -> i64 {
    DEFAULT_PAGE
}

fn default_page_size() -> i64 {
    DEFAULT_PAGE_SIZE
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    #[serde(default)]
    query: String,
}

#[derive(Debug, Serialize)]
struct MessageBody {
    message: String,
}

#[derive(Debug, Serialize)]
struct ValidationBody {
    message: &'static str,
    errors: BTreeMap<&'static str, Vec<String>>,
}

// =============================================================================
// Tier 1 responses
// =============================================================================

type HandlerResult = Result<Response, Failure>;

fn bad_request(message: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(MessageBody {
            message: message.into(),
        }),
    )
        .into_response()
}

fn validation_problem(violations: Vec<Violation>) -> Response {
    let mut errors: BTreeMap<&'static str, Vec<String>> = BTreeMap::new();
    for v in violations {
        errors.entry(v.field).or_default().push(v.message);
    }
    (
        StatusCode::BAD_REQUEST,
        Json(ValidationBody {
            message: "One or more validation errors occurred.",
            errors,
        }),
    )
        .into_response()
}

/// 想定内のドメインエラーはここで応答に変える。それ以外は translator へ。
fn reject(err: AppError) -> HandlerResult {
    match err {
        AppError::Domain(DomainError::NotFound(_)) => Ok(StatusCode::NOT_FOUND.into_response()),
        AppError::Domain(e @ DomainError::PageOutOfRange { .. }) => Ok((
            StatusCode::NOT_FOUND,
            Json(MessageBody {
                message: e.to_string(),
            }),
        )
            .into_response()),
        AppError::Domain(DomainError::InvalidArgument(message)) => Ok(bad_request(message)),
        AppError::Domain(DomainError::Validation(violations)) => Ok(validation_problem(violations)),
        other => Err(Failure::from(other)),
    }
}

fn book_id(path: Result<Path<i64>, PathRejection>) -> Result<BookId, Response> {
    path.map(|Path(id)| BookId::new(id))
        .map_err(|rejection| bad_request(rejection.body_text()))
}

// =============================================================================
// Handlers
// =============================================================================

async fn list_books<R: BookRepository>(
    State(state): State<ApiState<R>>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> HandlerResult {
    let Query(params) = match params {
        Ok(q) => q,
        Err(rejection) => return Ok(bad_request(rejection.body_text())),
    };
    let page = match PageRequest::new(params.page, params.page_size) {
        Ok(page) => page,
        Err(e) => return reject(e.into()),
    };

    match state.books.list(page).await {
        Ok(books) => Ok(Json(books).into_response()),
        Err(e) => reject(e),
    }
}

async fn get_book<R: BookRepository>(
    State(state): State<ApiState<R>>,
    path: Result<Path<i64>, PathRejection>,
) -> HandlerResult {
    let id = match book_id(path) {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };

    match state.books.get(id).await {
        Ok(book) => Ok(Json(book).into_response()),
        Err(e) => reject(e),
    }
}

async fn create_book<R: BookRepository>(
    State(state): State<ApiState<R>>,
    payload: Result<Json<BookDraft>, JsonRejection>,
) -> HandlerResult {
    let Json(draft) = match payload {
        Ok(p) => p,
        Err(rejection) => return Ok(bad_request(rejection.body_text())),
    };

    match state.books.create(draft).await {
        Ok(book) => {
            let location = format!("/api/books/{}", book.id());
            Ok((
                StatusCode::CREATED,
                [(header::LOCATION, location)],
                Json(book),
            )
                .into_response())
        }
        Err(e) => reject(e),
    }
}

async fn update_book<R: BookRepository>(
    State(state): State<ApiState<R>>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<BookDraft>, JsonRejection>,
) -> HandlerResult {
    let id = match book_id(path) {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };
    let Json(draft) = match payload {
        Ok(p) => p,
        Err(rejection) => return Ok(bad_request(rejection.body_text())),
    };

    match state.books.update(id, draft).await {
        Ok(()) => Ok(StatusCode::NO_CONTENT.into_response()),
        Err(e) => reject(e),
    }
}

async fn delete_book<R: BookRepository>(
    State(state): State<ApiState<R>>,
    path: Result<Path<i64>, PathRejection>,
) -> HandlerResult {
    let id = match book_id(path) {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };

    match state.books.delete(id).await {
        Ok(()) => Ok(StatusCode::NO_CONTENT.into_response()),
        Err(e) => reject(e),
    }
}

async fn search_books<R: BookRepository>(
    State(state): State<ApiState<R>>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> HandlerResult {
    let Query(params) = match params {
        Ok(q) => q,
        Err(rejection) => return Ok(bad_request(rejection.body_text())),
    };

    match state.books.search(&params.query).await {
        Ok(books) => Ok(Json(books).into_response()),
        Err(e) => reject(e),
    }
}

async fn health<R: BookRepository>(State(state): State<ApiState<R>>) -> HandlerResult {
    state.books.ping().await.map_err(Failure::from)?;
    Ok(Json(serde_json::json!({ "status": "ok" })).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::validation::validate_draft;

    #[test]
    fn list_params_default() {
        let params: ListParams = serde_json::from_str("{}").unwrap();
        assert_eq!(params.page, 1);
        assert_eq!(params.page_size, 10);
    }

    #[test]
    fn list_params_camel_case() {
        let params: ListParams = serde_json::from_str(r#"{"page": 3, "pageSize": 25}"#).unwrap();
        assert_eq!(params.page, 3);
        assert_eq!(params.page_size, 25);
    }

    #[test]
    fn reject_maps_not_found_to_404() {
        let response = reject(DomainError::NotFound(BookId::new(9)).into()).unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn reject_maps_validation_to_400() {
        let err = validate_draft(&BookDraft::default()).unwrap_err();
        let response = reject(err.into()).unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn reject_passes_storage_errors_on() {
        let err = AppError::Storage(Box::new(std::io::Error::other("gone")));
        assert!(reject(err).is_err());
    }
}
