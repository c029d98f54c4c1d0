//! Read-mostly JSON API over the dashboard.
//!
//! Serves the same views the CLI prints, for browser or script clients.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `GET`  | `/sections` | Sections by `order_index` |
//! | `GET`  | `/sections/{id}/folders` | Folder tree of a section |
//! | `GET`  | `/sections/{id}/cards` | Cards of a section (`?unfiled=true` for cards in no folder) |
//! | `GET`  | `/folders/{id}/cards` | Cards in a folder and its subfolders |
//! | `GET`  | `/cards/{id}` | One card with its folders |
//! | `GET`  | `/search?q=` | Sections, folders and cards matching `q` |
//! | `GET`  | `/favorites` | Locally starred cards |
//! | `GET`  | `/recent` | Recently opened cards |
//! | `GET`  | `/export` | Full export document |
//! | `POST` | `/import` | Replace all data with an export document |
//!
//! `POST /import` is destructive. It needs `?confirm=true` or an
//! `X-Linkboard-Confirm: true` header and an `application/json` body. Only
//! the `GET` routes answer cross-origin requests.
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "not_found", "message": "card not found: ..." } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404),
//! `unsupported_media_type` (415), `backend` (502), `internal` (500).

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;

use linkboard_core::local::RecentEntry;
use linkboard_core::models::{Card, FolderRef, SearchResults, Section};
use linkboard_core::search::{search_all_with_min, search_cards};
use linkboard_core::transfer::{self, DashboardExport, ImportPreview};
use linkboard_core::tree::{build_folder_tree, FolderNode};
use linkboard_core::{ops, DashboardError};

use crate::app::App;

/// Starts the HTTP server on `[server].bind`. Runs until the process is
/// terminated.
pub async fn run_server(app: App) -> anyhow::Result<()> {
    let bind_addr = app.config.server.bind.clone();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    println!("Linkboard API listening on http://{}", bind_addr);
    tracing::info!(bind = %bind_addr, "server started");
    axum::serve(listener, router(app)).await?;
    Ok(())
}

/// Header accepted in place of `?confirm=true` on `POST /import`.
pub const CONFIRM_HEADER: &str = "x-linkboard-confirm";

/// Read routes with permissive CORS, plus the same-origin import route.
pub fn router(app: App) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET])
        .allow_headers(Any);

    let reads = Router::new()
        .route("/health", get(handle_health))
        .route("/sections", get(handle_sections))
        .route("/sections/{id}/folders", get(handle_section_folders))
        .route("/sections/{id}/cards", get(handle_section_cards))
        .route("/folders/{id}/cards", get(handle_folder_cards))
        .route("/cards/{id}", get(handle_card))
        .route("/search", get(handle_search))
        .route("/favorites", get(handle_favorites))
        .route("/recent", get(handle_recent))
        .route("/export", get(handle_export))
        .layer(cors);

    reads
        .merge(Router::new().route("/import", post(handle_import)))
        .with_state(app)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found",
        message: message.into(),
    }
}

/// Maps failures by their [`DashboardError`] kind, if any.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        let message = format!("{:#}", err);
        match err.downcast_ref::<DashboardError>() {
            Some(DashboardError::NotFound { .. }) => not_found(message),
            Some(e) if e.is_client_error() => bad_request(message),
            Some(DashboardError::Backend { .. }) => AppError {
                status: StatusCode::BAD_GATEWAY,
                code: "backend",
                message,
            },
            _ => {
                tracing::error!(error = %message, "request failed");
                AppError {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    code: "internal",
                    message,
                }
            }
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        let status = rejection.status();
        let code = if status == StatusCode::UNSUPPORTED_MEDIA_TYPE {
            "unsupported_media_type"
        } else {
            "bad_request"
        };
        AppError {
            status,
            code,
            message: rejection.body_text(),
        }
    }
}

impl From<DashboardError> for AppError {
    fn from(err: DashboardError) -> Self {
        anyhow::Error::new(err).into()
    }
}

type ApiResult<T> = Result<Json<T>, AppError>;

// ============ Handlers ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn handle_sections(State(app): State<App>) -> ApiResult<Vec<Section>> {
    Ok(Json(app.backend.list_sections().await?))
}

async fn handle_section_folders(
    State(app): State<App>,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<FolderNode>> {
    let folders = app.backend.list_folders(id).await?;
    Ok(Json(build_folder_tree(&folders)))
}

#[derive(Deserialize)]
struct SectionCardsParams {
    #[serde(default)]
    unfiled: bool,
}

async fn handle_section_cards(
    State(app): State<App>,
    Path(id): Path<Uuid>,
    Query(params): Query<SectionCardsParams>,
) -> ApiResult<Vec<Card>> {
    let cards = if params.unfiled {
        app.backend.cards_without_folder(id).await?
    } else {
        app.backend.list_cards(id).await?
    };
    Ok(Json(cards))
}

async fn handle_folder_cards(
    State(app): State<App>,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<Card>> {
    Ok(Json(app.backend.cards_in_tree(id).await?))
}

#[derive(Serialize)]
struct CardDetail {
    #[serde(flatten)]
    card: Card,
    folders: Vec<FolderRef>,
}

async fn handle_card(State(app): State<App>, Path(id): Path<Uuid>) -> ApiResult<CardDetail> {
    let card = app
        .backend
        .get_card(id)
        .await?
        .ok_or(DashboardError::not_found("card", id))?;
    let folders = app.backend.card_folders(id).await?;
    Ok(Json(CardDetail { card, folders }))
}

#[derive(Deserialize)]
struct SearchParams {
    q: Option<String>,
    section: Option<Uuid>,
}

async fn handle_search(
    State(app): State<App>,
    Query(params): Query<SearchParams>,
) -> ApiResult<SearchResults> {
    let q = params
        .q
        .ok_or_else(|| bad_request("query parameter 'q' is required"))?;
    let min_len = app.config.search.min_query_len;
    let results = match params.section {
        Some(section) => SearchResults {
            cards: search_cards(app.backend.as_ref(), &q, Some(section), min_len).await?,
            ..Default::default()
        },
        None => search_all_with_min(app.backend.as_ref(), &q, min_len).await,
    };
    Ok(Json(results))
}

async fn handle_favorites(State(app): State<App>) -> ApiResult<Vec<Card>> {
    let favorites = app.favorites()?;
    Ok(Json(ops::favorite_cards(app.backend.as_ref(), &favorites).await?))
}

async fn handle_recent(State(app): State<App>) -> ApiResult<Vec<RecentEntry>> {
    Ok(Json(app.recent()?.entries().to_vec()))
}

async fn handle_export(State(app): State<App>) -> ApiResult<DashboardExport> {
    Ok(Json(transfer::export_data(app.backend.as_ref()).await?))
}

#[derive(Deserialize)]
struct ImportParams {
    #[serde(default)]
    confirm: bool,
}

fn import_confirmed(params: &ImportParams, headers: &HeaderMap) -> bool {
    params.confirm
        || headers
            .get(CONFIRM_HEADER)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.eq_ignore_ascii_case("true"))
}

async fn handle_import(
    State(app): State<App>,
    Query(params): Query<ImportParams>,
    headers: HeaderMap,
    body: Result<Json<DashboardExport>, JsonRejection>,
) -> ApiResult<ImportPreview> {
    if !import_confirmed(&params, &headers) {
        return Err(bad_request(
            "import replaces all data; pass ?confirm=true or X-Linkboard-Confirm: true",
        ));
    }
    let Json(doc) = body?;
    let preview = transfer::import_data(app.backend.as_ref(), &doc).await?;
    tracing::warn!(
        sections = preview.sections,
        cards = preview.cards,
        "dashboard replaced by import"
    );
    Ok(Json(preview))
}
