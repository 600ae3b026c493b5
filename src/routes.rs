use std::any::Any;

use askama::Template;
use axum::{
    extract::State,
    http::{StatusCode, Uri},
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use percent_encoding::percent_decode_str;
use serde::Serialize;
use thiserror::Error;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};
use tracing::{error, info};

use crate::approval::ApprovalService;

const LOOKUP_PREFIX: &str = "/urlinfo/1/";

#[derive(Clone)]
pub struct AppState {
    approvals: ApprovalService,
}

#[derive(Template)]
#[template(path = "home.html")]
struct HomeTemplate {
    version: &'static str,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("could not render page: {0}")]
    Render(#[from] askama::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        error!("{self}");
        status_response(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

#[derive(Serialize)]
struct StatusBody {
    status: u16,
}

#[derive(Serialize)]
struct ApprovalBody {
    approved: bool,
    status: u16,
}

#[derive(Serialize)]
struct SeedBody {
    success: bool,
    status: u16,
}

/// JSON body carrying nothing but the status code, used for every error.
pub fn status_response(code: StatusCode) -> Response {
    (
        code,
        Json(StatusBody {
            status: code.as_u16(),
        }),
    )
        .into_response()
}

/// Builds the app. `/add_test_data` wipes the store, so it only exists when `enable_test_data`
/// is set.
pub fn router(approvals: ApprovalService, enable_test_data: bool) -> Router {
    let mut router = Router::new()
        .route("/", get(home).fallback(method_not_allowed))
        .route(
            "/urlinfo/1/*url",
            get(approval_lookup).fallback(method_not_allowed),
        );
    if enable_test_data {
        router = router.route(
            "/add_test_data",
            get(add_data).fallback(method_not_allowed),
        );
    }

    router
        .fallback(page_not_found)
        .with_state(AppState { approvals })
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
}

async fn home() -> Result<Html<String>, AppError> {
    let page = HomeTemplate {
        version: env!("CARGO_PKG_VERSION"),
    }
    .render()?;
    Ok(Html(page))
}

async fn approval_lookup(State(state): State<AppState>, uri: Uri) -> Response {
    // Decoded by hand so bytes that aren't UTF-8 still get looked up. The query is not part of
    // the url; a literal `?` has to arrive as `%3F`.
    let raw = uri.path().strip_prefix(LOOKUP_PREFIX).unwrap_or_default();
    let url = percent_decode_str(raw).decode_utf8_lossy();
    if url.is_empty() {
        return status_response(StatusCode::NOT_FOUND);
    }

    let approved = state.approvals.is_approved(&url).await;
    info!("url: {url}, approved: {approved}");

    Json(ApprovalBody {
        approved,
        status: StatusCode::OK.as_u16(),
    })
    .into_response()
}

async fn add_data(State(state): State<AppState>) -> Json<SeedBody> {
    let added = state.approvals.seed_test_data().await;
    info!("data added: {added}");

    Json(SeedBody {
        success: added,
        status: StatusCode::OK.as_u16(),
    })
}

async fn page_not_found() -> Response {
    status_response(StatusCode::NOT_FOUND)
}

async fn method_not_allowed() -> Response {
    status_response(StatusCode::METHOD_NOT_ALLOWED)
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let details = if let Some(msg) = err.downcast_ref::<String>() {
        msg.as_str()
    } else if let Some(msg) = err.downcast_ref::<&str>() {
        msg
    } else {
        "unknown panic"
    };
    error!("handler panicked: {details}");
    status_response(StatusCode::INTERNAL_SERVER_ERROR)
}
