use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::Response,
    routing::get,
};

use crate::{
    application::{
        error::ErrorReport,
        post::{PostError, PostService},
        repos::RepoError,
    },
    domain::posts::PostNumber,
    presentation::views::{
        ErrorPageView, ErrorTemplate, PostTemplate, render_not_found_response,
        render_template_response,
    },
};

use super::middleware::{log_responses, set_request_context};

#[derive(Clone)]
pub struct HttpState {
    pub posts: Arc<PostService>,
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/post/{number}", get(post_detail))
        .route("/_health", get(health))
        .fallback(fallback_not_found)
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

/// `GET /post/{number}` — the post-detail page.
///
/// The route parameter is classified before any upstream work: a value that
/// is not a positive integer never reaches the query collaborator.
async fn post_detail(State(state): State<HttpState>, Path(number): Path<String>) -> Response {
    let site_title = state.posts.site_title().to_string();

    let number = match PostNumber::parse(&number) {
        Ok(number) => number,
        Err(err) => {
            return error_page_response(
                "infra::http::public::post_detail",
                StatusCode::BAD_REQUEST,
                ErrorPageView::bad_request(&site_title),
                err.to_string(),
            );
        }
    };

    match state.posts.post_detail(number).await {
        Ok(Some(view)) => render_template_response(PostTemplate { view }, StatusCode::OK),
        Ok(None) => render_not_found_response(&site_title),
        Err(err) => post_error_response(err, &site_title),
    }
}

fn post_error_response(err: PostError, site_title: &str) -> Response {
    const SOURCE: &str = "infra::http::public::post_detail";

    match err {
        PostError::Repo(repo_err) => {
            let status = match repo_err {
                RepoError::Transport(_)
                | RepoError::Status { .. }
                | RepoError::Query { .. }
                | RepoError::Malformed { .. } => StatusCode::BAD_GATEWAY,
            };
            error_page_response(
                SOURCE,
                status,
                ErrorPageView::upstream_failure(site_title),
                repo_err.to_string(),
            )
        }
        err => error_page_response(
            SOURCE,
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorPageView::internal_error(site_title),
            err.to_string(),
        ),
    }
}

fn error_page_response(
    source: &'static str,
    status: StatusCode,
    view: ErrorPageView,
    detail: String,
) -> Response {
    let mut response = render_template_response(ErrorTemplate { view }, status);
    ErrorReport::from_message(source, status, detail).attach(&mut response);
    response
}

async fn fallback_not_found(State(state): State<HttpState>) -> Response {
    render_not_found_response(state.posts.site_title())
}

async fn health() -> StatusCode {
    StatusCode::NO_CONTENT
}
