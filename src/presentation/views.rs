use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

use crate::application::error::{ErrorReport, HttpError};

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

pub fn render_not_found_response(site_title: &str) -> Response {
    let view = ErrorPageView::not_found(site_title);
    let mut response = render_template_response(ErrorTemplate { view }, StatusCode::NOT_FOUND);
    ErrorReport::from_message(
        "presentation::views::render_not_found_response",
        StatusCode::NOT_FOUND,
        "Post not found",
    )
    .attach(&mut response);
    response
}

#[derive(Clone)]
pub struct TagBadge {
    pub label: String,
}

/// Everything the post template needs, already formatted.
pub struct PostDetailContext {
    pub document_title: String,
    pub title: String,
    pub published: String,
    pub iso_date: String,
    pub source_url: String,
    pub tags: Vec<TagBadge>,
    pub body_html: String,
    pub widget_config: String,
}

#[derive(Template)]
#[template(path = "post.html")]
pub struct PostTemplate {
    pub view: PostDetailContext,
}

pub struct ErrorPageView {
    pub document_title: String,
    pub title: String,
    pub message: String,
    pub primary_action: Option<ErrorAction>,
}

impl ErrorPageView {
    pub fn not_found(site_title: &str) -> Self {
        Self {
            document_title: format!("Not found | {site_title}"),
            title: "Post Not Found".to_string(),
            message: "No post lives at this number. It may never have been written, \
                      or the issue behind it was deleted."
                .to_string(),
            primary_action: Some(ErrorAction::home()),
        }
    }

    pub fn bad_request(site_title: &str) -> Self {
        Self {
            document_title: format!("Bad request | {site_title}"),
            title: "That Is Not a Post Number".to_string(),
            message: "Post addresses look like /post/42. The part after /post/ must be \
                      a positive number."
                .to_string(),
            primary_action: Some(ErrorAction::home()),
        }
    }

    pub fn upstream_failure(site_title: &str) -> Self {
        Self {
            document_title: format!("Unavailable | {site_title}"),
            title: "Content Source Unreachable".to_string(),
            message: "The post could not be loaded from the content source. \
                      Please try again in a moment."
                .to_string(),
            primary_action: Some(ErrorAction::home()),
        }
    }

    pub fn internal_error(site_title: &str) -> Self {
        Self {
            document_title: format!("Error | {site_title}"),
            title: "Something Went Wrong".to_string(),
            message: "The page could not be rendered.".to_string(),
            primary_action: Some(ErrorAction::home()),
        }
    }
}

pub struct ErrorAction {
    pub href: String,
    pub label: String,
}

impl ErrorAction {
    pub fn home() -> Self {
        Self {
            href: "/".to_string(),
            label: "Back to home".to_string(),
        }
    }
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub view: ErrorPageView,
}
