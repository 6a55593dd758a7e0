use std::{process, sync::Arc};

use quaderno::{
    application::{
        error::AppError,
        post::{PostPageConfig, PostService},
        repos::IssuesRepo,
    },
    config,
    infra::{error::InfraError, github::GithubIssuesRepo, http, telemetry},
};
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let issues: Arc<dyn IssuesRepo> =
        Arc::new(GithubIssuesRepo::new(&settings.github).map_err(AppError::from)?);
    let posts = Arc::new(PostService::new(
        issues,
        PostPageConfig::from_settings(&settings),
    ));

    let router = http::build_router(http::HttpState { posts });

    let listener = tokio::net::TcpListener::bind(settings.server.public_addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "quaderno::serve",
        addr = %settings.server.public_addr,
        owner = %settings.github.owner,
        repo = %settings.github.repo,
        "serving posts"
    );

    axum::serve(listener, router.into_make_service())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    Ok(())
}
