use super::*;

fn raw_with_credentials() -> RawSettings {
    let mut raw = RawSettings::default();
    raw.comments.client_id = Some("id".to_string());
    raw.comments.client_secret = Some("secret".to_string());
    raw
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = raw_with_credentials();
    raw.server.public_port = Some(4000);
    raw.logging.level = Some("info".to_string());

    let overrides = ServeOverrides {
        public_port: Some(4321),
        log_level: Some("debug".to_string()),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.public_addr.port(), 4321);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
}

#[test]
fn github_repository_defaults_to_the_blog_tracker() {
    let settings = Settings::from_raw(raw_with_credentials()).expect("valid settings");
    assert_eq!(settings.github.owner, "zhangyu1818");
    assert_eq!(settings.github.repo, "blog");
    assert_eq!(
        settings.github.graphql_url.as_str(),
        "https://api.github.com/graphql"
    );
    assert!(settings.github.token.is_none());
}

#[test]
fn comment_credentials_are_required() {
    let raw = RawSettings::default();
    let err = Settings::from_raw(raw).expect_err("missing credentials must fail");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "comments.client_id",
            ..
        }
    ));
}

#[test]
fn blank_owner_is_rejected() {
    let mut raw = raw_with_credentials();
    raw.github.owner = Some("   ".to_string());
    let err = Settings::from_raw(raw).expect_err("blank owner must fail");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "github.owner",
            ..
        }
    ));
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = raw_with_credentials();
    let overrides = ServeOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn site_title_falls_back_to_default_when_blank() {
    let mut raw = raw_with_credentials();
    raw.site.title = Some("  ".to_string());
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.site.title, "zhangyu1818.");
}

#[test]
fn zero_port_is_rejected() {
    let mut raw = raw_with_credentials();
    raw.server.public_port = Some(0);
    assert!(Settings::from_raw(raw).is_err());
}
