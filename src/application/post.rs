//! The post-detail service: fetch one issue, shape it into a renderable view.

use std::sync::{Arc, LazyLock};

use ammonia::Builder as Sanitizer;
use thiserror::Error;
use time::format_description::{BorrowedFormatItem, well_known::Rfc3339};
use time::macros::format_description;

use crate::application::repos::{IssuesRepo, RepoError};
use crate::application::rewrite::{self, RewriteError};
use crate::config::Settings;
use crate::domain::posts::PostNumber;
use crate::presentation::views::{PostDetailContext, TagBadge};

const DATE_DISPLAY: &[BorrowedFormatItem<'_>] = format_description!("[year]-[month]-[day]");

// The upstream is trusted today, but the served page should not depend on
// that staying true. Classes and ids are kept so GitHub's pre-rendered
// highlighting and heading anchors survive; checkbox inputs keep task lists.
static BODY_SANITIZER: LazyLock<Sanitizer<'static>> = LazyLock::new(|| {
    let mut builder = Sanitizer::default();
    builder
        .add_generic_attributes(&["class", "id"])
        .add_tags(&["input"])
        .add_tag_attributes("input", &["type", "checked", "disabled"]);
    builder
});

/// Configuration slice the post page needs, injected at construction time.
#[derive(Debug, Clone)]
pub struct PostPageConfig {
    pub owner: String,
    pub repo: String,
    pub client_id: String,
    pub client_secret: String,
    pub site_title: String,
}

impl PostPageConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            owner: settings.github.owner.clone(),
            repo: settings.github.repo.clone(),
            client_id: settings.comments.client_id.clone(),
            client_secret: settings.comments.client_secret.clone(),
            site_title: settings.site.title.clone(),
        }
    }
}

#[derive(Debug, Error)]
pub enum PostError {
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Rewrite(#[from] RewriteError),
    #[error("failed to format post timestamp: {0}")]
    Timestamp(#[from] time::error::Format),
}

#[derive(Clone)]
pub struct PostService {
    issues: Arc<dyn IssuesRepo>,
    config: PostPageConfig,
}

impl PostService {
    pub fn new(issues: Arc<dyn IssuesRepo>, config: PostPageConfig) -> Self {
        Self { issues, config }
    }

    pub fn site_title(&self) -> &str {
        &self.config.site_title
    }

    /// Fetch the issue behind `number` and build the detail view.
    ///
    /// `Ok(None)` when the upstream has no matching issue. The body passes
    /// through the issue-link rewrite and then sanitization, in that order,
    /// so rewritten internal routes survive the sanitizer's URL policy.
    pub async fn post_detail(
        &self,
        number: PostNumber,
    ) -> Result<Option<PostDetailContext>, PostError> {
        let Some(mut record) = self.issues.issue_by_number(number).await? else {
            return Ok(None);
        };
        record.dedupe_labels();

        let rewritten =
            rewrite::rewrite_issue_links(&record.body_html, &self.config.owner, &self.config.repo)?;
        let body_html = BODY_SANITIZER.clean(&rewritten).to_string();

        let published = record.created_at.format(DATE_DISPLAY)?;
        let iso_date = record.created_at.format(&Rfc3339)?;

        let tags = record
            .labels
            .iter()
            .map(|label| TagBadge {
                label: label.name.clone(),
            })
            .collect();

        Ok(Some(PostDetailContext {
            document_title: format!("{} | {}", record.title, self.config.site_title),
            title: record.title,
            published,
            iso_date,
            source_url: record.url,
            tags,
            body_html,
            widget_config: self.widget_config(record.number),
        }))
    }

    /// Comment widget constructor arguments, serialized for the page script.
    ///
    /// The key names are the widget's own: `clientID`, `clientSecret`,
    /// `repo`, `owner`, `admin`, `number`. The admin allow-list is always
    /// exactly the repository owner.
    fn widget_config(&self, number: u64) -> String {
        serde_json::json!({
            "clientID": self.config.client_id,
            "clientSecret": self.config.client_secret,
            "repo": self.config.repo,
            "owner": self.config.owner,
            "admin": [self.config.owner],
            "number": number,
        })
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use time::macros::datetime;

    use crate::domain::posts::{LabelRecord, PostRecord};

    struct StubIssues {
        record: Option<PostRecord>,
    }

    #[async_trait]
    impl IssuesRepo for StubIssues {
        async fn issue_by_number(
            &self,
            _number: PostNumber,
        ) -> Result<Option<PostRecord>, RepoError> {
            Ok(self.record.clone())
        }
    }

    fn config() -> PostPageConfig {
        PostPageConfig {
            owner: "zhangyu1818".into(),
            repo: "blog".into(),
            client_id: "cid".into(),
            client_secret: "csecret".into(),
            site_title: "zhangyu1818.".into(),
        }
    }

    fn record() -> PostRecord {
        PostRecord {
            number: 42,
            url: "https://github.com/zhangyu1818/blog/issues/42".into(),
            title: "Why borrow checkers dream".into(),
            created_at: datetime!(2021-03-14 09:26:53 UTC),
            labels: vec![
                LabelRecord { name: "rust".into() },
                LabelRecord { name: "web".into() },
            ],
            body_html: "<p>hello</p>".into(),
        }
    }

    fn service(record: Option<PostRecord>) -> PostService {
        PostService::new(Arc::new(StubIssues { record }), config())
    }

    #[tokio::test]
    async fn view_carries_one_badge_per_label() {
        let view = service(Some(record()))
            .post_detail(PostNumber::new(42).unwrap())
            .await
            .expect("fetch")
            .expect("present");

        let labels: Vec<_> = view.tags.iter().map(|t| t.label.as_str()).collect();
        assert_eq!(labels, ["rust", "web"]);
    }

    #[tokio::test]
    async fn empty_label_set_yields_no_badges() {
        let mut record = record();
        record.labels.clear();
        let view = service(Some(record))
            .post_detail(PostNumber::new(42).unwrap())
            .await
            .expect("fetch")
            .expect("present");
        assert!(view.tags.is_empty());
    }

    #[tokio::test]
    async fn document_title_appends_the_site_suffix() {
        let view = service(Some(record()))
            .post_detail(PostNumber::new(42).unwrap())
            .await
            .expect("fetch")
            .expect("present");
        assert_eq!(view.document_title, "Why borrow checkers dream | zhangyu1818.");
        assert_eq!(view.published, "2021-03-14");
        assert_eq!(view.iso_date, "2021-03-14T09:26:53Z");
    }

    #[tokio::test]
    async fn widget_config_binds_the_issue_number_and_owner_admin() {
        let view = service(Some(record()))
            .post_detail(PostNumber::new(42).unwrap())
            .await
            .expect("fetch")
            .expect("present");

        let config: serde_json::Value =
            serde_json::from_str(&view.widget_config).expect("valid json");
        assert_eq!(config["number"], 42);
        assert_eq!(config["admin"], serde_json::json!(["zhangyu1818"]));
        assert_eq!(config["owner"], "zhangyu1818");
        assert_eq!(config["repo"], "blog");
        assert_eq!(config["clientID"], "cid");
        assert_eq!(config["clientSecret"], "csecret");
    }

    #[tokio::test]
    async fn body_is_rewritten_then_sanitized() {
        let mut record = record();
        record.body_html = concat!(
            r#"<p><a href="https://github.com/zhangyu1818/blog/issues/7">prev</a></p>"#,
            r#"<script>alert(1)</script>"#,
            r#"<pre class="highlight"><code>fn main() {}</code></pre>"#,
        )
        .into();

        let view = service(Some(record))
            .post_detail(PostNumber::new(42).unwrap())
            .await
            .expect("fetch")
            .expect("present");

        assert!(view.body_html.contains(r#"href="/post/7""#));
        assert!(!view.body_html.contains("<script>"));
        assert!(view.body_html.contains(r#"class="highlight""#));
    }

    #[tokio::test]
    async fn missing_issue_maps_to_none() {
        let result = service(None)
            .post_detail(PostNumber::new(9).unwrap())
            .await
            .expect("fetch");
        assert!(result.is_none());
    }
}
