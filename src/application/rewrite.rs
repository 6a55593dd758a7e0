//! Rewrites in-body links that point back at the content repository's issue
//! tracker so they resolve to internal post routes.

use lol_html::{RewriteStrSettings, element, rewrite_str};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RewriteError {
    #[error("html rewrite failed: {0}")]
    Rewrite(#[from] lol_html::errors::RewritingError),
}

/// Rewrite every anchor whose `href` matches
/// `https://github.com/<owner>/<repo>/issues/<digits>` to `/post/<digits>`.
///
/// Anything after the digits (fragments, query strings) is dropped, matching
/// how cross-references between issues are linked. Non-matching anchors pass
/// through untouched; zero matches is not an error.
pub fn rewrite_issue_links(
    html: &str,
    owner: &str,
    repo: &str,
) -> Result<String, RewriteError> {
    let prefix = format!("https://github.com/{owner}/{repo}/issues/");

    let output = rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![element!("a[href]", |el| {
                let Some(href) = el.get_attribute("href") else {
                    return Ok(());
                };
                if let Some(route) = internal_route(&href, &prefix) {
                    el.set_attribute("href", &route)?;
                }
                Ok(())
            })],
            ..RewriteStrSettings::default()
        },
    )?;

    Ok(output)
}

fn internal_route(href: &str, prefix: &str) -> Option<String> {
    let rest = href.strip_prefix(prefix)?;
    let digits: &str = {
        let end = rest
            .char_indices()
            .find(|(_, ch)| !ch.is_ascii_digit())
            .map(|(idx, _)| idx)
            .unwrap_or(rest.len());
        &rest[..end]
    };
    if digits.is_empty() {
        return None;
    }
    Some(format!("/post/{digits}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const OWNER: &str = "zhangyu1818";
    const REPO: &str = "blog";

    #[test]
    fn issue_tracker_links_become_internal_routes() {
        let html = r#"<p>see <a href="https://github.com/zhangyu1818/blog/issues/42">this</a></p>"#;
        let output = rewrite_issue_links(html, OWNER, REPO).expect("rewrite");
        assert!(output.contains(r#"href="/post/42""#));
        assert!(!output.contains("github.com/zhangyu1818/blog/issues/42"));
    }

    #[test]
    fn foreign_hosts_are_left_untouched() {
        let html = r#"<a href="https://example.com/issues/42">elsewhere</a>"#;
        let output = rewrite_issue_links(html, OWNER, REPO).expect("rewrite");
        assert!(output.contains(r#"href="https://example.com/issues/42""#));
    }

    #[test]
    fn other_repositories_are_left_untouched() {
        let html = r#"<a href="https://github.com/zhangyu1818/dotfiles/issues/3">dotfiles</a>"#;
        let output = rewrite_issue_links(html, OWNER, REPO).expect("rewrite");
        assert!(output.contains("zhangyu1818/dotfiles/issues/3"));
    }

    #[test]
    fn fragments_after_the_number_are_dropped() {
        let html =
            r#"<a href="https://github.com/zhangyu1818/blog/issues/7#issuecomment-1">cmt</a>"#;
        let output = rewrite_issue_links(html, OWNER, REPO).expect("rewrite");
        assert!(output.contains(r#"href="/post/7""#));
    }

    #[test]
    fn issue_list_link_without_number_is_not_rewritten() {
        let html = r#"<a href="https://github.com/zhangyu1818/blog/issues/">all</a>"#;
        let output = rewrite_issue_links(html, OWNER, REPO).expect("rewrite");
        assert!(output.contains(r#"href="https://github.com/zhangyu1818/blog/issues/""#));
    }

    #[test]
    fn html_without_anchors_passes_through() {
        let html = "<p>plain paragraph</p>";
        let output = rewrite_issue_links(html, OWNER, REPO).expect("rewrite");
        assert_eq!(output, html);
    }
}
