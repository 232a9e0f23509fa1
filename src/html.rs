//! HTML rendering for the commit index and the site index.
//!
//! Render functions take typed view models and escape every interpolated
//! value; commit summaries and branch names are untrusted input.

use chrono::SecondsFormat;

use crate::commit::CommitMetadata;
use crate::discover::package_name;

/// Escapes text for interpolation into HTML element content or attributes.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

fn html_page(title: &str, body: &str) -> String {
    let title = escape_html(title);
    format!(
        "<!DOCTYPE html>\n\
         <html>\n\
         <head><title>{title}</title></head>\n\
         <body>\n\
         <h1>{title}</h1>\n\
         {body}\n\
         </body>\n\
         </html>\n"
    )
}

fn iso(datestamp: &chrono::DateTime<chrono::Utc>) -> String {
    datestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// The per-commit index page: one link per uploaded build, plus the
/// human-readable commit fields.
pub fn html_commit_index(metadata: &CommitMetadata, builds: &[std::path::PathBuf]) -> String {
    let links: String = builds
        .iter()
        .filter_map(|build| package_name(build))
        .map(|name| {
            let name = escape_html(name);
            format!("<li><a href=\"./{name}/index.html\">{name}</a></li>\n")
        })
        .collect();

    let body = format!(
        "<ul>\n{links}</ul>\n\
         <dl>\n\
         <dt>Date</dt><dd>{date}</dd>\n\
         <dt>Summary</dt><dd><pre>{summary}</pre></dd>\n\
         <dt>Description</dt><dd><pre>{description}</pre></dd>\n\
         </dl>",
        date = iso(&metadata.datestamp),
        summary = escape_html(&metadata.summary),
        description = escape_html(&metadata.description),
    );

    html_page(&format!("Storybooks for commit {}", metadata.commit), &body)
}

fn html_commit_item(meta: &CommitMetadata) -> String {
    let pr = match (&meta.pull_request, &meta.pull_request_url) {
        (Some(number), Some(url)) => format!(
            "<span>PR #<a href=\"{}\">{}</a></span> ",
            escape_html(url),
            escape_html(number)
        ),
        _ => String::new(),
    };
    format!(
        "<li>{pr}<a href=\"commits/{commit}/index.html\">{commit}</a> \
         (<span>{date}</span>)\n<pre>{summary}</pre></li>\n",
        commit = escape_html(&meta.commit),
        date = iso(&meta.datestamp),
        summary = escape_html(&meta.summary),
    )
}

/// The rolling site index. Three views over the same newest-first list:
/// latest main-branch commits (capped), open pull requests, and all commits.
/// The views are non-exclusive.
pub fn html_site_index(
    project_name: &str,
    repo: &str,
    main_branch: &str,
    main_branch_items: usize,
    commits: &[CommitMetadata],
) -> String {
    let latest_main: String = commits
        .iter()
        .filter(|meta| meta.branch == main_branch)
        .take(main_branch_items)
        .map(html_commit_item)
        .collect();
    let pull_requests: String = commits
        .iter()
        .filter(|meta| meta.pull_request.is_some())
        .map(html_commit_item)
        .collect();
    let all: String = commits.iter().map(html_commit_item).collect();

    let body = format!(
        "<h2>Latest {main}</h2>\n<ul>\n{latest_main}</ul>\n\
         <h2>Pull Requests</h2>\n<ul>\n{pull_requests}</ul>\n\
         <h2>Commits</h2>\n<ul>\n{all}</ul>",
        main = escape_html(main_branch),
    );

    html_page(&format!("Storybooks for {project_name} ({repo})"), &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::path::PathBuf;

    fn meta(commit: &str, branch: &str, pr: Option<&str>) -> CommitMetadata {
        let (pull_request, pull_request_url) =
            crate::commit::pull_request_pair(pr.map(|n| format!("https://x/pull/{n}")).as_deref());
        CommitMetadata {
            datestamp: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            commit: commit.into(),
            branch: branch.into(),
            pull_request,
            pull_request_url,
            summary: format!("summary for {commit}"),
            description: "details".into(),
        }
    }

    #[test]
    fn escapes_markup_in_summaries() {
        let mut m = meta("abc", "main", None);
        m.summary = "<script>alert(1)</script>".into();
        let page = html_commit_index(&m, &[]);
        assert!(!page.contains("<script>"));
        assert!(page.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
    }

    #[test]
    fn commit_index_links_each_build() {
        let builds = vec![
            PathBuf::from("packages/pkg-a/storybook-static"),
            PathBuf::from("packages/pkg-b/storybook-static"),
        ];
        let page = html_commit_index(&meta("abc", "main", None), &builds);
        assert!(page.contains("<a href=\"./pkg-a/index.html\">pkg-a</a>"));
        assert!(page.contains("<a href=\"./pkg-b/index.html\">pkg-b</a>"));
    }

    #[test]
    fn site_index_groups_views_without_exclusivity() {
        let commits = vec![
            meta("aaa", "main", None),
            meta("bbb", "feature", Some("7")),
            meta("ccc", "main", Some("8")),
        ];
        let page = html_site_index("proj", "org/repo", "main", 3, &commits);

        // "ccc" is on main AND has a PR: it appears in all three sections.
        assert_eq!(page.matches("commits/ccc/index.html").count(), 3);
        // "bbb" is not on main: PR section and commits section only.
        assert_eq!(page.matches("commits/bbb/index.html").count(), 2);
        assert_eq!(page.matches("commits/aaa/index.html").count(), 2);
        assert!(page.contains("PR #<a href=\"https://x/pull/7\">7</a>"));
    }

    #[test]
    fn main_branch_view_is_capped() {
        let commits: Vec<_> = (0..5).map(|i| meta(&format!("c{i}"), "main", None)).collect();
        let page = html_site_index("proj", "org/repo", "main", 3, &commits);
        let latest = page.split("<h2>Pull Requests</h2>").next().unwrap();
        assert_eq!(latest.matches("<li>").count(), 3);
    }
}
