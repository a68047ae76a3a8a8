//! RSS 2.0 rendering of composite trend views, one file per
//! `(period, language)` facet.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use html_escape::encode_text;
use tracing::info;

use crate::app::Result;
use crate::domain::{CompositeTrend, Language, Period};
use crate::store::Store;

pub const DEFAULT_TTL_MINUTES: u32 = 1400;

const REPO_BASE_URL: &str = "https://github.com";
const NO_DESCRIPTION: &str = "[No description found.]";
const NO_README: &str = "<p>No README was found for this project.</p>";

pub struct FeedComposer {
    root_url: String,
    ttl_minutes: u32,
}

impl FeedComposer {
    pub fn new(root_url: impl Into<String>, ttl_minutes: u32) -> Self {
        Self {
            root_url: root_url.into().trim_end_matches('/').to_string(),
            ttl_minutes,
        }
    }

    /// Render every stored facet into `{out_dir}/{period}/{language}.xml`.
    pub fn write_all<S: Store + ?Sized>(
        &self,
        store: &S,
        out_dir: &Path,
        now: DateTime<Utc>,
    ) -> Result<Vec<PathBuf>> {
        let languages = store.list_languages()?;
        let periods = store.list_periods()?;
        let mut written = Vec::new();

        for language in &languages {
            for period in &periods {
                let rows = store.composite_view(&language.machine_name, &period.machine_name)?;
                let xml = self.render(language, period, &rows, now);

                let dir = out_dir.join(&period.machine_name);
                fs::create_dir_all(&dir)?;
                let path = dir.join(format!("{}.xml", language.machine_name));
                fs::write(&path, xml)?;

                info!(
                    "Generated feed for {}, {} ({} items)",
                    language.machine_name,
                    period.machine_name,
                    rows.len()
                );
                written.push(path);
            }
        }

        Ok(written)
    }

    pub fn render(
        &self,
        language: &Language,
        period: &Period,
        rows: &[CompositeTrend],
        now: DateTime<Utc>,
    ) -> String {
        let now = now.to_rfc2822();
        let mut out = String::from("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");
        out.push_str("<rss version=\"2.0\"><channel>");

        element(
            &mut out,
            "title",
            &format!(
                "GitHub Trending: {}, {}",
                language.display_name, period.display_name
            ),
        );
        element(
            &mut out,
            "link",
            &format!(
                "{}/{}?since={}",
                self.root_url, language.machine_name, period.machine_name
            ),
        );
        element(
            &mut out,
            "description",
            &format!(
                "The top repositories on GitHub for {}, measured {}",
                language.display_name, period.machine_name
            ),
        );
        element(&mut out, "pubDate", &now);
        element(&mut out, "lastBuildDate", &now);
        element(&mut out, "ttl", &self.ttl_minutes.to_string());

        if rows.is_empty() {
            out.push_str("<item>");
            element(
                &mut out,
                "title",
                &format!(
                    "No repos in {}, {} today",
                    language.display_name, period.display_name
                ),
            );
            element(&mut out, "pubDate", &now);
            out.push_str("</item>");
        }

        for row in rows {
            item(&mut out, row);
        }

        out.push_str("</channel></rss>\n");
        out
    }
}

fn element(out: &mut String, name: &str, text: &str) {
    out.push('<');
    out.push_str(name);
    out.push('>');
    out.push_str(&encode_text(text));
    out.push_str("</");
    out.push_str(name);
    out.push('>');
}

fn midnight_rfc2822(date: NaiveDate) -> String {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().to_rfc2822())
        .unwrap_or_default()
}

fn item(out: &mut String, row: &CompositeTrend) {
    let link = format!("{}/{}", REPO_BASE_URL, row.repo_name);
    let description = row
        .description
        .as_deref()
        .filter(|d| !d.is_empty())
        .unwrap_or(NO_DESCRIPTION);

    let mut body = format!(
        "<p><i>{}</i></p> <p>Last seen <b>{}</b>; First seen <b>{}</b></p>",
        encode_text(description),
        row.last_seen,
        row.first_seen
    );
    body.push_str(row.readme_html.as_deref().unwrap_or(NO_README));

    out.push_str("<item>");
    element(
        out,
        "title",
        &format!(
            "{} #{} in {}, {}",
            row.repo_name, row.rank, row.language_name, row.period_name
        ),
    );
    element(out, "link", &link);
    element(out, "author", row.author());
    out.push_str("<guid isPermaLink=\"false\">");
    out.push_str(&encode_text(&link));
    out.push_str("</guid>");
    element(out, "pubDate", &midnight_rfc2822(row.date));
    element(out, "description", &body);
    out.push_str("</item>");
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::domain::{FetchJob, RepoResult};
    use crate::store::SqliteStore;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, d).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 2, 12, 0, 0).unwrap()
    }

    fn daily() -> Period {
        Period::new("daily", "Today", "?since=daily", "")
    }

    fn composer() -> FeedComposer {
        FeedComposer::new("https://github.com/trending", DEFAULT_TTL_MINUTES)
    }

    fn row(rank: u32, name: &str, description: Option<&str>, readme: Option<&str>) -> CompositeTrend {
        CompositeTrend {
            language: "rust".into(),
            language_name: "Rust".into(),
            period: "daily".into(),
            period_name: "Today".into(),
            rank,
            date: day(2),
            repo_name: name.into(),
            description: description.map(String::from),
            readme_html: readme.map(String::from),
            first_seen: day(1),
            last_seen: day(2),
        }
    }

    #[test]
    fn test_render_items_in_rank_order() {
        let rows = vec![
            row(1, "rust-lang/rust", Some("Empowering <everyone>"), Some("<h1>Rust</h1>")),
            row(2, "tokio-rs/tokio", None, None),
        ];
        let xml = composer().render(&Language::new("rust", "Rust"), &daily(), &rows, now());

        let feed = feed_rs::parser::parse(xml.as_bytes()).unwrap();
        assert_eq!(feed.title.unwrap().content, "GitHub Trending: Rust, Today");
        assert_eq!(feed.entries.len(), 2);

        let first = &feed.entries[0];
        assert_eq!(first.title.as_ref().unwrap().content, "rust-lang/rust #1 in Rust, Today");
        assert_eq!(first.links[0].href, "https://github.com/rust-lang/rust");
        let summary = &first.summary.as_ref().unwrap().content;
        assert!(summary.contains("Empowering &lt;everyone&gt;"));
        assert!(summary.contains("<h1>Rust</h1>"));
        assert!(summary.contains("First seen <b>2024-07-01</b>"));
        assert_eq!(first.published.unwrap().date_naive(), day(2));

        let second = &feed.entries[1].summary.as_ref().unwrap().content;
        assert!(second.contains(NO_DESCRIPTION));
        assert!(second.contains(NO_README));
    }

    #[test]
    fn test_render_empty_view_placeholder() {
        let xml = composer().render(&Language::new("cobol", "COBOL"), &daily(), &[], now());
        let feed = feed_rs::parser::parse(xml.as_bytes()).unwrap();
        assert_eq!(feed.entries.len(), 1);
        assert_eq!(
            feed.entries[0].title.as_ref().unwrap().content,
            "No repos in COBOL, Today today"
        );
    }

    #[test]
    fn test_write_all_one_file_per_facet() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .upsert_languages(&[Language::all(), Language::new("rust", "Rust")])
            .unwrap();
        store.upsert_periods(&[daily()]).unwrap();
        let mut job = FetchJob::catch_all(daily());
        job.result = Some(vec!["a/b".into()]);
        store.record_snapshot(&job, day(2)).unwrap();
        store
            .apply_repository_result(
                &RepoResult {
                    repo_name: "a/b".into(),
                    description: "desc".into(),
                    readme_html: "<p>hi</p>".into(),
                    rename_from: None,
                },
                day(2),
            )
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let written = composer().write_all(&store, dir.path(), now()).unwrap();

        assert_eq!(written.len(), 2);
        let all = std::fs::read_to_string(dir.path().join("daily").join("all.xml")).unwrap();
        assert!(all.contains("a/b #1 in All Languages, Today"));
        assert!(dir.path().join("daily").join("rust.xml").exists());
    }
}
