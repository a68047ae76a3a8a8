//! Markup extraction for trending pages.
//!
//! Turns raw HTML into the two shapes the crawl consumes: the discovery
//! menus and a ranked list of repository names.

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::app::{Result, TrendError};

const LANGUAGE_MENU: &str = "div#languages-menuitems a";
const PERIOD_MENU: &str = "details#select-menu-date a";
const MENU_ITEM_TEXT: &str = "span.select-menu-item-text";
const LISTING_ROW: &str = "article.Box-row";
const LISTING_ANCHOR: &str = "h1 a, h2 a";

/// One `(target_url, display_text)` pair from a selector menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuEntry {
    /// Absolute URL.
    pub href: String,
    pub text: String,
}

impl MenuEntry {
    pub fn new(href: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            text: text.into(),
        }
    }
}

/// The root listing page reduced to its two facet menus.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryPage {
    pub languages: Vec<MenuEntry>,
    pub periods: Vec<MenuEntry>,
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| TrendError::Markup(format!("bad selector {css}: {e}")))
}

fn menu_text(anchor: &ElementRef<'_>, item_text: &Selector) -> String {
    let text: String = match anchor.select(item_text).next() {
        Some(span) => span.text().collect(),
        None => anchor.text().collect(),
    };
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn menu(document: &Html, css: &str, base: &Url) -> Result<Vec<MenuEntry>> {
    let anchors = selector(css)?;
    let item_text = selector(MENU_ITEM_TEXT)?;

    let mut entries = Vec::new();
    for anchor in document.select(&anchors) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let href = base.join(href)?;
        entries.push(MenuEntry::new(href.to_string(), menu_text(&anchor, &item_text)));
    }
    Ok(entries)
}

/// Extract the language and period menus. `base_url` resolves relative hrefs.
pub fn parse_discovery(html: &str, base_url: &str) -> Result<DiscoveryPage> {
    let base = Url::parse(base_url)?;
    let document = Html::parse_document(html);

    Ok(DiscoveryPage {
        languages: menu(&document, LANGUAGE_MENU, &base)?,
        periods: menu(&document, PERIOD_MENU, &base)?,
    })
}

/// Extract repository names (`owner/name`) in document order.
pub fn parse_listing(html: &str) -> Result<Vec<String>> {
    let rows = selector(LISTING_ROW)?;
    let anchors = selector(LISTING_ANCHOR)?;
    let document = Html::parse_document(html);

    let repos = document
        .select(&rows)
        .filter_map(|row| row.select(&anchors).next())
        .filter_map(|a| a.value().attr("href"))
        .map(|href| href.trim().trim_start_matches('/').to_string())
        .filter(|name| name.contains('/'))
        .collect();

    Ok(repos)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROOT: &str = "https://github.com/trending";

    const DISCOVERY_HTML: &str = r#"
        <html><body>
        <details id="select-menu-date">
          <a href="https://github.com/trending?since=daily"><span class="select-menu-item-text"> Today </span></a>
          <a href="https://github.com/trending?since=weekly"><span class="select-menu-item-text">This week</span></a>
          <a href="/trending?since=monthly"><span class="select-menu-item-text">This month</span></a>
        </details>
        <div id="languages-menuitems">
          <a href="/trending/rust?since=daily"><span class="select-menu-item-text">Rust</span></a>
          <a href="/trending/c%2B%2B?since=daily"><span class="select-menu-item-text">
              C++
          </span></a>
          <a href="/trending/rust?since=daily"><span class="select-menu-item-text">Rust</span></a>
        </div>
        </body></html>
    "#;

    const LISTING_HTML: &str = r#"
        <html><body>
        <article class="Box-row"><h2 class="h3"><a href="/rust-lang/rust"> rust-lang / rust </a></h2></article>
        <article class="Box-row"><h1><a href="/tokio-rs/tokio">tokio</a></h1></article>
        <article class="Box-row"><p>no anchor here</p></article>
        <article class="Box-row"><h2><a href="/sponsors">not a repo</a></h2></article>
        <article class="Box-row"><h2><a href="/rust-lang/rust">dup</a></h2></article>
        </body></html>
    "#;

    #[test]
    fn test_parse_discovery_menus() {
        let page = parse_discovery(DISCOVERY_HTML, ROOT).unwrap();

        assert_eq!(page.periods.len(), 3);
        assert_eq!(page.periods[0].text, "Today");
        assert_eq!(
            page.periods[2].href,
            "https://github.com/trending?since=monthly"
        );

        assert_eq!(page.languages.len(), 3);
        assert_eq!(
            page.languages[0].href,
            "https://github.com/trending/rust?since=daily"
        );
        assert_eq!(page.languages[1].text, "C++");
    }

    #[test]
    fn test_parse_discovery_missing_menus() {
        let page = parse_discovery("<html><body></body></html>", ROOT).unwrap();
        assert!(page.languages.is_empty());
        assert!(page.periods.is_empty());
    }

    #[test]
    fn test_parse_listing_document_order() {
        let repos = parse_listing(LISTING_HTML).unwrap();
        assert_eq!(repos, vec!["rust-lang/rust", "tokio-rs/tokio", "rust-lang/rust"]);
    }

    #[test]
    fn test_parse_listing_empty() {
        assert!(parse_listing("<html></html>").unwrap().is_empty());
    }
}
