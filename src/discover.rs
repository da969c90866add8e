use std::collections::HashSet;

use scraper::Html;
use url::Url;

use crate::config::SiteLayout;
use crate::html::anchors;

pub fn discover(document: &Html, page_url: &Url, layout: &SiteLayout) -> Vec<Url> {
    let range = layout.category_nav_range();
    let mut seen = HashSet::new();

    anchors(document)
        .skip(range.start)
        .take(range.len())
        .filter_map(|anchor| anchor.value().attr("href"))
        .filter_map(|href| match page_url.join(href) {
            Ok(url) => Some(url),
            Err(err) => {
                tracing::debug!(href, ?err, "skipping unparsable category link");
                None
            }
        })
        .filter(|url| seen.insert(url.clone()))
        .collect()
}
