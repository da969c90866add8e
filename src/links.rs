use std::collections::HashSet;

use scraper::Html;
use url::Url;

use crate::config::SiteLayout;
use crate::formats::BookSummary;
use crate::html::anchors;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{titles} titles but {links} links on {url}")]
pub struct AlignmentError {
    pub url: Url,
    pub titles: usize,
    pub links: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagePosition {
    First,
    Successor,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageLinks {
    pub titles: Vec<String>,
    pub links: Vec<String>,
}

impl PageLinks {
    pub fn into_summaries(self, page_url: &Url) -> Result<Vec<BookSummary>, AlignmentError> {
        if self.titles.len() != self.links.len() {
            return Err(AlignmentError {
                url: page_url.clone(),
                titles: self.titles.len(),
                links: self.links.len(),
            });
        }

        Ok(self
            .titles
            .into_iter()
            .zip(self.links)
            .map(|(title, link)| BookSummary { title, link })
            .collect())
    }
}

pub fn extract(document: &Html, layout: &SiteLayout, position: PagePosition) -> PageLinks {
    let item_anchors = anchors(document)
        .skip(layout.nav_anchor_count)
        .collect::<Vec<_>>();

    let titles = item_anchors
        .iter()
        .filter_map(|anchor| anchor.value().attr("title"))
        .map(str::to_owned)
        .collect();

    let trailing = match position {
        PagePosition::First => layout.first_page_trailing_anchors,
        PagePosition::Successor => layout.next_page_trailing_anchors,
    };
    let kept = item_anchors.len().saturating_sub(trailing);

    let mut seen = HashSet::new();
    let links = item_anchors[..kept]
        .iter()
        .filter_map(|anchor| anchor.value().attr("href"))
        .map(|href| absolutize(href, layout))
        .filter(|link| seen.insert(link.clone()))
        .collect();

    PageLinks { titles, links }
}

pub fn absolutize(href: &str, layout: &SiteLayout) -> String {
    match href.strip_prefix(layout.item_link_prefix.as_str()) {
        Some(rest) => format!("{}{rest}", layout.catalogue_base),
        None => href.to_owned(),
    }
}
