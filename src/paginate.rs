use std::collections::HashSet;
use std::time::{Duration, Instant};

use scraper::Html;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::config::{SiteLayout, TraversalLimits};
use crate::fetch::{Fetch, FetchError, fetch_page};
use crate::formats::{BookSummary, Category};
use crate::html::{Css, InvalidSelector, child_elements};
use crate::links::{self, AlignmentError, PagePosition};

#[derive(Debug, thiserror::Error)]
pub enum TraversalError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Alignment(#[from] AlignmentError),
    #[error("next-page control on {page} has no target")]
    MissingNextTarget { page: Url },
    #[error("invalid next-page target {href:?} on {page}: {source}")]
    InvalidNextTarget {
        page: Url,
        href: String,
        source: url::ParseError,
    },
    #[error("next-page chain of {entry} loops back to {url}")]
    Loop { entry: Url, url: Url },
    #[error("traversal of {entry} exceeded {max_pages} pages")]
    PageLimit { entry: Url, max_pages: usize },
    #[error("traversal of {entry} exceeded its time budget of {budget:?}")]
    TimeBudget { entry: Url, budget: Duration },
    #[error("traversal of {entry} cancelled")]
    Cancelled { entry: Url },
}

pub struct CategoryPaginator<'a> {
    fetcher: &'a dyn Fetch,
    layout: &'a SiteLayout,
    limits: TraversalLimits,
    cancel: CancellationToken,
    next_control: Css,
}

impl<'a> CategoryPaginator<'a> {
    pub fn new(
        fetcher: &'a dyn Fetch,
        layout: &'a SiteLayout,
        limits: TraversalLimits,
        cancel: CancellationToken,
    ) -> Result<Self, InvalidSelector> {
        let next_control = Css::parse(&layout.next_control_selector)?;
        Ok(Self {
            fetcher,
            layout,
            limits,
            cancel,
            next_control,
        })
    }

    pub fn traverse(&self, entry_url: &Url) -> Result<Category, TraversalError> {
        let started = Instant::now();
        let base = directory_of(entry_url);

        self.check_cancelled(entry_url)?;
        let mut page = fetch_page(self.fetcher, entry_url)?;
        let mut visited = HashSet::from([entry_url.clone()]);

        let mut items = Vec::new();
        let mut seen = HashSet::new();
        let seed = links::extract(&page.document, self.layout, PagePosition::First)
            .into_summaries(&page.url)?;
        let added = merge_unique(&mut items, &mut seen, seed);
        tracing::debug!(url = %page.url, added, "collected entry page");

        while let Some(href) = self.next_href(&page.document, &page.url)? {
            let next_url = base
                .join(&href)
                .map_err(|source| TraversalError::InvalidNextTarget {
                    page: page.url.clone(),
                    href: href.clone(),
                    source,
                })?;

            if visited.contains(&next_url) {
                return Err(TraversalError::Loop {
                    entry: entry_url.clone(),
                    url: next_url,
                });
            }
            if visited.len() >= self.limits.max_pages {
                return Err(TraversalError::PageLimit {
                    entry: entry_url.clone(),
                    max_pages: self.limits.max_pages,
                });
            }
            if let Some(budget) = self.limits.max_duration
                && started.elapsed() >= budget
            {
                return Err(TraversalError::TimeBudget {
                    entry: entry_url.clone(),
                    budget,
                });
            }
            self.check_cancelled(entry_url)?;

            page = fetch_page(self.fetcher, &next_url)?;
            visited.insert(next_url);

            let summaries = links::extract(&page.document, self.layout, PagePosition::Successor)
                .into_summaries(&page.url)?;
            let added = merge_unique(&mut items, &mut seen, summaries);
            tracing::debug!(url = %page.url, added, "collected successor page");
        }

        let category = Category {
            name: Category::name_from_entry_url(entry_url),
            entry_url: entry_url.clone(),
            pages_visited: visited.len(),
            items,
        };
        tracing::info!(
            category = %category.name,
            pages = category.pages_visited,
            items = category.items.len(),
            "category traversed"
        );
        Ok(category)
    }

    fn next_href(&self, document: &Html, page_url: &Url) -> Result<Option<String>, TraversalError> {
        let Some(control) = self.next_control.first_in(document) else {
            return Ok(None);
        };
        child_elements(control)
            .next()
            .and_then(|target| target.value().attr("href"))
            .map(|href| Some(href.to_owned()))
            .ok_or_else(|| TraversalError::MissingNextTarget {
                page: page_url.clone(),
            })
    }

    fn check_cancelled(&self, entry_url: &Url) -> Result<(), TraversalError> {
        if self.cancel.is_cancelled() {
            return Err(TraversalError::Cancelled {
                entry: entry_url.clone(),
            });
        }
        Ok(())
    }
}

fn directory_of(url: &Url) -> Url {
    let mut base = url.clone();
    base.set_query(None);
    base.set_fragment(None);
    if let Some(cut) = base.path().rfind('/') {
        let path = base.path()[..=cut].to_owned();
        base.set_path(&path);
    }
    base
}

fn merge_unique(
    items: &mut Vec<BookSummary>,
    seen: &mut HashSet<String>,
    summaries: Vec<BookSummary>,
) -> usize {
    let before = items.len();
    for summary in summaries {
        if seen.insert(summary.link.clone()) {
            items.push(summary);
        }
    }
    items.len() - before
}
