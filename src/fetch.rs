use anyhow::Context as _;
use reqwest::header::{ACCEPT, USER_AGENT};
use scraper::Html;
use url::Url;

use crate::config::FetchConfig;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("unreachable: {url}: {reason}")]
    Unreachable { url: Url, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Page,
    Image,
}

impl Resource {
    pub fn accept(self) -> &'static str {
        match self {
            Self::Page => "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8",
            Self::Image => "image/avif,image/webp,image/*,*/*;q=0.8",
        }
    }
}

pub trait Fetch {
    fn fetch(&self, url: &Url, resource: Resource) -> Result<Vec<u8>, FetchError>;
}

#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
    user_agent: String,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> anyhow::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .context("build http client")?;
        Ok(Self {
            client,
            user_agent: config.user_agent.clone(),
        })
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, url: &Url, resource: Resource) -> Result<Vec<u8>, FetchError> {
        let unreachable = |reason: String| FetchError::Unreachable {
            url: url.clone(),
            reason,
        };

        let response = self
            .client
            .get(url.clone())
            .header(USER_AGENT, &self.user_agent)
            .header(ACCEPT, resource.accept())
            .send()
            .map_err(|err| unreachable(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(unreachable(format!("http status {status}")));
        }

        let body = response
            .bytes()
            .map_err(|err| unreachable(format!("read body: {err}")))?;
        tracing::debug!(url = %url, bytes = body.len(), "fetched");
        Ok(body.to_vec())
    }
}

#[derive(Debug)]
pub struct CatalogPage {
    pub url: Url,
    pub document: Html,
}

impl CatalogPage {
    pub fn parse(url: Url, body: &[u8]) -> Self {
        let html = String::from_utf8_lossy(body);
        Self {
            url,
            document: Html::parse_document(&html),
        }
    }
}

pub fn fetch_page(fetcher: &dyn Fetch, url: &Url) -> Result<CatalogPage, FetchError> {
    let body = fetcher.fetch(url, Resource::Page)?;
    Ok(CatalogPage::parse(url.clone(), &body))
}

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::RefCell;
    use std::collections::HashMap;

    use super::*;

    #[derive(Debug, Default)]
    pub struct MapFetcher {
        pages: HashMap<String, Vec<u8>>,
        requests: RefCell<Vec<(String, Resource)>>,
    }

    impl MapFetcher {
        pub fn with_page(mut self, url: &str, body: impl Into<Vec<u8>>) -> Self {
            self.pages.insert(url.to_owned(), body.into());
            self
        }

        pub fn requests(&self) -> Vec<String> {
            self.requests
                .borrow()
                .iter()
                .map(|(url, _)| url.clone())
                .collect()
        }

        pub fn resource_of(&self, url: &str) -> Option<Resource> {
            self.requests
                .borrow()
                .iter()
                .find(|(requested, _)| requested == url)
                .map(|(_, resource)| *resource)
        }
    }

    impl Fetch for MapFetcher {
        fn fetch(&self, url: &Url, resource: Resource) -> Result<Vec<u8>, FetchError> {
            self.requests.borrow_mut().push((url.to_string(), resource));
            self.pages
                .get(url.as_str())
                .cloned()
                .ok_or_else(|| FetchError::Unreachable {
                    url: url.clone(),
                    reason: "http status 404 Not Found".to_owned(),
                })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::MapFetcher;
    use super::*;

    #[test]
    fn fetch_page_parses_body() -> anyhow::Result<()> {
        let fetcher = MapFetcher::default().with_page(
            "http://shop.test/a.html",
            "<html><head><title>A</title></head></html>",
        );
        let url = Url::parse("http://shop.test/a.html")?;
        let page = fetch_page(&fetcher, &url)?;
        assert_eq!(page.url, url);
        let title = crate::html::Css::parse("title")?;
        let title = title.first_in(&page.document).map(crate::html::text_of);
        assert_eq!(title.as_deref(), Some("A"));
        Ok(())
    }

    #[test]
    fn missing_page_is_unreachable() -> anyhow::Result<()> {
        let fetcher = MapFetcher::default();
        let url = Url::parse("http://shop.test/missing.html")?;
        let err = fetch_page(&fetcher, &url).unwrap_err();
        assert!(err.to_string().starts_with("unreachable: http://shop.test/missing.html"));
        assert_eq!(fetcher.requests(), vec!["http://shop.test/missing.html"]);
        Ok(())
    }

    #[test]
    fn pages_and_images_ask_for_different_content() {
        assert!(Resource::Page.accept().starts_with("text/html"));
        assert!(Resource::Image.accept().starts_with("image/"));
        assert!(!Resource::Image.accept().contains("text/html"));
    }
}
