use scraper::Html;
use url::Url;

use crate::config::SiteLayout;
use crate::html::{Css, InvalidSelector, child_elements};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImageError {
    #[error("detail page has no `{selector}` image container")]
    ContainerMissing { selector: String },
    #[error("`{selector}` image container has no child with a src")]
    SourceMissing { selector: String },
    #[error("invalid image reference {src:?}: {source}")]
    InvalidUrl {
        src: String,
        source: url::ParseError,
    },
}

#[derive(Debug, Clone)]
pub struct ImageLocator {
    container: Css,
    site_root: Url,
    path_prefix: String,
}

impl ImageLocator {
    pub fn new(layout: &SiteLayout) -> Result<Self, InvalidSelector> {
        Ok(Self {
            container: Css::parse(&layout.image_container_selector)?,
            site_root: layout.site_root.clone(),
            path_prefix: layout.image_path_prefix.clone(),
        })
    }

    pub fn locate(&self, document: &Html) -> Result<Url, ImageError> {
        let container =
            self.container
                .first_in(document)
                .ok_or_else(|| ImageError::ContainerMissing {
                    selector: self.container.source().to_owned(),
                })?;

        let src = child_elements(container)
            .next()
            .and_then(|image| image.value().attr("src"))
            .ok_or_else(|| ImageError::SourceMissing {
                selector: self.container.source().to_owned(),
            })?;

        let relative = src.strip_prefix(self.path_prefix.as_str()).unwrap_or(src);
        self.site_root
            .join(relative)
            .map_err(|source| ImageError::InvalidUrl {
                src: src.to_owned(),
                source,
            })
    }
}
