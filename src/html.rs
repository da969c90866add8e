use scraper::{ElementRef, Html, Selector};

#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid css selector `{css}`: {reason}")]
pub struct InvalidSelector {
    pub css: String,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct Css {
    source: String,
    selector: Selector,
}

impl Css {
    pub fn parse(source: &str) -> Result<Self, InvalidSelector> {
        let selector = Selector::parse(source).map_err(|err| InvalidSelector {
            css: source.to_owned(),
            reason: err.to_string(),
        })?;
        Ok(Self {
            source: source.to_owned(),
            selector,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn first<'a>(&self, scope: ElementRef<'a>) -> Option<ElementRef<'a>> {
        scope.select(&self.selector).next()
    }

    pub fn all<'a>(&self, scope: ElementRef<'a>) -> Vec<ElementRef<'a>> {
        scope.select(&self.selector).collect()
    }

    pub fn first_in<'a>(&self, document: &'a Html) -> Option<ElementRef<'a>> {
        document.select(&self.selector).next()
    }
}

pub fn anchors(document: &Html) -> impl Iterator<Item = ElementRef<'_>> {
    document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|element| element.value().name() == "a")
}

pub fn child_elements<'a>(element: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    element.children().filter_map(ElementRef::wrap)
}

pub fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_owned()
}
