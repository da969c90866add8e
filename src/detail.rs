use scraper::{ElementRef, Html};
use url::Url;

use crate::config::SiteLayout;
use crate::formats::{BookRecord, Field, SENTINEL, Substitution};
use crate::html::{Css, InvalidSelector, text_of};
use crate::image::{ImageError, ImageLocator};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldError {
    #[error("no element matches `{selector}`")]
    Missing { selector: String },
    #[error("`{selector}` matched {len} elements, position {position} is out of range")]
    OutOfRange {
        selector: String,
        position: String,
        len: usize,
    },
    #[error("text {text:?} has fewer than two tokens")]
    TooFewTokens { text: String },
}

#[derive(Debug, thiserror::Error)]
pub enum DetailError {
    #[error("image of {url}: {source}")]
    Image { url: Url, source: ImageError },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    FromStart(usize),
    FromEnd(usize),
}

impl Position {
    fn resolve(self, len: usize) -> Option<usize> {
        match self {
            Position::FromStart(index) => (index < len).then_some(index),
            Position::FromEnd(offset) => len.checked_sub(offset + 1),
        }
    }

    fn describe(self) -> String {
        match self {
            Position::FromStart(index) => format!("#{index}"),
            Position::FromEnd(offset) => format!("#-{}", offset + 1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    Identity,
    LastChars(usize),
    SecondToLastToken { strip: char },
}

impl Transform {
    fn apply(self, text: String) -> Result<String, FieldError> {
        match self {
            Transform::Identity => Ok(text),
            Transform::LastChars(n) => {
                let skip = text.chars().count().saturating_sub(n);
                Ok(text.chars().skip(skip).collect())
            }
            Transform::SecondToLastToken { strip } => {
                let tokens = text.split_whitespace().collect::<Vec<_>>();
                match tokens.len().checked_sub(2) {
                    Some(index) => Ok(tokens[index].chars().filter(|ch| *ch != strip).collect()),
                    None => Err(FieldError::TooFewTokens { text }),
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct FieldRule {
    scope: Option<Css>,
    items: Css,
    position: Position,
    transform: Transform,
}

impl FieldRule {
    pub fn new(items: &str, position: Position) -> Result<Self, InvalidSelector> {
        Ok(Self {
            scope: None,
            items: Css::parse(items)?,
            position,
            transform: Transform::Identity,
        })
    }

    pub fn within(mut self, scope: &str) -> Result<Self, InvalidSelector> {
        self.scope = Some(Css::parse(scope)?);
        Ok(self)
    }

    pub fn then(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn locate(&self, root: ElementRef<'_>) -> Result<String, FieldError> {
        let scope = match &self.scope {
            Some(scope) => scope.first(root).ok_or_else(|| FieldError::Missing {
                selector: scope.source().to_owned(),
            })?,
            None => root,
        };

        let matches = self.items.all(scope);
        if matches.is_empty() {
            return Err(FieldError::Missing {
                selector: self.items.source().to_owned(),
            });
        }
        let index = self
            .position
            .resolve(matches.len())
            .ok_or_else(|| FieldError::OutOfRange {
                selector: self.items.source().to_owned(),
                position: self.position.describe(),
                len: matches.len(),
            })?;

        self.transform.apply(text_of(matches[index]))
    }
}

#[derive(Debug, Clone)]
pub struct TableRules {
    pub table: Css,
    pub price_including_tax: FieldRule,
    pub price_excluding_tax: FieldRule,
    pub number_available: FieldRule,
    pub review_rating: FieldRule,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct TableFields {
    price_including_tax: String,
    price_excluding_tax: String,
    number_available: String,
    review_rating: String,
}

impl TableRules {
    fn locate(&self, root: ElementRef<'_>) -> Result<TableFields, FieldError> {
        let table = self.table.first(root).ok_or_else(|| FieldError::Missing {
            selector: self.table.source().to_owned(),
        })?;
        Ok(TableFields {
            price_including_tax: self.price_including_tax.locate(table)?,
            price_excluding_tax: self.price_excluding_tax.locate(table)?,
            number_available: self.number_available.locate(table)?,
            review_rating: self.review_rating.locate(table)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct RuleSet {
    pub universal_product_code: FieldRule,
    pub product_table: TableRules,
    pub product_description: FieldRule,
    pub category: FieldRule,
}

impl RuleSet {
    pub fn positional() -> Result<Self, InvalidSelector> {
        // Rows are read whole: header cell text followed by the value cell.
        let row = |index| FieldRule::new("tr", Position::FromStart(index));

        Ok(Self {
            universal_product_code: row(0)?,
            product_table: TableRules {
                table: Css::parse("table.table.table-striped")?,
                price_including_tax: row(3)?.then(Transform::LastChars(5)),
                price_excluding_tax: row(2)?.then(Transform::LastChars(5)),
                number_available: row(5)?.then(Transform::SecondToLastToken { strip: '(' }),
                review_rating: FieldRule::new("tr", Position::FromEnd(0))?,
            },
            product_description: FieldRule::new("p", Position::FromStart(3))?,
            category: FieldRule::new("li", Position::FromStart(2))?.within("ul.breadcrumb")?,
        })
    }
}

#[derive(Debug, Default)]
struct Substitutions(Vec<Substitution>);

impl Substitutions {
    fn take(&mut self, field: Field, result: Result<String, FieldError>) -> String {
        match result {
            Ok(value) => value,
            Err(reason) => {
                tracing::debug!(field = field.name(), %reason, "substituting sentinel");
                self.0.push(Substitution { field, reason });
                SENTINEL.to_owned()
            }
        }
    }
}

pub struct DetailExtractor {
    rules: RuleSet,
    images: ImageLocator,
}

impl DetailExtractor {
    pub fn new(layout: &SiteLayout) -> Result<Self, InvalidSelector> {
        Ok(Self {
            rules: RuleSet::positional()?,
            images: ImageLocator::new(layout)?,
        })
    }

    pub fn extract(
        &self,
        document: &Html,
        known_title: &str,
        source_url: &Url,
    ) -> Result<BookRecord, DetailError> {
        let root = document.root_element();
        let mut substitutions = Substitutions::default();

        let image_url = self
            .images
            .locate(document)
            .map_err(|source| DetailError::Image {
                url: source_url.clone(),
                source,
            })?;

        let universal_product_code = substitutions.take(
            Field::UniversalProductCode,
            self.rules.universal_product_code.locate(root),
        );

        let (price_including_tax, price_excluding_tax, number_available, review_rating) =
            match self.rules.product_table.locate(root) {
                Ok(table) => (
                    table.price_including_tax,
                    table.price_excluding_tax,
                    table.number_available,
                    table.review_rating,
                ),
                Err(reason) => {
                    let grouped = [
                        Field::PriceIncludingTax,
                        Field::PriceExcludingTax,
                        Field::NumberAvailable,
                        Field::ReviewRating,
                    ];
                    for field in grouped {
                        substitutions.take(field, Err(reason.clone()));
                    }
                    (
                        SENTINEL.to_owned(),
                        SENTINEL.to_owned(),
                        SENTINEL.to_owned(),
                        SENTINEL.to_owned(),
                    )
                }
            };

        let category = substitutions.take(Field::Category, self.rules.category.locate(root));
        let product_description = substitutions.take(
            Field::ProductDescription,
            self.rules.product_description.locate(root),
        );

        if !substitutions.0.is_empty() {
            tracing::warn!(
                url = %source_url,
                substituted = substitutions.0.len(),
                "detail page only partially matched"
            );
        }

        Ok(BookRecord::assemble(
            source_url.to_string(),
            universal_product_code,
            known_title.to_owned(),
            price_including_tax,
            price_excluding_tax,
            number_available,
            category,
            review_rating,
            product_description,
            image_url.to_string(),
            substitutions.0,
        ))
    }
}
