use serde::{Deserialize, Serialize};
use url::Url;

use crate::detail::FieldError;

pub const SENTINEL: &str = "Unable to scrap this information";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookSummary {
    pub title: String,
    pub link: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub name: String,
    pub entry_url: Url,
    pub pages_visited: usize,
    pub items: Vec<BookSummary>,
}

impl Category {
    pub fn name_from_entry_url(entry_url: &Url) -> String {
        let segments = entry_url
            .path_segments()
            .map(|segments| segments.collect::<Vec<_>>())
            .unwrap_or_default();
        let slug = match segments.as_slice() {
            [.., slug, _last] => *slug,
            _ => "",
        };

        let without_digits = slug
            .chars()
            .filter(|ch| !ch.is_ascii_digit())
            .collect::<String>();
        let name = title_case(&without_digits);
        let name = name.trim_matches(|ch| ch == '_' || ch == '-');
        if name.is_empty() {
            "Uncategorized".to_owned()
        } else {
            name.to_owned()
        }
    }
}

fn title_case(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut word_start = true;
    for ch in input.chars() {
        if ch.is_alphabetic() {
            if word_start {
                out.extend(ch.to_uppercase());
            } else {
                out.extend(ch.to_lowercase());
            }
            word_start = false;
        } else {
            out.push(ch);
            word_start = true;
        }
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    ProductPageUrl,
    UniversalProductCode,
    Title,
    PriceIncludingTax,
    PriceExcludingTax,
    NumberAvailable,
    Category,
    ReviewRating,
    ProductDescription,
    ImageUrl,
}

impl Field {
    pub const ALL: [Field; 10] = [
        Field::ProductPageUrl,
        Field::UniversalProductCode,
        Field::Title,
        Field::PriceIncludingTax,
        Field::PriceExcludingTax,
        Field::NumberAvailable,
        Field::Category,
        Field::ReviewRating,
        Field::ProductDescription,
        Field::ImageUrl,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Field::ProductPageUrl => "product_page_url",
            Field::UniversalProductCode => "universal_product_code",
            Field::Title => "title",
            Field::PriceIncludingTax => "price_including_tax",
            Field::PriceExcludingTax => "price_excluding_tax",
            Field::NumberAvailable => "number_available",
            Field::Category => "category",
            Field::ReviewRating => "review_rating",
            Field::ProductDescription => "product_description",
            Field::ImageUrl => "image_url",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substitution {
    pub field: Field,
    pub reason: FieldError,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookRecord {
    pub product_page_url: String,
    pub universal_product_code: String,
    pub title: String,
    pub price_including_tax: String,
    pub price_excluding_tax: String,
    pub number_available: String,
    pub category: String,
    pub review_rating: String,
    pub product_description: String,
    pub image_url: String,
    #[serde(skip)]
    substitutions: Vec<Substitution>,
}

impl BookRecord {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn assemble(
        product_page_url: String,
        universal_product_code: String,
        title: String,
        price_including_tax: String,
        price_excluding_tax: String,
        number_available: String,
        category: String,
        review_rating: String,
        product_description: String,
        image_url: String,
        substitutions: Vec<Substitution>,
    ) -> Self {
        Self {
            product_page_url,
            universal_product_code,
            title,
            price_including_tax,
            price_excluding_tax,
            number_available,
            category,
            review_rating,
            product_description,
            image_url,
            substitutions,
        }
    }

    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::ProductPageUrl => &self.product_page_url,
            Field::UniversalProductCode => &self.universal_product_code,
            Field::Title => &self.title,
            Field::PriceIncludingTax => &self.price_including_tax,
            Field::PriceExcludingTax => &self.price_excluding_tax,
            Field::NumberAvailable => &self.number_available,
            Field::Category => &self.category,
            Field::ReviewRating => &self.review_rating,
            Field::ProductDescription => &self.product_description,
            Field::ImageUrl => &self.image_url,
        }
    }

    pub fn values(&self) -> [&str; 10] {
        Field::ALL.map(|field| self.get(field))
    }

    pub fn substitutions(&self) -> &[Substitution] {
        &self.substitutions
    }

    pub fn is_partial(&self) -> bool {
        !self.substitutions.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Complete,
    Partial,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlOutcome {
    pub category: String,
    pub title: String,
    pub url: String,
    pub status: OutcomeStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub substituted: Vec<Field>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
    pub finished_at: String,
}
