//! Markup extraction collaborator.

use crate::error::{Result, ScanError};
use scraper::{Html, Selector};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Anchor {
    pub href: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Form {
    pub action: Option<String>,
    pub method: Option<String>,
}

/// Raw attribute values as they appear in the markup, unresolved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedPage {
    pub anchors: Vec<Anchor>,
    pub forms: Vec<Form>,
}

/// Pulls anchors and forms out of a markup string.
pub trait Parser: Send + Sync {
    fn parse(&self, html: &str) -> Result<ParsedPage>;
}

/// [`Parser`] backed by `scraper`.
pub struct HtmlParser {
    anchor_selector: Selector,
    form_selector: Selector,
}

impl HtmlParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            anchor_selector: selector("a")?,
            form_selector: selector("form")?,
        })
    }
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css)
        .map_err(|e| ScanError::Extraction(format!("bad selector {}: {}", css, e)))
}

impl Parser for HtmlParser {
    fn parse(&self, html: &str) -> Result<ParsedPage> {
        let document = Html::parse_document(html);

        let anchors = document
            .select(&self.anchor_selector)
            .map(|element| Anchor {
                href: element.value().attr("href").map(str::to_string),
            })
            .collect();

        let forms = document
            .select(&self.form_selector)
            .map(|element| Form {
                action: element.value().attr("action").map(str::to_string),
                method: element.value().attr("method").map(str::to_string),
            })
            .collect();

        Ok(ParsedPage { anchors, forms })
    }
}
