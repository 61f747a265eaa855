use lazy_static::lazy_static;
use scraper::{ElementRef, Html, Selector};
use sitesearch_core::teaser::collapse_whitespace;
use sitesearch_core::Document;
use url::Url;

/// Fields pulled out of one HTML page. Missing parts are empty or `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedPage {
    pub title: String,
    pub heading: Option<String>,
    pub content: String,
    pub keywords: Option<String>,
    pub description: Option<String>,
    /// Raw `href` values in document order.
    pub links: Vec<String>,
}

impl ExtractedPage {
    pub fn into_document(self, url: impl Into<String>) -> Document {
        Document {
            url: url.into(),
            title: self.title,
            heading: self.heading,
            content: self.content,
            keywords: self.keywords,
            description: self.description,
        }
    }
}

/// Turns a page body into fields and links. Never fails: broken markup just
/// yields fewer fields.
pub trait Extractor: Send + Sync + 'static {
    fn extract(&self, body: &str, base_url: &Url) -> ExtractedPage;
}

lazy_static! {
    static ref TITLE: Selector = Selector::parse("title").expect("valid selector");
    static ref H1: Selector = Selector::parse("h1").expect("valid selector");
    static ref BODY: Selector = Selector::parse("body").expect("valid selector");
    static ref META: Selector = Selector::parse("meta[name]").expect("valid selector");
    static ref LINK: Selector = Selector::parse("a[href]").expect("valid selector");
}

/// Elements whose text is never shown to a reader.
const HIDDEN: &[&str] = &["script", "style", "noscript", "template"];

#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlExtractor;

impl Extractor for HtmlExtractor {
    fn extract(&self, body: &str, _base_url: &Url) -> ExtractedPage {
        let doc = Html::parse_document(body);

        let title = doc.select(&TITLE).next().map(text_of).unwrap_or_default();
        let heading = doc.select(&H1).next().map(text_of).filter(|h| !h.is_empty());

        let mut raw = String::new();
        match doc.select(&BODY).next() {
            Some(body) => visible_text(body, &mut raw),
            None => visible_text(doc.root_element(), &mut raw),
        }

        let mut keywords = None;
        let mut description = None;
        for meta in doc.select(&META) {
            let (Some(name), Some(content)) = (meta.value().attr("name"), meta.value().attr("content")) else {
                continue;
            };
            let content = collapse_whitespace(content);
            if content.is_empty() {
                continue;
            }
            match name.trim().to_ascii_lowercase().as_str() {
                "keywords" if keywords.is_none() => keywords = Some(content),
                "description" if description.is_none() => description = Some(content),
                _ => {}
            }
        }

        let links = doc
            .select(&LINK)
            .filter_map(|a| a.value().attr("href"))
            .map(str::to_string)
            .collect();

        ExtractedPage { title, heading, content: collapse_whitespace(&raw), keywords, description, links }
    }
}

fn text_of(el: ElementRef<'_>) -> String {
    collapse_whitespace(&el.text().collect::<Vec<_>>().join(" "))
}

fn visible_text(el: ElementRef<'_>, out: &mut String) {
    for child in el.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
            out.push(' ');
        } else if let Some(child_el) = ElementRef::wrap(child) {
            if !HIDDEN.contains(&child_el.value().name()) {
                visible_text(child_el, out);
            }
        }
    }
}
