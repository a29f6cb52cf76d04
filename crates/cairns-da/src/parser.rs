use std::collections::HashSet;
use std::sync::LazyLock;

use chrono::NaiveDate;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::types::{DevelopmentApplication, Field};
use crate::utils::comment_url;

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Failed to parse URL: {0}")]
    UrlParse(String),
    #[error("Failed to parse date: {0}")]
    DateParse(String),
    #[error("Missing required field: {0}")]
    MissingField(String),
    #[error("Search form submit failed, portal reported '{0}'")]
    SearchFailed(&'static str),
}

pub(crate) const SEARCH_FORM_NAME: &str = "daEnquiryForm";

const SEARCH_FAILURE_MARKERS: [&str; 2] = ["Problem Encountered", "Error Page Exception"];

const MAP_LOCATION_SUFFIX: &str = " (map location)";

static FORM_SEL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(&format!("form[name=\"{}\"]", SEARCH_FORM_NAME))
        .expect("invalid selector: search form")
});

static FORM_CONTROL_SEL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("input[name], select[name], textarea[name]")
        .expect("invalid selector: form control")
});

static OPTION_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("option").expect("invalid selector: option"));

static RESULT_LINK_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a.plain_header[href]").expect("invalid selector: result"));

static ROW_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("p.rowDataOnly").expect("invalid selector: row"));

static KEY_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span.key").expect("invalid selector: key"));

static VALUE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span.inputField").expect("invalid selector: value"));

static ANCHOR_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a").expect("invalid selector: anchor"));

fn elem_text(element: ElementRef) -> String {
    element.text().collect::<String>()
}

fn non_empty(text: &str) -> Option<String> {
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

pub(crate) fn parse_portal_date(text: &str) -> Result<NaiveDate, ParseError> {
    NaiveDate::parse_from_str(text.trim(), crate::PORTAL_DATE_FORMAT)
        .map_err(|e| ParseError::DateParse(format!("'{}': {}", text, e)))
}

/// The portal's search form with the values it would submit untouched.
#[derive(Debug, Clone)]
pub(crate) struct SearchForm {
    pub action: Url,
    pub fields: Vec<(String, String)>,
}

impl SearchForm {
    /// Form defaults with `overrides` replacing same-named fields in place and
    /// the rest appended.
    pub fn with_overrides(&self, overrides: &[(&str, String)]) -> Vec<(String, String)> {
        let mut params = self.fields.clone();
        for (name, value) in overrides {
            match params.iter_mut().find(|(n, _)| n.as_str() == *name) {
                Some(existing) => existing.1 = value.clone(),
                None => params.push((name.to_string(), value.clone())),
            }
        }
        params
    }
}

pub(crate) fn parse_search_form(html: &str, page_url: &Url) -> Result<SearchForm, ParseError> {
    let document = Html::parse_document(html);
    let form = document
        .select(&FORM_SEL)
        .next()
        .ok_or_else(|| ParseError::MissingField(format!("{} on {}", SEARCH_FORM_NAME, page_url)))?;

    let action = match form.value().attr("action").map(str::trim) {
        Some(action) if !action.is_empty() => page_url
            .join(action)
            .map_err(|e| ParseError::UrlParse(format!("form action '{}': {}", action, e)))?,
        _ => page_url.clone(),
    };

    let mut fields = Vec::new();
    let mut clicked = false;

    for control in form.select(&FORM_CONTROL_SEL) {
        let element = control.value();
        let Some(name) = element.attr("name").filter(|n| !n.is_empty()) else {
            continue;
        };

        let value = match element.name() {
            "input" => {
                let kind = element.attr("type").unwrap_or("text").to_ascii_lowercase();
                match kind.as_str() {
                    // A browser submitting the form sends the first submit
                    // button as the one clicked.
                    "submit" if !clicked => {
                        clicked = true;
                        element.attr("value").unwrap_or_default().to_string()
                    }
                    "submit" | "button" | "image" | "reset" | "file" => continue,
                    "radio" | "checkbox" => {
                        if element.attr("checked").is_none() {
                            continue;
                        }
                        element.attr("value").unwrap_or("on").to_string()
                    }
                    _ => element.attr("value").unwrap_or_default().to_string(),
                }
            }
            "select" => {
                let selected = control
                    .select(&OPTION_SEL)
                    .find(|o| o.value().attr("selected").is_some())
                    .or_else(|| control.select(&OPTION_SEL).next());
                let Some(option) = selected else {
                    continue;
                };
                option
                    .value()
                    .attr("value")
                    .map(str::to_string)
                    .unwrap_or_else(|| elem_text(option).trim().to_string())
            }
            _ => elem_text(control),
        };

        fields.push((name.to_string(), value));
    }

    Ok(SearchForm { action, fields })
}

/// Detail page links from a search results page, resolved against the
/// results page URL.
pub(crate) fn parse_search_results(html: &str, page_url: &Url) -> Result<Vec<Url>, ParseError> {
    if let Some(marker) = SEARCH_FAILURE_MARKERS
        .into_iter()
        .find(|marker| html.contains(*marker))
    {
        return Err(ParseError::SearchFailed(marker));
    }

    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut urls = Vec::new();

    for link in document.select(&RESULT_LINK_SEL) {
        let Some(href) = link.value().attr("href").map(str::trim) else {
            continue;
        };
        match page_url.join(href) {
            Ok(url) => {
                if seen.insert(url.clone()) {
                    urls.push(url);
                }
            }
            Err(e) => log::warn!("Skipping result link '{}': {}", href, e),
        }
    }

    Ok(urls)
}

/// Run-scoped values stamped on every record.
#[derive(Debug, Clone)]
pub(crate) struct RecordContext {
    pub date_scraped: NaiveDate,
    pub info_url: String,
    pub feedback_url: String,
}

/// Collects the mapped fields of one detail page. Only values that were
/// actually found are committed.
#[derive(Debug, Default)]
struct ApplicationBuilder {
    council_reference: Option<String>,
    date_received: Option<String>,
    address: Option<String>,
    description: Option<String>,
    external_reference: Option<String>,
}

impl ApplicationBuilder {
    fn set(&mut self, field: Field, value: String) {
        let slot = match field {
            Field::CouncilReference => &mut self.council_reference,
            Field::DateReceived => &mut self.date_received,
            Field::Address => &mut self.address,
            Field::Description => &mut self.description,
            Field::ExternalReference => &mut self.external_reference,
        };
        *slot = Some(value);
    }

    fn build(self, ctx: &RecordContext) -> Result<Option<DevelopmentApplication>, ParseError> {
        let Some(council_reference) = self.council_reference else {
            return Ok(None);
        };

        let date_received = self.date_received.as_deref().ok_or_else(|| {
            ParseError::MissingField(format!(
                "{} for {}",
                Field::DateReceived,
                council_reference
            ))
        })?;
        let date_received = parse_portal_date(date_received)?;

        Ok(Some(DevelopmentApplication {
            comment_url: comment_url(&ctx.feedback_url, &council_reference),
            council_reference,
            date_received,
            address: self.address,
            description: self.description,
            external_reference: self.external_reference,
            date_scraped: ctx.date_scraped,
            info_url: ctx.info_url.clone(),
        }))
    }
}

fn strip_map_location(text: &str) -> &str {
    let text = text.trim();
    text.strip_suffix(MAP_LOCATION_SUFFIX)
        .unwrap_or(text)
        .trim_end()
}

/// Addresses are rendered as a `ul > li > a` map link instead of a value
/// span. A `ul` closes the enclosing `p` while parsing, so the list usually
/// ends up as the row's next element sibling rather than inside it.
fn address_text(row: ElementRef) -> Option<String> {
    let anchor = row.select(&ANCHOR_SEL).next().or_else(|| {
        row.next_siblings()
            .find_map(ElementRef::wrap)
            .filter(|list| list.value().name() == "ul")
            .and_then(|list| list.select(&ANCHOR_SEL).next())
    })?;
    non_empty(strip_map_location(&elem_text(anchor)))
}

fn parse_row(row: ElementRef) -> Option<(Field, String)> {
    let label = row.select(&KEY_SEL).next().map(elem_text)?;
    let label = label.trim();

    let Some(field) = Field::from_label(label) else {
        log::debug!("Ignoring unmapped row '{}'", label);
        return None;
    };

    let value = match field {
        Field::Address => address_text(row),
        _ => row
            .select(&VALUE_SEL)
            .next()
            .and_then(|value| non_empty(&elem_text(value))),
    };
    if value.is_none() {
        log::debug!("Row '{}' has no value, skipping", field.label());
    }

    value.map(|value| (field, value))
}

pub(crate) fn parse_application(
    html: &str,
    ctx: &RecordContext,
) -> Result<Option<DevelopmentApplication>, ParseError> {
    let document = Html::parse_document(html);

    let mut builder = ApplicationBuilder::default();
    for (field, value) in document.select(&ROW_SEL).filter_map(parse_row) {
        builder.set(field, value);
    }

    builder.build(ctx)
}
