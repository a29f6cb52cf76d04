use std::fmt::Display;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Record fields that are read straight off a detail page, keyed by the label
/// the portal displays next to them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    CouncilReference,
    DateReceived,
    Address,
    Description,
    ExternalReference,
}

impl Field {
    /// Looks up a trimmed display label. Labels the portal shows that we don't
    /// collect return `None`.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "Reference No." => Some(Field::CouncilReference),
            "Date Lodged" => Some(Field::DateReceived),
            "Property Details" => Some(Field::Address),
            "Description of Work" => Some(Field::Description),
            "File Reference" => Some(Field::ExternalReference),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Field::CouncilReference => "Reference No.",
            Field::DateReceived => "Date Lodged",
            Field::Address => "Property Details",
            Field::Description => "Description of Work",
            Field::ExternalReference => "File Reference",
        }
    }
}

impl Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Field::CouncilReference => write!(f, "council_reference"),
            Field::DateReceived => write!(f, "date_received"),
            Field::Address => write!(f, "address"),
            Field::Description => write!(f, "description"),
            Field::ExternalReference => write!(f, "external_reference"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevelopmentApplication {
    pub council_reference: String,
    pub date_received: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_reference: Option<String>,
    pub date_scraped: NaiveDate,
    pub info_url: String,
    pub comment_url: String,
}

impl Display for DevelopmentApplication {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "┌─ {} ─ lodged {}",
            self.council_reference, self.date_received
        )?;
        if let Some(address) = &self.address {
            writeln!(f, "│  Address: {}", address)?;
        }
        if let Some(description) = &self.description {
            let preview: String = description.chars().take(120).collect();
            if preview.len() < description.len() {
                writeln!(f, "│  Description: {}…", preview)?;
            } else {
                writeln!(f, "│  Description: {}", preview)?;
            }
        }
        if let Some(reference) = &self.external_reference {
            writeln!(f, "│  File reference: {}", reference)?;
        }
        write!(f, "└─ Comment: {}", self.comment_url)
    }
}
