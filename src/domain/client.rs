use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type ClientId = i64;

/// Countries offered when registering a client. Anything else is kept as free text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Country {
    Bahrain,
    SaudiArabia,
    Uae,
    Oman,
    Qatar,
    Kuwait,
    Other(String),
}

impl Country {
    /// The fixed choices, in the order they are offered.
    pub const CHOICES: [Country; 6] = [
        Country::Bahrain,
        Country::SaudiArabia,
        Country::Uae,
        Country::Oman,
        Country::Qatar,
        Country::Kuwait,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            Country::Bahrain => "bahrain",
            Country::SaudiArabia => "saudi-arabia",
            Country::Uae => "uae",
            Country::Oman => "oman",
            Country::Qatar => "qatar",
            Country::Kuwait => "kuwait",
            Country::Other(name) => name,
        }
    }

    /// Arabic display label.
    pub fn label_ar(&self) -> &str {
        match self {
            Country::Bahrain => "البحرين",
            Country::SaudiArabia => "السعودية",
            Country::Uae => "الإمارات",
            Country::Oman => "عُمان",
            Country::Qatar => "قطر",
            Country::Kuwait => "الكويت",
            Country::Other(name) => name,
        }
    }

    /// Parse a country from its code or Arabic label.
    /// Unknown values become `Other`; empty input is rejected.
    pub fn parse(s: &str) -> Option<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return None;
        }

        let known = Self::CHOICES
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(trimmed) || c.label_ar() == trimmed);

        Some(known.unwrap_or_else(|| match trimmed.to_lowercase().as_str() {
            "saudi arabia" | "saudi" | "ksa" => Country::SaudiArabia,
            "united arab emirates" | "emirates" => Country::Uae,
            _ => Country::Other(trimmed.to_string()),
        }))
    }
}

impl From<String> for Country {
    fn from(s: String) -> Self {
        Country::parse(&s).unwrap_or(Country::Other(s))
    }
}

impl From<Country> for String {
    fn from(country: Country) -> Self {
        country.as_str().to_string()
    }
}

impl std::fmt::Display for Country {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A client that invoices are issued to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    /// Assigned by the store, never reused
    pub id: ClientId,
    pub name: String,
    pub country: Country,
    /// Phone number or e-mail
    pub contact: String,
    pub created_at: DateTime<Utc>,
}

impl Client {
    /// Create a new client. The id is assigned by the repository on insert.
    pub fn new(name: impl Into<String>, country: Country, contact: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            country,
            contact: contact.into(),
            created_at: Utc::now(),
        }
    }
}
