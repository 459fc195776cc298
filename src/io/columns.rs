use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};

use crate::domain::{
    parse_amount, Client, ClientRef, Country, EntryKind, ExpenseEntry, Invoice, RevenueEntry,
};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Header labels for each exported field, in column order.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMap {
    columns: Vec<(&'static str, String)>,
}

impl ColumnMap {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = (&'static str, S)>,
        S: Into<String>,
    {
        Self {
            columns: columns
                .into_iter()
                .map(|(field, header)| (field, header.into()))
                .collect(),
        }
    }

    /// Every field of `kind`, headed by its own name.
    pub fn english(kind: EntryKind) -> Self {
        Self::new(fields_of(kind).iter().map(|f| (*f, *f)))
    }

    /// Every field of `kind`, with Arabic headers.
    pub fn arabic(kind: EntryKind) -> Self {
        Self::new(fields_of(kind).iter().map(|f| (*f, arabic_header(f))))
    }

    pub fn fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns.iter().map(|(field, _)| *field)
    }

    pub fn headers(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(_, header)| header.as_str())
    }

    pub fn header_for(&self, field: &str) -> Option<&str> {
        self.columns
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, header)| header.as_str())
    }
}

fn fields_of(kind: EntryKind) -> &'static [&'static str] {
    match kind {
        EntryKind::Client => Client::FIELDS,
        EntryKind::Invoice => Invoice::FIELDS,
        EntryKind::Revenue => RevenueEntry::FIELDS,
        EntryKind::Expense => ExpenseEntry::FIELDS,
    }
}

fn arabic_header(field: &str) -> &'static str {
    match field {
        "id" => "ID",
        "name" => "الاسم",
        "country" => "الدولة",
        "contact" => "التواصل",
        "created_at" => "تاريخ الإضافة",
        "client_id" => "رقم العميل",
        "client_name" => "العميل",
        "client_state" => "حالة العميل",
        "amount" => "المبلغ",
        "tax" => "الضريبة",
        "total" => "الإجمالي",
        "description" => "الوصف",
        "date" => "التاريخ",
        "source" => "المصدر",
        "category" => "الفئة",
        _ => "",
    }
}

/// Field values of one parsed row, keyed by field name.
pub struct Fields<'a> {
    values: HashMap<&'static str, &'a str>,
}

/// A field that could not be turned back into a record value.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl<'a> Fields<'a> {
    pub fn new(values: HashMap<&'static str, &'a str>) -> Self {
        Self { values }
    }

    /// Non-empty value, if present.
    pub fn get(&self, field: &'static str) -> Option<&'a str> {
        self.values.get(field).copied().filter(|v| !v.is_empty())
    }

    fn optional_string(&self, field: &'static str) -> Option<String> {
        self.get(field).map(str::to_string)
    }

    fn required(&self, field: &'static str) -> Result<&'a str, FieldError> {
        self.get(field).ok_or_else(|| FieldError {
            field,
            message: "missing value".to_string(),
        })
    }

    fn id(&self, field: &'static str) -> Result<Option<i64>, FieldError> {
        self.get(field)
            .map(|v| {
                v.parse::<i64>().map_err(|e| FieldError {
                    field,
                    message: e.to_string(),
                })
            })
            .transpose()
    }

    fn amount(&self, field: &'static str) -> Result<f64, FieldError> {
        parse_amount(self.required(field)?).map_err(|e| FieldError {
            field,
            message: e.to_string(),
        })
    }

    fn date(&self, field: &'static str) -> Result<NaiveDate, FieldError> {
        NaiveDate::parse_from_str(self.required(field)?, DATE_FORMAT).map_err(|e| FieldError {
            field,
            message: e.to_string(),
        })
    }

    /// Missing creation timestamps default to now.
    fn created_at(&self) -> Result<DateTime<Utc>, FieldError> {
        match self.get("created_at") {
            None => Ok(Utc::now()),
            Some(v) => DateTime::parse_from_rfc3339(v)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| FieldError {
                    field: "created_at",
                    message: e.to_string(),
                }),
        }
    }
}

/// A record that can be written as a CSV row and read back.
pub trait Tabular: Sized {
    const KIND: EntryKind;
    const FIELDS: &'static [&'static str];

    /// Text value of `field`; `None` for unknown fields.
    fn field(&self, field: &str) -> Option<String>;

    /// Rebuild a record. Missing ids read as 0 (unassigned).
    fn from_fields(fields: &Fields<'_>) -> Result<Self, FieldError>;
}

fn text(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

impl Tabular for Client {
    const KIND: EntryKind = EntryKind::Client;
    const FIELDS: &'static [&'static str] = &["id", "name", "country", "contact", "created_at"];

    fn field(&self, field: &str) -> Option<String> {
        Some(match field {
            "id" => self.id.to_string(),
            "name" => self.name.clone(),
            "country" => self.country.as_str().to_string(),
            "contact" => self.contact.clone(),
            "created_at" => self.created_at.to_rfc3339(),
            _ => return None,
        })
    }

    fn from_fields(fields: &Fields<'_>) -> Result<Self, FieldError> {
        let country = fields.required("country")?;
        Ok(Client {
            id: fields.id("id")?.unwrap_or(0),
            name: fields.required("name")?.to_string(),
            country: Country::from(country.to_string()),
            contact: fields.optional_string("contact").unwrap_or_default(),
            created_at: fields.created_at()?,
        })
    }
}

impl Tabular for Invoice {
    const KIND: EntryKind = EntryKind::Invoice;
    const FIELDS: &'static [&'static str] = &[
        "id",
        "client_id",
        "client_name",
        "client_state",
        "amount",
        "tax",
        "total",
        "description",
        "date",
        "created_at",
    ];

    fn field(&self, field: &str) -> Option<String> {
        Some(match field {
            "id" => self.id.to_string(),
            "client_id" => self.client.id().map(|id| id.to_string()).unwrap_or_default(),
            "client_name" => self.client.name().to_string(),
            "client_state" => {
                if self.client.is_orphaned() {
                    "orphaned".to_string()
                } else {
                    "linked".to_string()
                }
            }
            "amount" => self.amount.to_string(),
            "tax" => self.tax.to_string(),
            "total" => self.total().to_string(),
            "description" => text(&self.description),
            "date" => self.date.format(DATE_FORMAT).to_string(),
            "created_at" => self.created_at.to_rfc3339(),
            _ => return None,
        })
    }

    /// `total` is derived and ignored on the way back in.
    fn from_fields(fields: &Fields<'_>) -> Result<Self, FieldError> {
        let client_id = fields.id("client_id")?;
        let name = fields.required("client_name")?.to_string();
        let client = match (fields.get("client_state"), client_id) {
            (Some("orphaned"), former_id) | (_, former_id @ None) => {
                ClientRef::Orphaned { former_id, name }
            }
            (_, Some(id)) => ClientRef::Linked { id, name },
        };

        Ok(Invoice {
            id: fields.id("id")?.unwrap_or(0),
            client,
            amount: fields.amount("amount")?,
            tax: match fields.get("tax") {
                Some(_) => fields.amount("tax")?,
                None => 0.0,
            },
            description: fields.optional_string("description"),
            date: fields.date("date")?,
            created_at: fields.created_at()?,
        })
    }
}

impl Tabular for RevenueEntry {
    const KIND: EntryKind = EntryKind::Revenue;
    const FIELDS: &'static [&'static str] =
        &["id", "source", "amount", "description", "date", "created_at"];

    fn field(&self, field: &str) -> Option<String> {
        Some(match field {
            "id" => self.id.to_string(),
            "source" => self.source.clone(),
            "amount" => self.amount.to_string(),
            "description" => text(&self.description),
            "date" => self.date.format(DATE_FORMAT).to_string(),
            "created_at" => self.created_at.to_rfc3339(),
            _ => return None,
        })
    }

    fn from_fields(fields: &Fields<'_>) -> Result<Self, FieldError> {
        Ok(RevenueEntry {
            id: fields.id("id")?.unwrap_or(0),
            source: fields.required("source")?.to_string(),
            amount: fields.amount("amount")?,
            description: fields.optional_string("description"),
            date: fields.date("date")?,
            created_at: fields.created_at()?,
        })
    }
}

impl Tabular for ExpenseEntry {
    const KIND: EntryKind = EntryKind::Expense;
    const FIELDS: &'static [&'static str] =
        &["id", "description", "amount", "category", "date", "created_at"];

    fn field(&self, field: &str) -> Option<String> {
        Some(match field {
            "id" => self.id.to_string(),
            "description" => self.description.clone(),
            "amount" => self.amount.to_string(),
            "category" => text(&self.category),
            "date" => self.date.format(DATE_FORMAT).to_string(),
            "created_at" => self.created_at.to_rfc3339(),
            _ => return None,
        })
    }

    fn from_fields(fields: &Fields<'_>) -> Result<Self, FieldError> {
        Ok(ExpenseEntry {
            id: fields.id("id")?.unwrap_or(0),
            description: fields.required("description")?.to_string(),
            amount: fields.amount("amount")?,
            category: fields.optional_string("category"),
            date: fields.date("date")?,
            created_at: fields.created_at()?,
        })
    }
}
