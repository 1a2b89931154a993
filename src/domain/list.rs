use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::{postgres::PgRow, Row};
use unicode_segmentation::UnicodeSegmentation;

const MAX_CHAR_LENGTH: usize = 255;

#[derive(Debug, Clone, serde::Serialize)]
pub struct ListName(String);

impl ListName {
    pub fn parse(name: String) -> Result<ListName, String> {
        let name = name.trim();

        if name.is_empty() {
            return Err(String::from("List name is required"));
        }

        if name.graphemes(true).count() > MAX_CHAR_LENGTH {
            return Err(String::from("List name is too long"));
        }

        Ok(Self(name.to_string()))
    }
}

impl AsRef<str> for ListName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Deserialize, Debug)]
pub struct NewListBody {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// A subscriber list.
#[derive(Debug, serde::Serialize)]
pub struct MailingList {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl MailingList {
    pub fn from_row(row: PgRow) -> MailingList {
        MailingList {
            id: row.get("id"),
            name: row.get("name"),
            description: row.get("description"),
            created_at: row.get("created_at"),
        }
    }
}
