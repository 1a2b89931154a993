//! Maps raw CSV rows into [`SubscriberRecord`]s.
//!
//! Header aliases are resolved once against the header row into a
//! [`ColumnMap`]; every row after that is addressed by column index.

use chrono::{NaiveDate, NaiveDateTime};
use csv::StringRecord;

const EMAIL_ALIASES: &[&str] = &["Email", "email", "EMAIL"];
const NAME_ALIASES: &[&str] = &["Name", "name"];
const PHONE_ALIASES: &[&str] = &[
    "Phone",
    "phone",
    "PHONE",
    "Cell Number",
    "cell number",
    "Phone Number",
    "phone number",
    "Custom Cell Number",
    "custom Cell Number",
];

/// Canonical subscriber produced from one CSV row.
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize)]
pub struct SubscriberRecord {
    pub email: String,
    pub name: String,
    pub phone: String,
    pub date_added: Option<NaiveDateTime>,
    pub stop_time: Option<NaiveDateTime>,
    pub stop_status: i32,
    pub misc: String,
    pub ad_tracking: String,
    pub ip_address: String,
    pub web_form_url: String,
    pub country: String,
    pub region: String,
    pub city: String,
    pub postal_code: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub dma_code: String,
    pub area_code: String,
    pub tags: String,
}

/// Column indexes for every logical field, in alias priority order.
#[derive(Debug, Clone, Default)]
pub struct ColumnMap {
    email: Vec<usize>,
    name: Vec<usize>,
    phone: Vec<usize>,
    date_added: Vec<usize>,
    stop_time: Vec<usize>,
    stop_status: Vec<usize>,
    misc: Vec<usize>,
    ad_tracking: Vec<usize>,
    ip_address: Vec<usize>,
    web_form_url: Vec<usize>,
    country: Vec<usize>,
    region: Vec<usize>,
    city: Vec<usize>,
    postal_code: Vec<usize>,
    latitude: Vec<usize>,
    longitude: Vec<usize>,
    dma_code: Vec<usize>,
    area_code: Vec<usize>,
    tags: Vec<usize>,
}

impl ColumnMap {
    pub fn resolve(headers: &StringRecord) -> ColumnMap {
        let headers: Vec<&str> = headers.iter().map(str::trim).collect();
        let find = |aliases: &[&str]| -> Vec<usize> {
            aliases
                .iter()
                .filter_map(|alias| headers.iter().position(|header| header == alias))
                .collect()
        };

        ColumnMap {
            email: find(EMAIL_ALIASES),
            name: find(NAME_ALIASES),
            phone: find(PHONE_ALIASES),
            date_added: find(&["Date Added"]),
            stop_time: find(&["Stop Time"]),
            stop_status: find(&["Stop Status"]),
            misc: find(&["Misc"]),
            ad_tracking: find(&["Ad Tracking"]),
            ip_address: find(&["IP Address"]),
            web_form_url: find(&["Web Form URL"]),
            country: find(&["Country"]),
            region: find(&["Region"]),
            city: find(&["City"]),
            postal_code: find(&["Postal Code"]),
            latitude: find(&["Latitude"]),
            longitude: find(&["Longitude"]),
            dma_code: find(&["DMA Code"]),
            area_code: find(&["Area Code"]),
            tags: find(&["Tags"]),
        }
    }

    pub fn has_email_column(&self) -> bool {
        !self.email.is_empty()
    }

    /// Returns `None` when the row has no usable email.
    pub fn normalize(&self, row: &StringRecord) -> Option<SubscriberRecord> {
        let email = first_non_empty(row, &self.email)?.trim().to_string();

        if email.is_empty() {
            return None;
        }

        let text = |columns: &[usize]| first_non_empty(row, columns).unwrap_or("").to_string();

        Some(SubscriberRecord {
            email,
            name: text(&self.name),
            phone: first_non_empty(row, &self.phone)
                .map(digits_only)
                .unwrap_or_default(),
            date_added: first_non_empty(row, &self.date_added).and_then(parse_import_date),
            stop_time: first_non_empty(row, &self.stop_time).and_then(parse_import_date),
            stop_status: first_non_empty(row, &self.stop_status)
                .and_then(parse_stop_status)
                .unwrap_or(0),
            misc: text(&self.misc),
            ad_tracking: text(&self.ad_tracking),
            ip_address: text(&self.ip_address),
            web_form_url: text(&self.web_form_url),
            country: text(&self.country),
            region: text(&self.region),
            city: text(&self.city),
            postal_code: text(&self.postal_code),
            latitude: first_non_empty(row, &self.latitude).and_then(parse_coordinate),
            longitude: first_non_empty(row, &self.longitude).and_then(parse_coordinate),
            dma_code: text(&self.dma_code),
            area_code: text(&self.area_code),
            tags: text(&self.tags),
        })
    }
}

fn first_non_empty<'r>(row: &'r StringRecord, columns: &[usize]) -> Option<&'r str> {
    columns
        .iter()
        .filter_map(|index| row.get(*index))
        .find(|value| !value.trim().is_empty())
}

pub fn digits_only(value: &str) -> String {
    value.chars().filter(char::is_ascii_digit).collect()
}

/// Integers are taken as is; decimals such as `1.0` are truncated.
fn parse_stop_status(value: &str) -> Option<i32> {
    let value = value.trim();

    value.parse::<i32>().ok().or_else(|| {
        value
            .parse::<f64>()
            .ok()
            .filter(|status| status.is_finite())
            .map(|status| status.trunc() as i32)
    })
}

fn parse_coordinate(value: &str) -> Option<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|coordinate| coordinate.is_finite())
}

/// Parses the export timestamp format `MM/DD/YY H:MMam|pm`.
///
/// Two-digit years are always read as 20YY. Anything that does not match
/// yields `None`.
pub fn parse_import_date(value: &str) -> Option<NaiveDateTime> {
    let (date, time) = value.trim().split_once(char::is_whitespace)?;

    let mut date_parts = date.split('/');
    let month = two_digits(date_parts.next()?)?;
    let day = two_digits(date_parts.next()?)?;
    let year = two_digits(date_parts.next()?)?;
    if date_parts.next().is_some() {
        return None;
    }

    let time = time.trim().to_ascii_lowercase();
    let (clock, is_pm) = if let Some(clock) = time.strip_suffix("pm") {
        (clock, true)
    } else if let Some(clock) = time.strip_suffix("am") {
        (clock, false)
    } else {
        return None;
    };

    let (hour, minute) = clock.split_once(':')?;
    if hour.is_empty() || hour.len() > 2 || !hour.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hour: u32 = hour.parse().ok()?;
    let minute = two_digits(minute)?;

    if !(1..=12).contains(&hour) {
        return None;
    }
    let hour = match (hour, is_pm) {
        (12, false) => 0,
        (12, true) => 12,
        (hour, true) => hour + 12,
        (hour, false) => hour,
    };

    NaiveDate::from_ymd_opt(2000 + year as i32, month, day)?.and_hms_opt(hour, minute, 0)
}

fn two_digits(value: &str) -> Option<u32> {
    if value.len() != 2 || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    value.parse().ok()
}
