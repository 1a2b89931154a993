use chrono::NaiveDateTime;
use sqlx::{postgres::PgRow, Row};

/// A stored subscriber as returned by the listing endpoint.
#[derive(Debug, serde::Serialize)]
pub struct Subscriber {
    pub id: i64,
    pub email: String,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub date_added: Option<NaiveDateTime>,
    pub stop_time: Option<NaiveDateTime>,
    pub stop_status: i32,
    pub misc: Option<String>,
    pub ad_tracking: Option<String>,
    pub ip_address: Option<String>,
    pub web_form_url: Option<String>,
    pub country: Option<String>,
    pub region: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub dma_code: Option<String>,
    pub area_code: Option<String>,
    pub tags: Option<String>,
}

impl Subscriber {
    pub fn from_row(row: PgRow) -> Subscriber {
        Subscriber {
            id: row.get("id"),
            email: row.get("email"),
            name: row.get("name"),
            phone: row.get("phone"),
            date_added: row.get("date_added"),
            stop_time: row.get("stop_time"),
            stop_status: row.get("stop_status"),
            misc: row.get("misc"),
            ad_tracking: row.get("ad_tracking"),
            ip_address: row.get("ip_address"),
            web_form_url: row.get("web_form_url"),
            country: row.get("country"),
            region: row.get("region"),
            city: row.get("city"),
            postal_code: row.get("postal_code"),
            latitude: row.get("latitude"),
            longitude: row.get("longitude"),
            dma_code: row.get("dma_code"),
            area_code: row.get("area_code"),
            tags: row.get("tags"),
        }
    }
}
