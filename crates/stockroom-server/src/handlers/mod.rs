//! HTTP handlers, one module per resource.

pub mod auth;
pub mod directory;
pub mod dispatch_guides;
pub mod external_acts;
pub mod product_models;
pub mod products;
pub mod users;

use std::collections::HashMap;

use axum::extract::Multipart;
use chrono::{DateTime, NaiveDate, Utc};
use stockroom_core::StockroomError;

use crate::error::ApiResult;

/// The file part of a multipart upload.
pub(crate) struct FilePart {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Drain a multipart request into text fields plus the expected file
/// part. Unknown file fields are ignored.
pub(crate) async fn collect_multipart(
    mut multipart: Multipart,
    file_field: &str,
) -> ApiResult<(HashMap<String, String>, Option<FilePart>)> {
    let mut fields = HashMap::new();
    let mut file = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| StockroomError::validation(format!("malformed multipart body: {e}")))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if name == file_field {
            let file_name = field
                .file_name()
                .map(str::to_string)
                .unwrap_or_else(|| "upload".to_string());
            let content_type = field.content_type().map(str::to_string);
            let bytes = field
                .bytes()
                .await
                .map_err(|e| StockroomError::validation(format!("upload read failed: {e}")))?;
            file = Some(FilePart {
                file_name,
                content_type,
                bytes: bytes.to_vec(),
            });
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| StockroomError::validation(format!("malformed field {name}: {e}")))?;
            fields.insert(name, value);
        }
    }

    Ok((fields, file))
}

/// Parse a form date value: RFC 3339 first, then a bare `YYYY-MM-DD`
/// (interpreted as midnight UTC).
pub(crate) fn parse_date_value(raw: &str, what: &str) -> ApiResult<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        if let Some(dt) = date.and_hms_opt(0, 0, 0) {
            return Ok(dt.and_utc());
        }
    }
    Err(StockroomError::validation(format!("invalid {what}")).into())
}
