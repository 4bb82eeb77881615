use crate::{errors::ApiError, storage::UploadedArtifact};
use axum::{
    extract::{multipart::MultipartError, Multipart},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use std::str::FromStr;
use utoipa::ToSchema;

/// Standard success response
pub fn success_response<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(data)).into_response()
}

/// Standard created response
pub fn created_response<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, Json(data)).into_response()
}

/// Acknowledgement body for operations without a payload
#[derive(Debug, Serialize, ToSchema)]
pub struct Ack {
    pub success: bool,
    pub message: String,
}

pub fn ack_response(message: impl Into<String>) -> Response {
    success_response(Ack {
        success: true,
        message: message.into(),
    })
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(err.body_text())
    } else {
        ApiError::BadRequest(err.body_text())
    }
}

/// A fully buffered multipart form: text fields by name and file parts by name.
///
/// Field lookups take a list of accepted names so that both `snake_case` and
/// the camelCase names sent by browser forms resolve to the same value.
#[derive(Debug, Default)]
pub struct MultipartForm {
    fields: HashMap<String, Vec<String>>,
    files: HashMap<String, UploadedArtifact>,
}

impl MultipartForm {
    pub async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            match field.file_name().map(str::to_string) {
                Some(filename) => {
                    let content_type = field.content_type().map(str::to_string);
                    let bytes = field.bytes().await.map_err(multipart_error)?;
                    form.files.insert(
                        name,
                        UploadedArtifact {
                            filename,
                            content_type,
                            bytes: bytes.to_vec(),
                        },
                    );
                }
                None => {
                    let value = field.text().await.map_err(multipart_error)?;
                    form.fields.entry(name).or_default().push(value);
                }
            }
        }
        Ok(form)
    }

    #[cfg(test)]
    pub(crate) fn with_field(mut self, name: &str, value: &str) -> Self {
        self.fields
            .entry(name.to_string())
            .or_default()
            .push(value.to_string());
        self
    }

    /// First non-blank value among the accepted names, trimmed.
    pub fn text(&self, names: &[&str]) -> Option<String> {
        names
            .iter()
            .filter_map(|name| self.fields.get(*name))
            .flatten()
            .map(|value| value.trim())
            .find(|value| !value.is_empty())
            .map(str::to_string)
    }

    pub fn required_text(&self, names: &[&str]) -> Result<String, ApiError> {
        self.text(names)
            .ok_or_else(|| ApiError::ValidationError(format!("{} is required", names[0])))
    }

    pub fn decimal(&self, names: &[&str]) -> Result<Option<Decimal>, ApiError> {
        self.text(names)
            .map(|raw| {
                Decimal::from_str(&raw).map_err(|_| {
                    ApiError::ValidationError(format!("{} must be a number", names[0]))
                })
            })
            .transpose()
    }

    pub fn required_decimal(&self, names: &[&str]) -> Result<Decimal, ApiError> {
        self.decimal(names)?
            .ok_or_else(|| ApiError::ValidationError(format!("{} is required", names[0])))
    }

    pub fn integer(&self, names: &[&str]) -> Result<Option<i32>, ApiError> {
        self.text(names)
            .map(|raw| {
                raw.parse::<i32>().map_err(|_| {
                    ApiError::ValidationError(format!("{} must be a whole number", names[0]))
                })
            })
            .transpose()
    }

    pub fn date(&self, names: &[&str]) -> Result<Option<NaiveDate>, ApiError> {
        self.text(names)
            .map(|raw| {
                NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|_| {
                    ApiError::ValidationError(format!("{} must be a YYYY-MM-DD date", names[0]))
                })
            })
            .transpose()
    }

    /// Tags sent as repeated fields, a JSON array string, or a comma list.
    pub fn tags(&self, names: &[&str]) -> Result<Vec<String>, ApiError> {
        let mut tags = Vec::new();
        for value in names.iter().filter_map(|name| self.fields.get(*name)).flatten() {
            let value = value.trim();
            if value.starts_with('[') {
                let parsed: Vec<String> = serde_json::from_str(value).map_err(|_| {
                    ApiError::ValidationError(format!("{} must be a list of strings", names[0]))
                })?;
                tags.extend(parsed);
            } else {
                tags.extend(value.split(',').map(|tag| tag.trim().to_string()));
            }
        }
        Ok(tags)
    }

    /// Removes and returns a file part; empty file inputs count as absent.
    pub fn take_file(&mut self, names: &[&str]) -> Option<UploadedArtifact> {
        names
            .iter()
            .filter_map(|name| self.files.remove(*name))
            .find(|upload| !upload.bytes.is_empty())
    }
}

/// Parses a path identifier, keeping malformed ids apart from absent ones.
pub fn path_id(raw: &str) -> Result<uuid::Uuid, ApiError> {
    crate::identifiers::parse(raw).map_err(ApiError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    #[test]
    fn text_lookup_accepts_aliases_and_skips_blanks() {
        let form = MultipartForm::default()
            .with_field("farm_name", "   ")
            .with_field("farmName", " Green Acres ");
        assert_eq!(
            form.text(&["farm_name", "farmName"]).as_deref(),
            Some("Green Acres")
        );
        assert_eq!(form.text(&["missing"]), None);
    }

    #[test]
    fn non_numeric_price_is_a_validation_error() {
        let form = MultipartForm::default().with_field("price", "cheap");
        assert_matches!(form.decimal(&["price"]), Err(ApiError::ValidationError(_)));

        let form = MultipartForm::default().with_field("price", "42.50");
        assert_eq!(form.decimal(&["price"]).unwrap(), Some(dec!(42.50)));
    }

    #[test]
    fn tags_accept_json_arrays_comma_lists_and_repeats() {
        let form = MultipartForm::default()
            .with_field("preferences", r#"["organic","fresh"]"#)
            .with_field("preferences", "local, seasonal");
        assert_eq!(
            form.tags(&["preferences"]).unwrap(),
            vec!["organic", "fresh", "local", "seasonal"]
        );

        let form = MultipartForm::default().with_field("preferences", "[not json");
        assert_matches!(form.tags(&["preferences"]), Err(ApiError::ValidationError(_)));
    }

    #[test]
    fn harvest_date_must_be_iso() {
        let form = MultipartForm::default().with_field("harvest_date", "2024-03-01");
        assert_eq!(
            form.date(&["harvest_date"]).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 1)
        );
        let form = MultipartForm::default().with_field("harvest_date", "01/03/2024");
        assert_matches!(form.date(&["harvest_date"]), Err(ApiError::ValidationError(_)));
    }

    #[test]
    fn malformed_path_id_is_a_bad_request() {
        let err = path_id("not-an-id").unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
