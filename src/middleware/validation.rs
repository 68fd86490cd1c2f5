//! Declarative payload validation for HTML form bodies.
//!
//! Forms post bracketed keys (`campground[title]`, `review[rating]`), either
//! url-encoded or as `multipart/form-data` when files are attached. A
//! [`Schema`] lists the rules for one form; [`validate_payload`] checks every
//! rule and reports all violations in one comma-joined message.

use axum::extract::{FromRequest, Multipart, Request};
use axum::http::header::CONTENT_TYPE;
use axum::Form;
use std::convert::Infallible;

use crate::error::{AppError, AppResult};
use crate::types::{CampgroundInput, ReviewInput};
use crate::uploads::{extension_for, Upload};

/// A form body kept as ordered key/value pairs, so repeated keys (several
/// images) survive, plus any file parts. A body that could not be decoded is
/// kept as a rejection and reported by the validation gate, not by the
/// extractor.
#[derive(Debug, Clone, Default)]
pub struct FormPayload {
    fields: Vec<(String, String)>,
    uploads: Vec<Upload>,
    rejected: Option<String>,
}

impl FormPayload {
    pub fn new(fields: Vec<(String, String)>) -> Self {
        Self { fields, ..Default::default() }
    }

    pub fn with_uploads(mut self, uploads: Vec<Upload>) -> Self {
        self.uploads = uploads;
        self
    }

    fn rejected(reason: String) -> Self {
        Self { rejected: Some(reason), ..Default::default() }
    }

    async fn from_multipart(mut multipart: Multipart) -> Self {
        let mut fields = Vec::new();
        let mut uploads = Vec::new();
        loop {
            let field = match multipart.next_field().await {
                Ok(Some(field)) => field,
                Ok(None) => break,
                Err(e) => return Self::rejected(e.body_text()),
            };
            let name = field.name().unwrap_or_default().to_string();
            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let content_type = field.content_type().unwrap_or("application/octet-stream").to_string();
                    let bytes = match field.bytes().await {
                        Ok(bytes) => bytes,
                        Err(e) => return Self::rejected(e.body_text()),
                    };
                    // browsers send an empty part for an untouched file input
                    if file_name.is_empty() && bytes.is_empty() {
                        continue;
                    }
                    uploads.push(Upload { field: name, file_name, content_type, bytes });
                }
                None => match field.text().await {
                    Ok(value) => fields.push((name, value)),
                    Err(e) => return Self::rejected(e.body_text()),
                },
            }
        }
        Self::new(fields).with_uploads(uploads)
    }

    /// First value for `key`, trimmed.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v.trim())
    }

    /// All non-blank values for `key`, trimmed, in submission order.
    pub fn get_all(&self, key: &str) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.trim())
            .filter(|v| !v.is_empty())
            .collect()
    }

    pub fn uploads(&self) -> &[Upload] {
        &self.uploads
    }

    fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }
}

impl<S> FromRequest<S> for FormPayload
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("multipart/form-data"));
        if is_multipart {
            return Ok(match Multipart::from_request(req, state).await {
                Ok(multipart) => Self::from_multipart(multipart).await,
                Err(rejection) => Self::rejected(rejection.body_text()),
            });
        }
        Ok(match Form::<Vec<(String, String)>>::from_request(req, state).await {
            Ok(Form(fields)) => Self::new(fields),
            Err(rejection) => Self::rejected(rejection.body_text()),
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Kind {
    Text { min_len: usize, max_len: usize },
    Number { min: Option<f64>, max: Option<f64> },
    Integer { min: i64, max: i64 },
    Url { max_len: usize },
}

#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    /// Form key, e.g. `campground[title]`.
    pub key: &'static str,
    /// Name used in messages, e.g. `campground.title`.
    pub label: &'static str,
    pub required: bool,
    /// May appear more than once.
    pub repeated: bool,
    pub kind: Kind,
}

#[derive(Debug)]
pub struct Schema {
    pub name: &'static str,
    /// Keys starting with this prefix must be covered by a rule.
    pub prefix: &'static str,
    pub fields: &'static [FieldRule],
    /// Multipart field that may carry image files. `None` refuses files.
    pub files: Option<&'static str>,
}

pub static CAMPGROUND_SCHEMA: Schema = Schema {
    name: "campground",
    prefix: "campground[",
    fields: &[
        FieldRule {
            key: "campground[title]",
            label: "campground.title",
            required: true,
            repeated: false,
            kind: Kind::Text { min_len: 1, max_len: 100 },
        },
        FieldRule {
            key: "campground[price]",
            label: "campground.price",
            required: true,
            repeated: false,
            kind: Kind::Number { min: Some(0.0), max: None },
        },
        FieldRule {
            key: "campground[location]",
            label: "campground.location",
            required: true,
            repeated: false,
            kind: Kind::Text { min_len: 1, max_len: 200 },
        },
        FieldRule {
            key: "campground[description]",
            label: "campground.description",
            required: false,
            repeated: false,
            kind: Kind::Text { min_len: 0, max_len: 5000 },
        },
        FieldRule {
            key: "campground[images]",
            label: "campground.images",
            required: false,
            repeated: true,
            kind: Kind::Url { max_len: 2048 },
        },
        FieldRule {
            key: "deleteImages[]",
            label: "deleteImages",
            required: false,
            repeated: true,
            kind: Kind::Text { min_len: 1, max_len: 255 },
        },
    ],
    files: Some("image"),
};

pub static REVIEW_SCHEMA: Schema = Schema {
    name: "review",
    prefix: "review[",
    fields: &[
        FieldRule {
            key: "review[body]",
            label: "review.body",
            required: true,
            repeated: false,
            kind: Kind::Text { min_len: 1, max_len: 2000 },
        },
        FieldRule {
            key: "review[rating]",
            label: "review.rating",
            required: true,
            repeated: false,
            kind: Kind::Integer { min: 1, max: 5 },
        },
    ],
    files: None,
};

fn contains_html(value: &str) -> bool {
    value.contains('<') || value.contains('>')
}

fn check_value(rule: &FieldRule, value: &str) -> Option<String> {
    let label = rule.label;
    match rule.kind {
        Kind::Text { min_len, max_len } => {
            let len = value.chars().count();
            if len < min_len {
                Some(format!("\"{}\" is not allowed to be empty", label))
            } else if len > max_len {
                Some(format!("\"{}\" length must be less than or equal to {} characters long", label, max_len))
            } else if contains_html(value) {
                Some(format!("\"{}\" must not include HTML!", label))
            } else {
                None
            }
        }
        Kind::Number { min, max } => match value.parse::<f64>() {
            Ok(n) if !n.is_finite() => Some(format!("\"{}\" must be a number", label)),
            Ok(n) if min.is_some_and(|m| n < m) => {
                Some(format!("\"{}\" must be greater than or equal to {}", label, min.unwrap_or_default()))
            }
            Ok(n) if max.is_some_and(|m| n > m) => {
                Some(format!("\"{}\" must be less than or equal to {}", label, max.unwrap_or_default()))
            }
            Ok(_) => None,
            Err(_) => Some(format!("\"{}\" must be a number", label)),
        },
        Kind::Integer { min, max } => match value.parse::<i64>() {
            Ok(n) if n < min => Some(format!("\"{}\" must be greater than or equal to {}", label, min)),
            Ok(n) if n > max => Some(format!("\"{}\" must be less than or equal to {}", label, max)),
            Ok(_) => None,
            Err(_) => Some(format!("\"{}\" must be an integer", label)),
        },
        Kind::Url { max_len } => {
            if value.len() > max_len {
                Some(format!("\"{}\" length must be less than or equal to {} characters long", label, max_len))
            } else if !(value.starts_with("https://") || value.starts_with("http://")) || contains_html(value)
            {
                Some(format!("\"{}\" must be a valid uri", label))
            } else {
                None
            }
        }
    }
}

/// Collects every violation of `schema` in `payload`. Empty means valid.
pub fn violations(schema: &Schema, payload: &FormPayload) -> Vec<String> {
    if let Some(rejected) = &payload.rejected {
        return vec![format!("\"{}\" could not be read: {}", schema.name, rejected)];
    }
    let mut errors = Vec::new();

    for upload in &payload.uploads {
        match schema.files {
            Some(field) if field == upload.field => {
                if upload.bytes.is_empty() {
                    errors.push(format!("\"{}\" must not be an empty file", field));
                } else if extension_for(&upload.content_type).is_none() {
                    errors.push(format!("\"{}\" must be a JPEG, PNG, GIF or WebP image", field));
                }
            }
            _ => errors.push(format!("\"{}\" is not allowed", upload.field)),
        }
    }

    if !payload.keys().any(|k| k.starts_with(schema.prefix)) {
        errors.push(format!("\"{}\" is required", schema.name));
        return errors;
    }

    for rule in schema.fields {
        let values: Vec<&str> = payload.fields.iter().filter(|(k, _)| k == rule.key).map(|(_, v)| v.trim()).collect();
        if values.len() > 1 && !rule.repeated {
            errors.push(format!("\"{}\" must be a single value", rule.label));
            continue;
        }
        let present: Vec<&str> = values.into_iter().filter(|v| !v.is_empty()).collect();
        if present.is_empty() {
            if rule.required {
                errors.push(format!("\"{}\" is required", rule.label));
            }
            continue;
        }
        errors.extend(present.iter().filter_map(|v| check_value(rule, v)));
    }

    let mut unknown: Vec<&str> = payload
        .keys()
        .filter(|k| k.starts_with(schema.prefix) && !schema.fields.iter().any(|r| r.key == *k))
        .collect();
    unknown.dedup();
    for key in unknown {
        errors.push(format!("\"{}\" is not allowed", key));
    }

    errors
}

/// Fails with `BadRequest` carrying every violation, joined with ", ".
pub fn validate_payload(schema: &Schema, payload: &FormPayload) -> AppResult<()> {
    let errors = violations(schema, payload);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::BadRequest(errors.join(", ")))
    }
}

fn required<'a>(payload: &'a FormPayload, key: &str) -> AppResult<&'a str> {
    payload.get(key).filter(|v| !v.is_empty()).ok_or_else(|| AppError::BadRequest(format!("\"{}\" is required", key)))
}

impl CampgroundInput {
    /// Reads a payload that already passed [`CAMPGROUND_SCHEMA`].
    pub fn from_payload(payload: &FormPayload) -> AppResult<Self> {
        let price = required(payload, "campground[price]")?
            .parse::<f64>()
            .map_err(|_| AppError::BadRequest("\"campground.price\" must be a number".to_string()))?;
        Ok(Self {
            title: required(payload, "campground[title]")?.to_string(),
            description: payload.get("campground[description]").unwrap_or_default().to_string(),
            price,
            location: required(payload, "campground[location]")?.to_string(),
            images: payload.get_all("campground[images]").into_iter().map(str::to_string).collect(),
            uploaded: Vec::new(),
            delete_images: payload.get_all("deleteImages[]").into_iter().map(str::to_string).collect(),
        })
    }
}

impl ReviewInput {
    /// Reads a payload that already passed [`REVIEW_SCHEMA`].
    pub fn from_payload(payload: &FormPayload) -> AppResult<Self> {
        let rating = required(payload, "review[rating]")?
            .parse::<i64>()
            .map_err(|_| AppError::BadRequest("\"review.rating\" must be an integer".to_string()))?;
        Ok(Self { body: required(payload, "review[body]")?.to_string(), rating })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(pairs: &[(&str, &str)]) -> FormPayload {
        FormPayload::new(pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect())
    }

    fn lakeview<'a>() -> Vec<(&'a str, &'a str)> {
        vec![
            ("campground[title]", "Lakeview"),
            ("campground[price]", "25"),
            ("campground[location]", "Lake Tahoe, CA"),
        ]
    }

    #[test]
    fn test_valid_campground_without_description() {
        let p = payload(&lakeview());
        assert!(validate_payload(&CAMPGROUND_SCHEMA, &p).is_ok());
        let input = CampgroundInput::from_payload(&p).unwrap();
        assert_eq!(input.title, "Lakeview");
        assert_eq!(input.price, 25.0);
        assert_eq!(input.description, "");
        assert!(input.images.is_empty());
    }

    #[test]
    fn test_missing_fields_are_aggregated() {
        let p = payload(&[("campground[title]", "Lakeview")]);
        match validate_payload(&CAMPGROUND_SCHEMA, &p) {
            Err(AppError::BadRequest(msg)) => {
                assert_eq!(msg, "\"campground.price\" is required, \"campground.location\" is required");
            }
            other => panic!("expected BadRequest, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_object_is_reported_once() {
        let p = payload(&[("_method", "PUT")]);
        assert_eq!(violations(&CAMPGROUND_SCHEMA, &p), vec!["\"campground\" is required".to_string()]);
    }

    #[test]
    fn test_price_rules() {
        let mut pairs = lakeview();
        pairs[1] = ("campground[price]", "-1");
        let errs = violations(&CAMPGROUND_SCHEMA, &payload(&pairs));
        assert_eq!(errs, vec!["\"campground.price\" must be greater than or equal to 0".to_string()]);

        pairs[1] = ("campground[price]", "cheap");
        let errs = violations(&CAMPGROUND_SCHEMA, &payload(&pairs));
        assert_eq!(errs, vec!["\"campground.price\" must be a number".to_string()]);

        pairs[1] = ("campground[price]", "NaN");
        assert_eq!(violations(&CAMPGROUND_SCHEMA, &payload(&pairs)).len(), 1);
    }

    #[test]
    fn test_text_length_and_html() {
        let long_title = "x".repeat(101);
        let mut pairs = lakeview();
        pairs[0] = ("campground[title]", &long_title);
        let errs = violations(&CAMPGROUND_SCHEMA, &payload(&pairs));
        assert!(errs[0].contains("less than or equal to 100 characters"));

        pairs[0] = ("campground[title]", "<script>alert(1)</script>");
        let errs = violations(&CAMPGROUND_SCHEMA, &payload(&pairs));
        assert_eq!(errs, vec!["\"campground.title\" must not include HTML!".to_string()]);
    }

    #[test]
    fn test_unknown_campground_key_rejected() {
        let mut pairs = lakeview();
        pairs.push(("campground[author]", "someone-else"));
        let errs = violations(&CAMPGROUND_SCHEMA, &payload(&pairs));
        assert_eq!(errs, vec!["\"campground[author]\" is not allowed".to_string()]);
    }

    #[test]
    fn test_repeated_images_keep_order() {
        let mut pairs = lakeview();
        pairs.push(("campground[images]", "https://img.example.com/a.jpg"));
        pairs.push(("campground[images]", ""));
        pairs.push(("campground[images]", "https://img.example.com/b.jpg"));
        let p = payload(&pairs);
        assert!(validate_payload(&CAMPGROUND_SCHEMA, &p).is_ok());
        let input = CampgroundInput::from_payload(&p).unwrap();
        assert_eq!(input.images, vec!["https://img.example.com/a.jpg", "https://img.example.com/b.jpg"]);

        let mut bad = lakeview();
        bad.push(("campground[images]", "javascript:alert(1)"));
        assert_eq!(
            violations(&CAMPGROUND_SCHEMA, &payload(&bad)),
            vec!["\"campground.images\" must be a valid uri".to_string()]
        );
    }

    #[test]
    fn test_duplicate_single_field_rejected() {
        let mut pairs = lakeview();
        pairs.push(("campground[title]", "Other"));
        let errs = violations(&CAMPGROUND_SCHEMA, &payload(&pairs));
        assert_eq!(errs, vec!["\"campground.title\" must be a single value".to_string()]);
    }

    #[test]
    fn test_review_rating_bounds() {
        let ok = payload(&[("review[body]", "Great spot"), ("review[rating]", "5")]);
        assert!(validate_payload(&REVIEW_SCHEMA, &ok).is_ok());
        assert_eq!(ReviewInput::from_payload(&ok).unwrap(), ReviewInput { body: "Great spot".into(), rating: 5 });

        let too_high = payload(&[("review[body]", "Great spot"), ("review[rating]", "6")]);
        assert_eq!(
            violations(&REVIEW_SCHEMA, &too_high),
            vec!["\"review.rating\" must be less than or equal to 5".to_string()]
        );

        let fractional = payload(&[("review[body]", "Great spot"), ("review[rating]", "4.5")]);
        assert_eq!(violations(&REVIEW_SCHEMA, &fractional), vec!["\"review.rating\" must be an integer".to_string()]);

        let empty_body = payload(&[("review[body]", "   "), ("review[rating]", "3")]);
        assert_eq!(violations(&REVIEW_SCHEMA, &empty_body), vec!["\"review.body\" is required".to_string()]);
    }

    #[test]
    fn test_rejected_body_is_bad_request() {
        let p = FormPayload::rejected("Form requests must have `Content-Type: application/x-www-form-urlencoded`".into());
        assert!(matches!(validate_payload(&REVIEW_SCHEMA, &p), Err(AppError::BadRequest(_))));
    }

    fn upload(field: &str, content_type: &str, bytes: &'static [u8]) -> Upload {
        Upload {
            field: field.into(),
            file_name: "tent.png".into(),
            content_type: content_type.into(),
            bytes: axum::body::Bytes::from_static(bytes),
        }
    }

    #[test]
    fn test_uploads_checked_against_schema() {
        let ok = payload(&lakeview()).with_uploads(vec![upload("image", "image/png", b"png")]);
        assert!(validate_payload(&CAMPGROUND_SCHEMA, &ok).is_ok());

        let wrong_type = payload(&lakeview()).with_uploads(vec![upload("image", "text/html", b"<p>")]);
        assert_eq!(
            violations(&CAMPGROUND_SCHEMA, &wrong_type),
            vec!["\"image\" must be a JPEG, PNG, GIF or WebP image".to_string()]
        );

        let empty = payload(&lakeview()).with_uploads(vec![upload("image", "image/png", b"")]);
        assert_eq!(violations(&CAMPGROUND_SCHEMA, &empty), vec!["\"image\" must not be an empty file".to_string()]);

        let review = payload(&[("review[body]", "Nice"), ("review[rating]", "4")])
            .with_uploads(vec![upload("image", "image/png", b"png")]);
        assert_eq!(violations(&REVIEW_SCHEMA, &review), vec!["\"image\" is not allowed".to_string()]);
    }
}
