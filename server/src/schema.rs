//! Boundary validation for task payloads and pagination queries.
//!
//! Bodies are checked for unrecognized keys, decoded into request DTOs and
//! run through their `validator` rules, then converted into the typed records
//! in [`crate::task`]. Every offending field is reported; a payload is either
//! fully accepted or fully rejected.

use std::borrow::Cow;

use chrono::{DateTime, Months, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use validator::{Validate, ValidateArgs, ValidationError, ValidationErrors};

use crate::task::{NewTask, TaskChanges, TaskStatus};

const TASK_FIELDS: [&str; 4] = ["title", "description", "status", "deadline"];
const PAGE_FIELDS: [&str; 2] = ["page", "limit"];

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 10;

/// One validation failure, addressed by the path of the offending field.
/// Errors about the payload as a whole carry an empty path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub path: Vec<String>,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            path: vec![field.to_string()],
            message: message.into(),
        }
    }

    pub fn root(message: impl Into<String>) -> Self {
        Self {
            path: Vec::new(),
            message: message.into(),
        }
    }

    fn from_validation(field: &str, error: &ValidationError) -> Self {
        let message = match &error.message {
            Some(message) => message.to_string(),
            None => error.code.to_string(),
        };
        Self::new(field, message)
    }
}

pub type Validated<T> = Result<T, Vec<FieldError>>;

/// The instant deadlines are judged against.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    pub now: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
#[validate(context = Clock)]
pub struct CreateTaskRequest {
    #[validate(
        required(message = "Required"),
        length(min = 1, message = "Title is required")
    )]
    pub title: Option<String>,
    pub description: Option<String>,
    #[validate(custom(function = "known_status"))]
    pub status: Option<String>,
    #[validate(
        required(message = "Required"),
        custom(function = "deadline_window", use_context)
    )]
    pub deadline: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[validate(context = Clock)]
pub struct UpdateTaskRequest {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: Option<String>,
    pub description: Option<String>,
    #[validate(custom(function = "known_status"))]
    pub status: Option<String>,
    #[validate(custom(function = "deadline_window", use_context))]
    pub deadline: Option<String>,
}

impl CreateTaskRequest {
    fn into_new_task(self) -> Validated<NewTask> {
        let title = self.title.ok_or_else(|| vec![FieldError::new("title", "Required")])?;
        let raw_deadline = self
            .deadline
            .ok_or_else(|| vec![FieldError::new("deadline", "Required")])?;
        Ok(NewTask {
            title,
            description: self.description,
            status: self
                .status
                .as_deref()
                .map(|raw| field("status", parse_status(raw)))
                .transpose()?
                .unwrap_or_default(),
            deadline: field("deadline", parse_deadline(&raw_deadline))?,
        })
    }
}

impl UpdateTaskRequest {
    fn into_changes(self) -> Validated<TaskChanges> {
        Ok(TaskChanges {
            title: self.title,
            description: self.description,
            status: self
                .status
                .as_deref()
                .map(|raw| field("status", parse_status(raw)))
                .transpose()?,
            deadline: self
                .deadline
                .as_deref()
                .map(|raw| field("deadline", parse_deadline(raw)))
                .transpose()?,
        })
    }
}

pub fn validate_create(body: &Value, now: DateTime<Utc>) -> Validated<NewTask> {
    let fields = as_object(body)?;
    let mut errors = unknown_keys(fields);

    let request: CreateTaskRequest = decode(body, &mut errors)?;
    if let Err(invalid) = request.validate_with_args(&Clock { now }) {
        errors.extend(field_errors(&invalid, &TASK_FIELDS));
    }
    if !errors.is_empty() {
        return Err(errors);
    }
    request.into_new_task()
}

pub fn validate_update(body: &Value, now: DateTime<Utc>) -> Validated<TaskChanges> {
    let fields = as_object(body)?;
    let mut errors = unknown_keys(fields);

    let request: UpdateTaskRequest = decode(body, &mut errors)?;
    if let Err(invalid) = request.validate_with_args(&Clock { now }) {
        errors.extend(field_errors(&invalid, &TASK_FIELDS));
    }
    if !errors.is_empty() {
        return Err(errors);
    }

    let changes = request.into_changes()?;
    if changes.is_empty() {
        return Err(vec![FieldError::root("At least one field must be provided")]);
    }
    Ok(changes)
}

/// Validated page selection for the listing endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl Pagination {
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }

    pub fn total_pages(&self, total_items: u64) -> u64 {
        total_items.div_ceil(u64::from(self.limit))
    }

    /// True when the requested page lies beyond the last page of a
    /// non-empty result set.
    pub fn is_out_of_range(&self, total_pages: u64) -> bool {
        total_pages > 0 && u64::from(self.page) > total_pages
    }
}

/// Page selection after string coercion, before range checks.
#[derive(Debug, Validate)]
struct PageParams {
    #[validate(range(min = 1, message = "Number must be greater than 0"))]
    page: i64,
    #[validate(range(min = 1, max = 100, message = "Number must be between 1 and 100"))]
    limit: i64,
}

/// Coerce and validate raw `page` / `limit` query values. Absent values take
/// their defaults; present but blank values are rejected.
pub fn validate_pagination(page: Option<&str>, limit: Option<&str>) -> Validated<Pagination> {
    let mut errors = Vec::new();
    let defaults = Pagination::default();

    let page = match page {
        Some(raw) => check(&mut errors, integer("page", raw)),
        None => Some(i64::from(defaults.page)),
    };
    let limit = match limit {
        Some(raw) => check(&mut errors, integer("limit", raw)),
        None => Some(i64::from(defaults.limit)),
    };
    let (Some(page), Some(limit)) = (page, limit) else {
        return Err(errors);
    };

    let params = PageParams { page, limit };
    params
        .validate()
        .map_err(|invalid| field_errors(&invalid, &PAGE_FIELDS))?;

    // `limit` is within 1..=100 here.
    let page = u32::try_from(params.page).map_err(|_| vec![FieldError::new("page", "Number is too large")])?;
    Ok(Pagination {
        page,
        limit: params.limit as u32,
    })
}

fn check<T>(errors: &mut Vec<FieldError>, result: Result<T, FieldError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(error) => {
            errors.push(error);
            None
        }
    }
}

fn field<T>(name: &str, result: Result<T, ValidationError>) -> Validated<T> {
    result.map_err(|error| vec![FieldError::from_validation(name, &error)])
}

/// Flatten `validator` output into field errors, ordered as `order` lists the
/// fields.
fn field_errors(invalid: &ValidationErrors, order: &[&str]) -> Vec<FieldError> {
    let mut by_field: Vec<(usize, FieldError)> = Vec::new();
    for (name, errors) in invalid.field_errors() {
        let name: &str = name.as_ref();
        let rank = order.iter().position(|f| *f == name).unwrap_or(order.len());
        by_field.extend(errors.iter().map(|e| (rank, FieldError::from_validation(name, e))));
    }
    by_field.sort_by_key(|(rank, _)| *rank);
    by_field.into_iter().map(|(_, error)| error).collect()
}

fn decode<T: DeserializeOwned>(body: &Value, errors: &mut Vec<FieldError>) -> Validated<T> {
    serde_json::from_value(body.clone()).map_err(|err| {
        let mut all = std::mem::take(errors);
        all.push(FieldError::root(err.to_string()));
        all
    })
}

fn as_object(body: &Value) -> Result<&Map<String, Value>, Vec<FieldError>> {
    body.as_object().ok_or_else(|| {
        vec![FieldError::root(format!(
            "Expected object, received {}",
            type_name(body)
        ))]
    })
}

fn unknown_keys(fields: &Map<String, Value>) -> Vec<FieldError> {
    fields
        .keys()
        .filter(|key| !TASK_FIELDS.contains(&key.as_str()))
        .map(|key| FieldError::root(format!("Unrecognized key: '{key}'")))
        .collect()
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn invalid(code: &'static str, message: impl Into<Cow<'static, str>>) -> ValidationError {
    ValidationError::new(code).with_message(message.into())
}

fn parse_status(raw: &str) -> Result<TaskStatus, ValidationError> {
    TaskStatus::parse(raw).ok_or_else(|| {
        invalid(
            "invalid_enum_value",
            format!("Invalid enum value. Expected 'Todo' | 'In_Progress' | 'Done', received '{raw}'"),
        )
    })
}

fn known_status(raw: &str) -> Result<(), ValidationError> {
    parse_status(raw).map(|_| ())
}

fn parse_deadline(raw: &str) -> Result<DateTime<Utc>, ValidationError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|deadline| deadline.with_timezone(&Utc))
        .map_err(|_| invalid("invalid_datetime", "Invalid datetime"))
}

fn deadline_window(raw: &str, clock: &Clock) -> Result<(), ValidationError> {
    let deadline = parse_deadline(raw)?;
    if deadline <= clock.now {
        return Err(invalid("too_small", "Deadline must be in the future"));
    }
    match clock.now.checked_add_months(Months::new(12)) {
        Some(horizon) if deadline > horizon => {
            Err(invalid("too_big", "Deadline cannot be more than 1 year ahead"))
        }
        _ => Ok(()),
    }
}

/// Query values arrive as strings. Integral values written in float notation
/// (`"1e2"`, `"3.0"`) are accepted.
fn integer(field: &str, raw: &str) -> Result<i64, FieldError> {
    let trimmed = raw.trim();
    if let Ok(n) = trimmed.parse::<i64>() {
        return Ok(n);
    }
    match trimmed.parse::<f64>() {
        Ok(n) if !n.is_finite() => Err(FieldError::new(field, "Expected number, received nan")),
        Ok(n) if n.fract() != 0.0 => Err(FieldError::new(field, "Expected integer, received float")),
        Ok(n) if n.abs() < i64::MAX as f64 => Ok(n as i64),
        Ok(_) => Err(FieldError::new(field, "Number is too large")),
        Err(_) => Err(FieldError::new(field, "Expected number, received nan")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 15, 9, 30, 0).unwrap()
    }

    fn messages(errors: &[FieldError]) -> Vec<&str> {
        errors.iter().map(|e| e.message.as_str()).collect()
    }

    #[test]
    fn create_accepts_minimal_payload_and_defaults_status() {
        let task = validate_create(
            &json!({"title": "Pay rent", "deadline": "2026-04-01T00:00:00Z"}),
            now(),
        )
        .unwrap();
        assert_eq!(task.title, "Pay rent");
        assert_eq!(task.description, None);
        assert_eq!(task.status, TaskStatus::Todo);
        assert_eq!(task.deadline, Utc.with_ymd_and_hms(2026, 4, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn create_accepts_offset_deadline_and_normalizes_to_utc() {
        let task = validate_create(
            &json!({
                "title": "Call plumber",
                "description": "kitchen sink",
                "status": "In_Progress",
                "deadline": "2026-05-01T10:00:00+02:00"
            }),
            now(),
        )
        .unwrap();
        assert_eq!(task.status, TaskStatus::InProgress);
        assert_eq!(task.description.as_deref(), Some("kitchen sink"));
        assert_eq!(task.deadline, Utc.with_ymd_and_hms(2026, 5, 1, 8, 0, 0).unwrap());
    }

    #[test]
    fn create_reports_every_bad_field() {
        let errors = validate_create(
            &json!({"title": "", "status": "Blocked", "deadline": "tomorrow", "owner": "me"}),
            now(),
        )
        .unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&FieldError::root("Unrecognized key: 'owner'")));
        assert!(errors.contains(&FieldError::new("title", "Title is required")));
        assert!(errors.contains(&FieldError::new("deadline", "Invalid datetime")));
        assert!(errors.iter().any(|e| e.path == ["status"]));
    }

    #[test]
    fn create_requires_title_and_deadline() {
        let errors = validate_create(&json!({}), now()).unwrap_err();
        assert_eq!(
            errors,
            vec![
                FieldError::new("title", "Required"),
                FieldError::new("deadline", "Required"),
            ]
        );
    }

    #[test]
    fn create_rejects_non_object_body() {
        let errors = validate_create(&json!(["title"]), now()).unwrap_err();
        assert_eq!(messages(&errors), ["Expected object, received array"]);
    }

    #[test]
    fn create_rejects_wrong_types() {
        let errors = validate_create(&json!({"title": 7, "deadline": "2026-04-01T00:00:00Z"}), now())
            .unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].path.is_empty());
        assert!(errors[0].message.contains("invalid type"), "{}", errors[0].message);
    }

    #[test]
    fn wrong_types_are_reported_alongside_unknown_keys() {
        let errors = validate_create(&json!({"deadline": 1_700_000_000, "owner": "me"}), now())
            .unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0], FieldError::root("Unrecognized key: 'owner'"));
        assert!(errors[1].message.contains("invalid type"));
    }

    #[test]
    fn null_description_counts_as_absent() {
        let task = validate_create(
            &json!({"title": "x", "description": null, "deadline": "2026-04-01T00:00:00Z"}),
            now(),
        )
        .unwrap();
        assert_eq!(task.description, None);

        let errors = validate_update(&json!({"description": null}), now()).unwrap_err();
        assert_eq!(messages(&errors), ["At least one field must be provided"]);
    }

    #[test]
    fn invalid_status_names_the_allowed_values() {
        let errors = validate_update(&json!({"status": "Blocked"}), now()).unwrap_err();
        assert_eq!(
            errors,
            vec![FieldError::new(
                "status",
                "Invalid enum value. Expected 'Todo' | 'In_Progress' | 'Done', received 'Blocked'"
            )]
        );
    }

    #[test]
    fn deadline_must_be_strictly_future() {
        let at_now = now().to_rfc3339();
        let past = (now() - Duration::minutes(1)).to_rfc3339();
        for raw in [at_now, past] {
            let errors =
                validate_create(&json!({"title": "x", "deadline": raw}), now()).unwrap_err();
            assert_eq!(messages(&errors), ["Deadline must be in the future"]);
        }
    }

    #[test]
    fn deadline_is_capped_at_one_year() {
        let edge = Utc.with_ymd_and_hms(2027, 3, 15, 9, 30, 0).unwrap();
        assert!(validate_create(&json!({"title": "x", "deadline": edge.to_rfc3339()}), now()).is_ok());

        let beyond = (edge + Duration::seconds(1)).to_rfc3339();
        let errors = validate_create(&json!({"title": "x", "deadline": beyond}), now()).unwrap_err();
        assert_eq!(messages(&errors), ["Deadline cannot be more than 1 year ahead"]);
    }

    #[test]
    fn update_accepts_single_field() {
        let changes = validate_update(&json!({"status": "Done"}), now()).unwrap();
        assert_eq!(
            changes,
            TaskChanges {
                status: Some(TaskStatus::Done),
                ..Default::default()
            }
        );
    }

    #[test]
    fn update_rejects_empty_object() {
        let errors = validate_update(&json!({}), now()).unwrap_err();
        assert_eq!(messages(&errors), ["At least one field must be provided"]);
    }

    #[test]
    fn update_is_strict_and_validates_values() {
        let errors = validate_update(
            &json!({"id": "abc", "deadline": "2020-01-01T00:00:00Z"}),
            now(),
        )
        .unwrap_err();
        assert_eq!(
            messages(&errors),
            ["Unrecognized key: 'id'", "Deadline must be in the future"]
        );
    }

    #[test]
    fn pagination_defaults() {
        assert_eq!(validate_pagination(None, None).unwrap(), Pagination { page: 1, limit: 10 });
    }

    #[test]
    fn pagination_coerces_strings() {
        let p = validate_pagination(Some("3"), Some(" 25 ")).unwrap();
        assert_eq!(p, Pagination { page: 3, limit: 25 });
        assert_eq!(p.offset(), 50);
    }

    #[test]
    fn pagination_rejects_out_of_range_and_garbage() {
        let errors = validate_pagination(Some("0"), Some("101")).unwrap_err();
        assert_eq!(
            messages(&errors),
            [
                "Number must be greater than 0",
                "Number must be between 1 and 100",
            ]
        );

        let errors = validate_pagination(Some("1.5"), Some("ten")).unwrap_err();
        assert_eq!(
            messages(&errors),
            ["Expected integer, received float", "Expected number, received nan"]
        );

        let errors = validate_pagination(Some(""), None).unwrap_err();
        assert_eq!(errors[0].path, ["page"]);
    }

    #[test]
    fn pagination_accepts_integral_float_notation() {
        let p = validate_pagination(Some("1e2"), Some("2.0")).unwrap();
        assert_eq!(p, Pagination { page: 100, limit: 2 });

        let errors = validate_pagination(Some("1e30"), Some("1e3")).unwrap_err();
        assert_eq!(
            errors,
            vec![
                FieldError::new("page", "Number is too large"),
                FieldError::new("limit", "Number is too large"),
            ]
        );
    }

    #[test]
    fn pagination_rejects_page_beyond_u32() {
        let errors = validate_pagination(Some("4294967296"), None).unwrap_err();
        assert_eq!(errors, vec![FieldError::new("page", "Number is too large")]);
    }

    #[test]
    fn total_pages_and_range() {
        let p = Pagination { page: 3, limit: 10 };
        assert_eq!(p.total_pages(0), 0);
        assert_eq!(p.total_pages(10), 1);
        assert_eq!(p.total_pages(21), 3);
        assert!(!p.is_out_of_range(0));
        assert!(!p.is_out_of_range(3));
        assert!(p.is_out_of_range(2));
    }
}
