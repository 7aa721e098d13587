//! Boundary normalization of query strings and registration bodies.

use ecoponto_core::{CategoryId, PointCriteria, PointSubmission};
use serde::Deserialize;
use serde_json::Value;

use crate::error::ApiError;

/// Fold raw `/points` query pairs into search criteria.
///
/// `items` may arrive comma-separated (`items=1,2`), repeated (`items=1&items=2`), or in the
/// bracketed array form (`items[]=1`). Blank values are treated as absent.
pub(crate) fn criteria_from_query(pairs: Vec<(String, String)>) -> Result<PointCriteria, ApiError> {
    let mut criteria = PointCriteria::any();
    let mut problems = Vec::new();

    for (key, value) in pairs {
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        match key.as_str() {
            "uf" => criteria.state = Some(value.to_owned()),
            "city" => criteria.city = Some(value.to_owned()),
            "items" | "items[]" => match parse_ids(value) {
                Ok(ids) => criteria.category_ids.extend(ids),
                Err(bad) => problems.push(format!("items: {bad:?} is not a category id")),
            },
            _ => {}
        }
    }

    if problems.is_empty() {
        Ok(criteria)
    } else {
        Err(ApiError::validation(problems))
    }
}

fn parse_ids(raw: &str) -> Result<Vec<CategoryId>, String> {
    raw.split(',')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            segment
                .parse::<i64>()
                .ok()
                .map(CategoryId)
                .ok_or_else(|| segment.to_owned())
        })
        .collect()
}

/// Body of `POST /points`. Fields are kept as raw JSON so that missing and mistyped ones are
/// reported together instead of failing on the first.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct CreatePointBody {
    pub name: Option<Value>,
    pub email: Option<Value>,
    pub whatsapp: Option<Value>,
    /// JSON number or decimal string.
    pub latitude: Option<Value>,
    pub longitude: Option<Value>,
    pub city: Option<Value>,
    pub uf: Option<Value>,
    /// Integer array or comma-separated string.
    pub items: Option<Value>,
    /// Reference of the photo already stored by the upload collaborator.
    pub image: Option<Value>,
}

impl CreatePointBody {
    pub(crate) fn into_submission(self) -> Result<PointSubmission, ApiError> {
        let mut problems = Vec::new();

        let name = required("name", self.name, &mut problems);
        let email = required("email", self.email, &mut problems);
        if !email.is_empty() && !looks_like_email(&email) {
            problems.push("email must be a valid email".to_owned());
        }
        let whatsapp = required("whatsapp", self.whatsapp, &mut problems);
        let latitude = coordinate("latitude", self.latitude, &mut problems);
        let longitude = coordinate("longitude", self.longitude, &mut problems);
        let city = required("city", self.city, &mut problems);
        let uf = required("uf", self.uf, &mut problems);
        if uf.chars().count() > 2 {
            problems.push("uf must be at most 2 characters".to_owned());
        }
        let image_reference = required("image", self.image, &mut problems);
        let category_ids = items(self.items, &mut problems);

        if !problems.is_empty() {
            return Err(ApiError::validation(problems));
        }

        Ok(PointSubmission {
            name,
            email,
            whatsapp,
            latitude,
            longitude,
            city,
            state: uf,
            image_reference,
            category_ids,
        })
    }
}

fn required(field: &str, value: Option<Value>, problems: &mut Vec<String>) -> String {
    let text = match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.trim().to_owned(),
        Some(_) => {
            problems.push(format!("{field} must be a string"));
            return String::new();
        }
    };
    if text.is_empty() {
        problems.push(format!("{field} is required"));
    }
    text
}

fn coordinate(field: &str, value: Option<Value>, problems: &mut Vec<String>) -> f64 {
    let parsed = match value {
        None | Some(Value::Null) => {
            problems.push(format!("{field} is required"));
            return 0.0;
        }
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(text)) => text.trim().parse::<f64>().ok(),
        Some(_) => None,
    };

    match parsed {
        Some(number) if number.is_finite() => number,
        _ => {
            problems.push(format!("{field} must be a decimal number"));
            0.0
        }
    }
}

fn items(value: Option<Value>, problems: &mut Vec<String>) -> Vec<CategoryId> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::String(raw)) => parse_ids(&raw).unwrap_or_else(|bad| {
            problems.push(format!("items: {bad:?} is not a category id"));
            Vec::new()
        }),
        Some(Value::Array(entries)) => {
            let mut ids = Vec::with_capacity(entries.len());
            for entry in entries {
                match entry.as_i64() {
                    Some(id) => ids.push(CategoryId(id)),
                    None => problems.push(format!("items: {entry} is not a category id")),
                }
            }
            ids
        }
        Some(_) => {
            problems.push("items must be a list of category ids".to_owned());
            Vec::new()
        }
    }
}

fn looks_like_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
            .collect()
    }

    #[test]
    fn items_accept_every_encoding() {
        let criteria = criteria_from_query(pairs(&[
            ("uf", "SC"),
            ("city", "Rio do Sul"),
            ("items", "1, 2"),
            ("items", "3"),
            ("items[]", "4"),
        ]))
        .expect("valid");

        assert_eq!(criteria.state.as_deref(), Some("SC"), "state");
        assert_eq!(criteria.city.as_deref(), Some("Rio do Sul"), "city");
        let ids: Vec<i64> = criteria.category_ids.iter().map(|id| id.0).collect();
        assert_eq!(ids, vec![1, 2, 3, 4], "all encodings merged");
    }

    #[test]
    fn blank_values_mean_no_constraint() {
        let criteria = criteria_from_query(pairs(&[("uf", ""), ("city", "  "), ("items", "")]))
            .expect("valid");
        assert_eq!(criteria, PointCriteria::any(), "nothing constrained");
    }

    #[test]
    fn non_numeric_items_are_rejected() {
        let result = criteria_from_query(pairs(&[("items", "1,lamp")]));
        let err = result.expect_err("lamp is not an id");
        assert_eq!(err.details, vec![r#"items: "lamp" is not a category id"#], "detail");
    }

    fn body(value: Value) -> CreatePointBody {
        serde_json::from_value(value).expect("object body")
    }

    fn eco_ponto() -> Value {
        json!({
            "name": "Eco Ponto",
            "email": "eco@ponto.com.br",
            "whatsapp": "47999990000",
            "latitude": "-27.19",
            "longitude": -49.64,
            "city": "Rio do Sul",
            "uf": "SC",
            "items": "1,2",
            "image": "eco.jpg",
        })
    }

    #[test]
    fn body_with_string_coordinates_and_item_list_converts() {
        let submission = body(eco_ponto()).into_submission().expect("valid");
        assert!((submission.latitude + 27.19).abs() < f64::EPSILON, "latitude parsed");
        assert_eq!(submission.state, "SC", "uf mapped to state");
        assert_eq!(
            submission.category_ids,
            vec![CategoryId(1), CategoryId(2)],
            "items split"
        );
    }

    #[test]
    fn body_reports_every_problem_at_once() {
        let body = body(json!({
            "email": "not-an-email",
            "latitude": "north",
            "uf": "SCX",
        }));

        let err = body.into_submission().expect_err("invalid");
        assert_eq!(
            err.details,
            vec![
                "name is required",
                "email must be a valid email",
                "whatsapp is required",
                "latitude must be a decimal number",
                "longitude is required",
                "city is required",
                "uf must be at most 2 characters",
                "image is required",
            ],
            "all fields listed in order"
        );
    }

    #[test]
    fn mistyped_fields_are_listed_with_the_rest() {
        let mut raw = eco_ponto();
        raw["name"] = json!(5);
        raw["latitude"] = json!(true);
        raw["items"] = json!([1, "two"]);
        raw["image"] = Value::Null;

        let err = body(raw).into_submission().expect_err("invalid");
        assert_eq!(
            err.details,
            vec![
                "name must be a string",
                "latitude must be a decimal number",
                "image is required",
                r#"items: "two" is not a category id"#,
            ],
            "type errors reported per field"
        );
    }

    #[test]
    fn items_must_be_a_list_or_text() {
        let mut raw = eco_ponto();
        raw["items"] = json!({ "id": 1 });
        let err = body(raw).into_submission().expect_err("invalid");
        assert_eq!(err.details, vec!["items must be a list of category ids"], "detail");
    }

    #[test]
    fn missing_items_are_left_to_the_engine() {
        let mut raw = eco_ponto();
        raw["items"] = Value::Null;
        let submission = body(raw).into_submission().expect("boundary accepts");
        assert!(submission.category_ids.is_empty(), "engine rejects later");
    }
}
