use serde_json::{Map, Value};

use crate::model::draft::Draft;
use crate::model::schema::{Coercion, Fallback, IMAGES_FIELD, split_path};
use crate::model::value::{FieldValue, number_to_json};

/// Build the JSON body for submission.
///
/// Returns a derived copy with each listed coercion applied; the draft is
/// not touched. The body always carries an `images` array.
pub fn to_submission_payload(draft: &Draft, coercions: &[(&str, Coercion)]) -> Value {
    let mut body: Map<String, Value> = draft
        .fields()
        .iter()
        .map(|(k, v)| (k.clone(), v.to_json()))
        .collect();

    for (path, coercion) in coercions {
        let source = draft.get(path);
        let coerced = coerce(source, *coercion);
        match split_path(path) {
            (name, None) => {
                body.insert(name.to_string(), coerced);
            }
            (parent, Some(child)) => {
                if let Some(Value::Object(obj)) = body.get_mut(parent) {
                    obj.insert(child.to_string(), coerced);
                }
            }
        }
    }

    if !matches!(body.get(IMAGES_FIELD), Some(Value::Array(_))) {
        body.insert(IMAGES_FIELD.to_string(), Value::Array(Vec::new()));
    }

    Value::Object(body)
}

/// Payload using the schema's declared coercions.
pub fn schema_payload(draft: &Draft) -> Value {
    to_submission_payload(draft, &draft.schema().coercions())
}

/// Apply one coercion to a (possibly absent) field value.
pub fn coerce(value: Option<&FieldValue>, coercion: Coercion) -> Value {
    match coercion {
        Coercion::YesNo => Value::Bool(match value {
            Some(FieldValue::Text(s)) => s == "Yes",
            Some(FieldValue::Bool(b)) => *b,
            _ => false,
        }),
        Coercion::Integer { fallback } => {
            let parsed = match value {
                Some(FieldValue::Number(n)) if n.is_finite() => Some(n.trunc()),
                Some(FieldValue::Text(s)) => parse_int_prefix(s),
                _ => None,
            };
            parsed.map(number_to_json).unwrap_or_else(|| fallback_value(fallback))
        }
        Coercion::Float { fallback } => {
            let parsed = match value {
                Some(FieldValue::Number(n)) if n.is_finite() => Some(*n),
                Some(FieldValue::Text(s)) => parse_float_prefix(s),
                _ => None,
            };
            parsed.map(number_to_json).unwrap_or_else(|| fallback_value(fallback))
        }
    }
}

fn fallback_value(fallback: Fallback) -> Value {
    match fallback {
        Fallback::Zero => Value::from(0),
        Fallback::Null => Value::Null,
    }
}

/// Parse the leading integer of `s` ("12abc" → 12, "abc" → None).
pub fn parse_int_prefix(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let digits_start = usize::from(s.starts_with(['+', '-']));
    let digits_len = s[digits_start..]
        .bytes()
        .take_while(u8::is_ascii_digit)
        .count();
    if digits_len == 0 {
        return None;
    }
    s[..digits_start + digits_len].parse::<f64>().ok()
}

/// Parse the leading decimal number of `s` ("2.5kg" → 2.5, ".5" → 0.5).
pub fn parse_float_prefix(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut end = usize::from(s.starts_with(['+', '-']));

    let int_digits = count_digits(&bytes[end..]);
    end += int_digits;
    let mut frac_digits = 0;
    if bytes.get(end) == Some(&b'.') {
        frac_digits = count_digits(&bytes[end + 1..]);
        if int_digits > 0 || frac_digits > 0 {
            end += 1 + frac_digits;
        }
    }
    if int_digits == 0 && frac_digits == 0 {
        return None;
    }

    // Optional exponent, only consumed when followed by digits
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits = count_digits(&bytes[exp_end.min(bytes.len())..]);
        if exp_digits > 0 {
            end = exp_end + exp_digits;
        }
    }

    s[..end].parse::<f64>().ok().filter(|n| n.is_finite())
}

fn count_digits(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|b| b.is_ascii_digit()).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::category::{HOTEL, PHARMACY};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_yes_no_becomes_bool_without_mutating() {
        let mut draft = Draft::new(&PHARMACY);
        draft.set_field("service247", FieldValue::text("Yes")).unwrap();
        draft.set_field("deliveryAvailable", FieldValue::text("No")).unwrap();

        let payload = schema_payload(&draft);
        assert_eq!(payload["service247"], json!(true));
        assert_eq!(payload["deliveryAvailable"], json!(false));
        assert_eq!(draft.get("service247"), Some(&FieldValue::text("Yes")));
    }

    #[test]
    fn test_unselected_yes_no_is_false() {
        let draft = Draft::new(&PHARMACY);
        assert_eq!(schema_payload(&draft)["service247"], json!(false));
    }

    #[test]
    fn test_numeric_coercions_and_fallbacks() {
        let mut draft = Draft::new(&HOTEL);
        draft.set_field("rooms", FieldValue::text("42 rooms")).unwrap();
        draft.set_field("pricePerNight", FieldValue::text("12500.50")).unwrap();

        let payload = schema_payload(&draft);
        assert_eq!(payload["rooms"], json!(42));
        assert_eq!(payload["pricePerNight"], json!(12500.5));
        // unset, Fallback::Null
        assert_eq!(payload["starRating"], Value::Null);

        draft.set_field("rooms", FieldValue::text("many")).unwrap();
        assert_eq!(schema_payload(&draft)["rooms"], json!(0));
    }

    #[test]
    fn test_payload_keeps_nested_objects_and_images() {
        let mut draft = Draft::new(&HOTEL);
        draft.set_field("contactInfo.phone", FieldValue::text("0912345678")).unwrap();
        draft
            .append_images(vec!["data:image/jpeg;base64,AA==".to_string()])
            .unwrap();

        let payload = schema_payload(&draft);
        assert_eq!(
            payload["contactInfo"],
            json!({"phone": "0912345678", "email": "", "website": ""})
        );
        assert_eq!(payload["images"], json!(["data:image/jpeg;base64,AA=="]));
    }

    #[test]
    fn test_coercion_on_nested_path() {
        let mut draft = Draft::new(&HOTEL);
        draft.set_field("contactInfo.phone", FieldValue::text("7")).unwrap();
        let payload = to_submission_payload(
            &draft,
            &[("contactInfo.phone", Coercion::Integer { fallback: Fallback::Null })],
        );
        assert_eq!(payload["contactInfo"]["phone"], json!(7));
        assert_eq!(payload["contactInfo"]["email"], json!(""));
    }

    #[test]
    fn test_int_prefix_parsing() {
        assert_eq!(parse_int_prefix("12abc"), Some(12.0));
        assert_eq!(parse_int_prefix("  -3"), Some(-3.0));
        assert_eq!(parse_int_prefix("4.9"), Some(4.0));
        assert_eq!(parse_int_prefix(""), None);
        assert_eq!(parse_int_prefix("-"), None);
        assert_eq!(parse_int_prefix("abc"), None);
    }

    #[test]
    fn test_float_prefix_parsing() {
        assert_eq!(parse_float_prefix("2.5kg"), Some(2.5));
        assert_eq!(parse_float_prefix(".5"), Some(0.5));
        assert_eq!(parse_float_prefix("3."), Some(3.0));
        assert_eq!(parse_float_prefix("1e3x"), Some(1000.0));
        assert_eq!(parse_float_prefix("7e"), Some(7.0));
        assert_eq!(parse_float_prefix("."), None);
        assert_eq!(parse_float_prefix("NaN"), None);
    }
}
