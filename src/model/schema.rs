use indexmap::IndexMap;

use crate::model::value::FieldValue;

/// What kind of input a field holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Free text
    Text,
    /// Numeric input, still typed as text until the payload boundary
    Number,
    /// One of a fixed set of options (e.g. `Yes`/`No`)
    Choice(&'static [&'static str]),
    /// Ordered list of strings
    Tags,
    /// Ordered list of `{day, time}` entries
    Slots,
    /// Ordered list of image data URIs
    Images,
}

impl FieldKind {
    pub fn is_list(self) -> bool {
        matches!(self, FieldKind::Tags | FieldKind::Slots | FieldKind::Images)
    }

    /// Initial value for a freshly created draft.
    pub fn default_value(self) -> FieldValue {
        match self {
            FieldKind::Text | FieldKind::Choice(_) => FieldValue::text(""),
            FieldKind::Number => FieldValue::Null,
            FieldKind::Tags | FieldKind::Slots | FieldKind::Images => FieldValue::List(Vec::new()),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Number => "number",
            FieldKind::Choice(_) => "choice",
            FieldKind::Tags => "tags",
            FieldKind::Slots => "slots",
            FieldKind::Images => "images",
        }
    }
}

/// What to substitute when a numeric coercion cannot parse its input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    Zero,
    Null,
}

/// Per-field transform applied when building the submission payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coercion {
    /// `"Yes"` becomes `true`, anything else `false`
    YesNo,
    Integer { fallback: Fallback },
    Float { fallback: Fallback },
}

/// Declaration of one field in a category form.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    /// Bare name or `parent.child`
    pub path: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub coercion: Option<Coercion>,
}

impl FieldSpec {
    pub const fn text(path: &'static str, label: &'static str) -> Self {
        FieldSpec {
            path,
            label,
            kind: FieldKind::Text,
            required: false,
            coercion: None,
        }
    }

    pub const fn yes_no(path: &'static str, label: &'static str) -> Self {
        FieldSpec {
            path,
            label,
            kind: FieldKind::Choice(YES_NO),
            required: false,
            coercion: Some(Coercion::YesNo),
        }
    }

    pub const fn integer(path: &'static str, label: &'static str, fallback: Fallback) -> Self {
        FieldSpec {
            path,
            label,
            kind: FieldKind::Number,
            required: false,
            coercion: Some(Coercion::Integer { fallback }),
        }
    }

    pub const fn float(path: &'static str, label: &'static str, fallback: Fallback) -> Self {
        FieldSpec {
            path,
            label,
            kind: FieldKind::Number,
            required: false,
            coercion: Some(Coercion::Float { fallback }),
        }
    }

    pub const fn choice(
        path: &'static str,
        label: &'static str,
        options: &'static [&'static str],
    ) -> Self {
        FieldSpec {
            path,
            label,
            kind: FieldKind::Choice(options),
            required: false,
            coercion: None,
        }
    }

    pub const fn tags(path: &'static str, label: &'static str) -> Self {
        FieldSpec {
            path,
            label,
            kind: FieldKind::Tags,
            required: false,
            coercion: None,
        }
    }

    pub const fn slots(path: &'static str, label: &'static str) -> Self {
        FieldSpec {
            path,
            label,
            kind: FieldKind::Slots,
            required: false,
            coercion: None,
        }
    }

    pub const fn images() -> Self {
        FieldSpec {
            path: IMAGES_FIELD,
            label: "Images",
            kind: FieldKind::Images,
            required: false,
            coercion: None,
        }
    }

    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Split into `(parent, Some(child))` or `(name, None)`.
    pub fn segments(&self) -> (&'static str, Option<&'static str>) {
        split_path(self.path)
    }
}

pub const YES_NO: &[&str] = &["Yes", "No"];

/// Name of the field every listing form carries for ingested images.
pub const IMAGES_FIELD: &str = "images";

/// Split a field path on its first dot.
pub fn split_path(path: &str) -> (&str, Option<&str>) {
    match path.split_once('.') {
        Some((parent, child)) => (parent, Some(child)),
        None => (path, None),
    }
}

/// The form definition for one listing category.
#[derive(Debug)]
pub struct CategorySchema {
    /// Stable identifier used on the CLI and for draft files
    pub key: &'static str,
    /// Human-facing category label
    pub label: &'static str,
    /// Path under `<host>/api/` that accepts submissions
    pub endpoint: &'static str,
    pub fields: &'static [FieldSpec],
}

impl CategorySchema {
    pub fn field(&self, path: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.path == path)
    }

    /// Required field paths in declaration order.
    pub fn required_spec(&self) -> Vec<&'static str> {
        self.fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.path)
            .collect()
    }

    /// Declared coercions, keyed by path, in declaration order.
    pub fn coercions(&self) -> Vec<(&'static str, Coercion)> {
        self.fields
            .iter()
            .filter_map(|f| f.coercion.map(|c| (f.path, c)))
            .collect()
    }

    /// Label for a path, falling back to the path itself.
    pub fn label_for<'a>(&self, path: &'a str) -> &'a str {
        self.field(path).map(|f| f.label).unwrap_or(path)
    }

    /// The default shape of a new draft: scalars, lists, and nested objects
    /// built from dotted paths, in declaration order.
    pub fn default_fields(&self) -> IndexMap<String, FieldValue> {
        let mut fields: IndexMap<String, FieldValue> = IndexMap::new();
        for spec in self.fields {
            match spec.segments() {
                (name, None) => {
                    fields.insert(name.to_string(), spec.kind.default_value());
                }
                (parent, Some(child)) => {
                    let entry = fields
                        .entry(parent.to_string())
                        .or_insert_with(|| FieldValue::Object(IndexMap::new()));
                    if let FieldValue::Object(map) = entry {
                        map.insert(child.to_string(), spec.kind.default_value());
                    }
                }
            }
        }
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static FIELDS: &[FieldSpec] = &[
        FieldSpec::text("name", "Name").required(),
        FieldSpec::text("contactInfo.phone", "Phone").required(),
        FieldSpec::text("contactInfo.email", "Email"),
        FieldSpec::yes_no("parking", "Parking"),
        FieldSpec::integer("rooms", "Rooms", Fallback::Zero),
        FieldSpec::tags("tags", "Tags"),
        FieldSpec::images(),
    ];

    static SCHEMA: CategorySchema = CategorySchema {
        key: "test",
        label: "Test",
        endpoint: "tests",
        fields: FIELDS,
    };

    #[test]
    fn test_default_shape_groups_nested_fields() {
        let fields = SCHEMA.default_fields();
        let keys: Vec<&str> = fields.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["name", "contactInfo", "parking", "rooms", "tags", "images"]);

        let contact = fields["contactInfo"].as_object().unwrap();
        assert_eq!(contact["phone"], FieldValue::text(""));
        assert_eq!(contact["email"], FieldValue::text(""));
        assert_eq!(fields["rooms"], FieldValue::Null);
        assert_eq!(fields["tags"], FieldValue::List(vec![]));
    }

    #[test]
    fn test_required_spec_keeps_declaration_order() {
        assert_eq!(SCHEMA.required_spec(), vec!["name", "contactInfo.phone"]);
    }

    #[test]
    fn test_coercions_listed() {
        let coercions = SCHEMA.coercions();
        assert_eq!(coercions.len(), 2);
        assert_eq!(coercions[0], ("parking", Coercion::YesNo));
    }

    #[test]
    fn test_label_lookup_falls_back_to_path() {
        assert_eq!(SCHEMA.label_for("contactInfo.phone"), "Phone");
        assert_eq!(SCHEMA.label_for("nope"), "nope");
    }
}
