use indexmap::IndexMap;

use crate::model::schema::{CategorySchema, FieldKind, IMAGES_FIELD, split_path};
use crate::model::value::FieldValue;

/// Error type for draft mutations
#[derive(Debug, thiserror::Error)]
pub enum DraftError {
    #[error("unknown field '{path}' for category {category}")]
    UnknownField { category: String, path: String },
    #[error("field '{0}' is a list; use add/rm instead")]
    NotScalar(String),
    #[error("field '{0}' is not a list")]
    NotAList(String),
    #[error("'{value}' is not an option for '{path}' (expected one of: {options})")]
    InvalidChoice {
        path: String,
        value: String,
        options: String,
    },
}

/// One in-progress listing submission.
///
/// Mutations go through `set_field`, `add_list_item`, `remove_list_item`
/// and `add_slot`. Field order follows the schema.
#[derive(Debug, Clone)]
pub struct Draft {
    schema: &'static CategorySchema,
    fields: IndexMap<String, FieldValue>,
}

impl PartialEq for Draft {
    fn eq(&self, other: &Self) -> bool {
        self.schema.key == other.schema.key && self.fields == other.fields
    }
}

impl Draft {
    /// Create a draft with the schema's default shape.
    pub fn new(schema: &'static CategorySchema) -> Self {
        Draft {
            schema,
            fields: schema.default_fields(),
        }
    }

    /// Rebuild a draft from stored fields. Missing declared fields get their
    /// defaults; undeclared stored keys are dropped.
    pub fn from_fields(
        schema: &'static CategorySchema,
        stored: IndexMap<String, FieldValue>,
    ) -> Self {
        let mut fields = schema.default_fields();
        for (name, default) in fields.iter_mut() {
            let Some(value) = stored.get(name) else {
                continue;
            };
            match (default, value) {
                (FieldValue::Object(defaults), FieldValue::Object(saved)) => {
                    for (child, slot) in defaults.iter_mut() {
                        if let Some(v) = saved.get(child) {
                            *slot = v.clone();
                        }
                    }
                }
                (slot, value) => *slot = value.clone(),
            }
        }
        Draft { schema, fields }
    }

    pub fn schema(&self) -> &'static CategorySchema {
        self.schema
    }

    pub fn fields(&self) -> &IndexMap<String, FieldValue> {
        &self.fields
    }

    /// Read a bare or `parent.child` path. `None` when absent, including when
    /// the parent object itself is missing.
    pub fn get(&self, path: &str) -> Option<&FieldValue> {
        match split_path(path) {
            (name, None) => self.fields.get(name),
            (parent, Some(child)) => self.fields.get(parent)?.as_object()?.get(child),
        }
    }

    /// Replace the value at `path`. Two-segment paths merge into the parent
    /// object so sibling keys are preserved.
    pub fn set_field(&mut self, path: &str, value: FieldValue) -> Result<(), DraftError> {
        let spec = self.schema.field(path).ok_or_else(|| self.unknown(path))?;
        if spec.kind.is_list() {
            return Err(DraftError::NotScalar(path.to_string()));
        }
        if let (FieldKind::Choice(options), FieldValue::Text(s)) = (spec.kind, &value)
            && !s.is_empty()
            && !options.contains(&s.as_str())
        {
            return Err(DraftError::InvalidChoice {
                path: path.to_string(),
                value: s.clone(),
                options: options.join(", "),
            });
        }

        match split_path(path) {
            (name, None) => {
                self.fields.insert(name.to_string(), value);
            }
            (parent, Some(child)) => {
                let entry = self
                    .fields
                    .entry(parent.to_string())
                    .or_insert_with(|| FieldValue::Object(IndexMap::new()));
                match entry {
                    FieldValue::Object(map) => {
                        map.insert(child.to_string(), value);
                    }
                    other => {
                        let mut map = IndexMap::new();
                        map.insert(child.to_string(), value);
                        *other = FieldValue::Object(map);
                    }
                }
            }
        }
        Ok(())
    }

    /// Trim `candidate` and append it to a list field. Blank candidates are
    /// ignored and return `false`.
    pub fn add_list_item(&mut self, field: &str, candidate: &str) -> Result<bool, DraftError> {
        let trimmed = candidate.trim();
        let items = self.list_mut(field)?;
        if trimmed.is_empty() {
            return Ok(false);
        }
        items.push(FieldValue::text(trimmed));
        Ok(true)
    }

    /// Append a `{day, time}` entry. Either part blank after trimming is
    /// ignored and returns `false`.
    pub fn add_slot(&mut self, field: &str, day: &str, time: &str) -> Result<bool, DraftError> {
        let (day, time) = (day.trim(), time.trim());
        let items = self.list_mut(field)?;
        if day.is_empty() || time.is_empty() {
            return Ok(false);
        }
        let mut entry = IndexMap::new();
        entry.insert("day".to_string(), FieldValue::text(day));
        entry.insert("time".to_string(), FieldValue::text(time));
        items.push(FieldValue::Object(entry));
        Ok(true)
    }

    /// Remove the element at `index`. Indices outside `0..len` are a no-op,
    /// since callers may hold an index from a list that has since changed.
    pub fn remove_list_item(&mut self, field: &str, index: i64) -> Result<bool, DraftError> {
        let items = self.list_mut(field)?;
        match usize::try_from(index) {
            Ok(i) if i < items.len() => {
                items.remove(i);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Append ingested image data URIs to the `images` field.
    pub fn append_images<I>(&mut self, data_uris: I) -> Result<usize, DraftError>
    where
        I: IntoIterator<Item = String>,
    {
        let items = self.list_mut(IMAGES_FIELD)?;
        let before = items.len();
        items.extend(data_uris.into_iter().map(FieldValue::Text));
        Ok(items.len() - before)
    }

    /// Number of elements in a list field (0 for anything else).
    pub fn list_len(&self, field: &str) -> usize {
        self.get(field).and_then(FieldValue::as_list).map_or(0, <[_]>::len)
    }

    /// Reset every field to the schema default.
    pub fn clear(&mut self) {
        self.fields = self.schema.default_fields();
    }

    fn list_mut(&mut self, field: &str) -> Result<&mut Vec<FieldValue>, DraftError> {
        let spec = self.schema.field(field).ok_or_else(|| self.unknown(field))?;
        if !spec.kind.is_list() {
            return Err(DraftError::NotAList(field.to_string()));
        }
        let slot = match split_path(field) {
            (name, None) => self
                .fields
                .entry(name.to_string())
                .or_insert_with(|| FieldValue::List(Vec::new())),
            (parent, Some(child)) => {
                let parent = self
                    .fields
                    .entry(parent.to_string())
                    .or_insert_with(|| FieldValue::Object(IndexMap::new()));
                if !matches!(parent, FieldValue::Object(_)) {
                    *parent = FieldValue::Object(IndexMap::new());
                }
                match parent {
                    FieldValue::Object(map) => map
                        .entry(child.to_string())
                        .or_insert_with(|| FieldValue::List(Vec::new())),
                    _ => return Err(DraftError::NotAList(field.to_string())),
                }
            }
        };
        if !matches!(slot, FieldValue::List(_)) {
            *slot = FieldValue::List(Vec::new());
        }
        match slot {
            FieldValue::List(items) => Ok(items),
            _ => Err(DraftError::NotAList(field.to_string())),
        }
    }

    fn unknown(&self, path: &str) -> DraftError {
        DraftError::UnknownField {
            category: self.schema.key.to_string(),
            path: path.to_string(),
        }
    }
}
