use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::io::atomic_write;
use crate::io::lock::{DEFAULT_WAIT, DraftLock, LockError};
use crate::model::category;
use crate::model::draft::{Draft, DraftError};
use crate::model::schema::CategorySchema;
use crate::model::value::FieldValue;

/// Error type for draft persistence
#[derive(Debug, thiserror::Error)]
pub enum DraftIoError {
    #[error("no draft for {0}; start one with `sm draft new {0}`")]
    NoDraft(String),
    #[error("a draft for {0} already exists (use --force to start over)")]
    AlreadyExists(String),
    #[error("could not read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("draft file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("could not write {path}: {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Lock(#[from] LockError),
    #[error(transparent)]
    Draft(#[from] DraftError),
}

/// On-disk form of a draft (`drafts/<category>.json`)
#[derive(Debug, Clone, Serialize, Deserialize)]
struct DraftFile {
    category: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(default)]
    fields: IndexMap<String, FieldValue>,
}

/// Summary of a stored draft for listings
#[derive(Debug, Clone)]
pub struct DraftSummary {
    pub category: &'static CategorySchema,
    pub updated_at: DateTime<Utc>,
}

/// The directory holding drafts and local storage.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Open (creating if needed) a workspace rooted at `root`.
    pub fn open(root: &Path) -> Result<Self, DraftIoError> {
        let drafts = root.join("drafts");
        fs::create_dir_all(&drafts).map_err(|e| DraftIoError::WriteError {
            path: drafts,
            source: e,
        })?;
        Ok(Workspace {
            root: root.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn draft_path(&self, schema: &CategorySchema) -> PathBuf {
        self.root.join("drafts").join(format!("{}.json", schema.key))
    }

    pub fn lock(&self) -> Result<DraftLock, LockError> {
        DraftLock::acquire(&self.root, DEFAULT_WAIT)
    }

    /// Load the stored draft for a category, if any.
    pub fn load(&self, schema: &'static CategorySchema) -> Result<Option<Draft>, DraftIoError> {
        Ok(self.read_file(schema)?.map(|file| Draft::from_fields(schema, file.fields)))
    }

    /// Load the stored draft, failing when there is none.
    pub fn load_existing(&self, schema: &'static CategorySchema) -> Result<Draft, DraftIoError> {
        self.load(schema)?
            .ok_or_else(|| DraftIoError::NoDraft(schema.key.to_string()))
    }

    /// Start a fresh draft with the schema defaults.
    pub fn create(
        &self,
        schema: &'static CategorySchema,
        force: bool,
    ) -> Result<Draft, DraftIoError> {
        let _lock = self.lock()?;
        if !force && self.draft_path(schema).exists() {
            return Err(DraftIoError::AlreadyExists(schema.key.to_string()));
        }
        let draft = Draft::new(schema);
        self.write(&draft, Utc::now())?;
        debug!(category = schema.key, "created draft");
        Ok(draft)
    }

    /// Apply `f` to a copy of the latest stored draft and replace the file
    /// with the result. The file is untouched when `f` fails.
    pub fn update<F, R>(&self, schema: &'static CategorySchema, f: F) -> Result<R, DraftIoError>
    where
        F: FnOnce(&mut Draft) -> Result<R, DraftError>,
    {
        self.update_if_present(schema, f)?
            .ok_or_else(|| DraftIoError::NoDraft(schema.key.to_string()))
    }

    /// Like `update`, but a draft that no longer exists yields `Ok(None)`
    /// instead of an error. Used for results that complete after the user
    /// may have discarded the draft.
    pub fn update_if_present<F, R>(
        &self,
        schema: &'static CategorySchema,
        f: F,
    ) -> Result<Option<R>, DraftIoError>
    where
        F: FnOnce(&mut Draft) -> Result<R, DraftError>,
    {
        let _lock = self.lock()?;
        let Some(file) = self.read_file(schema)? else {
            return Ok(None);
        };
        let mut draft = Draft::from_fields(schema, file.fields);
        let result = f(&mut draft)?;
        self.write(&draft, file.created_at)?;
        Ok(Some(result))
    }

    /// Remove a draft. Returns whether one existed.
    pub fn discard(&self, schema: &CategorySchema) -> Result<bool, DraftIoError> {
        let _lock = self.lock()?;
        let path = self.draft_path(schema);
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(category = schema.key, "discarded draft");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(DraftIoError::WriteError { path, source: e }),
        }
    }

    /// All stored drafts for known categories, in category order.
    pub fn list(&self) -> Vec<DraftSummary> {
        category::ALL
            .iter()
            .copied()
            .filter_map(|schema| {
                let file = self.read_file(schema).ok()??;
                Some(DraftSummary {
                    category: schema,
                    updated_at: file.updated_at,
                })
            })
            .collect()
    }

    fn read_file(&self, schema: &CategorySchema) -> Result<Option<DraftFile>, DraftIoError> {
        let path = self.draft_path(schema);
        let content = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(DraftIoError::ReadError { path, source: e }),
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| DraftIoError::Corrupt { path, source: e })
    }

    fn write(&self, draft: &Draft, created_at: DateTime<Utc>) -> Result<(), DraftIoError> {
        let path = self.draft_path(draft.schema());
        let file = DraftFile {
            category: draft.schema().key.to_string(),
            created_at,
            updated_at: Utc::now(),
            fields: draft.fields().clone(),
        };
        let content = serde_json::to_string_pretty(&file).map_err(|e| DraftIoError::Corrupt {
            path: path.clone(),
            source: e,
        })?;
        atomic_write(&path, content.as_bytes())
            .map_err(|e| DraftIoError::WriteError { path, source: e })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::category::{GYM, PHARMACY};
    use tempfile::TempDir;

    fn workspace() -> (TempDir, Workspace) {
        let tmp = TempDir::new().unwrap();
        let ws = Workspace::open(tmp.path()).unwrap();
        (tmp, ws)
    }

    #[test]
    fn test_create_then_load() {
        let (_tmp, ws) = workspace();
        assert!(ws.load(&PHARMACY).unwrap().is_none());
        ws.create(&PHARMACY, false).unwrap();
        assert_eq!(ws.load(&PHARMACY).unwrap(), Some(Draft::new(&PHARMACY)));
    }

    #[test]
    fn test_create_refuses_to_clobber_without_force() {
        let (_tmp, ws) = workspace();
        ws.create(&PHARMACY, false).unwrap();
        ws.update(&PHARMACY, |d| d.set_field("name", FieldValue::text("Union")))
            .unwrap();

        assert!(matches!(
            ws.create(&PHARMACY, false),
            Err(DraftIoError::AlreadyExists(_))
        ));
        ws.create(&PHARMACY, true).unwrap();
        assert_eq!(ws.load_existing(&PHARMACY).unwrap().get("name"), Some(&FieldValue::text("")));
    }

    #[test]
    fn test_updates_to_different_fields_accumulate() {
        let (_tmp, ws) = workspace();
        ws.create(&GYM, false).unwrap();
        ws.update(&GYM, |d| d.set_field("contactInfo.phone", FieldValue::text("077")))
            .unwrap();
        ws.update(&GYM, |d| d.set_field("contactInfo.email", FieldValue::text("g@y.lk")))
            .unwrap();
        ws.update(&GYM, |d| d.add_list_item("facilities", "Sauna")).unwrap();

        let draft = ws.load_existing(&GYM).unwrap();
        assert_eq!(draft.get("contactInfo.phone"), Some(&FieldValue::text("077")));
        assert_eq!(draft.get("contactInfo.email"), Some(&FieldValue::text("g@y.lk")));
        assert_eq!(draft.list_len("facilities"), 1);
    }

    #[test]
    fn test_failed_update_leaves_file_alone() {
        let (_tmp, ws) = workspace();
        ws.create(&PHARMACY, false).unwrap();
        let before = fs::read_to_string(ws.draft_path(&PHARMACY)).unwrap();
        let err = ws
            .update(&PHARMACY, |d| d.set_field("nope", FieldValue::Null))
            .unwrap_err();
        assert!(matches!(err, DraftIoError::Draft(DraftError::UnknownField { .. })));
        assert_eq!(fs::read_to_string(ws.draft_path(&PHARMACY)).unwrap(), before);
    }

    #[test]
    fn test_update_on_discarded_draft() {
        let (_tmp, ws) = workspace();
        ws.create(&PHARMACY, false).unwrap();
        assert!(ws.discard(&PHARMACY).unwrap());
        assert!(!ws.discard(&PHARMACY).unwrap());

        let late = ws
            .update_if_present(&PHARMACY, |d| d.append_images(vec!["x".to_string()]))
            .unwrap();
        assert!(late.is_none());
        assert!(!ws.draft_path(&PHARMACY).exists());
        assert!(matches!(
            ws.update(&PHARMACY, |d| d.add_list_item("images", "x")),
            Err(DraftIoError::NoDraft(_))
        ));
    }

    #[test]
    fn test_list_reports_stored_drafts() {
        let (_tmp, ws) = workspace();
        ws.create(&GYM, false).unwrap();
        ws.create(&PHARMACY, false).unwrap();
        let keys: Vec<&str> = ws.list().iter().map(|s| s.category.key).collect();
        assert_eq!(keys, vec!["pharmacy", "gym"]);
    }

    #[test]
    fn test_corrupt_file_is_reported() {
        let (_tmp, ws) = workspace();
        fs::write(ws.draft_path(&PHARMACY), "{{not json").unwrap();
        assert!(matches!(ws.load(&PHARMACY), Err(DraftIoError::Corrupt { .. })));
    }
}
