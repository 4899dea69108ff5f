//! In-memory coordinator for one listing form.
//!
//! The draft lives in a shared `DraftSlot`. Every change is applied to a
//! copy of the latest draft which then replaces it, so work that finishes
//! late (image ingestion, submission) never writes over edits made in the
//! meantime. Disposing the slot makes any later result a silent no-op.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tracing::debug;

use crate::model::draft::{Draft, DraftError};
use crate::model::schema::CategorySchema;
use crate::model::value::FieldValue;
use crate::ops::ingest::{ImagePipeline, MediaPicker, PickError, ingest};
use crate::ops::payload::schema_payload;
use crate::ops::submit::{ListingSubmitter, SubmitState, submit_draft};
use crate::ops::validate::{ValidationResult, validate_required};

/// Error type for form actions
#[derive(Debug, thiserror::Error)]
pub enum FormError {
    #[error("the form was closed")]
    Disposed,
    #[error(transparent)]
    Draft(#[from] DraftError),
    #[error(transparent)]
    Pick(#[from] PickError),
}

/// Shared, disposable holder of a draft.
#[derive(Debug, Clone)]
pub struct DraftSlot {
    inner: Arc<Mutex<Option<Draft>>>,
}

impl DraftSlot {
    pub fn new(draft: Draft) -> Self {
        DraftSlot {
            inner: Arc::new(Mutex::new(Some(draft))),
        }
    }

    /// A copy of the current draft, or `None` once disposed.
    pub fn snapshot(&self) -> Option<Draft> {
        self.guard().clone()
    }

    /// Clone, mutate, replace. Returns `Ok(None)` when the slot has been
    /// disposed; a failed mutation leaves the draft unchanged.
    pub fn update<F, R>(&self, f: F) -> Result<Option<R>, DraftError>
    where
        F: FnOnce(&mut Draft) -> Result<R, DraftError>,
    {
        let mut guard = self.guard();
        let Some(current) = guard.as_ref() else {
            return Ok(None);
        };
        let mut next = current.clone();
        let result = f(&mut next)?;
        *guard = Some(next);
        Ok(Some(result))
    }

    /// Drop the draft; later updates are ignored.
    pub fn dispose(&self) {
        *self.guard() = None;
    }

    pub fn is_disposed(&self) -> bool {
        self.guard().is_none()
    }

    fn guard(&self) -> MutexGuard<'_, Option<Draft>> {
        // A panic mid-update never leaves a half-written draft behind
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Result of attaching a batch of images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImageOutcome {
    pub added: usize,
    pub failed: usize,
    /// The form was closed before processing finished; nothing was applied
    pub dropped: bool,
}

/// One open listing form.
#[derive(Debug, Clone)]
pub struct FormController {
    schema: &'static CategorySchema,
    slot: DraftSlot,
}

impl FormController {
    pub fn new(schema: &'static CategorySchema) -> Self {
        Self::from_draft(Draft::new(schema))
    }

    pub fn from_draft(draft: Draft) -> Self {
        FormController {
            schema: draft.schema(),
            slot: DraftSlot::new(draft),
        }
    }

    pub fn schema(&self) -> &'static CategorySchema {
        self.schema
    }

    pub fn slot(&self) -> &DraftSlot {
        &self.slot
    }

    pub fn draft(&self) -> Option<Draft> {
        self.slot.snapshot()
    }

    pub fn set_field(&self, path: &str, value: impl Into<FieldValue>) -> Result<(), FormError> {
        let value = value.into();
        self.apply(|d| d.set_field(path, value))
    }

    pub fn add_list_item(&self, field: &str, candidate: &str) -> Result<bool, FormError> {
        self.apply(|d| d.add_list_item(field, candidate))
    }

    pub fn add_slot(&self, field: &str, day: &str, time: &str) -> Result<bool, FormError> {
        self.apply(|d| d.add_slot(field, day, time))
    }

    pub fn remove_list_item(&self, field: &str, index: i64) -> Result<bool, FormError> {
        self.apply(|d| d.remove_list_item(field, index))
    }

    pub fn validate(&self) -> Result<ValidationResult, FormError> {
        let draft = self.slot.snapshot().ok_or(FormError::Disposed)?;
        Ok(validate_required(&draft))
    }

    pub fn payload(&self) -> Result<Value, FormError> {
        let draft = self.slot.snapshot().ok_or(FormError::Disposed)?;
        Ok(schema_payload(&draft))
    }

    /// Pick, process and append images. Processing runs without holding the
    /// draft; the results are appended to whatever the draft is by then.
    pub async fn attach_images<P>(
        &self,
        picker: &P,
        pipeline: ImagePipeline,
    ) -> Result<ImageOutcome, FormError>
    where
        P: MediaPicker + ?Sized,
    {
        let report = ingest(picker, pipeline).await?;
        let failed = report.failed_count();
        match self.slot.update(|d| d.append_images(report.accepted))? {
            Some(added) => Ok(ImageOutcome {
                added,
                failed,
                dropped: false,
            }),
            None => {
                debug!(category = self.schema.key, "form closed during ingestion; dropping images");
                Ok(ImageOutcome {
                    added: 0,
                    failed,
                    dropped: true,
                })
            }
        }
    }

    /// Validate and send the current draft. On success the draft is reset
    /// to its defaults; on any failure it is kept for another attempt.
    pub async fn submit<S>(&self, submitter: &S) -> Result<SubmitState, FormError>
    where
        S: ListingSubmitter + ?Sized,
    {
        let draft = self.slot.snapshot().ok_or(FormError::Disposed)?;
        let state = submit_draft(&draft, submitter).await;
        if state.is_submitted() {
            self.slot.update(|d| {
                d.clear();
                Ok(())
            })?;
        }
        Ok(state)
    }

    /// Close the form. In-flight work finishes but changes nothing.
    pub fn dispose(&self) {
        self.slot.dispose();
    }

    fn apply<F, R>(&self, f: F) -> Result<R, FormError>
    where
        F: FnOnce(&mut Draft) -> Result<R, DraftError>,
    {
        self.slot.update(f)?.ok_or(FormError::Disposed)
    }
}
