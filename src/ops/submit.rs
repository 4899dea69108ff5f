use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::io::api::{ApiError, Receipt};
use crate::model::draft::Draft;
use crate::ops::payload::schema_payload;
use crate::ops::validate::{ValidationResult, validate_required};

/// Shown when a failed submission carries no server message.
pub const GENERIC_FAILURE: &str = "Something went wrong. Please try again.";

/// Shown after a 2xx with no server message.
pub const DEFAULT_SUCCESS: &str = "Listing submitted";

/// Where a listing payload goes.
#[allow(async_fn_in_trait)]
pub trait ListingSubmitter {
    /// `POST` the payload to the category endpoint.
    async fn submit_listing(&self, endpoint: &str, payload: &Value) -> Result<Receipt, ApiError>;
}

/// What the user sees after pressing submit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum SubmitState {
    Submitted { status: u16, message: String },
    /// Validation blocked the submission; nothing was sent.
    Invalid { field: String, message: String },
    Failed { message: String },
}

impl SubmitState {
    pub fn is_submitted(&self) -> bool {
        matches!(self, SubmitState::Submitted { .. })
    }

    pub fn message(&self) -> &str {
        match self {
            SubmitState::Submitted { message, .. }
            | SubmitState::Invalid { message, .. }
            | SubmitState::Failed { message } => message,
        }
    }
}

/// Validate, then send. The draft is never modified here; clearing it on
/// success is up to the caller.
pub async fn submit_draft<S>(draft: &Draft, submitter: &S) -> SubmitState
where
    S: ListingSubmitter + ?Sized,
{
    if let ValidationResult::Fail { field, message } = validate_required(draft) {
        info!(category = draft.schema().key, %field, "submission blocked by validation");
        return SubmitState::Invalid { field, message };
    }

    let payload = schema_payload(draft);
    let endpoint = draft.schema().endpoint;
    match submitter.submit_listing(endpoint, &payload).await {
        Ok(receipt) => {
            info!(category = draft.schema().key, status = receipt.status, "listing submitted");
            SubmitState::Submitted {
                status: receipt.status,
                message: receipt.message.unwrap_or_else(|| DEFAULT_SUCCESS.to_string()),
            }
        }
        Err(err) => {
            warn!(category = draft.schema().key, error = %err, "submission failed");
            SubmitState::Failed {
                message: err
                    .server_message()
                    .map(str::to_string)
                    .unwrap_or_else(|| GENERIC_FAILURE.to_string()),
            }
        }
    }
}
