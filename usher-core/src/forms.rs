use crate::CoreResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

/// Store for attendee form submissions. The submission is created before
/// the order and may be patched after confirmation (contact completion).
#[async_trait]
pub trait FormSubmissionStore: Send + Sync {
    async fn submit_form(
        &self,
        form_id: Uuid,
        responses: serde_json::Value,
        email: &str,
    ) -> CoreResult<Uuid>;

    async fn update_submission(
        &self,
        submission_id: Uuid,
        patch: serde_json::Value,
    ) -> CoreResult<()>;
}

#[derive(Debug, Clone)]
pub struct StoredSubmission {
    pub form_id: Uuid,
    pub email: String,
    pub responses: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// In-memory submission store for tests and local development.
pub struct InMemoryFormStore {
    submissions: Mutex<HashMap<Uuid, StoredSubmission>>,
}

impl InMemoryFormStore {
    pub fn new() -> Self {
        Self {
            submissions: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, id: Uuid) -> Option<StoredSubmission> {
        self.submissions
            .lock()
            .expect("form store lock")
            .get(&id)
            .cloned()
    }
}

impl Default for InMemoryFormStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FormSubmissionStore for InMemoryFormStore {
    async fn submit_form(
        &self,
        form_id: Uuid,
        responses: serde_json::Value,
        email: &str,
    ) -> CoreResult<Uuid> {
        let id = Uuid::new_v4();
        self.submissions.lock().expect("form store lock").insert(
            id,
            StoredSubmission {
                form_id,
                email: email.to_string(),
                responses,
                created_at: Utc::now(),
            },
        );
        Ok(id)
    }

    async fn update_submission(
        &self,
        submission_id: Uuid,
        patch: serde_json::Value,
    ) -> CoreResult<()> {
        let mut submissions = self.submissions.lock().expect("form store lock");
        let stored = submissions
            .get_mut(&submission_id)
            .ok_or_else(|| crate::CoreError::ValidationError("unknown submission".to_string()))?;

        if let (Some(base), Some(overlay)) = (stored.responses.as_object_mut(), patch.as_object())
        {
            for (key, value) in overlay {
                base.insert(key.clone(), value.clone());
            }
        }
        Ok(())
    }
}
