use chrono::{DateTime, Utc};
use engagement_core::TenantId;
use serde::{Deserialize, Serialize};

/// One row of the `(meeting_id, topic_index, title, description,
/// meeting_date, company_ref, contact_ref)` stream C5 consumes (spec
/// §4.5's responsibility statement). `company_ref`/`contact_ref` are
/// carried through only for future scoping hooks; clustering itself is
/// purely lexical and tenant-scoped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingTopic {
    pub tenant: TenantId,
    pub meeting_id: String,
    pub topic_index: u32,
    pub title: String,
    pub description: String,
    pub meeting_date: DateTime<Utc>,
    pub company_ref: Option<String>,
    pub contact_ref: Option<String>,
}

impl IncomingTopic {
    pub fn blended_text(&self) -> String {
        format!("{} {}", self.title, self.description)
    }
}
