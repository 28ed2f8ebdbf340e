use crate::ids::{
    ActionKind, FeedbackId, GlobalTopicId, IntegrationKind, SuggestionId, TenantId, UserId,
    WorkQueueItemId,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Connection status of an `IntegrationCredential` (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Active,
    NeedsReconnect,
    Revoked,
}

/// identity {tenant, integration_kind}. At most one active row per key
/// (invariant I1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrationCredential {
    pub tenant: TenantId,
    pub integration_kind: IntegrationKind,
    pub access_secret: String,
    pub refresh_secret: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub status: ConnectionStatus,
    pub last_refresh: Option<DateTime<Utc>>,
    /// Tenant-scoped endpoint hint, e.g. a regional REST URL handed back
    /// by a two-step handshake integration (spec §4.1).
    pub endpoint_hint: Option<String>,
    /// Opaque session token for integrations requiring the Bullhorn-style
    /// second handshake, refreshed in lockstep with the access secret.
    pub session_token: Option<String>,
    pub metadata: serde_json::Value,
}

impl IntegrationCredential {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn is_within(&self, now: DateTime<Utc>, window: chrono::Duration) -> bool {
        self.expires_at <= now + window
    }
}

/// Single-use short-lived token bound to an OAuth authorization attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthState {
    pub token: String,
    pub tenant: TenantId,
    pub user: UserId,
    pub integration_kind: IntegrationKind,
    pub redirect_uri: String,
    pub pkce_verifier: Option<String>,
    pub created_at: DateTime<Utc>,
    pub consumed: bool,
}

impl OAuthState {
    /// ≤15 min TTL; exactly-at-boundary counts as expired (spec §8
    /// boundary behavior).
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.created_at + chrono::Duration::minutes(15)
    }

    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        !self.consumed && !self.is_expired(now)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    Idle,
    Running,
}

/// identity {tenant, integration_kind}; mutated only by the sync
/// orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncState {
    pub tenant: TenantId,
    pub integration_kind: IntegrationKind,
    pub last_successful_sync: Option<DateTime<Utc>>,
    pub cursor: Option<String>,
    pub mode: SyncMode,
    pub consecutive_errors: u32,
}

impl SyncState {
    pub fn new(tenant: TenantId, integration_kind: IntegrationKind) -> Self {
        Self {
            tenant,
            integration_kind,
            last_successful_sync: None,
            cursor: None,
            mode: SyncMode::Idle,
            consecutive_errors: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingDirection {
    Inbound,
    Outbound,
    Bidirectional,
}

/// identity {tenant, external_system, external_entity_kind, external_id}.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityMapping {
    pub tenant: TenantId,
    pub external_system: String,
    pub external_entity_kind: String,
    pub external_id: String,
    pub internal_table: String,
    pub internal_id: String,
    pub direction: MappingDirection,
    pub external_last_modified: DateTime<Utc>,
    pub internal_last_modified: DateTime<Utc>,
    pub soft_deleted: bool,
}

/// Outcome recorded against an `EventLedgerEntry` once processing settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingResult {
    Pending,
    Applied,
    SkippedConflict,
    SkippedDuplicate,
    Failed,
}

/// identity {external_system, external_event_id}; append-only, the basis
/// for idempotency (invariant I5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLedgerEntry {
    pub external_system: String,
    pub external_event_id: String,
    pub payload: serde_json::Value,
    pub payload_hash: String,
    pub received_at: DateTime<Utc>,
    pub external_occurred_at: DateTime<Utc>,
    pub processing_result: ProcessingResult,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkQueueStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

/// identity uuid; transitions monotonic except failed→pending on retry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkQueueItem {
    pub id: WorkQueueItemId,
    pub tenant: TenantId,
    pub subject_ref: String,
    pub status: WorkQueueStatus,
    pub attempts: u32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl WorkQueueItem {
    pub fn new(tenant: TenantId, subject_ref: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: WorkQueueItemId::generate(),
            tenant,
            subject_ref: subject_ref.into(),
            status: WorkQueueStatus::Pending,
            attempts: 0,
            last_error: None,
            created_at: now,
            processed_at: None,
        }
    }
}

/// Child row of a `GlobalTopic`: one contribution from a specific meeting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicSource {
    pub meeting_id: String,
    pub topic_index: u32,
    pub similarity_score: f64,
}

/// C5's canonical cluster; owns a set of `TopicSource` rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalTopic {
    pub id: GlobalTopicId,
    pub tenant: TenantId,
    pub canonical_title: String,
    pub canonical_description: String,
    pub source_count: u32,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub frequency_score: f64,
    pub recency_score: f64,
    pub relevance_score: f64,
    pub archived: bool,
    pub sources: Vec<TopicSource>,
}

impl GlobalTopic {
    pub fn new(
        tenant: TenantId,
        canonical_title: impl Into<String>,
        canonical_description: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: GlobalTopicId::generate(),
            tenant,
            canonical_title: canonical_title.into(),
            canonical_description: canonical_description.into(),
            source_count: 0,
            first_seen: now,
            last_seen: now,
            frequency_score: 0.0,
            recency_score: 0.0,
            relevance_score: 0.0,
            archived: false,
            sources: Vec::new(),
        }
    }

    pub fn is_active(&self) -> bool {
        !self.archived
    }

    pub fn blended_text(&self) -> String {
        format!("{} {}", self.canonical_title, self.canonical_description)
    }

    /// Returns false if `(meeting_id, topic_index)` already contributed a
    /// source row (spec §4.5 idempotency rule).
    pub fn already_has_source(&self, meeting_id: &str, topic_index: u32) -> bool {
        self.sources
            .iter()
            .any(|s| s.meeting_id == meeting_id && s.topic_index == topic_index)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingDecision {
    AutoExecute,
    HitlApprove,
    HitlEdit,
    Clarify,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
}

/// identity uuid; immutable once emitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiSuggestion {
    pub id: SuggestionId,
    pub tenant: TenantId,
    pub action_kind: ActionKind,
    pub confidence: f64,
    pub context_quality: u8,
    pub drafted_content: String,
    pub routing_decision: RoutingDecision,
    pub related_entity_refs: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackAction {
    Approved,
    Edited,
    Rejected,
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToneShift {
    MoreFormal,
    MoreCasual,
    Same,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LengthChange {
    Shorter,
    Longer,
    Same,
}

/// Structured diff of tone/length/CTA/personalization/bullets/complexity
/// between an original draft and its edited form (spec §4.4.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditDelta {
    pub tone_shift: ToneShift,
    pub length_change: LengthChange,
    pub length_delta_percent: i32,
    pub added_cta: bool,
    pub removed_cta: bool,
    pub changed_subject: bool,
    pub added_personalization: bool,
    pub removed_personalization: bool,
    pub added_bullet_points: bool,
    pub simplified_language: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    ReplyReceived,
    MeetingBooked,
    TaskCompleted,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomeMeasurement {
    pub measured: bool,
    pub positive: bool,
    pub kind: Option<OutcomeKind>,
}

impl Default for OutcomeMeasurement {
    fn default() -> Self {
        Self {
            measured: false,
            positive: false,
            kind: None,
        }
    }
}

/// identity uuid; immutable once written. `outcome` may be set exactly
/// once after the fact via `record_outcome`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiFeedback {
    pub id: FeedbackId,
    pub tenant: TenantId,
    pub suggestion_ref: SuggestionId,
    pub action: FeedbackAction,
    pub original_content: Option<String>,
    pub edited_content: Option<String>,
    pub edit_delta: Option<EditDelta>,
    pub confidence_at_generation: f64,
    pub context_quality_at_generation: u8,
    pub decision_latency_ms: i64,
    pub outcome: OutcomeMeasurement,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Formal,
    Professional,
    Casual,
    Friendly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreferredLength {
    Concise,
    Standard,
    Detailed,
}

/// Tri-state boolean: unknown until the user exhibits a preference
/// (spec §3: "tri-state").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriState {
    Unknown,
    True,
    False,
}

impl TriState {
    pub fn set(value: bool) -> Self {
        if value { Self::True } else { Self::False }
    }
}

impl Default for TriState {
    fn default() -> Self {
        Self::Unknown
    }
}

/// Learned + explicit preferences, keyed by user (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAiPreferences {
    pub tenant: TenantId,
    pub user: UserId,
    pub preferred_tone: Option<Tone>,
    pub preferred_length: Option<PreferredLength>,
    pub prefers_ctas: TriState,
    pub prefers_bullets: TriState,
    pub total_suggestions: u64,
    pub approvals: u64,
    pub edits: u64,
    pub rejections: u64,
    pub ignored: u64,
    pub approval_rate: f64,
    pub edit_rate: f64,
    pub rejection_rate: f64,
    pub ignored_rate: f64,
    pub auto_approve_threshold: Option<u8>,
    pub always_hitl_actions: HashSet<ActionKind>,
    pub never_auto_send: bool,
    pub notification_frequency: Option<String>,
    pub preferred_channels: Vec<String>,
}

impl UserAiPreferences {
    pub fn new(tenant: TenantId, user: UserId) -> Self {
        Self {
            tenant,
            user,
            preferred_tone: None,
            preferred_length: None,
            prefers_ctas: TriState::Unknown,
            prefers_bullets: TriState::Unknown,
            total_suggestions: 0,
            approvals: 0,
            edits: 0,
            rejections: 0,
            ignored: 0,
            approval_rate: 0.0,
            edit_rate: 0.0,
            rejection_rate: 0.0,
            ignored_rate: 0.0,
            auto_approve_threshold: None,
            always_hitl_actions: HashSet::new(),
            never_auto_send: false,
            notification_frequency: None,
            preferred_channels: Vec::new(),
        }
    }
}

/// Tenant-scoped analogue of `UserAiPreferences`, carrying org-wide
/// defaults that a user lookup falls back to when the user has not set
/// an explicit value: `auto_approve_threshold` and `always_hitl_actions`
/// are tenant-overridable per the routing table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrgAiPreferences {
    pub tenant: TenantId,
    pub auto_approve_threshold: u8,
    pub always_hitl_actions: HashSet<ActionKind>,
    pub never_auto_send: bool,
}

impl OrgAiPreferences {
    pub fn defaults(tenant: TenantId, config: &crate::config::CoreConfig) -> Self {
        Self {
            tenant,
            auto_approve_threshold: config.auto_approve_threshold_default,
            always_hitl_actions: config.always_hitl_actions_default.clone(),
            never_auto_send: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Immediate,
    Today,
    ThisWeek,
    Flexible,
}

/// Retrieval-only assembled context for an AI generation call (spec
/// §4.4.1). Every field is `Option` because the dossier is best-effort:
/// missing fields lower `context_quality` rather than failing assembly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextDossier {
    pub tenant: TenantId,
    pub contact: Option<serde_json::Value>,
    pub deal: Option<serde_json::Value>,
    pub meeting: Option<serde_json::Value>,
    pub email_history: Option<serde_json::Value>,
    pub user_preferences: Option<UserAiPreferences>,
    pub org_preferences: Option<OrgAiPreferences>,
    pub current_time: DateTime<Utc>,
    pub timezone: String,
    pub business_hours: bool,
    pub urgency: Urgency,
    pub context_quality: u8,
}
