//! C4 — AI Recommendation Pipeline: context dossier assembly, confidence
//! scoring and routing, edit-delta classification, and the preference
//! feedback loop that trains routing over time (spec §4.4).

pub mod dossier;
pub mod edit_delta;
pub mod feedback;
pub mod lexicon;
pub mod pipeline;
pub mod routing;
pub mod skill_guard;

pub use dossier::{DossierAssembler, DossierFieldSource, DossierRequest, DossierScope};
pub use edit_delta::classify as classify_edit_delta;
pub use feedback::FeedbackRecorder;
pub use pipeline::AiPipeline;
pub use routing::{confidence_level, effective_confidence, route};
pub use skill_guard::SkillInvocationGuard;
