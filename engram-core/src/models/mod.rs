//! Cross-subsystem data models exchanged through the backend traits.

mod breaker;
mod code;
mod codebase;
mod consolidation;
mod doc;
mod filter;
mod health;
mod knowledge;
mod retrieval;
mod schema;

pub use breaker::{BreakerSnapshot, CircuitState};
pub use code::{
    ClassRecord, CodeBundle, CodeFileRecord, CodeIngestCounts, CodeRelationKind,
    CodeRelationship, FunctionRecord, ImportRecord,
};
pub use codebase::{
    CodebaseIdentity, CodebaseRecord, IngestionRecord, TrackResult, TrackStatus,
};
pub use consolidation::{DuplicatePair, MemoryDigest, QualityInputs, QualityUpdate};
pub use doc::{CodeReference, DocConcept, DocIngestCounts, DocLink, DocSection, ParsedDoc};
pub use filter::IsolationFilter;
pub use health::{ContainerStatus, GraphTotals};
pub use knowledge::{
    ApiReferenceRecord, ExternalDocRecord, ExternalLinkKind, KnowledgeSource,
};
pub use retrieval::{MemoryCandidate, MemoryHit};
pub use schema::{AgentTypeSeed, ConstraintDef, IndexDef};
