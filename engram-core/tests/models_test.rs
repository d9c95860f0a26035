use proptest::prelude::*;

use engram_core::memory::{
    AgentRole, MemoryDraft, MemoryRecord, MemoryScope, MemoryType, Outcome, Score,
};
use engram_core::models::TrackStatus;

#[test]
fn memory_type_serializes_as_snake_case() {
    assert_eq!(
        serde_json::to_string(&MemoryType::ShortTerm).unwrap(),
        "\"short_term\""
    );
    assert_eq!(
        serde_json::to_string(&MemoryType::AntiPattern).unwrap(),
        "\"anti_pattern\""
    );
    let parsed: MemoryType = serde_json::from_str("\"prospective\"").unwrap();
    assert_eq!(parsed, MemoryType::Prospective);
}

#[test]
fn outcome_serializes_as_snake_case() {
    assert_eq!(
        serde_json::to_string(&Outcome::Successful).unwrap(),
        "\"successful\""
    );
}

#[test]
fn agent_role_serializes_as_kebab_case() {
    assert_eq!(
        serde_json::to_string(&AgentRole::ApiDesigner).unwrap(),
        "\"api-designer\""
    );
    assert_eq!(
        serde_json::to_string(&AgentRole::PreCommitDiagnostic).unwrap(),
        "\"pre-commit-diagnostic\""
    );
}

#[test]
fn track_status_serializes_lowercase() {
    assert_eq!(serde_json::to_string(&TrackStatus::New).unwrap(), "\"new\"");
    assert_eq!(
        serde_json::to_string(&TrackStatus::Error).unwrap(),
        "\"error\""
    );
}

#[test]
fn memory_record_round_trips_through_json() {
    let record = MemoryRecord {
        id: "m1".to_string(),
        content: "use arenas".to_string(),
        agent_type: "architect".to_string(),
        category: "design".to_string(),
        memory_type: MemoryType::Procedural,
        quality_score: 0.63,
        confidence: 0.9,
        importance: Some(7),
        validation_count: 2,
        application_count: 3,
        success_rate: 2.0 / 3.0,
        access_count: 5,
        tags: vec!["arenas".to_string()],
        metadata: "{}".to_string(),
        created_at: 1_700_000_000_000,
        last_validated: 1_700_000_000_000,
        accessed_at: None,
        last_used: Some(1_700_000_100_000),
        expires_at: None,
        parent_id: None,
        agent_instance_id: Some("architect_ab12cd34".to_string()),
        scope: MemoryScope::project("p1"),
        archived: false,
        promoted_at: None,
        promoted_from: None,
        decayed_at: None,
        merged_into: None,
        merged_at: None,
        last_quality_update: None,
    };

    let json = serde_json::to_string(&record).unwrap();
    let back: MemoryRecord = serde_json::from_str(&json).unwrap();
    assert_eq!(back.id, record.id);
    assert_eq!(back.memory_type, record.memory_type);
    assert_eq!(back.scope, record.scope);
    assert_eq!(back.importance, record.importance);
}

#[test]
fn draft_scope_constructors() {
    let draft = MemoryDraft {
        id: "m1".to_string(),
        content: String::new(),
        agent_type: "tester".to_string(),
        category: "general".to_string(),
        memory_type: MemoryType::Episodic,
        quality_score: 0.5,
        confidence: 0.7,
        importance: None,
        tags: Vec::new(),
        metadata: "{}".to_string(),
        scope: MemoryScope::universal("tester"),
        agent_instance_id: None,
        created_at: 0,
    };
    assert_eq!(draft.scope.id, "tester");
}

proptest! {
    #[test]
    fn score_construction_is_clamped_and_idempotent(value in -10.0f64..10.0) {
        let score = Score::new(value);
        prop_assert!((0.0..=1.0).contains(&score.value()));
        prop_assert_eq!(Score::new(score.value()).value(), score.value());
    }
}
