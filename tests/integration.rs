//! Integration tests for hostforge

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use hostforge::name::{builder, validate_template};
use hostforge::store::{NewTemplate, NewTemplateGroup};
use hostforge::{
    CommitRequest, DiscoveryConfig, GroupRule, HostForgeError, HostProbe, HostnameStatus,
    MemoryStore, ProbeResult, RangeScanner, ReleaseRequest, ReservationEngine,
    ReservationRequest, ScanConfig, ScanOptions, SequenceAllocator, TemplateStore,
};

/// Stub probe that resolves names whose trailing sequence falls in a band
struct BandProbe {
    low: i64,
    high: i64,
}

#[async_trait]
impl HostProbe for BandProbe {
    async fn check(&self, hostname: &str) -> hostforge::Result<ProbeResult> {
        let exists = builder::trailing_sequence(hostname)
            .map(|seq| seq >= self.low && seq <= self.high)
            .unwrap_or(false);
        Ok(ProbeResult {
            hostname: hostname.to_string(),
            exists,
            ip_address: exists.then(|| "192.0.2.10".to_string()),
            checked_at: Utc::now(),
        })
    }
}

/// Create a `srv` + zero-padded 3-digit sequence template (max length 6)
async fn seed_template(store: &MemoryStore) -> i64 {
    let template = TemplateStore::create(
        store,
        NewTemplate {
            name: "app-servers".to_string(),
            description: "application tier".to_string(),
            max_length: 6,
            sequence_start: 1,
            sequence_length: 3,
            sequence_padding: true,
            sequence_increment: 1,
            is_active: true,
            created_by: "admin".to_string(),
        },
    )
    .await
    .unwrap();
    store
        .create_group(NewTemplateGroup {
            template_id: template.id,
            name: "prefix".to_string(),
            length: 3,
            position: 1,
            is_required: true,
            rule: GroupRule::Fixed("srv".to_string()),
        })
        .await
        .unwrap();
    store
        .create_group(NewTemplateGroup {
            template_id: template.id,
            name: "seq".to_string(),
            length: 3,
            position: 2,
            is_required: true,
            rule: GroupRule::Sequence,
        })
        .await
        .unwrap();
    template.id
}

fn engine(store: &Arc<MemoryStore>) -> ReservationEngine {
    ReservationEngine::new(Arc::clone(store) as _, Arc::clone(store) as _)
}

#[tokio::test]
async fn test_end_to_end_generation() {
    let store = Arc::new(MemoryStore::new());
    let template_id = seed_template(&store).await;
    let template = TemplateStore::get(store.as_ref(), template_id).await.unwrap();

    assert!(validate_template(&template).is_ok());
    assert_eq!(builder::render(&template, 1, &HashMap::new()).unwrap(), "srv001");

    // srv1000 is 7 characters against a max of 6
    let err = builder::render(&template, 1000, &HashMap::new()).unwrap_err();
    assert!(matches!(err, HostForgeError::Validation { .. }));
}

#[tokio::test]
async fn test_full_lifecycle() {
    let store = Arc::new(MemoryStore::new());
    let template_id = seed_template(&store).await;
    let engine = engine(&store);

    let reserved = engine
        .reserve(&ReservationRequest {
            template_id,
            params: HashMap::new(),
            requested_by: "alice".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(reserved.name, "srv001");
    assert_eq!(reserved.status, HostnameStatus::Reserved);

    let committed = engine
        .commit(&CommitRequest {
            hostname_id: reserved.id,
            committed_by: "bob".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(committed.status, HostnameStatus::Committed);

    let released = engine
        .release(&ReleaseRequest {
            hostname_id: reserved.id,
            released_by: "bob".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(released.status, HostnameStatus::Released);

    // A second reservation picks up the next sequence
    let next = engine
        .reserve(&ReservationRequest {
            template_id,
            params: HashMap::new(),
            requested_by: "alice".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(next.name, "srv002");
    assert_eq!(next.sequence_num, 2);
}

#[tokio::test]
async fn test_transition_order_is_enforced() {
    let store = Arc::new(MemoryStore::new());
    let template_id = seed_template(&store).await;
    let engine = engine(&store);

    let reserved = engine
        .reserve(&ReservationRequest {
            template_id,
            params: HashMap::new(),
            requested_by: "alice".to_string(),
        })
        .await
        .unwrap();

    // Release before commit
    let err = engine
        .release(&ReleaseRequest {
            hostname_id: reserved.id,
            released_by: "bob".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, HostForgeError::StateConflict { .. }));

    engine
        .commit(&CommitRequest {
            hostname_id: reserved.id,
            committed_by: "bob".to_string(),
        })
        .await
        .unwrap();

    // Commit twice
    let err = engine
        .commit(&CommitRequest {
            hostname_id: reserved.id,
            committed_by: "bob".to_string(),
        })
        .await
        .unwrap_err();
    match err {
        HostForgeError::StateConflict { current, .. } => {
            assert_eq!(current, HostnameStatus::Committed)
        }
        other => panic!("expected StateConflict, got {:?}", other),
    }
}

#[tokio::test]
async fn test_sequence_allocation_follows_existing_names() {
    let store = Arc::new(MemoryStore::new());
    let template_id = seed_template(&store).await;
    let template = TemplateStore::get(store.as_ref(), template_id).await.unwrap();

    let allocator = SequenceAllocator::new(Arc::clone(&store) as _);
    assert_eq!(allocator.next_sequence(&template).await.unwrap(), 1);

    let engine = engine(&store);
    engine
        .reserve(&ReservationRequest {
            template_id,
            params: HashMap::new(),
            requested_by: "alice".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(allocator.next_sequence(&template).await.unwrap(), 2);
}

#[tokio::test]
async fn test_scan_counts_existing_names() {
    let store = Arc::new(MemoryStore::new());
    let template_id = seed_template(&store).await;
    let probe = Arc::new(BandProbe { low: 3, high: 7 });
    let scanner = RangeScanner::new(Arc::clone(&store) as _, probe as _);

    let result = scanner
        .scan(ScanOptions {
            template_id,
            start_seq: 1,
            end_seq: 20,
            params: HashMap::new(),
            max_concurrent: 4,
        })
        .await
        .unwrap();

    assert_eq!(result.template_name, "app-servers");
    assert_eq!(result.total_hostnames, 20);
    assert_eq!(result.existing_hostnames, 5);
    let hit = result.results.iter().find(|r| r.hostname == "srv005").unwrap();
    assert!(hit.exists);
    assert_eq!(hit.ip_address.as_deref(), Some("192.0.2.10"));
}

#[tokio::test]
async fn test_discovery_against_synthetic_band() {
    let store = Arc::new(MemoryStore::new());
    let template = TemplateStore::create(
        store.as_ref(),
        NewTemplate {
            name: "wide".to_string(),
            description: String::new(),
            max_length: 10,
            sequence_start: 1,
            sequence_length: 3,
            sequence_padding: true,
            sequence_increment: 1,
            is_active: true,
            created_by: "admin".to_string(),
        },
    )
    .await
    .unwrap();
    store
        .create_group(NewTemplateGroup {
            template_id: template.id,
            name: "prefix".to_string(),
            length: 4,
            position: 1,
            is_required: true,
            rule: GroupRule::Fixed("node".to_string()),
        })
        .await
        .unwrap();
    store
        .create_group(NewTemplateGroup {
            template_id: template.id,
            name: "seq".to_string(),
            length: 3,
            position: 2,
            is_required: true,
            rule: GroupRule::Sequence,
        })
        .await
        .unwrap();

    let probe = Arc::new(BandProbe { low: 100, high: 150 });
    let scanner = RangeScanner::with_config(
        Arc::clone(&store) as _,
        probe as _,
        ScanConfig::default(),
        DiscoveryConfig::default(),
    );

    let (lowest, highest) = scanner
        .discover_range(template.id, &HashMap::new())
        .await
        .unwrap();
    assert_eq!((lowest, highest), (100, 150));

    let usage = scanner.analyze_usage(template.id, 30).await.unwrap();
    assert_eq!(usage.get("NO").copied(), Some(30));
}

#[tokio::test]
async fn test_scan_result_serializes() {
    let store = Arc::new(MemoryStore::new());
    let template_id = seed_template(&store).await;
    let probe = Arc::new(BandProbe { low: 1, high: 2 });
    let scanner = RangeScanner::new(Arc::clone(&store) as _, probe as _);

    let result = scanner
        .scan(ScanOptions {
            template_id,
            start_seq: 1,
            end_seq: 3,
            params: HashMap::new(),
            max_concurrent: 0,
        })
        .await
        .unwrap();

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["template_name"], "app-servers");
    assert_eq!(json["total_hostnames"], 3);
    assert_eq!(json["existing_hostnames"], 2);
}

#[test]
fn test_error_messages() {
    let err = HostForgeError::state_conflict(HostnameStatus::Reserved, HostnameStatus::Released);
    assert!(err.to_string().contains("reserved"));
    assert!(err.to_string().contains("released"));

    let err = HostForgeError::validation("bad input");
    assert!(err.to_string().contains("bad input"));
}

#[test]
fn test_library_initialization() {
    assert!(hostforge::init().is_ok());
    assert!(!hostforge::VERSION.is_empty());
}
