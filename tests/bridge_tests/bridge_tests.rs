//! Tests for Bridge
//!
//! These tests verify:
//! - Command text and placement in the store
//! - Fire-and-forget versus polled operations
//! - Poll budget, spacing and early success
//! - Cancellation, store failures and slot exhaustion
//! - Stale response handling and re-polling

#[path = "../common/mod.rs"]
mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{RecordingStore, StoreOp};
use dby_bridge::bridge::{COMMAND_INSERTED, NO_RESPONSE, QUEUE_FULL};
use dby_bridge::protocol::EntityRef;
use dby_bridge::slot::{SerializedAllocator, SlotAllocator};
use dby_bridge::{
    AllocationMode, Bridge, BridgeConfig, BridgeError, CancelSource, CancelToken, KeyValueStore,
    Operation, Outcome, PollPolicy, Slot,
};
use proptest::prelude::*;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup() -> (Arc<RecordingStore>, Bridge) {
    setup_with(BridgeConfig::builder().poll_interval_ms(5).build())
}

fn setup_with(config: BridgeConfig) -> (Arc<RecordingStore>, Bridge) {
    let store = Arc::new(RecordingStore::new());
    let bridge = Bridge::new(store.clone(), &config).unwrap();
    (store, bridge)
}

fn person() -> Operation {
    Operation::define_entity("Person", vec!["name", "age"], vec!["string", "int"])
}

fn list_people() -> Operation {
    Operation::list_entity("Person")
}

const RESPONSE_0: &str = "dby_response_queue_0";
const COMMAND_0: &str = "dby_command_queue_0";

// =============================================================================
// Command Placement Tests
// =============================================================================

#[test]
fn test_define_entity_writes_command_to_first_slot() {
    let (store, bridge) = setup();

    let outcome = bridge.invoke(&person(), &CancelToken::never());

    assert_eq!(outcome.response(), Some(""));
    assert_eq!(
        store.inner().get(COMMAND_0).unwrap().as_deref(),
        Some("def Person(name_string,age_int)")
    );
    assert_eq!(
        store.inner().get("dby_command_queue_counter").unwrap().as_deref(),
        Some("1")
    );
}

#[test]
fn test_remove_entity_text() {
    let (store, bridge) = setup();

    bridge.invoke(&Operation::remove_entity("Widget"), &CancelToken::never());

    assert!(store
        .sets()
        .contains(&(COMMAND_0.to_string(), "rm ent Widget".to_string())));
}

#[test]
fn test_consecutive_requests_use_consecutive_slots() {
    let (store, bridge) = setup();

    bridge.invoke(&person(), &CancelToken::never());
    bridge.invoke(&Operation::remove_entity("Widget"), &CancelToken::never());

    assert_eq!(
        store.inner().get("dby_command_queue_1").unwrap().as_deref(),
        Some("rm ent Widget")
    );
}

#[test]
fn test_stale_response_cleared_before_command_written() {
    let (store, bridge) = setup();
    store.inner().set(RESPONSE_0, "left over").unwrap();

    bridge.invoke(&person(), &CancelToken::never());

    let ops = store.ops();
    let cleared = ops
        .iter()
        .position(|op| *op == StoreOp::Delete(RESPONSE_0.to_string()))
        .unwrap();
    let written = ops
        .iter()
        .position(|op| matches!(op, StoreOp::Set(k, _) if k == COMMAND_0))
        .unwrap();
    assert!(cleared < written);
    assert_eq!(store.inner().get(RESPONSE_0).unwrap(), None);
}

// =============================================================================
// Fire-and-forget Tests
// =============================================================================

#[test]
fn test_fire_and_forget_never_polls() {
    let (store, bridge) = setup();

    let outcome = bridge.invoke(&person(), &CancelToken::never());

    assert!(outcome.is_accepted());
    assert_eq!(outcome.message(), COMMAND_INSERTED);
    assert_eq!(store.gets_of(RESPONSE_0), 0);
}

#[test]
fn test_every_mutation_is_fire_and_forget() {
    let (store, bridge) = setup();
    let left = EntityRef::new("Person", vec!["name"], vec!["ann"]);
    let right = EntityRef::new("Company", vec!["name"], vec!["acme"]);

    let ops = vec![
        person(),
        Operation::AddRelation {
            left: left.clone(),
            right: right.clone(),
        },
        Operation::remove_entity("Person"),
        Operation::RemoveRelation { left, right },
        Operation::Generate,
    ];

    for op in &ops {
        let outcome = bridge.invoke(op, &CancelToken::never());
        assert_eq!(outcome.response(), Some(""), "{:?}", op);
    }

    let response_gets = store
        .ops()
        .into_iter()
        .filter(|op| matches!(op, StoreOp::Get(k) if k.starts_with("dby_response_queue_")))
        .count();
    assert_eq!(response_gets, 0);
    assert!(store.sets().contains(&("dby_command_queue_4".to_string(), "gen".to_string())));
}

// =============================================================================
// Polling Tests
// =============================================================================

#[test]
fn test_response_on_third_attempt() {
    let (store, bridge) = setup();
    store.respond_on_get(RESPONSE_0, 3, "[\"Person\"]");

    let outcome = bridge.invoke(&list_people(), &CancelToken::never());

    assert_eq!(outcome.response(), Some("[\"Person\"]"));
    assert_eq!(store.gets_of(RESPONSE_0), 3);
    assert_eq!(store.inner().get(RESPONSE_0).unwrap(), None);
}

#[test]
fn test_response_on_first_attempt_skips_waiting() {
    let config = BridgeConfig::builder().poll_interval_ms(1000).build();
    let (store, bridge) = setup_with(config);
    store.respond_on_get(RESPONSE_0, 1, "ok");

    let started = std::time::Instant::now();
    let outcome = bridge.invoke(&list_people(), &CancelToken::never());

    assert_eq!(outcome.response(), Some("ok"));
    assert!(started.elapsed() < Duration::from_millis(500));
}

#[test]
fn test_empty_response_counts_as_absent() {
    let (store, bridge) = setup();
    store.on_get(|key, count, inner| {
        if key == RESPONSE_0 {
            let text = if count == 1 { "" } else { "found" };
            inner.set(key, text).unwrap();
        }
    });

    let outcome = bridge.invoke(&list_people(), &CancelToken::never());

    assert_eq!(outcome.response(), Some("found"));
    assert_eq!(store.gets_of(RESPONSE_0), 2);
}

#[test]
fn test_no_response_is_pending_after_exact_budget() {
    let config = BridgeConfig::builder()
        .poll_interval_ms(20)
        .max_attempts(5)
        .build();
    let (store, bridge) = setup_with(config);

    let outcome = bridge.invoke(&list_people(), &CancelToken::never());

    assert!(matches!(outcome, Outcome::Pending(slot) if slot == Slot::new(0)));
    assert_eq!(outcome.message(), NO_RESPONSE);

    let times = store.get_times(RESPONSE_0);
    assert_eq!(times.len(), 5);
    for pair in times.windows(2) {
        assert!(pair[1] - pair[0] >= Duration::from_millis(20));
    }
}

#[test]
fn test_explicit_policy_overrides_config() {
    let (store, bridge) = setup();

    let policy = PollPolicy::new(Duration::from_millis(1), 2);
    let outcome = bridge.invoke_with(&list_people(), policy, &CancelToken::never());

    assert!(outcome.is_pending());
    assert_eq!(store.gets_of(RESPONSE_0), 2);
}

#[test]
fn test_pending_slot_can_be_polled_again() {
    let (store, bridge) = setup();
    let policy = PollPolicy::new(Duration::from_millis(1), 2);

    let slot = match bridge.invoke_with(&list_people(), policy, &CancelToken::never()) {
        Outcome::Pending(slot) => slot,
        other => panic!("expected Pending, got {:?}", other),
    };

    store.inner().set(&bridge.keys().response_key(slot), "late").unwrap();
    let outcome = bridge.poll(slot, policy, &CancelToken::never());

    assert_eq!(outcome.response(), Some("late"));
}

#[test]
fn test_list_relation_polls() {
    let (store, bridge) = setup();
    store.respond_on_get(RESPONSE_0, 1, "[]");

    let op = Operation::ListRelation {
        left: EntityRef::bare("A"),
        right: EntityRef::bare("B"),
    };
    let outcome = bridge.invoke(&op, &CancelToken::never());

    assert_eq!(outcome.response(), Some("[]"));
    assert_eq!(
        store.inner().get(COMMAND_0).unwrap().as_deref(),
        Some("lst rel A() B()")
    );
}

// =============================================================================
// Cancellation Tests
// =============================================================================

#[test]
fn test_cancelled_before_start_touches_nothing() {
    let (store, bridge) = setup();

    let outcome = bridge.invoke(&list_people(), &CancelToken::cancelled());

    assert!(matches!(outcome.error(), Some(BridgeError::Cancelled)));
    assert_eq!(store.gets_of(RESPONSE_0), 0);
    assert!(store.ops().is_empty());
}

#[test]
fn test_cancel_during_wait_stops_polling() {
    let config = BridgeConfig::builder().poll_interval_ms(5000).build();
    let (store, bridge) = setup_with(config);

    let source = Arc::new(CancelSource::new());
    let token = source.token();
    let hook_source = Arc::clone(&source);
    store.on_get(move |key, _, _| {
        if key == RESPONSE_0 {
            hook_source.cancel();
        }
    });

    let started = std::time::Instant::now();
    let outcome = bridge.invoke(&list_people(), &token);

    assert!(matches!(outcome.error(), Some(BridgeError::Cancelled)));
    assert_eq!(store.gets_of(RESPONSE_0), 1);
    assert!(started.elapsed() < Duration::from_millis(2500));
}

#[test]
fn test_deadline_bounds_a_long_poll() {
    let config = BridgeConfig::builder()
        .poll_interval_ms(20)
        .max_attempts(1000)
        .build();
    let (store, bridge) = setup_with(config);

    let token = CancelToken::never().with_timeout(Duration::from_millis(100));
    let started = std::time::Instant::now();
    let outcome = bridge.invoke(&list_people(), &token);

    assert!(matches!(outcome.error(), Some(BridgeError::Cancelled)));
    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(store.gets_of(RESPONSE_0) < 1000);
}

// =============================================================================
// Failure Tests
// =============================================================================

#[test]
fn test_validation_failure_never_touches_store() {
    let (store, bridge) = setup();
    let op = Operation::define_entity("Person", vec!["name", "age"], vec!["string"]);

    let outcome = bridge.invoke(&op, &CancelToken::never());

    assert!(matches!(outcome.error(), Some(BridgeError::Validation(_))));
    assert!(outcome
        .message()
        .starts_with("Count of fields and types do not match"));
    assert!(store.ops().is_empty());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_mismatched_lengths_fail_without_store_access(
        fields in prop::collection::vec("[a-z]{1,4}", 0..5),
        others in prop::collection::vec("[a-z]{1,4}", 0..5),
        relation in any::<bool>(),
    ) {
        prop_assume!(fields.len() != others.len());
        let (store, bridge) = setup();

        let op = if relation {
            Operation::ListRelation {
                left: EntityRef::new("A", fields, others),
                right: EntityRef::bare("B"),
            }
        } else {
            Operation::define_entity("A", fields, others)
        };
        let outcome = bridge.invoke(&op, &CancelToken::never());

        prop_assert!(matches!(outcome.error(), Some(BridgeError::Validation(_))));
        prop_assert!(store.ops().is_empty());
    }
}

#[test]
fn test_unavailable_store() {
    let (store, bridge) = setup();
    store.set_unavailable(true);

    let outcome = bridge.invoke(&person(), &CancelToken::never());

    let error = outcome.error().unwrap();
    assert!(matches!(error, BridgeError::StoreUnavailable(_)));
    assert!(error.is_retryable());
}

#[test]
fn test_full_ring_reports_queue_full() {
    let (store, bridge) = setup();
    for slot in 0..10 {
        store
            .inner()
            .set(&format!("dby_command_queue_{}", slot), "busy")
            .unwrap();
    }

    let outcome = bridge.invoke(&person(), &CancelToken::never());

    assert!(matches!(outcome.error(), Some(BridgeError::SlotsExhausted)));
    assert_eq!(outcome.message(), QUEUE_FULL);
    assert!(store.sets().is_empty());
}

// =============================================================================
// Configuration Tests
// =============================================================================

#[test]
fn test_invalid_config_is_rejected() {
    let store = Arc::new(RecordingStore::new());

    let zero_slots = BridgeConfig::builder().max_slots(0).build();
    assert!(matches!(
        Bridge::new(store.clone(), &zero_slots),
        Err(BridgeError::Config(_))
    ));

    let zero_attempts = BridgeConfig::builder().max_attempts(0).build();
    assert!(matches!(
        Bridge::new(store.clone(), &zero_attempts),
        Err(BridgeError::Config(_))
    ));

    let same_prefix = BridgeConfig::builder()
        .command_prefix("q_")
        .response_prefix("q_")
        .build();
    assert!(matches!(
        Bridge::new(store, &same_prefix),
        Err(BridgeError::Config(_))
    ));
}

#[test]
fn test_custom_key_layout() {
    let config = BridgeConfig::builder()
        .command_prefix("cmd:")
        .response_prefix("rsp:")
        .counter_key("cmd:next")
        .build();
    let (store, bridge) = setup_with(config);

    bridge.invoke(&person(), &CancelToken::never());

    assert!(store.inner().exists("cmd:0").unwrap());
    assert_eq!(store.inner().get("cmd:next").unwrap().as_deref(), Some("1"));
}

#[test]
fn test_serialized_allocation_mode() {
    let config = BridgeConfig::builder()
        .allocation(AllocationMode::Serialized)
        .build();
    let (store, bridge) = setup_with(config);

    bridge.invoke(&person(), &CancelToken::never());
    bridge.invoke(&Operation::remove_entity("Widget"), &CancelToken::never());

    assert!(store.inner().exists(COMMAND_0).unwrap());
    assert!(store.inner().exists("dby_command_queue_1").unwrap());
}

#[test]
fn test_bridges_sharing_an_allocator() {
    let store = Arc::new(RecordingStore::new());
    let config = BridgeConfig::default();
    let handle =
        SerializedAllocator::spawn(SlotAllocator::new(store.clone(), config.key_space())).unwrap();

    let first = Bridge::with_allocator(store.clone(), &config, handle.clone()).unwrap();
    let second = Bridge::with_allocator(store.clone(), &config, handle).unwrap();

    first.invoke(&person(), &CancelToken::never());
    second.invoke(&person(), &CancelToken::never());

    assert!(store.inner().exists(COMMAND_0).unwrap());
    assert!(store.inner().exists("dby_command_queue_1").unwrap());
}
