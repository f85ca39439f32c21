//! Integration tests for MovesetManager and the combo sweeper
//!
//! These tests verify that:
//! - Model edits emit change events to every subscriber
//! - Concurrent readers and writers see a consistent model
//! - The background sweeper re-rolls NPCs whose combo window expired

use mockall::mock;
use stancecraft::models::{
    ActorSnapshot, ConfigurationEntry, CycleMode, FormRef, RuleMatch, RuleRef, SourceRef, VariantInstance,
};
use stancecraft::{ActorSource, AnimationLibrary, ComboTracker, ModelChange, MovesetManager, MovesetModel};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{Duration, timeout};

mock! {
    Host {}

    impl ActorSource for Host {
        fn snapshot(&self, actor: &FormRef) -> Option<ActorSnapshot>;
        fn equipped_category(&self, actor: &FormRef) -> Option<String>;
    }
}

fn entries(count: u32) -> Vec<ConfigurationEntry> {
    (0..count)
        .map(|i| ConfigurationEntry::new(format!("Set {i}"), vec![VariantInstance::parent(SourceRef::new(0, i))]))
        .collect()
}

fn manager() -> Arc<MovesetManager> {
    Arc::new(MovesetManager::new(MovesetModel::default(), AnimationLibrary::new()))
}

#[tokio::test]
async fn test_rule_events_emitted() {
    let manager = manager();
    let mut rx = manager.subscribe();

    let rule = manager
        .add_rule("Bandits", RuleMatch::Faction(FormRef::new("Skyrim.esm", 0x1BCC0)))
        .unwrap();

    let event = timeout(Duration::from_millis(100), rx.recv())
        .await
        .expect("Timeout waiting for event")
        .expect("Channel closed");

    assert_eq!(
        event,
        ModelChange::RuleAdded {
            rule,
            name: "Bandits".to_string()
        }
    );

    manager.remove_rule(0).unwrap();
    let event = timeout(Duration::from_millis(100), rx.recv())
        .await
        .expect("Timeout waiting for event")
        .expect("Channel closed");
    assert!(
        matches!(&event, ModelChange::RuleRemoved { name } if name == "Bandits"),
        "Expected RuleRemoved event, got: {:?}",
        event
    );
}

#[tokio::test]
async fn test_multiple_subscribers_receive_events() {
    let manager = manager();
    let mut rx1 = manager.subscribe();
    let mut rx2 = manager.subscribe();

    manager
        .set_stance_entries(RuleRef::Player, "Mace", 2, entries(2))
        .unwrap();

    let expected = ModelChange::StanceEdited {
        rule: RuleRef::Player,
        category: "Mace".to_string(),
        stance: 2,
    };
    for rx in [&mut rx1, &mut rx2] {
        let event = timeout(Duration::from_millis(100), rx.recv())
            .await
            .expect("Timeout waiting for event")
            .expect("Channel closed");
        assert_eq!(event, expected);
    }
}

#[tokio::test]
async fn test_player_cycling_events() {
    let manager = manager();
    manager
        .set_stance_entries(RuleRef::Player, "Sword", 1, entries(3))
        .unwrap();
    let mut rx = manager.subscribe();

    manager.set_player_stance(1);
    let mut rng = rand::thread_rng();
    manager.next_player_variant("Sword", &mut rng);

    let stance = rx.recv().await.unwrap();
    assert_eq!(stance, ModelChange::StanceChanged { stance: 1 });
    let variant = rx.recv().await.unwrap();
    assert_eq!(
        variant,
        ModelChange::VariantChanged {
            category: "Sword".to_string(),
            ordinal: 1
        }
    );

    manager.set_cycle_mode(CycleMode::Random);
    let mut picks = Vec::new();
    for _ in 0..10 {
        picks.push(manager.next_player_variant("Sword", &mut rng));
    }
    assert!(picks.iter().all(|p| (1..=3).contains(p)));
    assert!(picks.windows(2).all(|w| w[0] != w[1]));
}

#[tokio::test]
async fn test_concurrent_access() {
    let manager = manager();
    let mut handles = Vec::new();

    for i in 0..8u32 {
        let manager = Arc::clone(&manager);
        handles.push(tokio::task::spawn_blocking(move || {
            let stance = (i % 4) as usize;
            manager
                .set_stance_entries(RuleRef::General, "Dagger", stance, entries(i + 1))
                .unwrap();
            manager.max_variants(RuleRef::General, "Dagger", stance)
        }));
    }

    for handle in handles {
        let count = handle.await.unwrap();
        assert!((1..=8).contains(&count));
    }

    // Last writer per stance wins; the cache agrees with the model
    for stance in 0..4 {
        let in_model = manager.read(|m| m.general.categories["Dagger"].stances[stance].parent_count());
        assert_eq!(manager.max_variants(RuleRef::General, "Dagger", stance), in_model);
    }
}

#[tokio::test]
async fn test_sweeper_rerolls_expired_windows() {
    let manager = manager();
    manager
        .set_stance_entries(RuleRef::General, "Sword", 0, entries(4))
        .unwrap();

    let mut host = MockHost::new();
    host.expect_snapshot()
        .returning(|actor| Some(ActorSnapshot::new(actor.clone(), FormRef::new("Skyrim.esm", 0x13746))));
    host.expect_equipped_category()
        .returning(|_| Some("Sword".to_string()));

    let tracker = Arc::new(ComboTracker::new(Duration::from_millis(20)).with_sweep_period(Duration::from_millis(5)));
    let mut rx = tracker.subscribe();
    let actor = FormRef::new("Skyrim.esm", 0x1A694);
    tracker.open_window(&actor, Instant::now());

    let handle = Arc::clone(&tracker).spawn_sweeper(Arc::new(host), Arc::clone(&manager));

    let event = timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("Timeout waiting for reroll")
        .expect("Channel closed");
    handle.abort();

    assert_eq!(event.actor, actor);
    assert!((1..=4).contains(&event.ordinal));
    assert_eq!(event.tier, 0);
    assert_eq!(tracker.current_ordinal(&actor), event.ordinal);
    assert!(!tracker.is_open(&actor));
    assert_eq!(manager.metrics().npc_rerolls(), 1);
}
