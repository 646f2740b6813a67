//! Integration tests for the sync engine, planner, and periodic worker.

use fabric_agent::{
    CommandStatus, FabricCommand, FabricExecutor, FabricOperation, FabricResult, MockExecutor,
};
use fabric_journal::{EntryState, JournalStore, MemoryJournal, Operation, Payload, ResourceType};
use fabric_sync_engine::{StopOutcome, SyncConfig, SyncEngine, SyncService, WakeSignal};
use fabric_testkit::prelude::*;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

type MemoryEngine = SyncEngine<MemoryJournal, MockExecutor>;

fn memory_engine() -> MemoryEngine {
    SyncEngine::new(
        SyncConfig::default(),
        Arc::new(MemoryJournal::new()),
        Arc::new(MockExecutor::new()),
    )
}

/// An executor that panics on its first command, then delegates.
struct PanicOnce {
    armed: AtomicBool,
    inner: MockExecutor,
}

impl FabricExecutor for PanicOnce {
    fn execute(&self, command: &FabricCommand) -> FabricResult<CommandStatus> {
        if self.armed.swap(false, Ordering::SeqCst) {
            panic!("controller session crashed");
        }
        self.inner.execute(command)
    }
}

/// Replaces one entry from inside the first command it runs, like a producer
/// racing the pass.
struct SupersedeDuring {
    store: Arc<MemoryJournal>,
    resource: (String, ResourceType),
    replacement: Mutex<Option<(Payload, EntryState)>>,
    inner: MockExecutor,
}

impl SupersedeDuring {
    fn new(
        store: &Arc<MemoryJournal>,
        id: &str,
        resource_type: ResourceType,
        payload: Payload,
        state: EntryState,
    ) -> Self {
        Self {
            store: Arc::clone(store),
            resource: (id.to_string(), resource_type),
            replacement: Mutex::new(Some((payload, state))),
            inner: MockExecutor::new(),
        }
    }
}

impl FabricExecutor for SupersedeDuring {
    fn execute(&self, command: &FabricCommand) -> FabricResult<CommandStatus> {
        if let Some((payload, state)) = self.replacement.lock().take() {
            let (id, resource_type) = &self.resource;
            self.store
                .supersede(id, *resource_type, payload, state)
                .unwrap()
                .unwrap();
        }
        self.inner.execute(command)
    }
}

/// Holds every `create` until released.
struct GatedCreate {
    entered: WakeSignal,
    release: WakeSignal,
    inner: MockExecutor,
}

impl FabricExecutor for GatedCreate {
    fn execute(&self, command: &FabricCommand) -> FabricResult<CommandStatus> {
        if command.operation() == FabricOperation::Create {
            self.entered.set();
            self.release.wait();
        }
        self.inner.execute(command)
    }
}

#[test]
fn wakes_coalesce_into_one_pass() {
    let engine = memory_engine();
    seed_port(engine.store().as_ref(), "p1", "n1", Operation::Bind, "g1");

    for _ in 0..10 {
        engine.wake();
    }
    engine.start().unwrap();

    assert_eventually("the first pass", || engine.stats().passes == 1);
    assert_holds_for("a single pass", Duration::from_millis(100), || {
        engine.stats().passes == 1
    });
    assert_eq!(engine.executor().count(FabricOperation::Add), 1);

    assert_eq!(engine.stop(None), StopOutcome::Stopped);
}

#[test]
fn lifecycle_calls_are_idempotent() {
    let engine = memory_engine();
    assert_eq!(engine.stop(Some(Duration::from_secs(1))), StopOutcome::NotRunning);

    engine.start().unwrap();
    engine.start().unwrap();
    assert!(engine.is_running());

    assert_eq!(engine.stop(Some(Duration::from_secs(5))), StopOutcome::Stopped);
    assert_eq!(engine.stop(None), StopOutcome::NotRunning);
    assert_eq!(engine.executor().count(FabricOperation::Abort), 1);
    assert_eq!(engine.stats().passes, 0);
}

#[test]
fn network_create_maps_status() {
    let engine = memory_engine();
    seed_network(engine.store().as_ref(), "n1", Operation::Create);
    engine.sync_once();
    assert_eq!(
        state_of(engine.store().as_ref(), "n1", ResourceType::Network),
        Some(EntryState::Completed)
    );

    let engine = memory_engine();
    engine
        .executor()
        .set_status(FabricOperation::Create, CommandStatus(3));
    seed_network(engine.store().as_ref(), "n1", Operation::Create);
    engine.sync_once();
    assert_eq!(
        state_of(engine.store().as_ref(), "n1", ResourceType::Network),
        Some(EntryState::Failed)
    );
}

#[test]
fn ports_on_one_network_share_one_command() {
    let engine = memory_engine();
    seed_port(engine.store().as_ref(), "p1", "n1", Operation::Bind, "g1");
    seed_port(engine.store().as_ref(), "p2", "n1", Operation::Bind, "g2");

    let report = engine.sync_once();
    assert_eq!(report.completed, 2);
    assert!(report.committed);

    assert_eq!(
        engine.executor().commands(),
        vec![
            FabricCommand::Add {
                name: "n1".into(),
                members: vec!["g1".into(), "g2".into()],
            },
            FabricCommand::Management(FabricOperation::Commit),
            FabricCommand::Management(FabricOperation::Reload),
        ]
    );

    let completed = engine.store().entries_by_state(EntryState::Completed).unwrap();
    assert_eq!(completed.len(), 2);
    // Written once each, by the bulk update.
    assert!(completed.iter().all(|e| e.revision_number == 1));
}

#[test]
fn commit_is_issued_once_per_pass() {
    let engine = memory_engine();
    seed_network(engine.store().as_ref(), "n1", Operation::Delete);
    seed_network(engine.store().as_ref(), "n2", Operation::Delete);
    seed_port(engine.store().as_ref(), "p1", "n3", Operation::Bind, "g1");
    seed_port(engine.store().as_ref(), "p2", "n4", Operation::Delete, "g2");

    let report = engine.sync_once();
    assert!(report.committed);
    assert_eq!(report.completed, 4);

    let executor = engine.executor();
    assert_eq!(executor.count(FabricOperation::Delete), 2);
    assert_eq!(executor.count(FabricOperation::Add), 1);
    assert_eq!(executor.count(FabricOperation::Remove), 1);
    assert_eq!(executor.count(FabricOperation::Commit), 1);
    assert_eq!(executor.count(FabricOperation::Reload), 1);

    let commands = executor.commands();
    assert_eq!(
        &commands[commands.len() - 2..],
        &[
            FabricCommand::Management(FabricOperation::Commit),
            FabricCommand::Management(FabricOperation::Reload),
        ]
    );
}

#[test]
fn empty_journal_issues_nothing() {
    let engine = memory_engine();
    let report = engine.sync_once();
    assert_eq!(report.commands, 0);
    assert!(!report.committed);
    assert!(engine.executor().commands().is_empty());
}

#[test]
fn unbound_ports_do_not_commit() {
    let engine = memory_engine();
    seed_port(engine.store().as_ref(), "p1", "n1", Operation::Create, "g1");

    let report = engine.sync_once();
    assert_eq!(report.deferred, 1);
    assert!(engine.executor().commands().is_empty());
    assert_eq!(
        state_of(engine.store().as_ref(), "p1", ResourceType::Port),
        Some(EntryState::Waiting)
    );
}

#[test]
fn failed_batch_is_marked_failed_without_commit() {
    let engine = memory_engine();
    engine
        .executor()
        .set_status(FabricOperation::Add, CommandStatus::FAILURE);
    seed_port(engine.store().as_ref(), "p1", "n1", Operation::Bind, "g1");

    let report = engine.sync_once();
    assert_eq!(report.failed, 1);
    assert!(!report.committed);
    assert_eq!(engine.executor().count(FabricOperation::Commit), 0);
}

#[test]
fn interrupted_batch_recovers_on_next_wake() {
    let engine = memory_engine();
    engine
        .executor()
        .fail_next(FabricOperation::Add, "session dropped");
    seed_port(engine.store().as_ref(), "p1", "n1", Operation::Bind, "g1");

    engine.start().unwrap();
    engine.wake();
    assert_eventually("the interrupted pass", || engine.stats().passes == 1);
    assert_eq!(
        state_of(engine.store().as_ref(), "p1", ResourceType::Port),
        Some(EntryState::Waiting)
    );

    engine.wake();
    assert_eventually("recovery", || {
        state_of(engine.store().as_ref(), "p1", ResourceType::Port) == Some(EntryState::Completed)
    });
    engine.stop(None);
}

#[test]
fn periodic_worker_recovers_interrupted_batch() {
    let executor = Arc::new(MockExecutor::new());
    executor.fail_next(FabricOperation::Add, "session dropped");
    let store = Arc::new(MemoryJournal::new());
    seed_port(store.as_ref(), "p1", "n1", Operation::Bind, "g1");

    let service = SyncService::new(
        SyncConfig::default().with_sync_interval(Duration::from_millis(20)),
        Arc::clone(&store),
        Arc::clone(&executor),
    );
    service.start().unwrap();

    assert_eventually("completion driven by the timer", || {
        state_of(store.as_ref(), "p1", ResourceType::Port) == Some(EntryState::Completed)
    });
    assert_eq!(executor.count(FabricOperation::Add), 2);

    assert_eq!(service.stop(), StopOutcome::Stopped);
    assert!(!service.periodic().is_running());
}

#[test]
fn worker_survives_a_panicking_pass() {
    let executor = Arc::new(PanicOnce {
        armed: AtomicBool::new(true),
        inner: MockExecutor::new(),
    });
    let engine = SyncEngine::new(
        SyncConfig::default(),
        Arc::new(MemoryJournal::new()),
        Arc::clone(&executor),
    );
    seed_network(engine.store().as_ref(), "n1", Operation::Create);

    engine.start().unwrap();
    engine.wake();
    assert_eventually("the panicking pass", || engine.stats().panics == 1);
    assert!(engine.is_running());

    engine.wake();
    assert_eventually("recovery", || {
        state_of(engine.store().as_ref(), "n1", ResourceType::Network)
            == Some(EntryState::Completed)
    });
    engine.stop(None);
}

#[test]
fn concurrent_producers_all_reconcile() {
    let engine = Arc::new(memory_engine());
    engine.start().unwrap();

    let producers: Vec<_> = (0..4)
        .map(|t| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                for i in 0..10 {
                    seed_port(
                        engine.store().as_ref(),
                        &format!("t{t}-p{i}"),
                        &format!("n{t}"),
                        Operation::Bind,
                        &format!("g{t}-{i}"),
                    );
                    engine.wake();
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().unwrap();
    }
    engine.wake();

    assert_eventually("every port completed", || {
        state_counts(engine.store().as_ref()) == [0, 0, 0, 40]
    });

    let mut added: Vec<String> = engine
        .executor()
        .commands()
        .into_iter()
        .filter(|c| c.operation() == FabricOperation::Add)
        .flat_map(|c| c.members().to_vec())
        .collect();
    added.sort();
    added.dedup();
    assert_eq!(added.len(), 40);

    assert_eq!(engine.stop(Some(Duration::from_secs(5))), StopOutcome::Stopped);
}

#[test]
fn file_journal_service_flow() {
    let dir = TestJournal::new();
    let executor = Arc::new(MockExecutor::new());

    {
        let store = dir.open();
        let service = SyncService::new(
            SyncConfig::default().with_sync_interval(Duration::from_secs(3600)),
            Arc::clone(&store),
            Arc::clone(&executor),
        );
        let producer = service.producer();
        producer.network_created("n1", "vf-n1", 12).unwrap();
        producer.port_created("p1", "vf-n1", Some("0x0011")).unwrap();
        producer.port_bound("p1").unwrap();

        service.start().unwrap();
        assert_eventually("reconciliation", || state_counts(store.as_ref()) == [0, 0, 0, 2]);
        assert_eq!(service.stop(), StopOutcome::Stopped);
    }

    let store = dir.open();
    assert_eq!(
        state_of(store.as_ref(), "p1", ResourceType::Port),
        Some(EntryState::Completed)
    );
    assert_eq!(executor.count(FabricOperation::Create), 1);
    assert_eq!(executor.count(FabricOperation::Abort), 1);
}

#[test]
fn planned_batches_match_property() {
    use fabric_sync_engine::BatchPlan;
    use proptest::prelude::*;
    use proptest::test_runner::TestRunner;

    let mut runner = TestRunner::default();
    runner
        .run(&waiting_ports_strategy(30), |ports| {
            let journal = MemoryJournal::new();
            seed_ports(&journal, &ports);
            let waiting = journal.entries_by_state(EntryState::Waiting).unwrap();
            let plan = BatchPlan::from_entries(&waiting);

            let mut groups: Vec<_> = ports
                .iter()
                .map(|p| (p.network_id.clone(), p.operation))
                .collect();
            groups.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.as_str().cmp(b.1.as_str())));
            groups.dedup();
            prop_assert_eq!(plan.batches().len(), groups.len());
            Ok(())
        })
        .unwrap();
}

#[test]
fn port_superseded_during_batch_is_removed_next_pass() {
    let store = Arc::new(MemoryJournal::new());
    seed_port(store.as_ref(), "p1", "n1", Operation::Bind, "g1");
    let executor = Arc::new(SupersedeDuring::new(
        &store,
        "p1",
        ResourceType::Port,
        port_payload(Operation::Delete, "n1", "g1"),
        EntryState::Waiting,
    ));
    let engine = SyncEngine::new(SyncConfig::default(), Arc::clone(&store), Arc::clone(&executor));

    let report = engine.sync_once();
    assert_eq!(report.completed, 0);
    assert_eq!(report.deferred, 1);
    assert!(report.committed);
    let entry = store.get_entry("p1", ResourceType::Port).unwrap().unwrap();
    assert_eq!(entry.state, EntryState::Waiting);
    assert_eq!(entry.operation(), Some(Ok(Operation::Delete)));

    engine.sync_once();
    assert_eq!(
        state_of(store.as_ref(), "p1", ResourceType::Port),
        Some(EntryState::Completed)
    );
    assert_eq!(
        executor.inner.commands(),
        vec![
            FabricCommand::Add {
                name: "n1".into(),
                members: vec!["g1".into()],
            },
            FabricCommand::Management(FabricOperation::Commit),
            FabricCommand::Management(FabricOperation::Reload),
            FabricCommand::Remove {
                name: "n1".into(),
                members: vec!["g1".into()],
            },
            FabricCommand::Management(FabricOperation::Commit),
            FabricCommand::Management(FabricOperation::Reload),
        ]
    );
}

#[test]
fn network_superseded_during_create_is_deleted_next_pass() {
    let store = Arc::new(MemoryJournal::new());
    seed_network(store.as_ref(), "n1", Operation::Create);
    let executor = Arc::new(SupersedeDuring::new(
        &store,
        "n1",
        ResourceType::Network,
        network_payload(Operation::Delete, "vf-n1", 10),
        EntryState::Pending,
    ));
    let engine = SyncEngine::new(SyncConfig::default(), Arc::clone(&store), Arc::clone(&executor));

    let report = engine.sync_once();
    assert_eq!(report.completed, 0);
    assert_eq!(report.deferred, 1);
    assert_eq!(
        state_of(store.as_ref(), "n1", ResourceType::Network),
        Some(EntryState::Pending)
    );

    let report = engine.sync_once();
    assert_eq!(report.completed, 1);
    assert!(report.committed);
    assert_eq!(executor.inner.count(FabricOperation::Create), 1);
    assert_eq!(executor.inner.count(FabricOperation::Delete), 1);
    assert_eq!(
        state_of(store.as_ref(), "n1", ResourceType::Network),
        Some(EntryState::Completed)
    );
}

#[test]
fn timed_out_stop_keeps_worker_until_it_finishes() {
    let executor = Arc::new(GatedCreate {
        entered: WakeSignal::new(),
        release: WakeSignal::new(),
        inner: MockExecutor::new(),
    });
    let engine = SyncEngine::new(
        SyncConfig::default(),
        Arc::new(MemoryJournal::new()),
        Arc::clone(&executor),
    );
    seed_network(engine.store().as_ref(), "n1", Operation::Create);

    engine.start().unwrap();
    engine.wake();
    assert!(executor.entered.wait_timeout(DEFAULT_WAIT));

    assert_eq!(
        engine.stop(Some(Duration::from_millis(10))),
        StopOutcome::TimedOut
    );
    assert_eq!(executor.inner.count(FabricOperation::Abort), 1);
    assert_holds_for("a worker stuck in a command", Duration::from_millis(50), || {
        engine.is_running()
    });

    executor.release.set();
    // Joins the old worker, which finishes its pass first.
    engine.start().unwrap();
    assert_eq!(
        state_of(engine.store().as_ref(), "n1", ResourceType::Network),
        Some(EntryState::Completed)
    );
    assert!(engine.is_running());

    seed_port(engine.store().as_ref(), "p1", "n1", Operation::Bind, "g1");
    engine.wake();
    assert_eventually("a pass on the new worker", || {
        state_of(engine.store().as_ref(), "p1", ResourceType::Port) == Some(EntryState::Completed)
    });

    assert_eq!(engine.stop(Some(Duration::from_secs(5))), StopOutcome::Stopped);
    assert_eq!(executor.inner.count(FabricOperation::Abort), 2);
}
