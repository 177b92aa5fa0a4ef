//! End-to-end lifecycle scenarios against the simulated network.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tableflow_core::{ReadAccessor, ReadError};
use tableflow_lifecycle::{
    ConfirmationPoller, FailureReason, LifecycleConfig, LifecycleCoordinator, LifecycleError,
    OperationSubmitter, Resolution, Session, SlotState, TableProvisioner,
};
use tableflow_simulation::{SimulatedNetwork, SimulatedSigner, StatusScript};
use tableflow_types::{demo, ContextId, ResourceDescriptor, Row, Statement};
use tokio::time;

const INTERVAL: Duration = Duration::from_millis(1000);

fn config() -> LifecycleConfig {
    LifecycleConfig::default().with_poll_interval(INTERVAL)
}

async fn session() -> Session {
    Session::connect(Arc::new(SimulatedSigner::new("0xabc", ContextId(1))))
        .await
        .unwrap()
}

/// Provision the demo table through the network, then hand it to a
/// coordinator reading through `reader`.
async fn coordinator_with_reader(
    network: &SimulatedNetwork,
    session: &Session,
    reader: Arc<dyn ReadAccessor>,
    config: LifecycleConfig,
) -> LifecycleCoordinator {
    let shared = Arc::new(network.clone());
    let provisioner = TableProvisioner::new(
        OperationSubmitter::new(shared.clone()),
        ConfirmationPoller::new(shared.clone()),
        shared.clone(),
        config.clone(),
    )
    .unwrap();

    network.push_script(StatusScript::confirm_after(1));
    let resource = provisioner.create_table(session, "t").await.unwrap();

    LifecycleCoordinator::new(
        resource,
        OperationSubmitter::new(shared.clone()),
        ConfirmationPoller::new(shared),
        reader,
        config,
    )
    .unwrap()
}

async fn coordinator(network: &SimulatedNetwork, session: &Session) -> LifecycleCoordinator {
    coordinator_with_reader(network, session, Arc::new(network.clone()), config()).await
}

fn confirmed_rows(resolution: Option<Resolution>) -> Vec<Row> {
    match resolution {
        Some(Resolution::Confirmed { rows, .. }) => rows,
        other => panic!("expected confirmation, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_bobby_tables() {
    let network = SimulatedNetwork::new(ContextId(1));
    let session = session().await;
    let mut coordinator = coordinator(&network, &session).await;

    let resource: &ResourceDescriptor = coordinator.resource();
    assert_eq!(resource.name, "t_1_1");
    assert_eq!(resource.column_names(), vec!["id", "name", "block", "tx"]);
    let reads_before = network.read_queries();

    let statement = Statement::write(
        r#"INSERT INTO t_1_1 (name, block, tx) VALUES ("Bobby Tables", BLOCK_NUM(), TXN_HASH())"#,
    )
    .unwrap();
    network.push_script(StatusScript::confirm_after(2));
    let handle = coordinator.write(&session, statement, vec![]).await.unwrap();

    // Two "not yet seen" answers leave the slot pending with no refresh.
    time::sleep(INTERVAL * 2 + INTERVAL / 2).await;
    assert!(matches!(coordinator.state(), SlotState::Pending(ref p) if p.handle == handle));
    assert_eq!(network.status_queries(&handle), 2);
    assert_eq!(network.read_queries(), reads_before);

    let rows = confirmed_rows(coordinator.next_resolution().await.unwrap());
    assert_eq!(network.status_queries(&handle), 3);
    assert_eq!(network.read_queries(), reads_before + 1);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, 1);
    assert_eq!(rows[0].name, "Bobby Tables");
    assert_eq!(rows[0].tx, handle.as_str());
    assert_eq!(coordinator.state(), SlotState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_back_to_back_writes_refresh_once() {
    let network = SimulatedNetwork::new(ContextId(1));
    let session = session().await;
    let mut coordinator = coordinator(&network, &session).await;

    network.push_script(StatusScript::confirm_after(2));
    let first = coordinator.insert_name(&session, "first").await.unwrap();
    time::sleep(INTERVAL + INTERVAL / 2).await;
    assert_eq!(network.status_queries(&first), 1);

    network.push_script(StatusScript::confirm_after(0));
    let second = coordinator.insert_name(&session, "second").await.unwrap();

    let resolution = coordinator.next_resolution().await.unwrap();
    assert!(matches!(resolution, Some(Resolution::Confirmed { ref handle, .. }) if *handle == second));

    // The first poll stopped when the second write was issued.
    time::sleep(INTERVAL * 10).await;
    assert_eq!(network.status_queries(&first), 1);
    assert_eq!(network.read_queries(), 1);
    assert_eq!(coordinator.next_resolution().await.unwrap(), None);
    // Both writes landed on the network; only one refresh observed them.
    assert_eq!(coordinator.rows().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_only_the_last_of_many_writes_resolves() {
    let network = SimulatedNetwork::new(ContextId(1));
    let session = session().await;
    let mut coordinator = coordinator(&network, &session).await;
    network.set_default_script(StatusScript::confirm_after(0));

    let mut handles = Vec::new();
    for i in 0..5 {
        handles.push(coordinator.insert_name(&session, &format!("w{i}")).await.unwrap());
    }
    let last = handles.pop().unwrap();

    let resolution = coordinator.next_resolution().await.unwrap();
    assert!(matches!(resolution, Some(Resolution::Confirmed { ref handle, .. }) if *handle == last));

    time::sleep(INTERVAL * 10).await;
    for superseded in &handles {
        assert_eq!(network.status_queries(superseded), 0);
    }
    assert_eq!(network.read_queries(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_confirmation_is_applied_once() {
    let network = SimulatedNetwork::new(ContextId(1));
    let session = session().await;
    let mut coordinator = coordinator(&network, &session).await;

    network.push_script(StatusScript::confirm_after(1));
    let handle = coordinator.insert_name(&session, "once").await.unwrap();
    confirmed_rows(coordinator.next_resolution().await.unwrap());

    // The verifier keeps saying "confirmed", but nobody is asking any more.
    time::sleep(INTERVAL * 10).await;
    assert_eq!(coordinator.next_resolution().await.unwrap(), None);
    assert_eq!(network.status_queries(&handle), 2);
    assert_eq!(network.read_queries(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_relinquish_guarantees_no_refresh() {
    let network = SimulatedNetwork::new(ContextId(1));
    let session = session().await;
    let mut coordinator = coordinator(&network, &session).await;

    network.push_script(StatusScript::confirm_after(1));
    let handle = coordinator.insert_name(&session, "gone").await.unwrap();
    coordinator.relinquish();

    time::sleep(INTERVAL * 10).await;
    assert_eq!(coordinator.state(), SlotState::Idle);
    assert_eq!(coordinator.next_resolution().await.unwrap(), None);
    assert_eq!(network.status_queries(&handle), 0);
    assert_eq!(network.read_queries(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_in_flight_answer_after_cancel_is_discarded() {
    let network = SimulatedNetwork::new(ContextId(1));
    let session = session().await;
    let mut coordinator = coordinator(&network, &session).await;
    network.set_status_latency(INTERVAL / 2);

    network.push_script(StatusScript::confirm_after(0));
    let handle = coordinator.insert_name(&session, "late").await.unwrap();

    // The first query is issued at 1.0 and answered at 1.5.
    time::sleep(INTERVAL + INTERVAL / 4).await;
    coordinator.relinquish();

    time::sleep(INTERVAL * 10).await;
    assert_eq!(network.status_queries(&handle), 1);
    assert_eq!(coordinator.next_resolution().await.unwrap(), None);
    assert_eq!(network.read_queries(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_dropping_the_coordinator_stops_polling() {
    let network = SimulatedNetwork::new(ContextId(1));
    let session = session().await;
    let mut coordinator = coordinator(&network, &session).await;

    network.push_script(StatusScript::never());
    let handle = coordinator.insert_name(&session, "orphan").await.unwrap();
    time::sleep(INTERVAL * 3 + INTERVAL / 2).await;
    assert_eq!(network.status_queries(&handle), 3);

    drop(coordinator);
    time::sleep(INTERVAL * 10).await;
    assert_eq!(network.status_queries(&handle), 3);
}

#[tokio::test(start_paused = true)]
async fn test_transient_errors_do_not_end_pending() {
    let network = SimulatedNetwork::new(ContextId(1));
    let session = session().await;
    let mut coordinator = coordinator(&network, &session).await;

    network.push_script(StatusScript::confirm_after(1).with_transport_errors(3));
    let handle = coordinator.insert_name(&session, "patient").await.unwrap();

    let rows = confirmed_rows(coordinator.next_resolution().await.unwrap());
    assert_eq!(rows.len(), 1);
    assert_eq!(network.status_queries(&handle), 5);
}

#[tokio::test(start_paused = true)]
async fn test_error_budget_fails_without_refresh() {
    let network = SimulatedNetwork::new(ContextId(1));
    let session = session().await;
    let mut coordinator = coordinator_with_reader(
        &network,
        &session,
        Arc::new(network.clone()),
        config().with_max_consecutive_poll_errors(3),
    )
    .await;

    network.push_script(StatusScript::confirm_after(0).with_transport_errors(100));
    let handle = coordinator.insert_name(&session, "unlucky").await.unwrap();

    match coordinator.next_resolution().await.unwrap() {
        Some(Resolution::Failed {
            handle: failed,
            reason: FailureReason::Abandoned { attempts, .. },
        }) => {
            assert_eq!(failed, handle);
            assert_eq!(attempts, 3);
        }
        other => panic!("expected abandonment, got {other:?}"),
    }
    assert_eq!(coordinator.state(), SlotState::Idle);
    assert_eq!(network.read_queries(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_wrong_context_is_refused() {
    let network = SimulatedNetwork::new(ContextId(1));
    let signer = Arc::new(SimulatedSigner::new("0xabc", ContextId(1)));
    let mut session = Session::connect(signer.clone()).await.unwrap();
    let mut coordinator = coordinator(&network, &session).await;

    signer.switch_context(ContextId(5));
    session.reconnect().await.unwrap();

    let err = coordinator.insert_name(&session, "x").await.unwrap_err();
    assert_eq!(
        err,
        LifecycleError::ContextMismatch {
            session: ContextId(5),
            resource: ContextId(1),
        }
    );
    assert_eq!(coordinator.state(), SlotState::Idle);
}

/// Reader that fails a set number of times before delegating.
struct FlakyReader {
    inner: SimulatedNetwork,
    failures_left: Mutex<u32>,
}

#[async_trait]
impl ReadAccessor for FlakyReader {
    async fn query(
        &self,
        context: ContextId,
        resource_name: &str,
        select: &str,
    ) -> Result<Vec<Row>, ReadError> {
        {
            let mut left = self.failures_left.lock();
            if *left > 0 {
                *left -= 1;
                return Err(ReadError::Transport("gateway unavailable".into()));
            }
        }
        self.inner.query(context, resource_name, select).await
    }
}

#[tokio::test(start_paused = true)]
async fn test_failed_refresh_is_surfaced_and_slot_freed() {
    let network = SimulatedNetwork::new(ContextId(1));
    let session = session().await;
    let reader = Arc::new(FlakyReader {
        inner: network.clone(),
        failures_left: Mutex::new(1),
    });
    let mut coordinator = coordinator_with_reader(&network, &session, reader, config()).await;

    network.push_script(StatusScript::confirm_after(0));
    let handle = coordinator.insert_name(&session, "x").await.unwrap();

    let err = coordinator.next_resolution().await.unwrap_err();
    assert!(matches!(err, LifecycleError::Refresh { handle: ref h, .. } if *h == handle));
    assert_eq!(coordinator.state(), SlotState::Idle);
    assert_eq!(coordinator.next_resolution().await.unwrap(), None);

    // The data is there; a manual reload sees it.
    let rows = coordinator.load_rows().await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(demo::declared_schema().len(), coordinator.resource().schema.len());
}

#[tokio::test(start_paused = true)]
async fn test_quoted_create_statement_provisions_t_1_1() {
    let network = SimulatedNetwork::new(ContextId(1));
    let session = session().await;
    let shared = Arc::new(network.clone());
    let provisioner = TableProvisioner::new(
        OperationSubmitter::new(shared.clone()),
        ConfirmationPoller::new(shared.clone()),
        shared,
        config(),
    )
    .unwrap();

    let statement = Statement::create(
        r#"CREATE TABLE "t" (id integer primary key, name text, block text, tx text)"#,
    )
    .unwrap();
    network.push_script(StatusScript::confirm_after(2));
    let resource = provisioner
        .provision(&session, &statement, &[])
        .await
        .unwrap();

    assert_eq!(resource.name, "t_1_1");
    assert_eq!(resource.context, ContextId(1));
    assert_eq!(resource.column_names(), vec!["id", "name", "block", "tx"]);
    assert_eq!(network.table_count(), 1);
}
