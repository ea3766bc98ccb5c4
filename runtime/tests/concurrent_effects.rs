//! Integration tests for concurrent effect execution
//!
//! Effects resolve on their own schedules; the store applies whatever they
//! feed back in arrival order, and cancelled effects feed nothing back.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use optimist_core::{SmallVec, effect::Effect, effect::EffectId, reducer::Reducer, smallvec};
use optimist_runtime::{Store, StoreError};
use std::time::Duration;

// ============================================================================
// Test Fixtures
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum TestAction {
    /// Start a job that finishes after `millis`
    Start { job: u32, millis: u64 },
    /// Drop a started job
    Abandon { job: u32 },
    /// A job finished
    Finished { job: u32 },
}

#[derive(Debug, Clone, Default)]
struct TestState {
    started: Vec<u32>,
    finished: Vec<u32>,
}

#[derive(Clone)]
struct TestEnvironment;

#[derive(Clone)]
struct TestReducer;

fn job_id(job: u32) -> EffectId {
    EffectId::new(format!("job-{job}"))
}

impl Reducer for TestReducer {
    type State = TestState;
    type Action = TestAction;
    type Environment = TestEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        _env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            TestAction::Start { job, millis } => {
                state.started.push(job);
                smallvec![
                    Effect::Future(Box::pin(async move {
                        tokio::time::sleep(Duration::from_millis(millis)).await;
                        Some(TestAction::Finished { job })
                    }))
                    .cancellable(job_id(job))
                ]
            },
            TestAction::Abandon { job } => {
                state.started.retain(|j| *j != job);
                smallvec![Effect::Cancel(job_id(job))]
            },
            TestAction::Finished { job } => {
                state.finished.push(job);
                SmallVec::new()
            },
        }
    }
}

fn store() -> Store<TestState, TestAction, TestEnvironment, TestReducer> {
    Store::new(TestState::default(), TestReducer, TestEnvironment)
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_results_apply_in_completion_order() {
    let store = store();

    for (job, millis) in [(1, 300), (2, 100), (3, 200)] {
        store.send(TestAction::Start { job, millis }).await.unwrap();
    }
    assert_eq!(store.in_flight(), 3);

    tokio::time::sleep(Duration::from_millis(400)).await;

    assert_eq!(store.state(|s| s.started.clone()).await, vec![1, 2, 3]);
    assert_eq!(store.state(|s| s.finished.clone()).await, vec![2, 3, 1]);
    assert_eq!(store.in_flight(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_job_never_reports() {
    let store = store();

    store.send(TestAction::Start { job: 1, millis: 100 }).await.unwrap();
    store.send(TestAction::Start { job: 2, millis: 100 }).await.unwrap();
    store.send(TestAction::Abandon { job: 1 }).await.unwrap();

    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(store.state(|s| s.finished.clone()).await, vec![2]);
    assert_eq!(store.in_flight(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_observers_see_feedback_actions() {
    let store = store();
    let mut first = store.subscribe_actions();
    let mut second = store.subscribe_actions();

    store.send(TestAction::Start { job: 7, millis: 50 }).await.unwrap();

    assert_eq!(first.recv().await.unwrap(), TestAction::Finished { job: 7 });
    assert_eq!(second.recv().await.unwrap(), TestAction::Finished { job: 7 });
}

#[tokio::test(start_paused = true)]
async fn test_graceful_shutdown_applies_drained_results() {
    let store = store();

    store.send(TestAction::Start { job: 1, millis: 50 }).await.unwrap();
    store.send(TestAction::Start { job: 2, millis: 80 }).await.unwrap();
    store.shutdown(Duration::from_secs(1)).await.unwrap();

    assert_eq!(store.state(|s| s.finished.clone()).await, vec![1, 2]);
    assert_eq!(store.in_flight(), 0);
    assert_eq!(
        store.send(TestAction::Start { job: 3, millis: 1 }).await.unwrap_err(),
        StoreError::ShutdownInProgress
    );
}

#[tokio::test(start_paused = true)]
async fn test_teardown_discards_results() {
    let store = store();

    store.send(TestAction::Start { job: 1, millis: 50 }).await.unwrap();
    assert_eq!(store.teardown(), 1);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(store.state(|s| s.finished.is_empty()).await);
}
