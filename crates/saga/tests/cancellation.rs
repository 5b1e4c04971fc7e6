//! Timeouts and cancellation of saga executions.

use std::convert::Infallible;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use saga::{CancellationToken, ExecuteOptions, SagaDefinition, SagaError, SagaState, StepResult};

fn slow_saga(compensations: Arc<AtomicUsize>) -> SagaDefinition {
    SagaDefinition::new("Slow-Saga")
        .add_activity("Fast", || async {
            Ok::<_, Infallible>(StepResult::succeeded(()))
        })
        .unwrap()
        .add_activity("Slow", || async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok::<_, Infallible>(StepResult::failed(()))
        })
        .unwrap()
        .add_compensation("Slow", "undo-Slow", move |_: StepResult<()>| {
            let compensations = Arc::clone(&compensations);
            async move {
                compensations.fetch_add(1, Ordering::SeqCst);
                Ok::<_, Infallible>(())
            }
        })
        .unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_activity_timeout_is_a_fault() {
    let compensations = Arc::new(AtomicUsize::new(0));
    let mut saga = slow_saga(Arc::clone(&compensations));

    let options = ExecuteOptions::new().with_activity_timeout(Duration::from_millis(50));
    let error = saga.execute_with(options).await.unwrap_err();

    assert!(matches!(
        error,
        SagaError::ActivityTimedOut { ref activity, timeout }
            if activity == "Slow" && timeout == Duration::from_millis(50)
    ));
    assert_eq!(saga.activity_outcomes().len(), 1);
    assert_eq!(compensations.load(Ordering::SeqCst), 0);
    assert_eq!(saga.state(), SagaState::Faulted);
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_interrupts_running_activity() {
    let compensations = Arc::new(AtomicUsize::new(0));
    let mut saga = slow_saga(Arc::clone(&compensations));

    let token = CancellationToken::new();
    let canceller = {
        let token = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            token.cancel();
        })
    };

    let options = ExecuteOptions::new().with_cancellation(token);
    let error = saga.execute_with(options).await.unwrap_err();
    canceller.await.unwrap();

    assert!(matches!(error, SagaError::Cancelled { ref activity } if activity == "Slow"));
    assert_eq!(saga.activity_outcomes().len(), 1);
    assert_eq!(compensations.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_cancelled_token_prevents_any_activity() {
    let compensations = Arc::new(AtomicUsize::new(0));
    let mut saga = slow_saga(compensations);

    let token = CancellationToken::new();
    token.cancel();

    let error = saga
        .execute_with(ExecuteOptions::new().with_cancellation(token))
        .await
        .unwrap_err();

    assert!(matches!(error, SagaError::Cancelled { ref activity } if activity == "Fast"));
    assert!(saga.activity_outcomes().is_empty());
    assert_eq!(saga.journal().failed_activity(), Some("Fast"));
}

#[tokio::test(start_paused = true)]
async fn test_compensation_timeout_is_reported_as_compensation_failure() {
    let mut saga = SagaDefinition::new("Stuck-Compensation-Saga")
        .add_activity("A", || async {
            Ok::<_, Infallible>(StepResult::failed(()))
        })
        .unwrap()
        .add_compensation("A", "undo-A", |_: StepResult<()>| async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok::<_, Infallible>(())
        })
        .unwrap();

    let options = ExecuteOptions::new().with_compensation_timeout(Duration::from_millis(20));
    let error = saga.execute_with(options).await.unwrap_err();

    match error {
        SagaError::CompensationFailed { activity, failures } => {
            assert_eq!(activity, "A");
            assert_eq!(failures[0].compensation, "undo-A");
            assert!(failures[0].reason.starts_with("timed out"));
        }
        other => panic!("expected compensation failure, got {other:?}"),
    }
}
