//! Fan-out/join patterns for independent remote calls.
//!
//! Both run every future concurrently on the calling task and wait for all of
//! them to settle. They differ only in how failures are reported:
//!
//! * [`join_all_settled`] returns every outcome; one failure never hides the
//!   others.
//! * [`join_all_or_fail`] reports the whole join as failed when any future
//!   failed. Futures that succeeded are not undone.

use futures::future::join_all;
use std::future::Future;

pub async fn join_all_settled<I, F, T, E>(futures: I) -> Vec<Result<T, E>>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = Result<T, E>>,
{
    join_all(futures).await
}

/// Waits for every future, then returns the first error in input order.
///
/// In-flight calls are never dropped halfway, so a failed join may still
/// have completed some of its calls remotely.
pub async fn join_all_or_fail<I, F, T, E>(futures: I) -> Result<Vec<T>, E>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = Result<T, E>>,
{
    let outcomes = join_all(futures).await;
    let total = outcomes.len();

    let mut values = Vec::with_capacity(total);
    let mut first_error = None;
    let mut failed = 0usize;

    for outcome in outcomes {
        match outcome {
            Ok(value) => values.push(value),
            Err(err) => {
                failed += 1;
                if first_error.is_none() {
                    first_error = Some(err);
                }
            }
        }
    }

    match first_error {
        None => Ok(values),
        Some(err) => {
            tracing::warn!(
                total,
                failed,
                succeeded = values.len(),
                "Fan-out join failed; succeeded calls are not rolled back"
            );
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn settled_keeps_every_outcome_in_order() {
        let outcomes = join_all_settled((0..4).map(|i| async move {
            if i == 2 { Err(format!("failed {}", i)) } else { Ok(i * 10) }
        }))
        .await;

        assert_eq!(outcomes.len(), 4);
        assert_eq!(outcomes[0], Ok(0));
        assert_eq!(outcomes[2], Err("failed 2".to_string()));
        assert_eq!(outcomes[3], Ok(30));
    }

    #[tokio::test]
    async fn or_fail_returns_values_when_all_succeed() {
        let values: Result<Vec<i32>, String> =
            join_all_or_fail((1..=3).map(|i| async move { Ok(i) })).await;
        assert_eq!(values, Ok(vec![1, 2, 3]));
    }

    #[tokio::test(start_paused = true)]
    async fn or_fail_waits_for_slower_calls_before_failing() {
        let completed = Arc::new(AtomicUsize::new(0));

        let result: Result<Vec<()>, &str> = join_all_or_fail((0..3).map(|i| {
            let completed = completed.clone();
            async move {
                if i == 1 {
                    return Err("second call failed");
                }
                tokio::time::sleep(Duration::from_millis(50)).await;
                completed.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }))
        .await;

        assert_eq!(result, Err("second call failed"));
        assert_eq!(completed.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn or_fail_reports_first_error_in_input_order() {
        let result: Result<Vec<i32>, i32> = join_all_or_fail((0..4).map(|i| async move {
            if i >= 2 { Err(i) } else { Ok(i) }
        }))
        .await;
        assert_eq!(result, Err(2));
    }
}
