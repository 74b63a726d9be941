use services::common::RepositoryError;

/// Whether a fresh attempt on a new connection could succeed. Constraint
/// violations and missing rows are final; only infrastructure hiccups and
/// serialization conflicts qualify.
pub fn is_transient(err: &RepositoryError) -> bool {
    matches!(
        err,
        RepositoryError::TransactionConflict
            | RepositoryError::ConnectionFailed(_)
            | RepositoryError::PoolError(_)
    )
}

/// Run a database operation, retrying transient failures with doubling
/// backoff. The invitation tables are updated through compare-and-swap
/// statements, so serialization conflicts under concurrent accept and resend
/// traffic are expected to clear on a second attempt.
///
/// Unique, foreign-key, and not-found errors break out immediately at debug
/// level; callers map those to their own error taxonomy and decide what is
/// worth logging.
#[macro_export]
macro_rules! retry_db {
    ($operation:expr, $block:block) => {{
        const MAX_ATTEMPTS: u32 = 3;

        let mut attempt = 1u32;
        let mut delay = std::time::Duration::from_millis(100);
        let started = std::time::Instant::now();

        loop {
            let result: Result<_, services::common::RepositoryError> = async $block.await;

            match result {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::info!(
                            operation = $operation,
                            attempt,
                            elapsed_ms = started.elapsed().as_millis() as u64,
                            "Database operation recovered after retry"
                        );
                    }
                    break Ok(value);
                }
                Err(err) if $crate::repositories::retry::is_transient(&err) => {
                    if attempt >= MAX_ATTEMPTS {
                        tracing::error!(
                            operation = $operation,
                            attempt,
                            elapsed_ms = started.elapsed().as_millis() as u64,
                            error = %err,
                            "Database operation failed after retries"
                        );
                        break Err(err);
                    }

                    tracing::warn!(
                        operation = $operation,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Transient database error, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                    attempt += 1;
                }
                Err(err) => {
                    tracing::debug!(
                        operation = $operation,
                        error = %err,
                        "Database operation returned an error"
                    );
                    break Err(err);
                }
            }
        }
    }};
}
