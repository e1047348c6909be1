//! Unit of work completion and conflict retry

use tracing::warn;

use core_kernel::CoreError;

use crate::ports::UnitOfWork;

/// Commits on success and rolls back on failure
///
/// A failed commit is reported as the operation's error. A failed rollback
/// is logged and the original error is returned.
pub async fn finish<T>(
    unit: Box<dyn UnitOfWork>,
    outcome: Result<T, CoreError>,
) -> Result<T, CoreError> {
    match outcome {
        Ok(value) => {
            unit.commit().await?;
            Ok(value)
        }
        Err(error) => {
            if let Err(rollback_error) = unit.rollback().await {
                warn!(error = %rollback_error, "Rollback failed");
            }
            Err(error)
        }
    }
}

/// Runs a body inside a unit of work, retrying transient conflicts
///
/// The body is re-evaluated from scratch on every attempt, so it must only
/// borrow its inputs.
///
/// ```rust,ignore
/// let family = in_unit_of_work!(self, "createFamily", |uow| {
///     self.create_family_in(uow, ctx, &details)
/// })?;
/// ```
#[macro_export]
macro_rules! in_unit_of_work {
    ($service:ident, $operation:expr, |$uow:ident| $body:expr) => {{
        let mut attempt: u32 = 0;
        loop {
            let completed = match $service.store.begin().await {
                Ok(mut unit) => {
                    let outcome = {
                        let $uow: &mut dyn $crate::ports::UnitOfWork = unit.as_mut();
                        $body.await
                    };
                    $crate::tx::finish(unit, outcome).await
                }
                Err(error) => Err(core_kernel::CoreError::from(error)),
            };
            match completed {
                Err(error)
                    if error.is_retryable() && attempt < $service.config.max_conflict_retries =>
                {
                    attempt += 1;
                    tracing::warn!(
                        operation = $operation,
                        attempt,
                        error = %error,
                        "Retrying unit of work after transient conflict"
                    );
                }
                other => break other,
            }
        }
    }};
}
