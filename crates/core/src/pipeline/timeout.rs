use std::thread;
use std::time::Duration;

use crossbeam_channel::RecvTimeoutError;

use crate::shared::error::PipelineError;

/// Run `f` with an upper bound on how long the caller waits for it.
///
/// With no limit, `f` runs on the calling thread. Otherwise it runs on a
/// worker thread; on expiry the caller gets [`PipelineError::Timeout`] and
/// the worker is left to finish on its own, its result discarded.
pub fn run_with_timeout<T, F>(
    operation: &'static str,
    limit: Option<Duration>,
    f: F,
) -> Result<T, PipelineError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, PipelineError> + Send + 'static,
{
    let Some(limit) = limit else {
        return f();
    };

    let (tx, rx) = crossbeam_channel::bounded(1);
    thread::Builder::new()
        .name(format!("timed-{operation}"))
        .spawn(move || {
            // The receiver is gone if the caller already timed out.
            let _ = tx.send(f());
        })
        .map_err(|e| PipelineError::Inference {
            stage: operation,
            message: format!("could not start worker thread: {e}"),
        })?;

    match rx.recv_timeout(limit) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => {
            log::warn!("{operation} exceeded {limit:?}");
            Err(PipelineError::Timeout {
                operation,
                after: limit,
            })
        }
        Err(RecvTimeoutError::Disconnected) => Err(PipelineError::Inference {
            stage: operation,
            message: "worker thread panicked".to_string(),
        }),
    }
}
