use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;

use super::executor::Completion;

/// Why background work produced no value of its own.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkerFailure {
    #[error("worker thread could not be spawned: {0}")]
    Spawn(String),
    #[error("worker panicked: {0}")]
    Panicked(String),
}

/// Runs `work` on a background thread and delivers its result through `completion`.
///
/// The reply is never abandoned: a panic inside `work`, or a thread that cannot
/// be spawned, completes with `on_failure` instead.
pub fn spawn_worker<T, W, F>(completion: Completion<T>, work: W, on_failure: F)
where
    T: Send + 'static,
    W: FnOnce() -> T + Send + 'static,
    F: FnOnce(WorkerFailure) -> T + Send + 'static,
{
    let reply = Arc::new(Mutex::new(Some((completion, on_failure))));
    let worker_reply = Arc::clone(&reply);
    let spawned = std::thread::Builder::new()
        .name("transpop-worker".to_string())
        .spawn(move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(work));
            let Some((completion, on_failure)) = take_reply(&worker_reply) else {
                return;
            };
            match outcome {
                Ok(value) => completion.complete(value),
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    tracing::warn!(%message, "worker panicked");
                    completion.complete(on_failure(WorkerFailure::Panicked(message)));
                }
            }
        });
    if let Err(err) = spawned {
        tracing::warn!(?err, "failed to spawn worker thread");
        if let Some((completion, on_failure)) = take_reply(&reply) {
            completion.complete(on_failure(WorkerFailure::Spawn(err.to_string())));
        }
    }
}

fn take_reply<R>(reply: &Mutex<Option<R>>) -> Option<R> {
    reply
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .take()
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
