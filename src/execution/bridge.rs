// Bridge from asynchronous reporting calls to the runner's synchronous
// callbacks: each operation is awaited on the calling thread, bounded by a
// maximum wait.

use std::future::Future;
use std::time::Duration;

use tokio::runtime::{Handle, RuntimeFlavor};
use tracing::{error, warn};

use crate::error::{ClientError, ReporterError};

/// Matches the reporter's historical 30000 ms wait.
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(30);

pub struct SyncBridge {
    handle: Handle,
    max_wait: Duration,
}

impl SyncBridge {
    pub fn new(handle: Handle, max_wait: Duration) -> Self {
        Self { handle, max_wait }
    }

    pub fn max_wait(&self) -> Duration {
        self.max_wait
    }

    /// Block until `operation` settles, logging and swallowing any failure.
    ///
    /// Returns `None` when the operation failed or was abandoned after the
    /// maximum wait.
    pub fn complete<T, F>(&self, operation: &str, fut: F) -> Option<T>
    where
        F: Future<Output = Result<T, ClientError>> + Send + 'static,
        T: Send + 'static,
    {
        match self.settle(operation, fut) {
            Ok(value) => Some(value),
            Err(err) => {
                if err.is_timeout() {
                    warn!("{}", err);
                } else {
                    error!("{}", err);
                }
                None
            }
        }
    }

    /// Block until a client operation settles, with its failure typed.
    pub fn settle<T, F>(&self, operation: &str, fut: F) -> Result<T, ReporterError>
    where
        F: Future<Output = Result<T, ClientError>> + Send + 'static,
        T: Send + 'static,
    {
        self.wait(operation, fut)?
            .map_err(|source| ReporterError::RemoteOperationFailure {
                operation: operation.to_string(),
                source,
            })
    }

    /// Block until `fut` yields, or give up after the maximum wait.
    ///
    /// The future runs as its own task. An abandoned task keeps running
    /// detached and its output is discarded.
    pub fn wait<T, F>(&self, operation: &str, fut: F) -> Result<T, ReporterError>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let flavor = Handle::try_current().map(|current| current.runtime_flavor());
        if let Ok(RuntimeFlavor::CurrentThread) = flavor {
            return Err(ReporterError::fault(
                operation,
                "cannot block inside a current-thread runtime",
            ));
        }

        let task = self.handle.spawn(fut);
        let max_wait = self.max_wait;
        // The timer must be created inside the runtime, so it is built in the
        // future being blocked on rather than on the calling thread.
        let bounded = async move { tokio::time::timeout(max_wait, task).await };

        let outcome = match flavor {
            // Inside a worker (or blocking) thread of a multi-threaded runtime.
            Ok(_) => tokio::task::block_in_place(|| self.handle.block_on(bounded)),
            Err(_) => self.handle.block_on(bounded),
        };

        match outcome {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(join_error)) => Err(ReporterError::fault(operation, join_error.to_string())),
            Err(_elapsed) => Err(ReporterError::RemoteOperationTimeout {
                operation: operation.to_string(),
                waited: self.max_wait,
            }),
        }
    }
}
