use futures::future::BoxFuture;

/// Starts a unit of work the caller neither waits for nor keeps a handle to.
///
/// This is the only place research execution leaves the request path; a
/// durable queue can replace it without touching the job state machine.
pub trait TaskSpawner: Send + Sync {
    fn spawn_detached(&self, task: BoxFuture<'static, ()>);
}

/// Runs each task on the ambient tokio runtime.
#[derive(Debug, Clone, Default)]
pub struct TokioSpawner;

impl TaskSpawner for TokioSpawner {
    fn spawn_detached(&self, task: BoxFuture<'static, ()>) {
        // JoinHandle dropped on purpose
        drop(tokio::spawn(task));
    }
}
