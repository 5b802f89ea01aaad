//! Task spawning on the host's single-threaded executor

use futures::future::LocalBoxFuture;
use std::future::Future;
use std::rc::Rc;

/// Handle onto the cooperative executor that runs the application's
/// asynchronous work (the browser event loop, or a tokio `LocalSet`).
#[derive(Clone)]
pub struct Spawner {
    spawn_fn: Rc<dyn Fn(LocalBoxFuture<'static, ()>)>,
}

impl Spawner {
    pub fn new<F>(spawn_fn: F) -> Self
    where
        F: Fn(LocalBoxFuture<'static, ()>) + 'static,
    {
        Self {
            spawn_fn: Rc::new(spawn_fn),
        }
    }

    /// Detach `future` onto the executor
    pub fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + 'static,
    {
        (self.spawn_fn)(Box::pin(future));
    }
}
