//! Single-threaded executor shared by sessions and the supervisor loop.
//!
//! A [`Dispatcher`] wraps an actix arbiter: one thread, one event loop,
//! work executed in the order it was posted. Sessions are actors started
//! on it, so their mailboxes are the only way state changes reach them.
//! It is always passed in explicitly; nothing here is process-global.

use actix::prelude::*;
use std::future::Future;

#[derive(Clone, Debug)]
pub struct Dispatcher {
    arbiter: ArbiterHandle,
}

impl Dispatcher {
    /// Uses the arbiter of the calling thread.
    ///
    /// # Panics
    /// Panics when called outside of a running actix `System`.
    pub fn current() -> Self {
        Self {
            arbiter: Arbiter::current(),
        }
    }

    /// Starts a new arbiter thread owned by the current `System`.
    pub fn dedicated() -> Self {
        Self {
            arbiter: Arbiter::new().handle(),
        }
    }

    /// Queues a unit of work. Returns false if the dispatcher has stopped.
    pub fn post<F>(&self, work: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        self.arbiter.spawn_fn(work)
    }

    /// Queues a future. Returns false if the dispatcher has stopped.
    pub fn spawn<F>(&self, fut: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.arbiter.spawn(fut)
    }

    /// Starts an actor whose mailbox is drained on this dispatcher.
    pub fn start<A, F>(&self, build: F) -> Addr<A>
    where
        A: Actor<Context = Context<A>>,
        F: FnOnce(&mut Context<A>) -> A + Send + 'static,
    {
        A::start_in_arbiter(&self.arbiter, build)
    }

    /// Stops the underlying event loop once queued work has run.
    pub fn stop(&self) -> bool {
        self.arbiter.stop()
    }
}
