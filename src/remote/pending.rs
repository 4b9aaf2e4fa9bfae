use crate::error::{SyncError, SyncResult};
use crate::util::{now_ms, random_suffix};
use futures::channel::oneshot;
use std::cell::RefCell;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::rc::{Rc, Weak};
use std::task::{Context, Poll};

/// Correlates one-shot remote reads with their responses.
///
/// Each registered request gets an id that is unique across overlapping
/// calls (timestamp, per-table counter, random suffix). A response is
/// delivered only to the request whose id it carries; anything that arrives
/// after the request finished is dropped.
pub struct PendingTable<T> {
    inner: Rc<RefCell<Inner<T>>>,
}

struct Inner<T> {
    next: u64,
    waiting: HashMap<RequestId, oneshot::Sender<T>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RequestId(String);

impl RequestId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl<T> Clone for PendingTable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> Default for PendingTable<T> {
    fn default() -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                next: 0,
                waiting: HashMap::new(),
            })),
        }
    }
}

impl<T: 'static> PendingTable<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self) -> PendingRequest<T> {
        let (tx, rx) = oneshot::channel();

        let id = {
            let mut inner = self.inner.borrow_mut();
            inner.next += 1;
            let id = RequestId(format!("{}_{}_{}", now_ms(), inner.next, random_suffix()));
            inner.waiting.insert(id.clone(), tx);
            id
        };

        let mut cleanup = Cleanup::default();
        let weak: Weak<RefCell<Inner<T>>> = Rc::downgrade(&self.inner);
        let id2 = id.clone();
        cleanup.push(move || {
            if let Some(inner) = weak.upgrade() {
                inner.borrow_mut().waiting.remove(&id2);
            }
        });

        PendingRequest { id, rx, cleanup }
    }

    /// Hands `value` to the matching request. Returns `false` for unknown or
    /// already-finished ids.
    pub fn resolve(&self, id: &RequestId, value: T) -> bool {
        let tx = self.inner.borrow_mut().waiting.remove(id);
        match tx {
            Some(tx) => tx.send(value).is_ok(),
            None => {
                log::debug!("dropping late delivery for request {id}");
                false
            }
        }
    }

    pub fn in_flight(&self) -> usize {
        self.inner.borrow().waiting.len()
    }
}

/// Cleanup hooks that run exactly once, on completion or on drop.
#[derive(Default)]
struct Cleanup {
    hooks: Vec<Box<dyn FnOnce()>>,
    done: bool,
}

impl Cleanup {
    fn push(&mut self, f: impl FnOnce() + 'static) {
        self.hooks.push(Box::new(f));
    }

    fn run(&mut self) {
        if self.done {
            return;
        }
        self.done = true;
        for hook in self.hooks.drain(..) {
            hook();
        }
    }
}

impl Drop for Cleanup {
    fn drop(&mut self) {
        self.run();
    }
}

/// A registered read. Awaiting it yields the delivered value; dropping it
/// (e.g. when a timeout wins the race) releases everything registered
/// through [`PendingRequest::on_cleanup`].
pub struct PendingRequest<T> {
    id: RequestId,
    rx: oneshot::Receiver<T>,
    cleanup: Cleanup,
}

impl<T> PendingRequest<T> {
    pub fn id(&self) -> &RequestId {
        &self.id
    }

    pub fn on_cleanup(&mut self, f: impl FnOnce() + 'static) {
        self.cleanup.push(f);
    }
}

impl<T> Future for PendingRequest<T> {
    type Output = SyncResult<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let out = match Pin::new(&mut self.rx).poll(cx) {
            Poll::Pending => return Poll::Pending,
            Poll::Ready(Ok(v)) => Ok(v),
            Poll::Ready(Err(oneshot::Canceled)) => Err(SyncError::Cancelled),
        };
        self.cleanup.run();
        Poll::Ready(out)
    }
}
