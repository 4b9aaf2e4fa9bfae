use crate::models::Envelope;
use crate::remote::RemoteTransport;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::task::{Poll, Waker};

/// Counters describing what happened to remote writes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OutboxStats {
    pub enqueued: u64,
    pub delivered: u64,
    pub failed: u64,
    /// Evicted because the queue was full.
    pub dropped: u64,
    /// Superseded by a newer snapshot before they were sent.
    pub coalesced: u64,
    pub out_of_order: u64,
    pub last_sent: Option<u64>,
    pub last_delivered: Option<u64>,
}

struct Queued {
    seq: u64,
    envelope: Envelope,
}

struct Shared {
    queue: VecDeque<Queued>,
    capacity: usize,
    next_seq: u64,
    closed: bool,
    waker: Option<Waker>,
    stats: OutboxStats,
}

impl Shared {
    fn wake(&mut self) {
        if let Some(w) = self.waker.take() {
            w.wake();
        }
    }
}

/// Producer side of the remote write queue.
///
/// Writes are full-state snapshots, so the queue keeps the newest ones: when
/// it is full the oldest queued snapshot is evicted. `enqueue` never blocks
/// and never fails.
pub struct Outbox {
    shared: Rc<RefCell<Shared>>,
}

/// Consumer side; drive [`OutboxWorker::run`] on the local executor.
pub struct OutboxWorker {
    shared: Rc<RefCell<Shared>>,
}

impl Outbox {
    pub fn new(capacity: usize) -> (Self, OutboxWorker) {
        let shared = Rc::new(RefCell::new(Shared {
            queue: VecDeque::new(),
            capacity: capacity.max(1),
            next_seq: 0,
            closed: false,
            waker: None,
            stats: OutboxStats::default(),
        }));
        (
            Self {
                shared: shared.clone(),
            },
            OutboxWorker { shared },
        )
    }

    /// Queues a snapshot and returns its sequence number.
    pub fn enqueue(&self, envelope: Envelope) -> u64 {
        let mut s = self.shared.borrow_mut();
        s.next_seq += 1;
        let seq = s.next_seq;

        if s.queue.len() >= s.capacity {
            if let Some(old) = s.queue.pop_front() {
                s.stats.dropped += 1;
                log::warn!("outbox full; dropping remote write #{}", old.seq);
            }
        }

        s.queue.push_back(Queued { seq, envelope });
        s.stats.enqueued += 1;
        s.wake();
        seq
    }

    pub fn queued(&self) -> usize {
        self.shared.borrow().queue.len()
    }

    pub fn stats(&self) -> OutboxStats {
        self.shared.borrow().stats.clone()
    }
}

impl Drop for Outbox {
    fn drop(&mut self) {
        let mut s = self.shared.borrow_mut();
        s.closed = true;
        s.wake();
    }
}

impl OutboxWorker {
    async fn next_batch(&self) -> Option<Vec<Queued>> {
        futures::future::poll_fn(|cx| {
            let mut s = self.shared.borrow_mut();
            if !s.queue.is_empty() {
                return Poll::Ready(Some(s.queue.drain(..).collect()));
            }
            if s.closed {
                return Poll::Ready(None);
            }
            s.waker = Some(cx.waker().clone());
            Poll::Pending
        })
        .await
    }

    fn note_sent(&self, seq: u64) {
        let mut s = self.shared.borrow_mut();
        if let Some(last) = s.stats.last_sent {
            if seq <= last {
                s.stats.out_of_order += 1;
                log::warn!("remote write #{seq} sent after #{last}");
            }
        }
        s.stats.last_sent = Some(seq);
    }

    /// Sends queued snapshots one at a time until the [`Outbox`] is dropped.
    /// Failures are logged and counted; nothing is retried.
    pub async fn run<T: RemoteTransport>(self, transport: T, key: String) {
        while let Some(mut batch) = self.next_batch().await {
            let Some(latest) = batch.pop() else {
                continue;
            };
            if !batch.is_empty() {
                let skipped = batch.len() as u64;
                self.shared.borrow_mut().stats.coalesced += skipped;
                log::debug!("remote write #{} supersedes {skipped} queued", latest.seq);
            }

            self.note_sent(latest.seq);
            let result = transport.push(&key, &latest.envelope).await;

            let mut s = self.shared.borrow_mut();
            match result {
                Ok(()) => {
                    s.stats.delivered += 1;
                    s.stats.last_delivered = Some(latest.seq);
                    log::debug!("remote write #{} sent", latest.seq);
                }
                Err(e) => {
                    s.stats.failed += 1;
                    log::warn!("remote write #{} dropped: {e}", latest.seq);
                }
            }
        }
        log::debug!("outbox closed");
    }
}
