use crate::error::{SyncError, SyncResult};
use crate::models::{Envelope, PartialEnvelope};
use crate::remote::RemoteTransport;
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Clone)]
pub(crate) enum FetchBehavior {
    Respond(SyncResult<Option<PartialEnvelope>>),
    /// Never answers, like an endpoint that swallowed the request.
    Hang,
}

#[derive(Default)]
struct State {
    fetch: Option<FetchBehavior>,
    fetches: usize,
    fail_pushes: bool,
    pushes: Vec<(String, Envelope)>,
}

/// In-memory transport recording every call.
#[derive(Clone, Default)]
pub(crate) struct FakeTransport {
    state: Rc<RefCell<State>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn responding(result: SyncResult<Option<PartialEnvelope>>) -> Self {
        let t = Self::new();
        t.state.borrow_mut().fetch = Some(FetchBehavior::Respond(result));
        t
    }

    pub fn hanging() -> Self {
        let t = Self::new();
        t.state.borrow_mut().fetch = Some(FetchBehavior::Hang);
        t
    }

    pub fn fail_pushes(&self, fail: bool) {
        self.state.borrow_mut().fail_pushes = fail;
    }

    pub fn fetches(&self) -> usize {
        self.state.borrow().fetches
    }

    pub fn pushes(&self) -> Vec<(String, Envelope)> {
        self.state.borrow().pushes.clone()
    }
}

impl RemoteTransport for FakeTransport {
    async fn fetch(&self, _key: &str) -> SyncResult<Option<PartialEnvelope>> {
        let behavior = {
            let mut s = self.state.borrow_mut();
            s.fetches += 1;
            s.fetch.clone()
        };
        match behavior {
            None => Ok(None),
            Some(FetchBehavior::Respond(r)) => r,
            Some(FetchBehavior::Hang) => futures::future::pending().await,
        }
    }

    async fn push(&self, key: &str, envelope: &Envelope) -> SyncResult<()> {
        let mut s = self.state.borrow_mut();
        s.pushes.push((key.to_string(), envelope.clone()));
        if s.fail_pushes {
            return Err(SyncError::write("connection reset"));
        }
        Ok(())
    }
}
