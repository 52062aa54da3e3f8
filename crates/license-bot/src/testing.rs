//! Shared test doubles for the workflow tests.

use std::sync::Mutex;

use crate::reply::{Reply, ReplyError, ReplySink};
use crate::router::Invoker;

/// One call received by a [`RecordingSink`].
#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    Rejected(String),
    Deferred,
    Finalized(Reply),
}

/// Reply sink that records every call in order.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<SinkEvent>>,
    fail_defer: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose `defer` fails, as when the interaction token expired.
    pub fn failing_defer() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            fail_defer: true,
        }
    }

    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().unwrap().clone()
    }

    /// The finalized reply, if any.
    pub fn finalized(&self) -> Option<Reply> {
        self.events().into_iter().find_map(|e| match e {
            SinkEvent::Finalized(r) => Some(r),
            _ => None,
        })
    }

    /// Text of the finalized reply; panics if it was not plain text.
    pub fn finalized_text(&self) -> String {
        match self.finalized() {
            Some(Reply::Text(t)) => t,
            other => panic!("expected a finalized text reply, got {:?}", other),
        }
    }

    /// Text of the immediate rejection, if any.
    pub fn rejection(&self) -> Option<String> {
        self.events().into_iter().find_map(|e| match e {
            SinkEvent::Rejected(t) => Some(t),
            _ => None,
        })
    }
}

impl ReplySink for RecordingSink {
    async fn reject(&self, content: &str) -> Result<(), ReplyError> {
        self.events
            .lock()
            .unwrap()
            .push(SinkEvent::Rejected(content.to_string()));
        Ok(())
    }

    async fn defer(&self) -> Result<(), ReplyError> {
        if self.fail_defer {
            return Err(serenity::Error::Other("interaction expired").into());
        }
        self.events.lock().unwrap().push(SinkEvent::Deferred);
        Ok(())
    }

    async fn finalize(&self, reply: Reply) -> Result<(), ReplyError> {
        self.events.lock().unwrap().push(SinkEvent::Finalized(reply));
        Ok(())
    }
}

/// A guild member with the given role ids and no role names.
pub fn member(user_id: u64, role_ids: &[u64]) -> Invoker {
    Invoker {
        user_id,
        tag: format!("user{}", user_id),
        role_ids: role_ids.to_vec(),
        role_names: Vec::new(),
    }
}

/// A guild member holding a role named `role_name`.
pub fn member_with_role_name(user_id: u64, role_name: &str) -> Invoker {
    Invoker {
        role_names: vec![role_name.to_string()],
        ..member(user_id, &[])
    }
}
