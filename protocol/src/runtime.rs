//! # Actor Runtime
//!
//! Hosts one actor per tokio task. The task owns the actor's state outright;
//! nothing else can reach it. Everything the outside world wants, whether a
//! mutation or a read, arrives as a [`Command`] on the actor's mailbox and
//! is processed strictly one at a time.
//!
//! ```text
//!   ActorHandle ──► mpsc mailbox ──► task { actor.handle(env, now) }
//!                                          │
//!                                          └──► outbox (unbounded) ──► router
//! ```
//!
//! Outbound messages go into an unbounded outbox, so a committed transition
//! never waits on its recipient. The router that drains the outbox lives
//! with the concrete actors (see `vaulthub_contracts::system`).

use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::MAILBOX_CAPACITY;
use crate::error::{Classify, ErrorClass};
use crate::message::Outbound;
use crate::types::{Address, Envelope, MessageId};

// ---------------------------------------------------------------------------
// Actor trait
// ---------------------------------------------------------------------------

/// A single-threaded state machine driven by enveloped messages.
///
/// `handle` must be atomic: on `Err` the actor's state is exactly what it
/// was before the call.
pub trait Actor: Send + 'static {
    /// Inbound message type.
    type Message: Send + fmt::Debug + 'static;
    /// Typed failure for a rejected message.
    type Error: std::error::Error + Classify + Send + 'static;

    /// Name used in logs and metric labels.
    fn name(&self) -> &'static str;

    /// Short name of a message, for logs and metric labels.
    fn message_kind(message: &Self::Message) -> &'static str;

    /// Applies one message at time `now` (unix seconds) and returns the
    /// messages the transition emits.
    fn handle(
        &mut self,
        envelope: Envelope<Self::Message>,
        now: u64,
    ) -> Result<Vec<Outbound>, Self::Error>;

    /// Called after `handle` rejected a message. Returns notices to emit
    /// about the rejection; the default emits nothing.
    ///
    /// An implementation that emits here must also make the rejection final
    /// (consume the id), or a redelivery could contradict the notice.
    fn on_rejected(
        &mut self,
        _sender: &Address,
        _id: MessageId,
        _error: &Self::Error,
    ) -> Vec<Outbound> {
        Vec::new()
    }
}

/// Receives the outcome of every processed message. Used for metrics.
pub trait Observer: Send + Sync + 'static {
    /// A message was applied.
    fn applied(&self, actor: &'static str, kind: &'static str);
    /// A message was rejected.
    fn rejected(&self, actor: &'static str, kind: &'static str, class: ErrorClass);
}

/// Observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl Observer for NoopObserver {
    fn applied(&self, _actor: &'static str, _kind: &'static str) {}
    fn rejected(&self, _actor: &'static str, _kind: &'static str, _class: ErrorClass) {}
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures of the runtime itself, as opposed to rejected messages.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The actor task has exited and its mailbox is closed.
    #[error("actor {0} has stopped")]
    ActorStopped(&'static str),
}

// ---------------------------------------------------------------------------
// Mailbox
// ---------------------------------------------------------------------------

type Reply<A> = oneshot::Sender<Result<(), <A as Actor>::Error>>;
type QueryFn<A> = Box<dyn FnOnce(&A) + Send>;

/// An instruction for the actor task.
enum Command<A: Actor> {
    /// Process a message. `reply` is `None` for fire-and-forget delivery.
    Deliver {
        envelope: Envelope<A::Message>,
        reply: Option<Reply<A>>,
    },
    /// Run a read-only closure against the current state.
    Query(QueryFn<A>),
}

/// Cloneable handle to a running actor.
pub struct ActorHandle<A: Actor> {
    name: &'static str,
    tx: mpsc::Sender<Command<A>>,
}

impl<A: Actor> Clone for ActorHandle<A> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            tx: self.tx.clone(),
        }
    }
}

impl<A: Actor> ActorHandle<A> {
    /// The actor's name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Submits a message and waits for its outcome.
    ///
    /// The outer `Result` reports runtime failure; the inner one is the
    /// actor's verdict on the message.
    pub async fn submit(
        &self,
        envelope: Envelope<A::Message>,
    ) -> Result<Result<(), A::Error>, RuntimeError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Command::Deliver {
                envelope,
                reply: Some(reply_tx),
            })
            .await
            .map_err(|_| RuntimeError::ActorStopped(self.name))?;
        reply_rx
            .await
            .map_err(|_| RuntimeError::ActorStopped(self.name))
    }

    /// Enqueues a message without waiting for its outcome.
    pub async fn deliver(&self, envelope: Envelope<A::Message>) -> Result<(), RuntimeError> {
        self.tx
            .send(Command::Deliver {
                envelope,
                reply: None,
            })
            .await
            .map_err(|_| RuntimeError::ActorStopped(self.name))
    }

    /// Runs `f` against the actor's state, in mailbox order.
    pub async fn query<R, F>(&self, f: F) -> Result<R, RuntimeError>
    where
        R: Send + 'static,
        F: FnOnce(&A) -> R + Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let run: QueryFn<A> = Box::new(move |actor: &A| {
            // The caller may have given up; nothing to do then.
            let _ = reply_tx.send(f(actor));
        });
        self.tx
            .send(Command::Query(run))
            .await
            .map_err(|_| RuntimeError::ActorStopped(self.name))?;
        reply_rx
            .await
            .map_err(|_| RuntimeError::ActorStopped(self.name))
    }
}

/// Spawns `actor` on its own task.
///
/// The task exits when every [`ActorHandle`] has been dropped, and its
/// `JoinHandle` yields the final state.
pub fn spawn<A: Actor>(
    actor: A,
    clock: Arc<dyn Clock>,
    observer: Arc<dyn Observer>,
    outbox: mpsc::UnboundedSender<Outbound>,
) -> (ActorHandle<A>, JoinHandle<A>) {
    let name = actor.name();
    let (tx, rx) = mpsc::channel(MAILBOX_CAPACITY);
    let task = tokio::spawn(run(actor, rx, clock, observer, outbox));
    (ActorHandle { name, tx }, task)
}

async fn run<A: Actor>(
    mut actor: A,
    mut rx: mpsc::Receiver<Command<A>>,
    clock: Arc<dyn Clock>,
    observer: Arc<dyn Observer>,
    outbox: mpsc::UnboundedSender<Outbound>,
) -> A {
    let name = actor.name();
    info!(actor = name, "actor started");

    while let Some(command) = rx.recv().await {
        match command {
            Command::Deliver { envelope, reply } => {
                let kind = A::message_kind(&envelope.body);
                let id = envelope.id;
                let sender = envelope.sender.clone();

                let (outcome, emitted) = match actor.handle(envelope, clock.now()) {
                    Ok(emitted) => {
                        observer.applied(name, kind);
                        (Ok(()), emitted)
                    }
                    Err(e) => {
                        observer.rejected(name, kind, e.class());
                        debug!(
                            actor = name,
                            kind,
                            id,
                            sender = %sender,
                            code = e.code(),
                            error = %e,
                            "message rejected"
                        );
                        let notices = actor.on_rejected(&sender, id, &e);
                        (Err(e), notices)
                    }
                };

                for message in emitted {
                    if outbox.send(message).is_err() {
                        warn!(actor = name, kind, "outbox closed, dropping emitted message");
                    }
                }

                if let Some(reply) = reply {
                    let _ = reply.send(outcome);
                }
            }
            Command::Query(f) => f(&actor),
        }
    }

    info!(actor = name, "actor stopped");
    actor
}
