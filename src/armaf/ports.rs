//! Request/response channels used to talk to actors.

use std::{fmt::Debug, result::Result};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};

/// How many requests may be queued for an actor before senders have to wait.
const REQUEST_QUEUE_DEPTH: usize = 8;

type ResponseReceiver<R, E> = oneshot::Receiver<Result<R, E>>;

/// A single message for an actor, together with the channel its answer goes
/// back on.
pub struct Request<P, R, E> {
    pub payload: P,
    pub response_sender: oneshot::Sender<Result<R, E>>,
}

impl<P, R, E> Request<P, R, E> {
    /// Wrap `payload` in a request. The returned receiver resolves once the
    /// actor sends its answer on `response_sender`, or errors if the request
    /// is dropped unanswered.
    pub fn new(payload: P) -> (Request<P, R, E>, ResponseReceiver<R, E>) {
        let (response_sender, response_receiver) = oneshot::channel();
        (
            Request {
                payload,
                response_sender,
            },
            response_receiver,
        )
    }
}

/// Ways in which talking to an actor can fail.
#[derive(Debug, Error, Clone)]
pub enum ActorRequestError<E: Debug> {
    /// The actor is gone, its request queue is closed.
    #[error("error when sending message to actor")]
    Send,

    /// The actor dropped the request without answering it.
    #[error("error while awaiting request response channel")]
    Recv,

    /// The actor handled the request and reported an error.
    #[error("{0:?}")]
    Actor(E),
}

/// The sending half of an actor's mailbox.
///
/// Ports are cheap to clone and every clone talks to the same actor. The
/// actor treats the moment its last port is dropped as the signal to tear
/// itself down; there is no dedicated stop message.
#[derive(Debug)]
pub struct ActorPort<P, R, E: Debug> {
    message_sender: mpsc::Sender<Request<P, R, E>>,
    shutdown_receiver: watch::Receiver<()>,
}

// Derived Clone would require P, R and E to be Clone, and anyhow::Error isn't.
impl<P, R, E: Debug> Clone for ActorPort<P, R, E> {
    fn clone(&self) -> Self {
        Self {
            message_sender: self.message_sender.clone(),
            shutdown_receiver: self.shutdown_receiver.clone(),
        }
    }
}

impl<P, R, E: Debug> ActorPort<P, R, E> {
    /// Create a connected port and receiver pair. The receiver is meant to be
    /// moved into the actor's task.
    pub fn make() -> (ActorPort<P, R, E>, ActorReceiver<P, R, E>) {
        let (message_sender, request_receiver) = mpsc::channel(REQUEST_QUEUE_DEPTH);
        let (shutdown_notifier, shutdown_receiver) = watch::channel(());
        (
            ActorPort {
                message_sender,
                shutdown_receiver,
            },
            ActorReceiver {
                request_receiver,
                _shutdown_notifier: shutdown_notifier,
            },
        )
    }

    /// Send `payload` to the actor and wait for its answer.
    pub async fn request(&self, payload: P) -> Result<R, ActorRequestError<E>> {
        let (req, rx) = Request::new(payload);
        if self.message_sender.send(req).await.is_err() {
            return Err(ActorRequestError::Send);
        }
        match rx.await {
            Err(_) => Err(ActorRequestError::Recv),
            Ok(Ok(response)) => Ok(response),
            Ok(Err(actor_error)) => Err(ActorRequestError::Actor(actor_error)),
        }
    }

    /// Drop this port and wait until the actor has finished.
    ///
    /// Returns once every other clone of the port is gone too and the actor
    /// has dropped its [ActorReceiver], i.e. after its teardown completed.
    pub async fn await_shutdown(self) {
        drop(self.message_sender);
        let mut shutdown_receiver = self.shutdown_receiver;
        // Nobody ever sends on this channel, it only ever closes.
        let result = shutdown_receiver.changed().await;
        debug_assert!(result.is_err());
    }
}

/// The receiving half of an actor's mailbox.
///
/// Dropping it is what wakes up [ActorPort::await_shutdown], so it must be the
/// last thing an actor lets go of.
#[derive(Debug)]
pub struct ActorReceiver<P, R, E: Debug> {
    pub request_receiver: mpsc::Receiver<Request<P, R, E>>,
    _shutdown_notifier: watch::Sender<()>,
}

impl<P, R, E: Debug> ActorReceiver<P, R, E> {
    /// Next request, or `None` once all ports have been dropped.
    pub async fn recv(&mut self) -> Option<Request<P, R, E>> {
        self.request_receiver.recv().await
    }
}
