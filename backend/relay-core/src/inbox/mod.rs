//! Long-lived receiving side of the relay.
//!
//! A [`MessageInbox`] keeps a transport session open with a listener
//! registered on it. The listener runs on the transport's thread and only
//! appends to a FIFO queue; callers take messages out with a bounded
//! [`receive`](MessageInbox::receive).
//!
//! # Synchronization
//!
//! The queue and the connected flag sit behind one `std::sync::Mutex`, which
//! is never held across an `.await`. A `Notify` plays the condition
//! variable: a waiter enables its `Notified` future before inspecting the
//! queue, so an arrival or a disconnect between the check and the wait still
//! wakes it.

use crate::error::TransportError;
use crate::transport::{ConnectionHandle, ConnectionState, MessageListener, PendingMessage, Transport};

use common::ErrorLocation;

use std::collections::VecDeque;
use std::panic::Location;
use std::pin::pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::{Mutex as AsyncMutex, Notify, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, timeout_at};

pub const INBOX_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

struct InboxState {
    queue: VecDeque<PendingMessage>,
    connected: bool,
    /// Bumped on every connect so a stale suspension watcher cannot
    /// disconnect a newer session.
    generation: u64,
}

struct InboxShared {
    state: Mutex<InboxState>,
    wakeup: Notify,
}

impl InboxShared {
    fn lock(&self) -> MutexGuard<'_, InboxState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, message: PendingMessage) {
        let depth = {
            let mut state = self.lock();
            state.queue.push_back(message);
            state.queue.len()
        };
        debug!("Inbox queued message ({depth} pending)");
        self.wakeup.notify_waiters();
    }

    fn pop(&self) -> Result<Option<PendingMessage>, TransportError> {
        let mut state = self.lock();
        if !state.connected {
            return Err(TransportError::NotConnected {
                message: String::from("Inbox is not connected to the transport"),
                location: ErrorLocation::from(Location::caller()),
            });
        }
        Ok(state.queue.pop_front())
    }

    fn mark_connected(&self) -> u64 {
        let mut state = self.lock();
        state.connected = true;
        state.generation += 1;
        state.generation
    }

    fn mark_disconnected(&self, generation: Option<u64>) {
        let changed = {
            let mut state = self.lock();
            let current = generation.is_none_or(|g| g == state.generation);
            if current && state.connected {
                state.connected = false;
                true
            } else {
                false
            }
        };
        if changed {
            self.wakeup.notify_waiters();
        }
    }
}

struct InboxListener {
    shared: Arc<InboxShared>,
}

impl MessageListener for InboxListener {
    fn on_message(&self, message: PendingMessage) {
        self.shared.push(message);
    }
}

struct InboxLink<T: Transport> {
    connection: ConnectionHandle<T>,
    watcher: Option<JoinHandle<()>>,
}

impl<T: Transport> InboxLink<T> {
    fn stop_watcher(&mut self) {
        if let Some(watcher) = self.watcher.take() {
            watcher.abort();
        }
    }
}

pub struct MessageInbox<T: Transport> {
    shared: Arc<InboxShared>,
    link: AsyncMutex<InboxLink<T>>,
    connect_timeout: Duration,
}

impl<T: Transport> MessageInbox<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self {
            shared: Arc::new(InboxShared {
                state: Mutex::new(InboxState {
                    queue: VecDeque::new(),
                    connected: false,
                    generation: 0,
                }),
                wakeup: Notify::new(),
            }),
            link: AsyncMutex::new(InboxLink {
                connection: ConnectionHandle::new(transport),
                watcher: None,
            }),
            connect_timeout: INBOX_CONNECT_TIMEOUT,
        }
    }

    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    pub fn is_connected(&self) -> bool {
        self.shared.lock().connected
    }

    /// Number of buffered messages.
    pub fn pending(&self) -> usize {
        self.shared.lock().queue.len()
    }

    /// Connect and register the listener.
    ///
    /// Repeated calls on a live session do nothing, so there is never more
    /// than one session or listener.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the session cannot be brought up or the
    /// listener cannot be registered.
    pub async fn connect(&self) -> Result<(), TransportError> {
        let mut link = self.link.lock().await;
        if link.connection.is_connected() && self.is_connected() {
            debug!("Inbox already connected");
            return Ok(());
        }

        link.stop_watcher();
        if let Some(session) = link.connection.session() {
            link.connection.transport().remove_listener(session);
        }

        let session = link.connection.connect(self.connect_timeout).await?;
        let listener = Arc::new(InboxListener {
            shared: Arc::clone(&self.shared),
        });
        if let Err(e) = link.connection.transport().add_listener(session, listener) {
            link.connection.disconnect();
            return Err(e);
        }

        let generation = self.shared.mark_connected();
        if let Some(state) = link.connection.subscribe() {
            link.watcher = Some(spawn_suspension_watcher(
                Arc::clone(&self.shared),
                state,
                generation,
            ));
        }
        info!("Inbox listening on session {session}");

        Ok(())
    }

    /// Unregister and close the session, waking every pending `receive`.
    ///
    /// Buffered messages stay queued. Safe when not connected.
    pub async fn disconnect(&self) {
        let mut link = self.link.lock().await;
        link.stop_watcher();
        if let Some(session) = link.connection.session() {
            link.connection.transport().remove_listener(session);
            info!("Inbox disconnecting session {session}");
        }
        link.connection.disconnect();
        self.shared.mark_disconnected(None);
    }

    /// Drop every buffered message. Returns how many were discarded.
    pub fn clear_queue(&self) -> usize {
        let mut state = self.shared.lock();
        let discarded = state.queue.len();
        state.queue.clear();
        if discarded > 0 {
            debug!("Inbox discarded {discarded} stale messages");
        }
        discarded
    }

    /// Wait up to `timeout` for the next message in arrival order.
    ///
    /// Returns `Ok(None)` when the timeout elapses.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::NotConnected`] as soon as the inbox is found
    /// disconnected, including when a disconnect happens mid-wait.
    pub async fn receive(
        &self,
        timeout: Duration,
    ) -> Result<Option<PendingMessage>, TransportError> {
        // `None` when the timeout is too large to land on the clock: wait unbounded.
        let deadline = Instant::now().checked_add(timeout);

        loop {
            let mut notified = pin!(self.shared.wakeup.notified());
            notified.as_mut().enable();

            if let Some(message) = self.shared.pop()? {
                return Ok(Some(message));
            }

            match deadline {
                Some(deadline) => {
                    if timeout_at(deadline, notified).await.is_err() {
                        debug!("Inbox receive timed out after {timeout:?}");
                        return Ok(None);
                    }
                }
                None => notified.await,
            }
        }
    }
}

/// Mark the inbox disconnected once the transport suspends or drops the
/// session it was connected with.
fn spawn_suspension_watcher(
    shared: Arc<InboxShared>,
    mut state: watch::Receiver<ConnectionState>,
    generation: u64,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if state
            .wait_for(|s| *s != ConnectionState::Connected)
            .await
            .is_err()
        {
            debug!("Transport closed the inbox session");
        }
        warn!("Inbox session suspended by the transport");
        shared.mark_disconnected(Some(generation));
    })
}
