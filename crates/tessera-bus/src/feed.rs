use tokio::sync::mpsc;

/// Receiving end of one subscription
///
/// Yields events in publish order. `None` from a receive means end-of-stream:
/// the subscription was cancelled, the queue was closed, or the feed
/// overflowed under [`CloseOnFull`](tessera_core::OverflowPolicy::CloseOnFull).
/// Events already queued are still delivered before end-of-stream.
pub struct Feed<T> {
    rx: Receiver<T>,
}

enum Receiver<T> {
    Unbounded(mpsc::UnboundedReceiver<T>),
    Bounded(mpsc::Receiver<T>),
}

pub(crate) enum FeedSender<T> {
    Unbounded(mpsc::UnboundedSender<T>),
    Bounded(mpsc::Sender<T>),
}

/// Outcome of handing one event to a feed
pub(crate) enum Delivery {
    Sent,
    Full,
    Disconnected,
}

impl<T> FeedSender<T> {
    pub(crate) fn deliver(&self, event: T) -> Delivery {
        match self {
            FeedSender::Unbounded(tx) => match tx.send(event) {
                Ok(()) => Delivery::Sent,
                Err(_) => Delivery::Disconnected,
            },
            FeedSender::Bounded(tx) => match tx.try_send(event) {
                Ok(()) => Delivery::Sent,
                Err(mpsc::error::TrySendError::Full(_)) => Delivery::Full,
                Err(mpsc::error::TrySendError::Closed(_)) => Delivery::Disconnected,
            },
        }
    }
}

pub(crate) fn channel<T>(capacity: Option<usize>) -> (FeedSender<T>, Feed<T>) {
    match capacity {
        None => {
            let (tx, rx) = mpsc::unbounded_channel();
            (
                FeedSender::Unbounded(tx),
                Feed {
                    rx: Receiver::Unbounded(rx),
                },
            )
        }
        Some(capacity) => {
            let (tx, rx) = mpsc::channel(capacity);
            (
                FeedSender::Bounded(tx),
                Feed {
                    rx: Receiver::Bounded(rx),
                },
            )
        }
    }
}

impl<T> Feed<T> {
    /// Wait for the next event
    pub async fn recv(&mut self) -> Option<T> {
        match &mut self.rx {
            Receiver::Unbounded(rx) => rx.recv().await,
            Receiver::Bounded(rx) => rx.recv().await,
        }
    }

    /// Block the current thread until the next event
    ///
    /// Must not be called from within an async runtime.
    pub fn blocking_recv(&mut self) -> Option<T> {
        match &mut self.rx {
            Receiver::Unbounded(rx) => rx.blocking_recv(),
            Receiver::Bounded(rx) => rx.blocking_recv(),
        }
    }

    /// Take the next event if one is already queued
    ///
    /// Returns `None` both when the feed is empty and at end-of-stream; use
    /// [`is_closed`](Feed::is_closed) to tell them apart.
    pub fn try_recv(&mut self) -> Option<T> {
        match &mut self.rx {
            Receiver::Unbounded(rx) => rx.try_recv().ok(),
            Receiver::Bounded(rx) => rx.try_recv().ok(),
        }
    }

    /// Drain every queued event without waiting
    pub fn drain(&mut self) -> Vec<T> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }

    /// Whether the publishing side has gone away
    pub fn is_closed(&self) -> bool {
        match &self.rx {
            Receiver::Unbounded(rx) => rx.is_closed(),
            Receiver::Bounded(rx) => rx.is_closed(),
        }
    }
}

impl<T> std::fmt::Debug for Feed<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Feed")
            .field("closed", &self.is_closed())
            .finish()
    }
}
