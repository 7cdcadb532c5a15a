//! Change-feed relay
//!
//! The transport adapter holds the [`Relay`] and sends the id of every asset
//! another session modified. The receiving half is a plain
//! `UnboundedReceiver` drained by the desk's forwarding loop.

use futures::channel::mpsc::{UnboundedReceiver, UnboundedSender, unbounded};
#[cfg(debug_assertions)]
use std::panic::Location;
#[cfg(debug_assertions)]
use std::sync::{Arc, OnceLock};

/// Sending half of a change feed, named `{source}_{event}_relay` at use
/// sites, e.g. `asset_changed_relay`.
#[derive(Clone, Debug)]
pub struct Relay<T>
where
    T: Send + 'static,
{
    sender: UnboundedSender<T>,
    #[cfg(debug_assertions)]
    emit_location: Arc<OnceLock<&'static Location<'static>>>,
}

impl<T> Relay<T>
where
    T: Send + 'static,
{
    /// Sends an event. Events sent after the feed was disconnected are dropped.
    ///
    /// Debug builds panic when one relay is sent from two call sites.
    #[track_caller]
    pub fn send(&self, value: T) {
        #[cfg(debug_assertions)]
        {
            let caller = Location::caller();
            match self.emit_location.set(caller) {
                Err(previous) if previous != caller => {
                    panic!("relay sent from {caller} but already bound to {previous}")
                }
                _ => {}
            }
        }

        if self.sender.unbounded_send(value).is_err() {
            log::debug!("relay: event dropped, feed disconnected");
        }
    }
}

pub fn relay<T>() -> (Relay<T>, UnboundedReceiver<T>)
where
    T: Send + 'static,
{
    let (sender, receiver) = unbounded();
    (
        Relay {
            sender,
            #[cfg(debug_assertions)]
            emit_location: Arc::new(OnceLock::new()),
        },
        receiver,
    )
}
