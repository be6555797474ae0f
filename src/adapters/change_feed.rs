//! Change feed: a bounded queue of [`StateChange`]s for an outer layer
//! (socket server, test harness) to drain at its own pace.
//!
//! ```text
//! ┌─────────┐  StateChange  ┌────────────┐  receive()  ┌──────────┐
//! │  Board  │──────────────▶│ ChangeFeed │────────────▶│ consumer │
//! └─────────┘   try_send    └────────────┘             └──────────┘
//! ```
//!
//! Everything runs on one executor, so the channel uses `NoopRawMutex`.
//! A full queue drops the newest change with a warning; the board never
//! blocks on a slow consumer.

use std::rc::Rc;

use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_sync::channel::Channel;
use log::warn;

use crate::app::events::StateChange;
use crate::app::ports::EventSink;

/// Queue depth.
pub const FEED_DEPTH: usize = 64;

type FeedChannel = Channel<NoopRawMutex, StateChange, FEED_DEPTH>;

/// Cloneable handle; subscribe one clone and read from another.
#[derive(Clone)]
pub struct ChangeFeed {
    channel: Rc<FeedChannel>,
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeFeed {
    pub fn new() -> Self {
        Self {
            channel: Rc::new(Channel::new()),
        }
    }

    /// Wait for the next change.
    pub async fn receive(&self) -> StateChange {
        self.channel.receive().await
    }

    pub fn try_receive(&self) -> Option<StateChange> {
        self.channel.try_receive().ok()
    }

    /// Drain everything currently queued.
    pub fn drain(&self) -> Vec<StateChange> {
        core::iter::from_fn(|| self.try_receive()).collect()
    }

    pub fn len(&self) -> usize {
        self.channel.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channel.is_empty()
    }
}

impl EventSink for ChangeFeed {
    fn emit(&mut self, change: &StateChange) {
        if self.channel.try_send(change.clone()).is_err() {
            warn!("Change feed full, dropping {:?}", change.target());
        }
    }
}
