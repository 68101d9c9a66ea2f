//! Lazy enumeration of every bug under a ref namespace.
//!
//! A background thread lists refs, reads each bug, and sends results one
//! at a time over a `sync_channel` of bound 1 — at most one item is ever
//! sitting unread, so a consumer that stops early leaves at most one
//! `Bug` stranded rather than however many the namespace happens to hold.
//! The channel's disconnect is the cancellation signal: once the receiver
//! is dropped, the next `send` fails and the thread exits.

use std::sync::Arc;
use std::sync::mpsc::{Receiver, sync_channel};

use tracing::debug;

use crate::bug::Bug;
use crate::config::Config;
use crate::errors::BugError;
use crate::store::Store;

/// Iterator over `(bug | error)` results, backed by a background thread.
/// Yields nothing further after the first `Err`.
pub struct Enumerate {
    receiver: Receiver<Result<Bug, BugError>>,
    done: bool,
}

impl Iterator for Enumerate {
    type Item = Result<Bug, BugError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.receiver.recv() {
            Ok(item) => {
                if item.is_err() {
                    self.done = true;
                }
                Some(item)
            }
            Err(_) => {
                self.done = true;
                None
            }
        }
    }
}

/// Starts background enumeration of every bug whose ref falls under
/// `prefix`, with a channel capacity taken from
/// `config.enumerate_channel_capacity` (spec's "buffered-size-1" default is
/// `1`; raising it trades the drop guarantee for throughput) and legacy-
/// clock-tolerance warnings gated by `config.warn_on_legacy_clock_tolerance`.
pub fn stream(store: Arc<dyn Store + Send + Sync>, prefix: &str, config: &Config) -> Enumerate {
    let (sender, receiver) = sync_channel(config.enumerate_channel_capacity.max(1));
    let prefix = prefix.to_string();
    let config = config.clone();

    std::thread::spawn(move || {
        let refs = match store.list_refs(&prefix) {
            Ok(refs) => refs,
            Err(e) => {
                let _ = sender.send(Err(e));
                return;
            }
        };

        for ref_name in refs {
            let result = Bug::read_with_config(store.as_ref(), &ref_name, &config);
            let is_err = result.is_err();
            if sender.send(result).is_err() {
                debug!("enumeration consumer dropped, stopping producer thread");
                return;
            }
            if is_err {
                return;
            }
        }
    });

    Enumerate {
        receiver,
        done: false,
    }
}
