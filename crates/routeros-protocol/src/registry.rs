//! Ownership of responses on shared connections.
//!
//! When several client sessions share one persistent socket, every session
//! prefixes its tags with an ownership tag of the form `"<n>_"`. A session
//! reading the socket keeps the responses carrying its own prefix and parks
//! the others in a process-wide table, where their owner picks them up on
//! its next read.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, LazyLock, Weak};

use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::response::Response;

/// Assigns ownership tags and routes responses between sessions sharing a
/// connection.
pub trait Registry: Send + Sync + fmt::Debug {
    /// Returns the prefix this session puts in front of its tags.
    fn ownership_tag(&self) -> &str;

    /// Switches tagless mode and returns the previous setting.
    ///
    /// In tagless mode requests are written with their tag as given, without
    /// the ownership prefix.
    fn set_tagless_mode(&self, tagless: bool) -> bool;

    /// Returns `true` while tagless mode is on.
    fn is_tagless_mode(&self) -> bool;

    /// Takes a freshly read response.
    ///
    /// Returns it, with the ownership prefix removed, when it belongs to this
    /// session; otherwise keeps it for its owner and returns `None`.
    fn route(&self, response: Response) -> Option<Response>;

    /// Takes the oldest response other sessions parked for this one, with
    /// its ownership prefix already removed.
    fn take_parked(&self) -> Option<Response>;

    /// Returns `true` if responses are parked for this session.
    fn has_parked(&self) -> bool;
}

static TABLES: LazyLock<Mutex<HashMap<String, Weak<OwnershipTable>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

#[derive(Debug, Default)]
struct OwnershipTable {
    next_owner: AtomicU32,
    parked: Mutex<HashMap<u32, VecDeque<Response>>>,
}

/// A [`Registry`] backed by a process-wide table keyed by connection
/// identity.
///
/// Every [`attach`](SharedRegistry::attach) with the same key joins the same
/// table. The table lives as long as any of its sessions.
pub struct SharedRegistry {
    key: String,
    owner: u32,
    ownership_tag: String,
    tagless: AtomicBool,
    table: Arc<OwnershipTable>,
}

impl SharedRegistry {
    /// Joins the ownership table for `key` as a new session.
    pub fn attach(key: impl Into<String>) -> Self {
        let key = key.into();
        let table = {
            let mut tables = TABLES.lock();
            tables.retain(|_, table| table.strong_count() > 0);
            if let Some(table) = tables.get(&key).and_then(Weak::upgrade) {
                table
            } else {
                let table = Arc::new(OwnershipTable::default());
                tables.insert(key.clone(), Arc::downgrade(&table));
                table
            }
        };
        let owner = table.next_owner.fetch_add(1, Ordering::Relaxed);
        table.parked.lock().insert(owner, VecDeque::new());
        debug!(key = %key, owner, "Attached to ownership table");
        Self {
            key,
            owner,
            ownership_tag: format!("{owner}_"),
            tagless: AtomicBool::new(false),
            table,
        }
    }

    /// Returns the connection key this registry was attached with.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the number of sessions attached to the same table.
    pub fn sessions(&self) -> usize {
        self.table.parked.lock().len()
    }
}

/// Splits a tag into its owner number and the prefix length, if it carries
/// an ownership prefix.
fn parse_owner(tag: &str) -> Option<(u32, usize)> {
    let (prefix, _) = tag.split_once('_')?;
    if prefix.is_empty() || !prefix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    prefix.parse().ok().map(|owner| (owner, prefix.len() + 1))
}

impl Registry for SharedRegistry {
    fn ownership_tag(&self) -> &str {
        &self.ownership_tag
    }

    fn set_tagless_mode(&self, tagless: bool) -> bool {
        self.tagless.swap(tagless, Ordering::AcqRel)
    }

    fn is_tagless_mode(&self) -> bool {
        self.tagless.load(Ordering::Acquire)
    }

    fn route(&self, mut response: Response) -> Option<Response> {
        let Some((owner, prefix_len)) = parse_owner(response.tag()) else {
            return Some(response);
        };
        if owner == self.owner {
            response.strip_tag_prefix(prefix_len);
            return Some(response);
        }
        let mut parked = self.table.parked.lock();
        if let Some(queue) = parked.get_mut(&owner) {
            trace!(owner, tag = %response.tag(), "Parking response for another session");
            response.strip_tag_prefix(prefix_len);
            queue.push_back(response);
        } else {
            warn!(
                owner,
                tag = %response.tag(),
                "Dropping response for a session that is gone"
            );
        }
        None
    }

    fn take_parked(&self) -> Option<Response> {
        self.table
            .parked
            .lock()
            .get_mut(&self.owner)
            .and_then(VecDeque::pop_front)
    }

    fn has_parked(&self) -> bool {
        self.table
            .parked
            .lock()
            .get(&self.owner)
            .is_some_and(|queue| !queue.is_empty())
    }
}

impl fmt::Debug for SharedRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedRegistry")
            .field("key", &self.key)
            .field("ownership_tag", &self.ownership_tag)
            .field("tagless", &self.is_tagless_mode())
            .finish_non_exhaustive()
    }
}

impl Drop for SharedRegistry {
    fn drop(&mut self) {
        let left = self.table.parked.lock().remove(&self.owner);
        if let Some(queue) = left
            && !queue.is_empty()
        {
            warn!(
                key = %self.key,
                owner = self.owner,
                count = queue.len(),
                "Discarding parked responses of a detached session"
            );
        }
    }
}
