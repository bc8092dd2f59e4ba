//! Storage for every managed client plus the circular per monitor client lists.
//!
//! Clients live in slots addressed by a generational `ClientId`. Each monitor
//! owns one circular doubly linked list threaded through the clients' `link`
//! fields. A client is in exactly one list or in none; in the latter case the
//! caller holds the `Detached` token for it, which has to be given back to
//! either `link` or `remove`.
use std::collections::HashMap;

use anyhow::{Result, bail};
use xcb::Window;

use crate::{
    client::{Client, ModeFilter, State},
    monitor::Monitor,
};

/// Handle to a managed client. Goes stale once the client is removed.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct ClientId {
    index: usize,
    generation: u32,
}

/// A client that is in the arena but in no monitor list.
#[must_use = "a detached client has to be linked to a monitor or removed"]
#[derive(Debug, PartialEq, Eq)]
pub struct Detached(ClientId);

/// Neighbours of a client in its monitor list
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub(crate) struct Link {
    pub(crate) prev: ClientId,
    pub(crate) next: ClientId,
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    client: Option<Client>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Forward,
    Backward,
}

#[derive(Debug, Default)]
pub struct ClientArena {
    slots: Vec<Slot>,
    free: Vec<usize>,
    windows: HashMap<Window, ClientId>,
}

impl ClientArena {
    pub fn new() -> ClientArena {
        ClientArena::default()
    }

    /// Number of clients currently stored
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// Store a new client. Fails if its window is already managed.
    pub fn insert(&mut self, client: Client) -> Result<Detached> {
        let window = client.window();
        if self.windows.contains_key(&window) {
            bail!("window {} is already managed", window);
        }

        let id = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index];
                slot.client = Some(client);
                ClientId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    client: Some(client),
                });
                ClientId {
                    index: self.slots.len() - 1,
                    generation: 0,
                }
            }
        };
        self.windows.insert(window, id);
        Ok(Detached(id))
    }

    /// Drop a detached client from the arena, handing it back.
    pub fn remove(&mut self, detached: Detached) -> Client {
        let id = detached.0;
        let slot = &mut self.slots[id.index];
        let client = slot
            .client
            .take()
            .expect("a Detached token always refers to a stored client");
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.windows.remove(&client.window());
        client
    }

    /// The client managing `window`, if any
    pub fn lookup(&self, window: Window) -> Option<ClientId> {
        self.windows.get(&window).copied()
    }

    pub fn get(&self, id: ClientId) -> Option<&Client> {
        self.slots
            .get(id.index)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.client.as_ref())
    }

    pub fn get_mut(&mut self, id: ClientId) -> Option<&mut Client> {
        self.slots
            .get_mut(id.index)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.client.as_mut())
    }

    fn linked(&self, id: ClientId) -> Link {
        self.get(id)
            .and_then(|c| c.link)
            .expect("monitor lists only hold linked clients")
    }

    fn linked_mut(&mut self, id: ClientId) -> &mut Link {
        self.get_mut(id)
            .and_then(|c| c.link.as_mut())
            .expect("monitor lists only hold linked clients")
    }

    /// Append a detached client to the end of `monitor`'s list. The client's
    /// monitor is updated to match.
    pub fn link(&mut self, detached: Detached, monitor: &mut Monitor) -> ClientId {
        let id = detached.0;
        let link = match monitor.head() {
            None => {
                monitor.set_head(Some(id));
                Link { prev: id, next: id }
            }
            Some(head) => {
                let tail = self.linked(head).prev;
                self.linked_mut(tail).next = id;
                self.linked_mut(head).prev = id;
                Link {
                    prev: tail,
                    next: head,
                }
            }
        };

        if let Some(client) = self.get_mut(id) {
            client.link = Some(link);
            client.set_monitor(monitor.id());
        }
        id
    }

    /// Take a client out of `monitor`'s list. None if the client is unknown
    /// or not a member of that list.
    pub fn unlink(&mut self, id: ClientId, monitor: &mut Monitor) -> Option<Detached> {
        let link = match self.get(id) {
            Some(c) if c.monitor() == monitor.id() => c.link?,
            _ => return None,
        };

        if link.next == id {
            monitor.set_head(None);
        } else {
            self.linked_mut(link.prev).next = link.next;
            self.linked_mut(link.next).prev = link.prev;
            if monitor.head() == Some(id) {
                monitor.set_head(Some(link.next));
            }
        }

        if let Some(client) = self.get_mut(id) {
            client.link = None;
        }
        Some(Detached(id))
    }

    /// Move the head of `monitor`'s list one step, which rotates the order
    /// clients are tiled in.
    pub fn rotate(&self, monitor: &mut Monitor, forward: bool) {
        if let Some(head) = monitor.head() {
            let link = self.linked(head);
            monitor.set_head(Some(if forward { link.next } else { link.prev }));
        }
    }

    /// Clients of `monitor` in list order, starting at its head
    pub fn iter<'a>(&'a self, monitor: &Monitor) -> Iter<'a> {
        Iter {
            arena: self,
            head: monitor.head(),
            next: monitor.head(),
            remaining: self.len(),
        }
    }

    /// The first client after `from` in list order that matches, wrapping
    /// around. `from` itself is considered last, after a full turn.
    pub fn next(
        &self,
        from: ClientId,
        mode: ModeFilter,
        state: State,
        monitor: &Monitor,
    ) -> Option<ClientId> {
        self.walk(from, Direction::Forward, mode, state, monitor)
    }

    /// Same as `next`, walking the list backwards.
    pub fn previous(
        &self,
        from: ClientId,
        mode: ModeFilter,
        state: State,
        monitor: &Monitor,
    ) -> Option<ClientId> {
        self.walk(from, Direction::Backward, mode, state, monitor)
    }

    /// The first matching client of `monitor` starting at its head
    pub fn first(&self, mode: ModeFilter, state: State, monitor: &Monitor) -> Option<ClientId> {
        let head = monitor.head()?;
        if self.get(head)?.matches(mode, state, monitor) {
            Some(head)
        } else {
            self.next(head, mode, state, monitor)
        }
    }

    fn walk(
        &self,
        from: ClientId,
        direction: Direction,
        mode: ModeFilter,
        state: State,
        monitor: &Monitor,
    ) -> Option<ClientId> {
        let start = self.get(from).filter(|c| c.monitor() == monitor.id())?;
        let mut link = start.link?;

        // a list never holds more than every stored client
        for _ in 0..self.len() {
            let id = match direction {
                Direction::Forward => link.next,
                Direction::Backward => link.prev,
            };
            let client = self.get(id)?;
            if client.matches(mode, state, monitor) {
                return Some(id);
            }
            if id == from {
                return None;
            }
            link = client.link?;
        }
        None
    }
}

/// Iterator over one monitor's client list
pub struct Iter<'a> {
    arena: &'a ClientArena,
    head: Option<ClientId>,
    next: Option<ClientId>,
    remaining: usize,
}

impl<'a> Iterator for Iter<'a> {
    type Item = ClientId;

    fn next(&mut self) -> Option<ClientId> {
        if self.remaining == 0 {
            return None;
        }
        let current = self.next?;
        self.remaining -= 1;
        let following = self.arena.get(current).and_then(|c| c.link).map(|l| l.next);
        self.next = match following {
            Some(id) if Some(id) != self.head => Some(id),
            _ => None,
        };
        Some(current)
    }
}
