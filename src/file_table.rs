// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

use crate::handler::DataHandler;
use bytes::BytesMut;

//==============================================================================
// Constants & Structures
//==============================================================================

/// File Descriptor. Always the real OS-level integer fd, never a table-assigned index.
pub type Fd = i32;

/// Connection role, per §3 of the data model.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Role {
    FileData,
    ListenStream,
    MessageStream,
    Datagram,
}

/// Per-fd connection state: role, ingress/egress buffers, optional data handler.
pub struct Connection {
    role: Role,
    owned: bool,
    ingress: BytesMut,
    egress: BytesMut,
    on_data: Option<DataHandler>,
}

/// Dense `fd -> Connection` arena, per Design Notes §9: a `Vec<Option<Connection>>`
/// indexed directly by the real fd value (not a slab-assigned index), since the fd is
/// handed to [FdTable::ensure] by the kernel or by the caller, never chosen by the table.
pub struct FdTable {
    slots: Vec<Option<Connection>>,
    initial_buffer_capacity: usize,
}

//==============================================================================
// Associate Functions
//==============================================================================

/// Associate functions for [Connection].
impl Connection {
    pub fn role(&self) -> Role {
        self.role
    }

    /// True if the reactor opened this fd itself (`listen_*`/`connect_*`/`accept`),
    /// as opposed to a caller-supplied fd registered through `watch_fd`. Only
    /// owned fds are closed by the reactor and fall back to the global socket hook.
    pub fn owned(&self) -> bool {
        self.owned
    }

    pub fn ingress(&self) -> &BytesMut {
        &self.ingress
    }

    pub fn ingress_mut(&mut self) -> &mut BytesMut {
        &mut self.ingress
    }

    pub fn egress(&self) -> &BytesMut {
        &self.egress
    }

    pub fn egress_mut(&mut self) -> &mut BytesMut {
        &mut self.egress
    }

    pub fn set_on_data(&mut self, handler: DataHandler) {
        self.on_data = Some(handler);
    }

    /// Takes the data handler out, leaving `None` behind. Paired with
    /// [Connection::set_on_data] so the caller can invoke the handler with
    /// `&mut` access to whatever owns this connection's [FdTable].
    pub fn take_on_data(&mut self) -> Option<DataHandler> {
        self.on_data.take()
    }
}

/// Associate functions for [FdTable].
impl FdTable {
    /// Creates an empty table, reserving room for `initial_fd_table_capacity` fds
    /// and `initial_buffer_capacity` bytes per connection buffer.
    pub fn new(initial_fd_table_capacity: usize, initial_buffer_capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(initial_fd_table_capacity),
            initial_buffer_capacity,
        }
    }

    /// Inserts or confirms a [Connection] at slot `fd` with the given role and
    /// ownership. Idempotent: if a connection already exists at `fd`, it is left
    /// unchanged.
    pub fn ensure(&mut self, fd: Fd, role: Role, owned: bool) {
        assert!(fd >= 0, "fd must be non-negative");
        let ix = fd as usize;
        if ix >= self.slots.len() {
            self.slots.resize_with(ix + 1, || None);
        }
        if self.slots[ix].is_none() {
            self.slots[ix] = Some(Connection {
                role,
                owned,
                ingress: BytesMut::with_capacity(self.initial_buffer_capacity),
                egress: BytesMut::with_capacity(self.initial_buffer_capacity),
                on_data: None,
            });
        }
    }

    /// Returns the connection at `fd`, if present.
    pub fn get(&self, fd: Fd) -> Option<&Connection> {
        self.slots.get(fd as usize)?.as_ref()
    }

    /// Returns the connection at `fd`, if present, mutably.
    pub fn get_mut(&mut self, fd: Fd) -> Option<&mut Connection> {
        self.slots.get_mut(fd as usize)?.as_mut()
    }

    /// Removes the connection at `fd`, if any, and shrinks trailing empty slots.
    pub fn drop(&mut self, fd: Fd) {
        let ix = fd as usize;
        if ix < self.slots.len() {
            self.slots[ix] = None;
        }
        while matches!(self.slots.last(), Some(None)) {
            self.slots.pop();
        }
    }

    /// True if `fd` has a live connection.
    pub fn contains(&self, fd: Fd) -> bool {
        self.get(fd).is_some()
    }

    /// Current table size: one more than the largest fd still present, or 0 if empty.
    pub fn size(&self) -> usize {
        self.slots.len()
    }

    /// Iterates every live `(fd, &Connection)` pair in ascending fd order.
    pub fn iter(&self) -> impl Iterator<Item = (Fd, &Connection)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(ix, slot)| slot.as_ref().map(|c| (ix as Fd, c)))
    }

    /// Every live fd with a non-empty egress buffer, in ascending order.
    pub fn writable_fds(&self) -> Vec<Fd> {
        self.iter()
            .filter(|(_, c)| !c.egress().is_empty())
            .map(|(fd, _)| fd)
            .collect()
    }

    /// Every live fd, in ascending order.
    pub fn all_fds(&self) -> Vec<Fd> {
        self.iter().map(|(fd, _)| fd).collect()
    }
}

//==============================================================================
// Unit Tests
//==============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_is_idempotent() {
        let mut table = FdTable::new(4, 16);
        table.ensure(3, Role::FileData, false);
        table.ensure(3, Role::FileData, false);
        assert!(table.contains(3));
        assert_eq!(table.size(), 4);
    }

    #[test]
    fn drop_shrinks_trailing_slots() {
        let mut table = FdTable::new(4, 16);
        table.ensure(0, Role::FileData, false);
        table.ensure(3, Role::FileData, false);
        table.drop(3);
        assert!(!table.contains(3));
        assert_eq!(table.size(), 1);
    }

    #[test]
    fn drop_keeps_earlier_fds_live() {
        let mut table = FdTable::new(4, 16);
        table.ensure(0, Role::FileData, false);
        table.ensure(1, Role::FileData, false);
        table.drop(1);
        assert!(table.contains(0));
        assert!(!table.contains(1));
        assert_eq!(table.size(), 1);
    }

    #[test]
    fn sparse_domain_allows_absent_fds() {
        let mut table = FdTable::new(4, 16);
        table.ensure(5, Role::FileData, false);
        assert_eq!(table.size(), 6);
        assert!(!table.contains(2));
    }
}
