//! The ASPA validation table.
//!
//! An [`AspaTable`] organizes the validated Autonomous System Provider
//! Authorization data received from one or more RPKI-RTR cache
//! sessions. Each session gets its own sorted record store; readers
//! resolve a customer ASN across all attached stores, writers run one
//! of the update mechanisms in [`crate::update`].

use std::fmt;
use std::mem;

use inetnum::asn::Asn;
use log::{debug, error, trace};
use parking_lot::{Mutex, RwLock};

use crate::types::{
    AspaRecord, AspaStoreError, HopResult, SocketId, UpdateError,
};
use crate::update::{self, OperationKind, UpdateOperation};

use self::config::{TableConfig, UpdateStrategy};

pub mod config;

mod array;

pub use self::array::AspaArray;

//------------ RecordEvent ---------------------------------------------------

/// The direction of a record change reported to a table's listener.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum RecordEvent {
    /// The record became visible in the table.
    Added,
    /// The record was withdrawn from the table.
    Removed,
}

impl fmt::Display for RecordEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordEvent::Added => write!(f, "added"),
            RecordEvent::Removed => write!(f, "removed"),
        }
    }
}

//------------ AspaListener --------------------------------------------------

/// A callback invoked for every record added to or removed from a table.
///
/// Listeners are called after the table's locks have been released, in
/// the order the changes were applied. They must not start an update on
/// the table they observe.
pub type AspaListener =
    Box<dyn Fn(&AspaRecord, SocketId, RecordEvent) + Send + Sync>;

//------------ Binding -------------------------------------------------------

/// The bond between a cache session and its record store.
pub(crate) struct Binding {
    pub(crate) socket: SocketId,
    pub(crate) store: AspaArray,
}

//------------ TableInner ----------------------------------------------------

#[derive(Default)]
pub(crate) struct TableInner {
    pub(crate) bindings: Vec<Binding>,
}

impl TableInner {
    fn position(&self, socket: SocketId) -> Option<usize> {
        self.bindings.iter().position(|b| b.socket == socket)
    }

    pub(crate) fn binding(&self, socket: SocketId) -> Option<&Binding> {
        self.position(socket).map(|idx| &self.bindings[idx])
    }

    pub(crate) fn binding_mut(
        &mut self,
        socket: SocketId,
    ) -> Option<&mut Binding> {
        match self.position(socket) {
            Some(idx) => Some(&mut self.bindings[idx]),
            None => None,
        }
    }

    /// Returns the binding for `socket`, creating an empty one on the
    /// first update from that socket.
    pub(crate) fn bind_or_get(&mut self, socket: SocketId) -> &mut Binding {
        match self.position(socket) {
            Some(idx) => &mut self.bindings[idx],
            None => {
                debug!("{}: creating binding", socket);
                self.bindings.push(Binding {
                    socket,
                    store: AspaArray::new(),
                });
                let idx = self.bindings.len() - 1;
                &mut self.bindings[idx]
            }
        }
    }
}

//------------ AspaTable -----------------------------------------------------

/// An ASPA validation table.
///
/// The table holds one record store per attached cache session and a
/// notification channel. Many readers may verify hops concurrently; at
/// most one writer at a time runs an update protocol against the table,
/// serialized through an internal writer lease.
pub struct AspaTable {
    pub(crate) inner: RwLock<TableInner>,

    /// Held by whoever is running an update protocol against this
    /// table, so nothing else mutates a binding in the meantime.
    pub(crate) update_lock: Mutex<()>,

    pub(crate) config: TableConfig,
    listener: Option<AspaListener>,
}

impl AspaTable {
    /// Creates an empty table with the given configuration.
    pub fn new(config: TableConfig) -> Self {
        AspaTable {
            inner: RwLock::new(TableInner::default()),
            update_lock: Mutex::new(()),
            config,
            listener: None,
        }
    }

    /// Creates an empty table that reports record changes to `listener`.
    pub fn with_listener(config: TableConfig, listener: AspaListener) -> Self {
        AspaTable {
            listener: Some(listener),
            ..Self::new(config)
        }
    }

    /// Returns the table's configuration.
    pub fn config(&self) -> TableConfig {
        self.config
    }

    //--- Verification

    /// Checks a hop in an `AS_PATH`.
    ///
    /// Looks up `customer` across the stores of all attached sessions.
    /// If no store attests the customer ASN the hop is unattested;
    /// otherwise the hop is authorized exactly if any attestation lists
    /// `provider`.
    pub fn check_hop(&self, customer: Asn, provider: Asn) -> HopResult {
        let inner = self.inner.read();
        let mut attested = false;
        for binding in &inner.bindings {
            if let Some(record) = binding.store.lookup(customer) {
                attested = true;
                if record.authorizes(provider) {
                    return HopResult::ProviderPlus;
                }
            }
        }
        if attested {
            HopResult::NotProviderPlus
        } else {
            HopResult::NoAttestation
        }
    }

    //--- Inspection

    /// Returns the total number of records across all sessions.
    pub fn record_count(&self) -> usize {
        self.inner.read().bindings.iter().map(|b| b.store.len()).sum()
    }

    /// Returns the number of attached sessions.
    pub fn socket_count(&self) -> usize {
        self.inner.read().bindings.len()
    }

    /// Returns a snapshot of the records contributed by `socket`.
    pub fn records_for(&self, socket: SocketId) -> Option<Vec<AspaRecord>> {
        self.inner
            .read()
            .binding(socket)
            .map(|b| b.store.records().to_vec())
    }

    //--- Session management

    /// Withdraws everything the given session contributed.
    ///
    /// Drops the session's binding. With `notify` set, the listener
    /// receives a removal notification per withdrawn record.
    pub fn src_remove(&self, socket: SocketId, notify: bool) {
        let _lease = self.update_lock.lock();
        let removed = {
            let mut inner = self.inner.write();
            inner
                .position(socket)
                .map(|idx| inner.bindings.swap_remove(idx).store)
        };
        let store = match removed {
            Some(store) => store,
            None => return,
        };
        debug!("{}: withdrew {} records", socket, store.len());
        if notify {
            for record in store.iter() {
                self.notify(record, socket, RecordEvent::Removed);
            }
        }
    }

    /// Replaces the records associated with `socket` in `dst` with the
    /// ones `src` holds for it.
    ///
    /// The store moves from `src` to `dst` in one step; readers of
    /// either table observe a single swap. Whatever `dst` previously
    /// held for the socket is dropped. With `notify_dst` set, the
    /// displaced records are announced as removed and the moved records
    /// as added to `dst`'s listener; with `notify_src` set, the moved
    /// records are announced as removed to `src`'s listener.
    pub fn src_replace(
        dst: &AspaTable,
        src: &AspaTable,
        socket: SocketId,
        notify_dst: bool,
        notify_src: bool,
    ) -> Result<(), AspaStoreError> {
        // A table cannot replace from itself.
        if std::ptr::eq(dst, src) {
            return Err(AspaStoreError::InvalidArgument);
        }
        let _dst_lease = dst.update_lock.lock();
        let _src_lease = src.update_lock.lock();

        let (displaced, moved, moved_len) = {
            let mut src_inner = src.inner.write();
            let mut dst_inner = dst.inner.write();

            let store = match src_inner.position(socket) {
                Some(idx) => src_inner.bindings.swap_remove(idx).store,
                None => return Err(AspaStoreError::RecordNotFound),
            };
            let moved_len = store.len();
            let moved = if notify_dst || notify_src {
                store.records().to_vec()
            } else {
                Vec::new()
            };
            let displaced = match dst_inner.position(socket) {
                Some(idx) => Some(mem::replace(
                    &mut dst_inner.bindings[idx].store,
                    store,
                )),
                None => {
                    dst_inner.bindings.push(Binding { socket, store });
                    None
                }
            };
            (displaced, moved, moved_len)
        };

        debug!(
            "{}: replaced {} records with {}",
            socket,
            displaced.as_ref().map_or(0, |s| s.len()),
            moved_len
        );
        if notify_dst {
            for record in displaced.iter().flatten() {
                dst.notify(record, socket, RecordEvent::Removed);
            }
            for record in &moved {
                dst.notify(record, socket, RecordEvent::Added);
            }
        }
        if notify_src {
            for record in &moved {
                src.notify(record, socket, RecordEvent::Removed);
            }
        }
        Ok(())
    }

    //--- Updating

    /// Applies an update batch with the configured strategy.
    ///
    /// Runs the full protocol of the table's [`UpdateStrategy`]: for
    /// swap-in, compute, apply and finish; for in-place, the update
    /// plus an automatic undo and cleanup should it fail partway. On
    /// success the store reflects the whole batch, on failure it is
    /// back in its pre-batch state either way.
    pub fn apply_operations(
        &self,
        socket: SocketId,
        operations: Vec<UpdateOperation>,
    ) -> Result<(), UpdateError> {
        match self.config.strategy {
            UpdateStrategy::SwapIn => {
                let mut update = self.compute_update(socket, operations)?;
                update.apply();
                update.finish();
                Ok(())
            }
            UpdateStrategy::InPlace => {
                let mut operations = operations;
                match self.update_in_place(socket, &mut operations) {
                    Ok(()) => {
                        update::update_cleanup(&mut operations);
                        Ok(())
                    }
                    Err(err) => {
                        if let Err(undo_err) =
                            self.undo_update(socket, &mut operations, &err)
                        {
                            error!(
                                "{}: undo after failed update: {}",
                                socket, undo_err
                            );
                        }
                        update::update_cleanup(&mut operations);
                        Err(err)
                    }
                }
            }
        }
    }

    //--- Notifications

    pub(crate) fn notify(
        &self,
        record: &AspaRecord,
        socket: SocketId,
        event: RecordEvent,
    ) {
        if let Some(listener) = &self.listener {
            trace!("{}: {} {}", socket, event, record);
            listener(record, socket, event);
        }
    }

    /// Reports one batch worth of changes, in post-normalization order.
    pub(crate) fn notify_operations(
        &self,
        socket: SocketId,
        operations: &[UpdateOperation],
    ) {
        for op in operations {
            if op.is_no_op() && !self.config.notify_no_ops {
                continue;
            }
            let event = match op.kind {
                OperationKind::Add => RecordEvent::Added,
                OperationKind::Remove => RecordEvent::Removed,
            };
            self.notify(&op.record, socket, event);
        }
    }
}

impl Default for AspaTable {
    fn default() -> Self {
        Self::new(TableConfig::default())
    }
}

impl fmt::Debug for AspaTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AspaTable")
            .field("sockets", &self.socket_count())
            .field("records", &self.record_count())
            .field("config", &self.config)
            .finish()
    }
}
