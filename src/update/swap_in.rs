//! The swap-in update mechanism.
//!
//! Swap-in updates never touch the live record array. A replacement
//! array is built from the existing records and the operation batch,
//! then substituted in one step. Readers verifying an `AS_PATH` keep
//! reading the old array until the swap, and a batch that fails during
//! computation leaves no visible trace at all.
//!
//! The protocol is three-phase. [`AspaTable::compute_update`] merges
//! the batch into a new array and hands back an [`AspaUpdate`] handle.
//! [`AspaUpdate::apply`] publishes the new array and notifies the
//! table's listener; skipping it discards the update.
//! [`AspaUpdate::finish`] ends the protocol, releasing the displaced
//! array and whatever the batch still owns.

use log::debug;
use parking_lot::MutexGuard;

use crate::table::{AspaArray, AspaTable};
use crate::types::{AspaStoreError, SocketId, UpdateError};

use super::{normalize, validate, OperationKind, UpdateOperation};

//------------ AspaUpdate ----------------------------------------------------

/// A computed update, ready to be applied to the table it came from.
///
/// The handle holds the table's writer lease for its entire lifetime:
/// between [`compute_update`][AspaTable::compute_update] and
/// [`finish`][AspaUpdate::finish], no other update can mutate the
/// target binding. Dropping the handle is equivalent to finishing it.
pub struct AspaUpdate<'t> {
    table: &'t AspaTable,
    socket: SocketId,
    operations: Vec<UpdateOperation>,

    /// The replacement store; taken out when the update is applied.
    new_store: Option<AspaArray>,

    /// The store the update displaced, kept alive until the protocol
    /// finishes.
    displaced: Option<AspaArray>,

    _lease: MutexGuard<'t, ()>,
}

impl AspaTable {
    /// Computes an update that can later be applied to this table.
    ///
    /// Normalizes the batch and merges it with the records `socket`
    /// currently contributes into a fresh array. The live binding is
    /// not touched; concurrent readers keep observing the pre-update
    /// state until [`apply`][AspaUpdate::apply].
    ///
    /// On error, the offending operation's original batch index is
    /// reported and the whole batch is released; the table is
    /// unchanged.
    pub fn compute_update(
        &self,
        socket: SocketId,
        mut operations: Vec<UpdateOperation>,
    ) -> Result<AspaUpdate<'_>, UpdateError> {
        validate(&operations)?;
        normalize(&mut operations)?;

        let lease = self.update_lock.lock();
        let inner = self.inner.read();
        let existing = match inner.binding(socket) {
            Some(binding) => binding.store.records(),
            None => &[],
        };

        let adds = operations
            .iter()
            .filter(|op| !op.is_no_op() && op.kind == OperationKind::Add)
            .count();
        let mut new_store =
            AspaArray::with_capacity(existing.len() + adds);
        let mut records = existing.iter().peekable();

        for op in operations.iter_mut().filter(|op| !op.is_no_op()) {
            // Copy over everything sorted below this operation.
            while let Some(record) = records.peek() {
                if record.customer < op.record.customer {
                    new_store.push((*record).clone());
                    records.next();
                } else {
                    break;
                }
            }
            let existing_match = records
                .peek()
                .map_or(false, |r| r.customer == op.record.customer);
            match op.kind {
                OperationKind::Add => {
                    if existing_match {
                        return Err(UpdateError::new(
                            AspaStoreError::DuplicateRecord,
                            op.index,
                        ));
                    }
                    new_store.push(op.record.clone());
                }
                OperationKind::Remove => {
                    if !existing_match {
                        return Err(UpdateError::new(
                            AspaStoreError::RecordNotFound,
                            op.index,
                        ));
                    }
                    // Park the withdrawn providers in the operation
                    // slot; the removal notification carries them.
                    if let Some(record) = records.next() {
                        op.record.providers = record.providers.clone();
                    }
                }
            }
        }
        for record in records {
            new_store.push(record.clone());
        }

        debug!(
            "{}: computed update, {} operations, {} -> {} records",
            socket,
            operations.len(),
            existing.len(),
            new_store.len()
        );
        drop(inner);

        Ok(AspaUpdate {
            table: self,
            socket,
            operations,
            new_store: Some(new_store),
            displaced: None,
            _lease: lease,
        })
    }
}

impl<'t> AspaUpdate<'t> {
    /// Returns the normalized operations the update was computed from.
    pub fn operations(&self) -> &[UpdateOperation] {
        &self.operations
    }

    /// Returns whether the update has been applied.
    pub fn is_applied(&self) -> bool {
        self.displaced.is_some()
    }

    /// Publishes the computed store.
    ///
    /// Swaps the new array into the binding and then reports every
    /// non-no-op operation to the table's listener, in
    /// post-normalization order. A listener that immediately queries
    /// the table therefore observes the new state. Calling this more
    /// than once has no further effect.
    pub fn apply(&mut self) {
        let new_store = match self.new_store.take() {
            Some(store) => store,
            None => return,
        };
        let new_len = new_store.len();
        {
            let mut inner = self.table.inner.write();
            let binding = inner.bind_or_get(self.socket);
            self.displaced =
                Some(std::mem::replace(&mut binding.store, new_store));
        }
        debug!("{}: applied update, store now {} records",
            self.socket, new_len);
        self.table.notify_operations(self.socket, &self.operations);
    }

    /// Finishes the update.
    ///
    /// Releases the writer lease and everything the update still owns:
    /// the displaced store if it was applied, the unused replacement
    /// store if it was not, and the provider sequences parked in
    /// operation slots.
    pub fn finish(self) {}
}
