//! The in-place update mechanism.
//!
//! In-place updates splice operations directly into the live record
//! array. Readers are blocked for the duration of the splice, and a
//! batch that fails partway leaves the store in an intermediate state
//! until [`AspaTable::undo_update`] rolls the applied prefix back.
//! Each applied operation records its undo state in its own slot: an
//! add remembers that it inserted, a removal keeps the withdrawn
//! record's provider sequence so it can be reinserted.

use std::mem;

use log::debug;

use crate::table::AspaTable;
use crate::types::{AspaRecord, AspaStoreError, SocketId, UpdateError};

use super::{normalize, validate, OperationKind, UpdateOperation};

impl AspaTable {
    /// Updates the store of `socket` by applying the batch in place.
    ///
    /// The operations are normalized first, then applied one by one
    /// against the live array. If an operation fails, it is not
    /// applied, later operations are not attempted, and the error
    /// reports the operation's original batch index. The caller should
    /// then restore consistency with [`undo_update`][Self::undo_update]
    /// and release batch resources with
    /// [`update_cleanup`][crate::update::update_cleanup].
    ///
    /// On success, the listener receives one notification per
    /// operation, in post-normalization order.
    pub fn update_in_place(
        &self,
        socket: SocketId,
        operations: &mut [UpdateOperation],
    ) -> Result<(), UpdateError> {
        validate(operations)?;
        normalize(operations)?;

        let _lease = self.update_lock.lock();
        let result = {
            let mut inner = self.inner.write();
            let store = &mut inner.bind_or_get(socket).store;
            let mut result = Ok(());
            for op in
                operations.iter_mut().filter(|op| !op.is_no_op())
            {
                match op.kind {
                    OperationKind::Add => {
                        match store.locate(op.record.customer) {
                            Ok(_) => {
                                result = Err(UpdateError::new(
                                    AspaStoreError::DuplicateRecord,
                                    op.index,
                                ));
                                break;
                            }
                            Err(pos) => {
                                store.insert_at(pos, op.record.clone());
                                op.applied = true;
                            }
                        }
                    }
                    OperationKind::Remove => {
                        match store.locate(op.record.customer) {
                            Ok(pos) => {
                                // Keep the withdrawn providers around
                                // for notification and undo.
                                op.record.providers =
                                    store.remove_at(pos).providers;
                                op.applied = true;
                            }
                            Err(_) => {
                                result = Err(UpdateError::new(
                                    AspaStoreError::RecordNotFound,
                                    op.index,
                                ));
                                break;
                            }
                        }
                    }
                }
            }
            result
        };

        match result {
            Ok(()) => {
                debug!(
                    "{}: updated store in place, {} operations",
                    socket,
                    operations.len()
                );
                self.notify_operations(socket, operations);
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// Reverses the applied part of a failed in-place update.
    ///
    /// Walks the batch in its post-normalization order up to the failed
    /// operation, reversing every operation that was applied: inserted
    /// records are removed again, withdrawn records are reinserted from
    /// the provider sequences parked in their operation slots. After a
    /// successful undo the store equals its pre-update state.
    pub fn undo_update(
        &self,
        socket: SocketId,
        operations: &mut [UpdateOperation],
        failed: &UpdateError,
    ) -> Result<(), AspaStoreError> {
        let _lease = self.update_lock.lock();
        let mut inner = self.inner.write();
        let store = match inner.binding_mut(socket) {
            Some(binding) => &mut binding.store,
            // Nothing was bound, so nothing was applied.
            None => return Ok(()),
        };

        let mut undone = 0;
        for op in operations.iter_mut() {
            if op.index == failed.failed_index() {
                break;
            }
            if !op.applied {
                continue;
            }
            match op.kind {
                OperationKind::Add => {
                    match store.locate(op.record.customer) {
                        Ok(pos) => {
                            store.remove_at(pos);
                        }
                        Err(_) => {
                            return Err(AspaStoreError::RecordNotFound)
                        }
                    }
                }
                OperationKind::Remove => {
                    match store.locate(op.record.customer) {
                        Err(pos) => {
                            store.insert_at(
                                pos,
                                AspaRecord::new(
                                    op.record.customer,
                                    mem::take(&mut op.record.providers),
                                ),
                            );
                        }
                        Ok(_) => {
                            return Err(AspaStoreError::DuplicateRecord)
                        }
                    }
                }
            }
            op.applied = false;
            undone += 1;
        }

        debug!("{}: undid {} operations", socket, undone);
        Ok(())
    }
}
