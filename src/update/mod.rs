//! Aggregated updates to an ASPA table.
//!
//! A cache response is turned into an array of 'add record' and 'remove
//! record' operations, effectively a diff against the table's previous
//! state. Applying the diff in one go keeps iterations and allocations
//! down and gives listeners a faithful per-record change feed once the
//! update lands.
//!
//! Two update mechanisms are supported, selected per table through
//! [`UpdateStrategy`](crate::table::config::UpdateStrategy):
//!
//! - **Swap-in** ([`swap_in`]) builds a replacement record array off to
//!   the side and substitutes it atomically. Readers verifying an
//!   `AS_PATH` are never blocked while the update is computed, and a
//!   failed batch needs no undo machinery because nothing was published.
//!   The protocol is three-phase: compute, optionally apply, finish.
//!
//! - **In-place** ([`in_place`]) splices operations directly into the
//!   live array, remembering enough per-operation state to reverse the
//!   applied prefix of a batch that fails partway through.
//!
//! Both mechanisms first sort the operation array stably by customer
//! ASN. Operations on matching customer ASNs stay in arrival order,
//! which makes duplicate announcements and duplicate withdrawals
//! neighbors in the array, and lets an announcement that is withdrawn
//! again within the same batch annihilate into a no-op.

use std::fmt;

use inetnum::asn::Asn;

use crate::types::{AspaRecord, AspaStoreError, UpdateError};

pub mod in_place;
pub mod swap_in;

//------------ OperationKind -------------------------------------------------

/// What an operation does with its attached record.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum OperationKind {
    /// Add the record to the store.
    Add,
    /// Remove the record from the store.
    Remove,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Add => write!(f, "add"),
            OperationKind::Remove => write!(f, "remove"),
        }
    }
}

//------------ UpdateOperation -----------------------------------------------

/// A single element of an update batch.
///
/// An `Add` operation carries the full record to insert. A `Remove`
/// operation must carry an empty provider sequence; during the update
/// the removed record's providers are moved into the slot so they stay
/// available for notifications and for undoing the batch.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UpdateOperation {
    /// The operation's position in the original batch.
    ///
    /// Errors point back at this value, and it breaks ties when the
    /// batch is sorted.
    pub index: usize,

    /// The operation's type.
    pub kind: OperationKind,

    /// The record to add or remove.
    pub record: AspaRecord,

    /// Set when this operation pairs up with a complementary one in the
    /// same batch and both cancel out.
    is_no_op: bool,

    /// Set once the in-place mechanism has applied this operation, so
    /// an undo pass reverses exactly what happened.
    pub(crate) applied: bool,
}

impl UpdateOperation {
    /// Creates an operation announcing `record`.
    pub fn add(index: usize, record: AspaRecord) -> Self {
        UpdateOperation {
            index,
            kind: OperationKind::Add,
            record,
            is_no_op: false,
            applied: false,
        }
    }

    /// Creates an operation withdrawing the record for `customer`.
    pub fn remove(index: usize, customer: Asn) -> Self {
        UpdateOperation {
            index,
            kind: OperationKind::Remove,
            record: AspaRecord::new(customer, Vec::new()),
            is_no_op: false,
            applied: false,
        }
    }

    /// Returns whether the operation annihilated with a complementary
    /// one in the same batch.
    pub fn is_no_op(&self) -> bool {
        self.is_no_op
    }

    fn customer(&self) -> Asn {
        self.record.customer
    }
}

//------------ Normalization -------------------------------------------------

/// Checks the batch against the session layer's contract.
///
/// A remove operation announcing providers is malformed input.
pub(crate) fn validate(
    operations: &[UpdateOperation],
) -> Result<(), UpdateError> {
    for op in operations {
        if op.kind == OperationKind::Remove
            && !op.record.providers.is_empty()
        {
            return Err(UpdateError::new(
                AspaStoreError::InvalidArgument,
                op.index,
            ));
        }
    }
    Ok(())
}

/// Sorts the batch and resolves operations targeting the same customer.
///
/// The sort is stable: operations on the same customer ASN keep their
/// arrival order. Walking neighbors then settles the in-batch cases:
/// two adds or two removes for one customer fail at the second one; an
/// add that is removed again annihilates into a no-op pair; a remove
/// followed by an add stands, since the remove targets an existing
/// record while the add introduces a fresh one.
///
/// Errors carry the offending operation's original batch index.
pub(crate) fn normalize(
    operations: &mut [UpdateOperation],
) -> Result<(), UpdateError> {
    operations.sort_by(|a, b| {
        a.customer().cmp(&b.customer()).then(a.index.cmp(&b.index))
    });

    let mut i = 0;
    while i + 1 < operations.len() {
        if operations[i].customer() != operations[i + 1].customer() {
            i += 1;
            continue;
        }
        match (operations[i].kind, operations[i + 1].kind) {
            (OperationKind::Add, OperationKind::Add) => {
                return Err(UpdateError::new(
                    AspaStoreError::DuplicateRecord,
                    operations[i + 1].index,
                ));
            }
            (OperationKind::Remove, OperationKind::Remove) => {
                return Err(UpdateError::new(
                    AspaStoreError::RecordNotFound,
                    operations[i + 1].index,
                ));
            }
            (OperationKind::Add, OperationKind::Remove) => {
                operations[i].is_no_op = true;
                operations[i + 1].is_no_op = true;
                i += 2;
            }
            (OperationKind::Remove, OperationKind::Add) => {
                i += 1;
            }
        }
    }
    Ok(())
}

/// Releases the provider sequences still held in operation slots.
///
/// After an update has finished, operation slots may still own provider
/// sequences: those of withdrawn records, and those of operations past a
/// failure point. Callers that keep the batch around for diagnostics can
/// free that memory here. Idempotent; safe after success, failure or
/// undo.
pub fn update_cleanup(operations: &mut [UpdateOperation]) {
    for op in operations {
        op.record.providers = Vec::new();
    }
}

//============ Tests =========================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn add(index: usize, customer: u32, providers: &[u32]) -> UpdateOperation {
        UpdateOperation::add(
            index,
            AspaRecord::new(
                customer.into(),
                providers.iter().map(|p| Asn::from(*p)).collect(),
            ),
        )
    }

    fn remove(index: usize, customer: u32) -> UpdateOperation {
        UpdateOperation::remove(index, customer.into())
    }

    #[test]
    fn sort_is_stable_per_customer() {
        let mut ops = vec![
            remove(0, 200),
            add(1, 100, &[1]),
            add(2, 200, &[2]),
            remove(3, 100),
        ];
        normalize(&mut ops).expect("no conflicts");

        // Matching customers keep their arrival order.
        let order: Vec<(u32, usize)> = ops
            .iter()
            .map(|op| (op.customer().into_u32(), op.index))
            .collect();
        assert_eq!(order, vec![(100, 1), (100, 3), (200, 0), (200, 2)]);
    }

    #[test]
    fn complementary_pair_annihilates() {
        let mut ops = vec![add(0, 100, &[200]), remove(1, 100)];
        normalize(&mut ops).expect("no conflicts");
        assert!(ops[0].is_no_op());
        assert!(ops[1].is_no_op());
    }

    #[test]
    fn remove_then_add_passes_through() {
        let mut ops = vec![remove(0, 100), add(1, 100, &[200])];
        normalize(&mut ops).expect("no conflicts");
        assert!(!ops[0].is_no_op());
        assert!(!ops[1].is_no_op());
    }

    #[test]
    fn duplicate_add_fails_at_second() {
        let mut ops = vec![add(0, 100, &[200]), add(1, 100, &[300])];
        let err = normalize(&mut ops).expect_err("duplicate add");
        assert_eq!(err.kind(), AspaStoreError::DuplicateRecord);
        assert_eq!(err.failed_index(), 1);
    }

    #[test]
    fn duplicate_remove_fails_at_second() {
        let mut ops = vec![add(0, 50, &[1]), remove(1, 100), remove(2, 100)];
        let err = normalize(&mut ops).expect_err("duplicate remove");
        assert_eq!(err.kind(), AspaStoreError::RecordNotFound);
        assert_eq!(err.failed_index(), 2);
    }

    #[test]
    fn annihilated_pair_is_consumed() {
        // The remove at the tail must not pair up with the annihilated
        // remove before it.
        let mut ops = vec![add(0, 100, &[1]), remove(1, 100), remove(2, 100)];
        let err = normalize(&mut ops);
        // First pair annihilates, the trailing remove stands alone and
        // is left for the apply stage to reject.
        assert!(err.is_ok());
        assert!(ops[0].is_no_op());
        assert!(ops[1].is_no_op());
        assert!(!ops[2].is_no_op());
    }

    #[test]
    fn remove_with_providers_is_rejected() {
        let mut op = remove(0, 100);
        op.record.providers = vec![200.into()];
        let err = validate(&[op]).expect_err("malformed remove");
        assert_eq!(err.kind(), AspaStoreError::InvalidArgument);
        assert_eq!(err.failed_index(), 0);
    }

    #[test]
    fn cleanup_releases_providers() {
        let mut ops = vec![add(0, 100, &[200, 300])];
        update_cleanup(&mut ops);
        assert!(ops[0].record.providers.is_empty());
        // Idempotent.
        update_cleanup(&mut ops);
        assert!(ops[0].record.providers.is_empty());
    }
}
