//! Configuration options for an ASPA table.
//!
//! A configuration is created by instantiating [`TableConfig`], setting
//! some fields on it, and passing it to
//! [`AspaTable::new`](super::AspaTable::new).

//------------ UpdateStrategy ------------------------------------------------

/// Selects how update batches are applied to a table.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum UpdateStrategy {
    /// Build a replacement record array off to the side and atomically
    /// swap it in. Readers observe a single publication point and are
    /// never blocked while the update is being computed; a failed batch
    /// leaves no visible trace.
    SwapIn,
    /// Splice operations directly into the live record array, keeping
    /// enough per-operation state to undo a partially applied batch.
    /// Readers are blocked for the duration of the splice and may
    /// otherwise observe intermediate states.
    InPlace,
}

//------------ TableConfig ---------------------------------------------------

/// Construction-time configuration of an [`AspaTable`](super::AspaTable).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TableConfig {
    /// The update mechanism the table runs for incoming batches.
    pub strategy: UpdateStrategy,

    /// Whether an add/remove pair that annihilates within one batch
    /// still emits its paired added/removed notifications.
    pub notify_no_ops: bool,
}

impl Default for TableConfig {
    fn default() -> Self {
        TableConfig {
            strategy: UpdateStrategy::SwapIn,
            notify_no_ops: false,
        }
    }
}
