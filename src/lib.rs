//! An in-memory store for validated ASPA data.
//!
//! The central type of this crate is the [`AspaTable`]: per customer
//! ASN it stores the set of ASNs authorized to act as that customer's
//! upstream providers, as learned from one or more RPKI-to-Router
//! cache sessions. Given a (customer ASN, provider ASN) pair drawn
//! from a BGP `AS_PATH`, [`AspaTable::check_hop`] answers whether the
//! hop is attested as authorized, attested as unauthorized, or not
//! attested at all.
//!
//! Cache sessions deliver their diffs as batches of add and remove
//! operations; the [`update`] module applies a batch atomically with
//! respect to concurrent readers, using either a swap-in or an
//! in-place strategy. The [`lpm`] module provides the longest-prefix-
//! match index the surrounding RPKI library uses for route origin
//! lookups.
//!
//! ```
//! use aspa_store::{
//!     AspaRecord, AspaTable, HopResult, SocketId, TableConfig,
//!     UpdateOperation,
//! };
//!
//! let table = AspaTable::new(TableConfig::default());
//! let socket = SocketId::new(1);
//!
//! let batch = vec![UpdateOperation::add(
//!     0,
//!     AspaRecord::new(65000.into(), vec![65001.into(), 65002.into()]),
//! )];
//! table.apply_operations(socket, batch).unwrap();
//!
//! assert_eq!(
//!     table.check_hop(65000.into(), 65001.into()),
//!     HopResult::ProviderPlus
//! );
//! assert_eq!(
//!     table.check_hop(65000.into(), 65003.into()),
//!     HopResult::NotProviderPlus
//! );
//! assert_eq!(
//!     table.check_hop(64999.into(), 65001.into()),
//!     HopResult::NoAttestation
//! );
//! ```

pub mod lpm;
pub mod table;
pub mod types;
pub mod update;

pub use crate::lpm::LpmTree;
pub use crate::table::config::{TableConfig, UpdateStrategy};
pub use crate::table::{AspaArray, AspaListener, AspaTable, RecordEvent};
pub use crate::types::errors::{AspaStoreError, UpdateError};
pub use crate::types::hop::HopResult;
pub use crate::types::record::{AspaRecord, SocketId};
pub use crate::update::swap_in::AspaUpdate;
pub use crate::update::{
    update_cleanup, OperationKind, UpdateOperation,
};
