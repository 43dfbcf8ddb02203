use std::fmt;

use inetnum::asn::Asn;

//------------ SocketId ------------------------------------------------------

/// Identifies the RTR cache session a set of records was learned from.
///
/// The transport layer hands out these identifiers. The store never
/// interprets them, it only uses them to tell the contributions of
/// different sessions apart.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct SocketId(u64);

impl SocketId {
    /// Creates a socket ID from its raw value.
    pub fn new(id: u64) -> Self {
        SocketId(id)
    }

    /// Returns the raw value of the socket ID.
    pub fn into_u64(self) -> u64 {
        self.0
    }
}

impl From<u64> for SocketId {
    fn from(id: u64) -> Self {
        SocketId(id)
    }
}

impl fmt::Display for SocketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "socket {}", self.0)
    }
}

//------------ AspaRecord ----------------------------------------------------

/// One ASPA object: a customer ASN plus the providers it authorizes.
///
/// The provider sequence is kept in the order it arrived in, so that
/// listeners see records exactly the way the cache announced them.
/// Within a store, records are unique by customer ASN.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct AspaRecord {
    /// The customer ASN.
    pub customer: Asn,

    /// The provider ASNs the customer authorizes as upstreams.
    pub providers: Vec<Asn>,
}

impl AspaRecord {
    /// Creates a new record from its components.
    pub fn new(customer: Asn, providers: Vec<Asn>) -> Self {
        AspaRecord {
            customer,
            providers,
        }
    }

    /// Returns the number of authorized providers.
    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }

    /// Returns whether `provider` appears in the provider sequence.
    pub fn authorizes(&self, provider: Asn) -> bool {
        self.providers.contains(&provider)
    }
}

impl fmt::Display for AspaRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> [", self.customer)?;
        let mut providers = self.providers.iter();
        if let Some(first) = providers.next() {
            write!(f, "{}", first)?;
        }
        for provider in providers {
            write!(f, ", {}", provider)?;
        }
        write!(f, "]")
    }
}
