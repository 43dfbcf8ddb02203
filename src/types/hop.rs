use std::fmt;

//------------ HopResult -----------------------------------------------------

/// The ASPA classification of a single `AS_PATH` hop.
///
/// A hop is an adjacent (customer ASN, provider ASN) pair drawn from a
/// BGP `AS_PATH`. Presence of any attestation for the customer ASN
/// constrains the hop; the provider sequence acts as a whitelist.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum HopResult {
    /// No attached session attests the customer ASN at all.
    NoAttestation,
    /// The customer ASN is attested, but none of its attestations list
    /// the provider ASN.
    NotProviderPlus,
    /// At least one attestation lists the provider ASN.
    ProviderPlus,
}

impl fmt::Display for HopResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HopResult::NoAttestation => write!(f, "no-attestation"),
            HopResult::NotProviderPlus => write!(f, "not-provider+"),
            HopResult::ProviderPlus => write!(f, "provider+"),
        }
    }
}
