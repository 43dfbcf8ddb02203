use std::fmt;

//------------ AspaStoreError ------------------------------------------------

/// Possible errors returned by methods on an ASPA table.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AspaStoreError {
    /// A record with this customer ASN already exists, either in the
    /// store itself or earlier in the same update batch.
    DuplicateRecord,
    /// The record with this customer ASN cannot be found, or would have
    /// been removed earlier in the same update batch already.
    RecordNotFound,
    /// The session layer handed in a malformed operation, e.g. a removal
    /// that carries a provider sequence.
    InvalidArgument,
}

impl std::error::Error for AspaStoreError {}

impl fmt::Display for AspaStoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            AspaStoreError::DuplicateRecord => {
                write!(
                    f,
                    "Error: A record with this customer ASN already exists."
                )
            }
            AspaStoreError::RecordNotFound => {
                write!(f, "Error: The record cannot be found.")
            }
            AspaStoreError::InvalidArgument => {
                write!(f, "Error: Malformed operation input.")
            }
        }
    }
}

//------------ UpdateError ---------------------------------------------------

/// An error raised while applying an update batch.
///
/// Next to the error kind it carries the position the offending
/// operation had in the original batch, so that the session layer can
/// point back at the cache response element that caused the failure.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct UpdateError {
    kind: AspaStoreError,
    failed_index: usize,
}

impl UpdateError {
    pub(crate) fn new(kind: AspaStoreError, failed_index: usize) -> Self {
        UpdateError { kind, failed_index }
    }

    /// Returns the kind of failure.
    pub fn kind(self) -> AspaStoreError {
        self.kind
    }

    /// Returns the original batch position of the offending operation.
    pub fn failed_index(self) -> usize {
        self.failed_index
    }
}

impl std::error::Error for UpdateError {}

impl fmt::Display for UpdateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (operation {})", self.kind, self.failed_index)
    }
}

impl From<UpdateError> for AspaStoreError {
    fn from(err: UpdateError) -> Self {
        err.kind
    }
}
