use crate::host::NodeId;

/// Errors surfaced by host-tree operations.
///
/// Structural disagreements between the virtual tree and the live tree are
/// not errors; the reconciler recovers from those by unmounting and
/// remounting. `DomError` covers the cases that cannot be recovered locally:
/// a node id that no longer resolves, or a node of the wrong kind for the
/// requested operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomError {
    Missing { id: NodeId },
    KindMismatch { id: NodeId, expected: &'static str },
}

impl std::fmt::Display for DomError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DomError::Missing { id } => write!(f, "node {id} missing"),
            DomError::KindMismatch { id, expected } => {
                write!(f, "node {id} kind mismatch; expected {expected}")
            }
        }
    }
}

impl std::error::Error for DomError {}
