//! Call-site attribution for in-flight stores and their diagnostics.

use std::fmt;

/// A snapshot of the guest call stack at the moment a store was traced,
/// preserved so the reporter can attribute a non-persistent store or an
/// overwrite to where it came from.
///
/// The translation host owns walking the guest's actual frame pointers (an
/// excluded collaborator); this crate only stores
/// whatever the host handed it -- a flat stack of return addresses, leaf
/// frame first.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CallSite(Vec<u64>);

impl CallSite {
    pub fn new(frames: Vec<u64>) -> Self {
        Self(frames)
    }

    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn frames(&self) -> &[u64] {
        &self.0
    }
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "<unknown>");
        }
        for (i, frame) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, " <- ")?;
            }
            write!(f, "{:#x}", frame)?;
        }
        Ok(())
    }
}
