//! The inbound instance record handed to the forwarding engine.

use std::io::Read;
use std::sync::{Arc, Mutex};

use dicom_ul::association::client::ClientAssociation;

/// A handle to the inbound association, used only to `release` it when an
/// editor raises a connection-fatal abort.
///
/// Cloning shares the same underlying association; at most one invocation
/// is expected to call [`InboundAssociation::release`] per `Params`.
#[derive(Clone)]
pub struct InboundAssociation {
    inner: Arc<Mutex<Option<ClientAssociation>>>,
}

impl InboundAssociation {
    pub fn new(assoc: ClientAssociation) -> Self {
        InboundAssociation {
            inner: Arc::new(Mutex::new(Some(assoc))),
        }
    }

    /// A handle with nothing to release, for callers that do not have a
    /// live inbound association to begin with (e.g. a CLI driver reading
    /// instances from disk rather than from a C-STORE SCP).
    pub fn none() -> Self {
        InboundAssociation {
            inner: Arc::new(Mutex::new(None)),
        }
    }

    /// Release the inbound association, if it has not already been
    /// released. Subsequent calls are a no-op.
    pub fn release(&self) {
        if let Ok(mut guard) = self.inner.lock() {
            if let Some(mut assoc) = guard.take() {
                let _ = assoc.release();
            }
        }
    }
}

/// One inbound composite DICOM instance, as produced by the C-STORE SCP
/// that is out of scope for this crate.
///
/// `data` is read-once: it is a boxed reader over the association's byte
/// stream, and forwarding to multiple destinations must re-materialize
/// bytes from a single parsed copy rather than reading `data` again.
pub struct Params {
    /// SOP Instance UID of the inbound instance.
    pub iuid: String,
    /// SOP Class UID of the inbound instance.
    pub cuid: String,
    /// Transfer syntax UID the instance arrived encoded in.
    pub tsuid: String,
    /// Presentation context id the instance arrived on.
    pub pcid: u8,
    /// Lazy, read-once byte stream carrying the data set
    /// (without preamble or file meta group).
    pub data: Box<dyn Read + Send>,
    /// Handle to the inbound association, released on a connection-fatal
    /// abort.
    pub inbound_association: InboundAssociation,
}

impl std::fmt::Debug for Params {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Params")
            .field("iuid", &self.iuid)
            .field("cuid", &self.cuid)
            .field("tsuid", &self.tsuid)
            .field("pcid", &self.pcid)
            .finish_non_exhaustive()
    }
}
