//! Error taxonomy for the forwarding engine.
//!
//! Each variant maps directly to a row of the error handling table:
//! configuration, negotiation, per-file abort, connection abort, transport
//! and DICOMDIR. The DICOMDIR case is not actually raised as an error by
//! [`crate::forward`] (it is reported as a dropped instance), but the
//! variant is kept here so that callers matching on `ForwardError` see the
//! full taxonomy in one place.

use snafu::Snafu;

use crate::association::AssocError;
use crate::editor::EditorError;
use crate::frames::FrameError;
use crate::stow::StowError;
use crate::transcode::TranscodeError;

/// Errors produced while forwarding a single instance to one or more
/// destinations.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum ForwardError {
    /// no destinations were given to forward to
    NoDestinations,

    /// could not prepare outbound association for {cuid}
    Negotiation {
        cuid: String,
        source: AssocError,
    },

    /// no presentation context accepted for abstract syntax {cuid}, transfer syntax {tsuid}
    NoPresentationContext { cuid: String, tsuid: String },

    /// instance transfer aborted by an editor: {message}
    PerFileAbort { message: String },

    /// connection-fatal abort raised by an editor: {message}
    ConnectionAbort { message: String },

    /// failed to apply attribute editor
    Editor { source: EditorError },

    /// failed to extract frames from pixel data
    Frames { source: FrameError },

    /// failed to transcode pixel data
    Transcode { source: TranscodeError },

    /// failed to parse inbound data stream
    ReadDataset { source: dicom_object::ReadError },

    /// failed to serialize outbound data set
    WriteDataset { source: dicom_object::WriteError },

    /// C-STORE transport error
    Store { source: AssocError },

    /// STOW-RS upload error
    Stow { source: StowError },

    /// failed to serialize a C-STORE/STOW-RS request
    Writer { source: crate::writer::WriterError },

    /// unknown transfer syntax {ts}
    UnknownTransferSyntax { ts: String },

    /// failed to build or serialize file meta group
    Meta { source: dicom_object::meta::Error },

    /// failed to read inbound stream for STOW-RS pass-through
    ReadInboundForStow { source: std::io::Error },

    /// peer rejected C-STORE with status {status:04X}H
    CStoreStatus { status: u16 },
}

pub type Result<T, E = ForwardError> = std::result::Result<T, E>;
