//! The writer (§4.F): serializes a (possibly edited, possibly transcoded)
//! instance for its destination, either by copying the inbound stream
//! verbatim (pass-through) or by encoding a parsed dataset.
//!
//! Grounded on `storescu/src/store_sync.rs::send_file`'s pattern of
//! building a command dataset under Implicit VR Little Endian and a
//! payload dataset under the negotiated transfer syntax via
//! `write_dataset_with_ts`, combining both into a single `PData` PDU when
//! they fit under the negotiated max PDU length. The STOW-RS payload
//! (`StowPayload`) has no equivalent anywhere in the pack — authored
//! fresh per §4.F's note that its `newInputStream`-equivalent must be
//! re-derivable (here, idempotent) across retries.

use std::io::Read;

use dicom_core::{dicom_value, DataElement, VR};
use dicom_dictionary_std::tags;
use dicom_object::mem::InMemDicomObject;
use dicom_object::FileDicomObject;
use dicom_transfer_syntax_registry::TransferSyntaxRegistry;
use dicom_ul::pdu::{PDataValue, PDataValueType};
use snafu::{ResultExt, Snafu};

type Dataset = FileDicomObject<InMemDicomObject>;

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum WriterError {
    /// unknown transfer syntax {ts}
    UnknownTransferSyntax { ts: String },

    /// failed to write command dataset
    WriteCommand { source: dicom_object::WriteError },

    /// failed to write payload dataset
    WritePayload { source: dicom_object::WriteError },

    /// failed to read inbound stream for pass-through
    ReadInbound { source: std::io::Error },

    /// failed to write file meta group
    WriteMeta { source: dicom_object::WriteError },
}

pub type Result<T, E = WriterError> = std::result::Result<T, E>;

/// Builds the C-STORE-RQ command dataset (`spec.md` §4.F combines it with
/// the payload into one `PData` PDU when both fit under the negotiated max
/// PDU length), matching `storescu`'s `store_req_command`.
pub fn store_req_command(cuid: &str, iuid: &str, message_id: u16) -> InMemDicomObject {
    InMemDicomObject::command_from_element_iter([
        DataElement::new(tags::AFFECTED_SOP_CLASS_UID, VR::UI, dicom_value!(Str, cuid)),
        DataElement::new(tags::COMMAND_FIELD, VR::US, dicom_value!(U16, [0x0001])),
        DataElement::new(tags::MESSAGE_ID, VR::US, dicom_value!(U16, [message_id])),
        DataElement::new(tags::PRIORITY, VR::US, dicom_value!(U16, [0x0000])),
        DataElement::new(
            tags::COMMAND_DATA_SET_TYPE,
            VR::US,
            dicom_value!(U16, [0x0000]),
        ),
        DataElement::new(tags::AFFECTED_SOP_INSTANCE_UID, VR::UI, dicom_value!(Str, iuid)),
    ])
}

/// One `C-STORE-RQ` ready to hand to `ClientAssociation::send`: the
/// command value (always Implicit VR Little Endian) and the data value
/// (the negotiated output transfer syntax), addressed to `pcid`.
pub struct StoreRequest {
    pub pcid: u8,
    pub command: Vec<u8>,
    pub data: Vec<u8>,
}

impl StoreRequest {
    /// Combine command and data into the PDU the single-PData path sends,
    /// per `store_sync.rs`'s "both fit under max PDU length" branch —
    /// the only path this crate implements (large, stream-split C-STORE
    /// requests are out of scope; see `DESIGN.md`).
    pub fn into_pdata_values(self) -> Vec<PDataValue> {
        vec![
            PDataValue {
                presentation_context_id: self.pcid,
                value_type: PDataValueType::Command,
                is_last: true,
                data: self.command,
            },
            PDataValue {
                presentation_context_id: self.pcid,
                value_type: PDataValueType::Data,
                is_last: true,
                data: self.data,
            },
        ]
    }
}

/// Pass-through path (§4.F): the inbound stream is copied verbatim as the
/// payload, with only the command dataset built fresh. No dataset is ever
/// parsed.
pub fn write_pass_through(
    cuid: &str,
    iuid: &str,
    pcid: u8,
    message_id: u16,
    mut inbound: impl Read,
) -> Result<StoreRequest> {
    let command = encode_command(cuid, iuid, message_id)?;
    let mut data = Vec::with_capacity(2048);
    inbound.read_to_end(&mut data).context(ReadInboundSnafu)?;
    Ok(StoreRequest { pcid, command, data })
}

/// Parsed path (§4.F): the dataset has already been edited/transcoded by
/// the caller and is serialized under `output_tsuid`, which must match
/// the transfer syntax already recorded in `dataset`'s file meta.
pub fn write_parsed(
    dataset: &Dataset,
    cuid: &str,
    iuid: &str,
    pcid: u8,
    message_id: u16,
    output_tsuid: &str,
) -> Result<StoreRequest> {
    let command = encode_command(cuid, iuid, message_id)?;
    let ts = TransferSyntaxRegistry
        .get(output_tsuid)
        .context(UnknownTransferSyntaxSnafu { ts: output_tsuid })?;
    let mut data = Vec::with_capacity(2048);
    dataset
        .write_dataset_with_ts(&mut data, ts)
        .context(WritePayloadSnafu)?;
    Ok(StoreRequest { pcid, command, data })
}

fn encode_command(cuid: &str, iuid: &str, message_id: u16) -> Result<Vec<u8>> {
    let cmd = store_req_command(cuid, iuid, message_id);
    let mut buf = Vec::with_capacity(128);
    cmd.write_dataset_with_ts(
        &mut buf,
        &dicom_transfer_syntax_registry::entries::IMPLICIT_VR_LITTLE_ENDIAN.erased(),
    )
    .context(WriteCommandSnafu)?;
    Ok(buf)
}

/// A STOW-RS payload whose bytes are computed lazily and rebuilt on every
/// call to [`bytes`](Self::bytes) rather than cached, so the same payload
/// can back more than one upload attempt (`spec.md` §9's idempotence
/// note) without the caller having to remember whether it was already
/// consumed.
pub enum StowPayload {
    /// Pass-through: the full inbound DICOM file stream (preamble, file
    /// meta, encoded data set), already complete on the wire — handed to
    /// `stow` verbatim.
    PassThrough(Vec<u8>),
    /// Parsed: a dataset to be re-serialized (preamble + file meta +
    /// data set under the current meta transfer syntax) on every call.
    Parsed(Dataset),
}

impl StowPayload {
    /// Produce the full encoded bitstream this payload represents. This
    /// is §4.F's `newInputStream` equivalent: a fresh `Vec<u8>` every
    /// time, since the underlying HTTP client may need to retry the
    /// upload with a freshly-readable body.
    pub fn bytes(&self) -> Result<Vec<u8>> {
        match self {
            StowPayload::PassThrough(bytes) => Ok(bytes.clone()),
            StowPayload::Parsed(dataset) => {
                let mut buf = Vec::with_capacity(4096);
                dataset.write_all(&mut buf).context(WriteMetaSnafu)?;
                Ok(buf)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_dataset_carries_affected_sop_uids() {
        let cmd = store_req_command("1.2.840.10008.5.1.4.1.1.7", "1.2.3.4", 7);
        let cuid = cmd
            .element(tags::AFFECTED_SOP_CLASS_UID)
            .unwrap()
            .to_str()
            .unwrap();
        assert_eq!(cuid, "1.2.840.10008.5.1.4.1.1.7");
        let iuid = cmd
            .element(tags::AFFECTED_SOP_INSTANCE_UID)
            .unwrap()
            .to_str()
            .unwrap();
        assert_eq!(iuid, "1.2.3.4");
    }

    #[test]
    fn pass_through_copies_inbound_bytes_verbatim() {
        let inbound = b"not really dicom but copied verbatim".to_vec();
        let req = write_pass_through(
            "1.2.840.10008.5.1.4.1.1.7",
            "1.2.3.4",
            1,
            1,
            &inbound[..],
        )
        .unwrap();
        assert_eq!(req.data, inbound);
        assert_eq!(req.pcid, 1);
    }
}
