//! The forward controller (§4.G/§4.H): decides pass-through vs parsed
//! handling per destination, fans an instance out to one or more
//! destinations, and emits progress notifications.
//!
//! Grounded on `storescu/src/main.rs::run()`'s per-file loop (select
//! transfer syntax → transcode if needed → send → record progress),
//! generalized from "one file, one association" to "one inbound
//! instance, N destinations, one parsed copy shared across them" as
//! described in `SPEC_FULL.md` §4.G.

use std::io::Read;

use dicom_dictionary_std::{tags, uids};
use dicom_object::mem::InMemDicomObject;
use dicom_object::{FileDicomObject, FileMetaTableBuilder};
use dicom_transfer_syntax_registry::TransferSyntaxRegistry;
use snafu::{ensure, OptionExt, ResultExt};
use tracing::warn;

use crate::association::{AssocError, DestinationAddr, OutboundAssociation};
use crate::config::{DestinationConfig, DestinationTarget};
use crate::editor::{AbortSignal, AttributeEditor, AttributeEditorContext};
use crate::error::{
    CStoreStatusSnafu, ConnectionAbortSnafu, EditorSnafu, MetaSnafu, NoDestinationsSnafu,
    NoPresentationContextSnafu, PerFileAbortSnafu, ReadDatasetSnafu, ReadInboundForStowSnafu,
    StoreSnafu, StowSnafu, TranscodeSnafu, UnknownTransferSyntaxSnafu, WriterSnafu,
};
use crate::error::Result;
use crate::mask::MaskArea;
use crate::negotiate::select_transfer_syntax;
use crate::params::Params;
use crate::progress::{ProgressSink, ProgressStatus};
use crate::stow::{web_output_tsuid, StowClient, StowDestination};
use crate::transcode::{self, needs_transcode};
use crate::writer::{self, StowPayload};

type Dataset = FileDicomObject<InMemDicomObject>;

/// One configured forwarding target, either a DICOM C-STORE peer with a
/// long-lived outbound association, or a STOW-RS web endpoint.
pub enum ForwardDestination {
    Dicom(DicomDestination),
    Web(WebDestination),
}

pub struct DicomDestination {
    pub name: String,
    association: OutboundAssociation,
    editors: Vec<Box<dyn AttributeEditor>>,
    mask: Option<MaskArea>,
    message_id: u16,
}

pub struct WebDestination {
    pub name: String,
    client: StowClient,
    target: StowDestination,
    editors: Vec<Box<dyn AttributeEditor>>,
    mask: Option<MaskArea>,
}

impl ForwardDestination {
    /// Build a destination handle from a configuration entry. DICOM
    /// destinations do not open their association eagerly — the first
    /// `prepare_transfer` call does, per §4.B.
    pub fn from_config(
        config: &DestinationConfig,
        calling_ae_title: &str,
        max_pdu_length: u32,
    ) -> std::result::Result<Self, crate::config::ConfigError> {
        let editors = config
            .editors
            .iter()
            .map(|e| e.compile())
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let mask = config.mask.map(MaskArea::from);

        Ok(match &config.target {
            DestinationTarget::Dicom { addr } => ForwardDestination::Dicom(DicomDestination {
                name: config.name.clone(),
                association: OutboundAssociation::new(DestinationAddr {
                    addr: addr.clone(),
                    calling_ae_title: calling_ae_title.to_string(),
                    called_ae_title: config.called_ae_title.clone(),
                    max_pdu_length,
                }),
                editors,
                mask,
                message_id: 1,
            }),
            DestinationTarget::Web { base_url } => ForwardDestination::Web(WebDestination {
                name: config.name.clone(),
                client: StowClient::new(),
                target: StowDestination {
                    base_url: base_url.clone(),
                },
                editors,
                mask,
            }),
        })
    }

    fn name(&self) -> &str {
        match self {
            ForwardDestination::Dicom(d) => &d.name,
            ForwardDestination::Web(w) => &w.name,
        }
    }

    fn editors(&self) -> &[Box<dyn AttributeEditor>] {
        match self {
            ForwardDestination::Dicom(d) => &d.editors,
            ForwardDestination::Web(w) => &w.editors,
        }
    }

    fn mask(&self) -> Option<MaskArea> {
        match self {
            ForwardDestination::Dicom(d) => d.mask,
            ForwardDestination::Web(w) => w.mask,
        }
    }

    /// §4.B `prepareTransfer`: returns the output transfer syntax this
    /// destination will receive the instance under.
    fn prepare_transfer(&mut self, cuid: &str, tsuid: &str) -> std::result::Result<String, AssocError> {
        match self {
            ForwardDestination::Dicom(d) => d.association.prepare_transfer(cuid, tsuid),
            ForwardDestination::Web(_) => Ok(web_output_tsuid(tsuid).to_string()),
        }
    }
}

/// Entry point named in §6: forward one instance to exactly one
/// destination.
pub fn store_one_destination(
    destination: &mut ForwardDestination,
    params: Params,
    sink: &dyn ProgressSink,
) -> Result<()> {
    store_multiple_destination(std::slice::from_mut(destination), params, sink)
}

/// Entry point named in §6 and detailed in §4.G: forward one instance to
/// every destination that accepts it.
pub fn store_multiple_destination(
    destinations: &mut [ForwardDestination],
    params: Params,
    sink: &dyn ProgressSink,
) -> Result<()> {
    ensure!(!destinations.is_empty(), NoDestinationsSnafu);

    if params.cuid == uids::MEDIA_STORAGE_DIRECTORY_STORAGE {
        warn!(iuid = %params.iuid, "dropping DICOMDIR instance, not forwarded");
        return Ok(());
    }

    let Params {
        iuid,
        cuid,
        tsuid,
        pcid,
        mut data,
        inbound_association,
    } = params;

    // §4.G step 3: prepare every destination's association, dropping the
    // ones that fail to negotiate.
    let mut prepared: Vec<(usize, String)> = Vec::with_capacity(destinations.len());
    for (index, destination) in destinations.iter_mut().enumerate() {
        match destination.prepare_transfer(&cuid, &tsuid) {
            Ok(output_tsuid) => prepared.push((index, output_tsuid)),
            Err(source) => {
                warn!(
                    destination = destination.name(),
                    cuid = %cuid,
                    "failed to prepare transfer: {}",
                    snafu::Report::from_error(&source)
                );
            }
        }
    }

    if prepared.is_empty() {
        return Ok(());
    }

    let remaining = prepared.len();

    if prepared.len() == 1 {
        let (index, output_tsuid) = prepared.into_iter().next().unwrap();
        let destination = &mut destinations[index];
        return transfer_single(
            destination,
            &cuid,
            &iuid,
            pcid,
            &tsuid,
            &output_tsuid,
            &mut data,
            &inbound_association,
            sink,
            remaining - 1,
        );
    }

    // §4.G step 5: multi-destination fan-out. Parse once, deep-copy per
    // destination.
    let input_ts = TransferSyntaxRegistry
        .get(&tsuid)
        .context(UnknownTransferSyntaxSnafu { ts: tsuid.clone() })?;
    let meta = FileMetaTableBuilder::new()
        .media_storage_sop_class_uid(cuid.clone())
        .media_storage_sop_instance_uid(iuid.clone())
        .transfer_syntax(tsuid.clone())
        .build()
        .context(MetaSnafu)?;
    let parsed_obj = InMemDicomObject::read_dataset_with_ts(&mut data, input_ts)
        .context(ReadDatasetSnafu)?;
    let source_dataset = parsed_obj.with_exact_meta(meta);

    let mut remaining_count = prepared.len();
    for (index, output_tsuid) in prepared {
        remaining_count -= 1;
        let destination = &mut destinations[index];
        let copy = source_dataset.clone();
        // `transfer_parsed` already reports progress and only returns Err
        // for a connection-fatal abort, so `?` both stops the fan-out and
        // propagates exactly that case.
        transfer_parsed(
            destination,
            &cuid,
            &iuid,
            pcid,
            &output_tsuid,
            copy,
            &inbound_association,
            sink,
            remaining_count,
        )?;
    }

    Ok(())
}

/// Single-destination path (§4.G step 4): pass-through when eligible,
/// parsed otherwise.
#[allow(clippy::too_many_arguments)]
fn transfer_single(
    destination: &mut ForwardDestination,
    cuid: &str,
    iuid: &str,
    pcid: u8,
    input_tsuid: &str,
    output_tsuid: &str,
    data: &mut Box<dyn Read + Send>,
    inbound_association: &crate::params::InboundAssociation,
    sink: &dyn ProgressSink,
    remaining: usize,
) -> Result<()> {
    let pass_through_eligible =
        destination.editors().is_empty() && destination.mask().is_none() && output_tsuid == input_tsuid;

    if pass_through_eligible {
        let result = send_pass_through(destination, cuid, iuid, pcid, output_tsuid, data);
        return report(destination, iuid, cuid, result, sink, remaining);
    }

    let input_ts = TransferSyntaxRegistry
        .get(input_tsuid)
        .context(UnknownTransferSyntaxSnafu {
            ts: input_tsuid.to_string(),
        })?;
    let meta = FileMetaTableBuilder::new()
        .media_storage_sop_class_uid(cuid.to_string())
        .media_storage_sop_instance_uid(iuid.to_string())
        .transfer_syntax(input_tsuid.to_string())
        .build()
        .context(MetaSnafu)?;
    let parsed_obj =
        InMemDicomObject::read_dataset_with_ts(data, input_ts).context(ReadDatasetSnafu)?;
    let dataset = parsed_obj.with_exact_meta(meta);

    transfer_parsed(
        destination,
        cuid,
        iuid,
        pcid,
        output_tsuid,
        dataset,
        inbound_association,
        sink,
        remaining,
    )
}

/// Parsed path shared by both the single- and multi-destination flows
/// (§4.G/§4.F "parsed" branch): run the destination's editors, transcode
/// if required, then write.
#[allow(clippy::too_many_arguments)]
fn transfer_parsed(
    destination: &mut ForwardDestination,
    cuid: &str,
    iuid: &str,
    pcid: u8,
    output_tsuid: &str,
    mut dataset: Dataset,
    inbound_association: &crate::params::InboundAssociation,
    sink: &dyn ProgressSink,
    remaining: usize,
) -> Result<()> {
    let mask = destination.mask();
    let mut context = AttributeEditorContext::new(mask);
    let pipeline = crate::editor::EditorPipeline::new(destination.editors());

    let iuid = match pipeline
        .run(&mut dataset, &mut context, iuid.to_string())
        .context(EditorSnafu)
    {
        Ok(iuid) => iuid,
        Err(e) => return report(destination, iuid, cuid, Err(e), sink, remaining),
    };

    match context.abort {
        AbortSignal::None => {}
        AbortSignal::FileException => {
            let message = context.abort_message.unwrap_or_default();
            return report(
                destination,
                &iuid,
                cuid,
                PerFileAbortSnafu { message }.fail(),
                sink,
                remaining,
            );
        }
        AbortSignal::ConnectionException => {
            let message = context.abort_message.unwrap_or_default();
            inbound_association.release();
            return report(
                destination,
                &iuid,
                cuid,
                ConnectionAbortSnafu { message }.fail(),
                sink,
                remaining,
            );
        }
    }

    let has_pixel_data = dataset.element(tags::PIXEL_DATA).is_ok();
    if needs_transcode(&dataset_ts(&dataset), output_tsuid, has_pixel_data, mask.is_some()) {
        if let Err(e) = transcode::transcode(&mut dataset, output_tsuid, mask).context(TranscodeSnafu) {
            return report(destination, &iuid, cuid, Err(e), sink, remaining);
        }
    } else if let Some(ts) = TransferSyntaxRegistry.get(output_tsuid) {
        dataset.update_meta(|m| m.set_transfer_syntax(ts));
    }

    let result = write_parsed_result(destination, cuid, &iuid, pcid, output_tsuid, &dataset);
    report(destination, &iuid, cuid, result, sink, remaining)
}

fn dataset_ts(dataset: &Dataset) -> String {
    dataset.meta().transfer_syntax().trim_end_matches('\0').to_string()
}

fn send_pass_through(
    destination: &mut ForwardDestination,
    cuid: &str,
    iuid: &str,
    pcid: u8,
    output_tsuid: &str,
    data: &mut Box<dyn Read + Send>,
) -> Result<()> {
    match destination {
        ForwardDestination::Dicom(dest) => {
            let message_id = next_message_id(dest);
            let accepted = dest.association.accepted_contexts();
            let proposed = dest.association.proposed_abstract_syntaxes();
            let pc = select_transfer_syntax(accepted, &proposed, cuid, pcid, output_tsuid)
                .context(NoPresentationContextSnafu {
                    cuid: cuid.to_string(),
                    tsuid: output_tsuid.to_string(),
                })?;
            let request =
                writer::write_pass_through(cuid, iuid, pc.id, message_id, &mut *data)
                    .context(WriterSnafu)?;
            store_via_cstore(dest, request)
        }
        ForwardDestination::Web(dest) => {
            let meta = FileMetaTableBuilder::new()
                .media_storage_sop_class_uid(cuid.to_string())
                .media_storage_sop_instance_uid(iuid.to_string())
                .transfer_syntax(output_tsuid.to_string())
                .build()
                .context(MetaSnafu)?;
            let mut full = Vec::with_capacity(4096);
            full.extend_from_slice(&[0u8; 128]);
            full.extend_from_slice(b"DICM");
            meta.write(&mut full).context(MetaSnafu)?;
            data.read_to_end(&mut full).context(ReadInboundForStowSnafu)?;
            dest.client
                .store(&dest.target, &StowPayload::PassThrough(full))
                .context(StowSnafu)
        }
    }
}

fn write_parsed_result(
    destination: &mut ForwardDestination,
    cuid: &str,
    iuid: &str,
    pcid: u8,
    output_tsuid: &str,
    dataset: &Dataset,
) -> Result<()> {
    match destination {
        ForwardDestination::Dicom(dest) => {
            let message_id = next_message_id(dest);
            let accepted = dest.association.accepted_contexts();
            let proposed = dest.association.proposed_abstract_syntaxes();
            let pc = select_transfer_syntax(accepted, &proposed, cuid, pcid, output_tsuid)
                .context(NoPresentationContextSnafu {
                    cuid: cuid.to_string(),
                    tsuid: output_tsuid.to_string(),
                })?;
            let request =
                writer::write_parsed(dataset, cuid, iuid, pc.id, message_id, output_tsuid)
                    .context(WriterSnafu)?;
            store_via_cstore(dest, request)
        }
        ForwardDestination::Web(dest) => dest
            .client
            .store(&dest.target, &StowPayload::Parsed(dataset.clone()))
            .context(StowSnafu),
    }
}

fn store_via_cstore(dest: &mut DicomDestination, request: writer::StoreRequest) -> Result<()> {
    let status = dest.association.cstore(request).context(StoreSnafu)?;
    ensure!(
        matches!(status, 0 | 1 | 0x0107 | 0x0116 | 0xB000..=0xBFFF),
        crate::error::CStoreStatusSnafu { status }
    );
    Ok(())
}

fn next_message_id(dest: &mut DicomDestination) -> u16 {
    let id = dest.message_id;
    dest.message_id = dest.message_id.wrapping_add(1).max(1);
    id
}

fn report(
    destination: &ForwardDestination,
    iuid: &str,
    cuid: &str,
    result: Result<()>,
    sink: &dyn ProgressSink,
    remaining: usize,
) -> Result<()> {
    match &result {
        Ok(()) => {
            sink.notify(iuid, cuid, Some(0), ProgressStatus::Completed, remaining);
        }
        Err(_) => {
            notify_failed(destination, iuid, cuid, sink, remaining);
        }
    }
    result
}

fn notify_failed(
    destination: &ForwardDestination,
    iuid: &str,
    cuid: &str,
    sink: &dyn ProgressSink,
    remaining: usize,
) {
    warn!(destination = destination.name(), %iuid, %cuid, "instance transfer failed");
    sink.notify(iuid, cuid, None, ProgressStatus::Failed, remaining);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dataset_ts_trims_null_padding() {
        let mut obj = InMemDicomObject::new_empty();
        obj.put(dicom_core::DataElement::new(
            dicom_dictionary_std::tags::PATIENT_ID,
            dicom_core::VR::LO,
            dicom_core::PrimitiveValue::from("x"),
        ));
        let dataset = obj
            .with_meta(
                FileMetaTableBuilder::new()
                    .media_storage_sop_class_uid("1.2.840.10008.5.1.4.1.1.7")
                    .media_storage_sop_instance_uid("1.2.3.4")
                    .transfer_syntax(uids::EXPLICIT_VR_LITTLE_ENDIAN),
            )
            .unwrap();
        assert_eq!(dataset_ts(&dataset), uids::EXPLICIT_VR_LITTLE_ENDIAN);
    }
}
