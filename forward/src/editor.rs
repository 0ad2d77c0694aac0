//! The editor pipeline (§4.C): an ordered list of attribute editors applied
//! to a parsed dataset, sharing one [`AttributeEditorContext`] per
//! destination/instance pair.
//!
//! Grounded directly on `dicom_core::ops`'s `AttributeOp`/`AttributeAction`/
//! `ApplyOp` trait, already implemented for `FileDicomObject` in
//! `object/src/ops.rs`. An [`AttributeEditor`] is anything that can mutate
//! a dataset and the shared context; built-in editors are thin wrappers
//! around `ApplyOp::apply`.

use dicom_core::ops::{ApplyOp, AttributeAction, AttributeOp, AttributeSelector};
use dicom_dictionary_std::tags;
use dicom_object::mem::InMemDicomObject;
use dicom_object::FileDicomObject;
use snafu::{ResultExt, Snafu};

use crate::mask::MaskArea;

pub type Dataset = FileDicomObject<InMemDicomObject>;

/// The abort signal an editor may raise on the shared context.
///
/// `FileException` aborts only the instance currently being processed by
/// the destination whose editor raised it; `ConnectionException` also
/// releases the inbound association and aborts the entire forwarding
/// invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AbortSignal {
    #[default]
    None,
    FileException,
    ConnectionException,
}

/// Per-destination, per-instance mutable state threaded through the
/// editor pipeline.
#[derive(Debug, Default)]
pub struct AttributeEditorContext {
    pub abort: AbortSignal,
    pub abort_message: Option<String>,
    pub mask_area: Option<MaskArea>,
}

impl AttributeEditorContext {
    pub fn new(mask_area: Option<MaskArea>) -> Self {
        AttributeEditorContext {
            abort: AbortSignal::None,
            abort_message: None,
            mask_area,
        }
    }

    pub fn abort_file(&mut self, message: impl Into<String>) {
        self.abort = AbortSignal::FileException;
        self.abort_message = Some(message.into());
    }

    pub fn abort_connection(&mut self, message: impl Into<String>) {
        self.abort = AbortSignal::ConnectionException;
        self.abort_message = Some(message.into());
    }
}

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum EditorError {
    /// editor failed to apply attribute operation
    Apply {
        source: dicom_object::ops::ApplyError,
    },
}

pub type Result<T, E = EditorError> = std::result::Result<T, E>;

/// A single attribute editor: a callable mutating a dataset and its shared
/// context, matching the `AttributeEditor::apply(dataset, context)`
/// interface named in spec §6.
pub trait AttributeEditor: Send + Sync {
    fn apply(&self, dataset: &mut Dataset, context: &mut AttributeEditorContext) -> Result<()>;
}

impl<F> AttributeEditor for F
where
    F: Fn(&mut Dataset, &mut AttributeEditorContext) -> Result<()> + Send + Sync,
{
    fn apply(&self, dataset: &mut Dataset, context: &mut AttributeEditorContext) -> Result<()> {
        (self)(dataset, context)
    }
}

/// Replace the string value of an existing attribute, or do nothing if
/// it is absent.
pub struct ReplaceStrEditor {
    pub selector: AttributeSelector,
    pub value: std::borrow::Cow<'static, str>,
}

impl AttributeEditor for ReplaceStrEditor {
    fn apply(&self, dataset: &mut Dataset, _context: &mut AttributeEditorContext) -> Result<()> {
        dataset
            .apply(AttributeOp::new(
                self.selector.clone(),
                AttributeAction::ReplaceStr(self.value.clone()),
            ))
            .context(ApplySnafu)
    }
}

/// Remove an attribute if present.
pub struct RemoveTagEditor {
    pub selector: AttributeSelector,
}

impl AttributeEditor for RemoveTagEditor {
    fn apply(&self, dataset: &mut Dataset, _context: &mut AttributeEditorContext) -> Result<()> {
        dataset
            .apply(AttributeOp::new(self.selector.clone(), AttributeAction::Remove))
            .context(ApplySnafu)
    }
}

/// Set an attribute's string value, creating it if missing.
pub struct SetStrEditor {
    pub selector: AttributeSelector,
    pub value: std::borrow::Cow<'static, str>,
}

impl AttributeEditor for SetStrEditor {
    fn apply(&self, dataset: &mut Dataset, _context: &mut AttributeEditorContext) -> Result<()> {
        dataset
            .apply(AttributeOp::new(
                self.selector.clone(),
                AttributeAction::SetStr(self.value.clone()),
            ))
            .context(ApplySnafu)
    }
}

/// An ordered pipeline of editors applied in sequence to a dataset,
/// refreshing `iuid` from `SOPInstanceUID` after each one (per §4.C and
/// §9's note that editors may rewrite the SOP Instance UID).
pub struct EditorPipeline<'a> {
    editors: &'a [Box<dyn AttributeEditor>],
}

impl<'a> EditorPipeline<'a> {
    pub fn new(editors: &'a [Box<dyn AttributeEditor>]) -> Self {
        EditorPipeline { editors }
    }

    /// Run every editor in order, updating `iuid` after each step.
    /// Returns the refreshed `iuid` alongside the (possibly aborted)
    /// context.
    pub fn run(
        &self,
        dataset: &mut Dataset,
        context: &mut AttributeEditorContext,
        mut iuid: String,
    ) -> Result<String> {
        for editor in self.editors {
            editor.apply(dataset, context)?;
            if let Ok(element) = dataset.element(tags::SOP_INSTANCE_UID) {
                if let Ok(s) = element.to_str() {
                    iuid = s.trim_end_matches('\0').to_string();
                }
            }
        }
        Ok(iuid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dicom_core::{dicom_value, DataElement, PrimitiveValue, VR};
    use dicom_object::{FileMetaTableBuilder, InMemDicomObject};

    fn sample_dataset() -> Dataset {
        let mut obj = InMemDicomObject::new_empty();
        obj.put(DataElement::new(
            tags::PATIENT_ID,
            VR::LO,
            PrimitiveValue::from("12345"),
        ));
        obj.put(DataElement::new(
            tags::SOP_INSTANCE_UID,
            VR::UI,
            dicom_value!(Str, "1.2.3.4"),
        ));
        obj.with_meta(
            FileMetaTableBuilder::new()
                .media_storage_sop_class_uid("1.2.840.10008.5.1.4.1.1.7")
                .media_storage_sop_instance_uid("1.2.3.4")
                .transfer_syntax("1.2.840.10008.1.2.1"),
        )
        .unwrap()
    }

    #[test]
    fn pipeline_rewrites_iuid_and_refreshes_context() {
        let mut dataset = sample_dataset();
        let editors: Vec<Box<dyn AttributeEditor>> = vec![Box::new(SetStrEditor {
            selector: tags::SOP_INSTANCE_UID.into(),
            value: "9.9.9.9".into(),
        })];
        let pipeline = EditorPipeline::new(&editors);
        let mut ctx = AttributeEditorContext::default();
        let iuid = pipeline.run(&mut dataset, &mut ctx, "1.2.3.4".into()).unwrap();
        assert_eq!(iuid, "9.9.9.9");
        assert_eq!(ctx.abort, AbortSignal::None);
    }

    #[test]
    fn editor_can_raise_connection_abort() {
        let mut dataset = sample_dataset();
        let editors: Vec<Box<dyn AttributeEditor>> = vec![Box::new(
            |_d: &mut Dataset, ctx: &mut AttributeEditorContext| {
                ctx.abort_connection("peer misbehaving");
                Ok(())
            },
        )];
        let pipeline = EditorPipeline::new(&editors);
        let mut ctx = AttributeEditorContext::default();
        pipeline.run(&mut dataset, &mut ctx, "1.2.3.4".into()).unwrap();
        assert_eq!(ctx.abort, AbortSignal::ConnectionException);
    }
}
