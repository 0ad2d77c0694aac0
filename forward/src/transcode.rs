//! The transcoder (§4.E): decode frames, burn in a mask overlay if
//! configured, and re-encode to the chosen output transfer syntax,
//! rewriting the codec-dependent tags to match.
//!
//! Grounded closely on `pixeldata/src/transcode.rs`'s
//! `Transcode::transcode_with_options` (decode to native representation,
//! re-encode via the output transfer syntax's codec, rebuild the pixel
//! data value, apply the codec's returned `AttributeOp`s, update file
//! meta). The mask overlay step has no counterpart in the pack and is
//! inserted as a plain pixel-buffer mutation between decode and re-encode.

use dicom_core::{DataElement, PrimitiveValue, VR};
use dicom_dictionary_std::{tags, uids};
use dicom_object::mem::InMemDicomObject;
use dicom_object::FileDicomObject;
use dicom_pixeldata::{PhotometricInterpretation, PixelDecoder, PixelRepresentation, Transcode as _};
use dicom_transfer_syntax_registry::TransferSyntaxRegistry;
use snafu::{OptionExt, ResultExt, Snafu};

use crate::mask::MaskArea;

type Dataset = FileDicomObject<InMemDicomObject>;

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum TranscodeError {
    /// unsupported or unknown output transfer syntax {ts}
    UnknownTransferSyntax { ts: String },

    /// could not decode pixel data
    Decode { source: dicom_pixeldata::Error },

    /// could not re-encode pixel data for transfer syntax {ts}
    Encode {
        ts: String,
        source: dicom_pixeldata::TranscodeError,
    },

    /// unsupported bits allocated value {bits_allocated} for mask overlay
    UnsupportedBitsAllocated { bits_allocated: u16 },
}

pub type Result<T, E = TranscodeError> = std::result::Result<T, E>;

/// Whether frame extraction/transcoding is required at all, per §4.D's
/// trigger condition:
///
/// > either (a) a mask area is configured and pixel data is present and
/// > the inbound syntax is not lossy video, or (b) the inbound syntax is
/// > not the chosen outbound syntax and the inbound syntax is
/// > encapsulated (non-native).
pub fn needs_transcode(
    input_tsuid: &str,
    output_tsuid: &str,
    has_pixel_data: bool,
    has_mask: bool,
) -> bool {
    if has_mask && has_pixel_data && !is_lossy_video(input_tsuid) {
        return true;
    }
    let input_ts = TransferSyntaxRegistry.get(input_tsuid);
    let is_encapsulated = input_ts
        .map(|ts| ts.is_encapsulated_pixel_data())
        .unwrap_or(false);
    input_tsuid != output_tsuid && is_encapsulated
}

/// Map a decoded pixel buffer's photometric interpretation back to its
/// DICOM defined term, for rewriting `PhotometricInterpretation` after a
/// decode that may have normalized it (YBR frames decode to RGB, see
/// `pixeldata/src/lib.rs`'s `decode_pixel_data`).
fn photometric_interpretation_code(pi: &PhotometricInterpretation) -> String {
    match pi {
        PhotometricInterpretation::Monochrome1 => "MONOCHROME1".to_string(),
        PhotometricInterpretation::Monochrome2 => "MONOCHROME2".to_string(),
        PhotometricInterpretation::PaletteColor => "PALETTE COLOR".to_string(),
        PhotometricInterpretation::Rgb => "RGB".to_string(),
        PhotometricInterpretation::YbrFull => "YBR_FULL".to_string(),
        PhotometricInterpretation::YbrFull422 => "YBR_FULL_422".to_string(),
        PhotometricInterpretation::YbrPartial422 => "YBR_PARTIAL_422".to_string(),
        PhotometricInterpretation::YbrPartial420 => "YBR_PARTIAL_420".to_string(),
        PhotometricInterpretation::YbrIct => "YBR_ICT".to_string(),
        PhotometricInterpretation::YbrRct => "YBR_RCT".to_string(),
        PhotometricInterpretation::Unknown(s) => s.clone(),
    }
}

fn is_lossy_video(tsuid: &str) -> bool {
    matches!(
        tsuid,
        uids::MPEG2MPML
            | uids::MPEG2MPHL
            | uids::MPEG4HP41
            | uids::MPEG4HP41BD
            | uids::HEVCMP51
    )
}

/// Decode the dataset's pixel data, burn in `mask` on every frame if
/// present, and re-encode to `output_tsuid`, rewriting the file meta
/// transfer syntax and the codec-dependent attributes to match.
///
/// On return, `dataset` is fully prepared for serialization under
/// `output_tsuid` (§4.F then only has to call the plain dataset writer).
pub fn transcode(
    dataset: &mut Dataset,
    output_tsuid: &str,
    mask: Option<MaskArea>,
) -> Result<()> {
    let output_ts = TransferSyntaxRegistry
        .get(output_tsuid)
        .context(UnknownTransferSyntaxSnafu { ts: output_tsuid })?;

    if mask.is_none() {
        dataset
            .transcode(output_ts)
            .context(EncodeSnafu { ts: output_tsuid })?;
        return Ok(());
    }

    // decode to native representation so the mask can be burned in
    let decoded = dataset.decode_pixel_data().context(DecodeSnafu)?;
    let bits_allocated = decoded.bits_allocated();
    let bytes_per_sample = ((bits_allocated + 7) / 8) as u32;
    let samples_per_pixel = decoded.samples_per_pixel() as u32;
    let rows = decoded.rows();
    let columns = decoded.columns();
    let frames = decoded.number_of_frames();
    let frame_len = (rows * columns * samples_per_pixel * bytes_per_sample) as usize;

    // pulled out up front: `decoded` borrows `dataset`, and every field
    // below is read before the first `dataset.put` call re-borrows it
    // mutably to write the masked pixel data and rewritten tags back.
    let photometric = photometric_interpretation_code(decoded.photometric_interpretation());
    let pixel_representation = decoded.pixel_representation();
    let bits_stored = decoded.bits_stored();
    let high_bit = decoded.high_bit();

    let mut native = decoded.data().to_vec();
    if let Some(area) = mask {
        for frame in 0..frames {
            let start = frame as usize * frame_len;
            let end = start + frame_len;
            if let Some(buf) = native.get_mut(start..end) {
                area.apply(buf, columns, rows, samples_per_pixel, bytes_per_sample);
            }
        }
    }

    let vr = if bits_allocated == 8 { VR::OB } else { VR::OW };
    let value = match bits_allocated {
        8 => PrimitiveValue::from(native),
        16 => {
            let words: Vec<u16> = native
                .chunks_exact(2)
                .map(|c| u16::from_le_bytes([c[0], c[1]]))
                .collect();
            PrimitiveValue::U16(words.into())
        }
        other => return UnsupportedBitsAllocatedSnafu { bits_allocated: other }.fail(),
    };

    // decoding normalizes the pixel representation (e.g. a lossy-JPEG
    // YBR frame decodes to interleaved RGB); the header must describe
    // what `native` actually holds rather than what the encapsulated
    // stream declared.
    dataset.put(DataElement::new(
        tags::PHOTOMETRIC_INTERPRETATION,
        VR::CS,
        photometric,
    ));
    dataset.put(DataElement::new(
        tags::PLANAR_CONFIGURATION,
        VR::US,
        PrimitiveValue::from(0u16),
    ));
    dataset.put(DataElement::new(
        tags::PIXEL_REPRESENTATION,
        VR::US,
        PrimitiveValue::from(match pixel_representation {
            PixelRepresentation::Unsigned => 0u16,
            PixelRepresentation::Signed => 1u16,
        }),
    ));
    dataset.put(DataElement::new(
        tags::BITS_STORED,
        VR::US,
        PrimitiveValue::from(bits_stored),
    ));
    dataset.put(DataElement::new(
        tags::HIGH_BIT,
        VR::US,
        PrimitiveValue::from(high_bit),
    ));
    dataset.put(DataElement::new(
        tags::NUMBER_OF_FRAMES,
        VR::IS,
        frames.to_string(),
    ));

    dataset.put(DataElement::new(tags::PIXEL_DATA, vr, value));
    dataset.update_meta(|meta| {
        meta.set_transfer_syntax(&dicom_transfer_syntax_registry::entries::EXPLICIT_VR_LITTLE_ENDIAN)
    });

    if output_tsuid != uids::EXPLICIT_VR_LITTLE_ENDIAN {
        dataset
            .transcode(output_ts)
            .context(EncodeSnafu { ts: output_tsuid })?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dicom_core::dicom_value;
    use dicom_object::{FileMetaTableBuilder, InMemDicomObject};

    fn rgb_planar_dataset() -> Dataset {
        let mut obj = InMemDicomObject::new_empty();
        obj.put(DataElement::new(tags::ROWS, VR::US, dicom_value!(U16, [2])));
        obj.put(DataElement::new(tags::COLUMNS, VR::US, dicom_value!(U16, [2])));
        obj.put(DataElement::new(
            tags::SAMPLES_PER_PIXEL,
            VR::US,
            dicom_value!(U16, [3]),
        ));
        obj.put(DataElement::new(
            tags::PHOTOMETRIC_INTERPRETATION,
            VR::CS,
            dicom_value!(Str, "RGB"),
        ));
        // deliberately planar (by-plane), to verify the rewrite forces
        // the interleaved layout the mask loop actually produces
        obj.put(DataElement::new(
            tags::PLANAR_CONFIGURATION,
            VR::US,
            dicom_value!(U16, [1]),
        ));
        obj.put(DataElement::new(
            tags::BITS_ALLOCATED,
            VR::US,
            dicom_value!(U16, [8]),
        ));
        obj.put(DataElement::new(
            tags::BITS_STORED,
            VR::US,
            dicom_value!(U16, [8]),
        ));
        obj.put(DataElement::new(tags::HIGH_BIT, VR::US, dicom_value!(U16, [7])));
        obj.put(DataElement::new(
            tags::PIXEL_REPRESENTATION,
            VR::US,
            dicom_value!(U16, [0]),
        ));
        obj.put(DataElement::new(
            tags::NUMBER_OF_FRAMES,
            VR::IS,
            dicom_value!(Str, "1"),
        ));
        // 2x2 RGB, 3 bytes/pixel, 12 bytes total
        obj.put(DataElement::new(
            tags::PIXEL_DATA,
            VR::OB,
            PrimitiveValue::U8((0..12).collect()),
        ));
        obj.with_meta(
            FileMetaTableBuilder::new()
                .media_storage_sop_class_uid("1.2.840.10008.5.1.4.1.1.7")
                .media_storage_sop_instance_uid("1.2.3.4")
                .transfer_syntax(uids::EXPLICIT_VR_LITTLE_ENDIAN),
        )
        .unwrap()
    }

    #[test]
    fn mask_path_rewrites_planar_configuration_to_standard() {
        let mut dataset = rgb_planar_dataset();
        let mask = MaskArea::full_frame(2, 2);
        transcode(&mut dataset, uids::EXPLICIT_VR_LITTLE_ENDIAN, Some(mask)).unwrap();

        let planar_configuration = dataset
            .element(tags::PLANAR_CONFIGURATION)
            .unwrap()
            .to_int::<u16>()
            .unwrap();
        assert_eq!(planar_configuration, 0);

        let photometric = dataset
            .element(tags::PHOTOMETRIC_INTERPRETATION)
            .unwrap()
            .string()
            .unwrap()
            .trim()
            .to_string();
        assert_eq!(photometric, "RGB");

        let bits_stored = dataset
            .element(tags::BITS_STORED)
            .unwrap()
            .to_int::<u16>()
            .unwrap();
        assert_eq!(bits_stored, 8);
    }

    #[test]
    fn transcode_not_needed_when_syntaxes_match_and_no_mask() {
        assert!(!needs_transcode(
            uids::EXPLICIT_VR_LITTLE_ENDIAN,
            uids::EXPLICIT_VR_LITTLE_ENDIAN,
            true,
            false
        ));
    }

    #[test]
    fn transcode_needed_when_encapsulated_and_syntaxes_differ() {
        assert!(needs_transcode(
            uids::JPEG_BASELINE8_BIT,
            uids::EXPLICIT_VR_LITTLE_ENDIAN,
            true,
            false
        ));
    }

    #[test]
    fn transcode_needed_when_mask_present_on_native_syntax() {
        assert!(needs_transcode(
            uids::EXPLICIT_VR_LITTLE_ENDIAN,
            uids::EXPLICIT_VR_LITTLE_ENDIAN,
            true,
            true
        ));
    }

    #[test]
    fn transcode_not_needed_without_pixel_data() {
        assert!(!needs_transcode(
            uids::JPEG_BASELINE8_BIT,
            uids::EXPLICIT_VR_LITTLE_ENDIAN,
            false,
            true
        ));
    }
}
