//! The frame extractor (§4.D): enumerates per-frame byte buffers from
//! native or encapsulated pixel data, and the `BytesWithImageDescriptor`
//! capability (§3, §9) that memoizes the expensive parts of that job.
//!
//! Grounded on `dicom-pixeldata`'s `decode_pixel_data_frame`
//! (`pixeldata/src/lib.rs`) for the native/single-fragment/RLE cases. The
//! JPEG SOI-marker scan has no counterpart anywhere in the pack and is
//! authored fresh, in the same `ensure!`-based error style as the rest of
//! this crate.

use std::sync::OnceLock;

use dicom_core::value::Value;
use dicom_dictionary_std::{tags, uids};
use dicom_object::mem::InMemDicomObject;
use dicom_object::FileDicomObject;
use snafu::{ensure, OptionExt, ResultExt, Snafu};

type Dataset = FileDicomObject<InMemDicomObject>;

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum FrameError {
    /// missing required image attribute `{name}`
    MissingAttribute { name: &'static str },

    /// frame index {frame} out of range ({frames} frames available)
    FrameOutOfRange { frame: u32, frames: u32 },

    /// pixel data is not present on this instance
    NoPixelData,

    /// cannot match fragments to frames: found {found} JPEG start markers for {declared} declared frames
    FragmentFrameMismatch { found: usize, declared: u32 },
}

pub type Result<T, E = FrameError> = std::result::Result<T, E>;

/// Image attributes needed to index frames and to re-encode them,
/// mirroring `dicom_pixeldata::DecodedPixelData`'s header fields but kept
/// independent of a full decode.
#[derive(Debug, Clone, Copy)]
pub struct ImageDescriptor {
    pub rows: u32,
    pub columns: u32,
    pub samples_per_pixel: u16,
    pub bits_allocated: u16,
    pub bits_stored: u16,
    pub photometric_interpretation: PhotometricInterpretation,
    pub number_of_frames: u32,
    pub planar_configuration: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhotometricInterpretation {
    Monochrome1,
    Monochrome2,
    PaletteColor,
    Rgb,
    YbrFull,
    YbrFull422,
    Other,
}

impl From<&str> for PhotometricInterpretation {
    fn from(s: &str) -> Self {
        match s.trim() {
            "MONOCHROME1" => PhotometricInterpretation::Monochrome1,
            "MONOCHROME2" => PhotometricInterpretation::Monochrome2,
            "PALETTE COLOR" => PhotometricInterpretation::PaletteColor,
            "RGB" => PhotometricInterpretation::Rgb,
            "YBR_FULL" => PhotometricInterpretation::YbrFull,
            "YBR_FULL_422" => PhotometricInterpretation::YbrFull422,
            _ => PhotometricInterpretation::Other,
        }
    }
}

impl ImageDescriptor {
    pub fn from_dataset(dataset: &Dataset) -> Result<Self> {
        let rows = dataset
            .element(tags::ROWS)
            .ok()
            .and_then(|e| e.to_int::<u16>().ok())
            .context(MissingAttributeSnafu { name: "Rows" })?;
        let columns = dataset
            .element(tags::COLUMNS)
            .ok()
            .and_then(|e| e.to_int::<u16>().ok())
            .context(MissingAttributeSnafu { name: "Columns" })?;
        let samples_per_pixel = dataset
            .element(tags::SAMPLES_PER_PIXEL)
            .ok()
            .and_then(|e| e.to_int::<u16>().ok())
            .context(MissingAttributeSnafu {
                name: "SamplesPerPixel",
            })?;
        let bits_allocated = dataset
            .element(tags::BITS_ALLOCATED)
            .ok()
            .and_then(|e| e.to_int::<u16>().ok())
            .context(MissingAttributeSnafu {
                name: "BitsAllocated",
            })?;
        let bits_stored = dataset
            .element(tags::BITS_STORED)
            .ok()
            .and_then(|e| e.to_int::<u16>().ok())
            .unwrap_or(bits_allocated);
        let photometric_interpretation = dataset
            .element(tags::PHOTOMETRIC_INTERPRETATION)
            .ok()
            .and_then(|e| e.to_str().ok().map(|s| s.into_owned()))
            .map(|s| PhotometricInterpretation::from(s.as_str()))
            .context(MissingAttributeSnafu {
                name: "PhotometricInterpretation",
            })?;
        let number_of_frames = dataset
            .element(tags::NUMBER_OF_FRAMES)
            .ok()
            .and_then(|e| e.to_int::<i32>().ok())
            .map(|n| n.max(1) as u32)
            .unwrap_or(1);
        let planar_configuration = dataset
            .element(tags::PLANAR_CONFIGURATION)
            .ok()
            .and_then(|e| e.to_int::<u16>().ok())
            .unwrap_or(0);

        Ok(ImageDescriptor {
            rows: rows as u32,
            columns: columns as u32,
            samples_per_pixel,
            bits_allocated,
            bits_stored,
            photometric_interpretation,
            number_of_frames,
            planar_configuration,
        })
    }

    /// Native pixel data frame length in bytes, per §4.D's
    /// `photometric × cols × rows × samples × bitsAllocated` rule.
    pub fn native_frame_length(&self) -> usize {
        let bytes_per_sample = ((self.bits_allocated + 7) / 8) as usize;
        self.rows as usize * self.columns as usize * self.samples_per_pixel as usize
            * bytes_per_sample
    }
}

/// The `BytesWithImageDescriptor` capability (§3, §9): a lazy accessor
/// yielding per-frame bytes, memoizing fragment-start position scans so
/// that repeated frame access does not re-scan the encapsulated stream.
pub trait FrameSource {
    fn image_descriptor(&self) -> &ImageDescriptor;
    fn transfer_syntax(&self) -> &str;
    fn bytes(&self, frame: u32) -> Result<Vec<u8>>;
    /// Palette LUT dataset, populated only with the descriptor/data tags
    /// (and segmented variants, when present), or `None` if the instance
    /// is not palette-color.
    fn palette_color_lookup_table(&self) -> Option<Dataset>;
}

enum PixelStorage<'a> {
    /// Contiguous native buffer.
    Native(&'a [u8]),
    /// One fragment per frame (single-frame encapsulated, or RLE
    /// Lossless multiframe).
    FragmentPerFrame(Vec<&'a [u8]>),
    /// JPEG-family multiframe: fragments must be matched to frames by
    /// scanning for SOI markers.
    JpegFragments(Vec<&'a [u8]>),
}

/// A `FrameSource` over an already-parsed dataset, memoizing its
/// JPEG fragment-start scan and native-frame boundaries on first access.
pub struct MemoizedFrameSource<'a> {
    descriptor: ImageDescriptor,
    tsuid: String,
    storage: PixelStorage<'a>,
    dataset: &'a Dataset,
    frame_starts: OnceLock<Vec<(usize, usize)>>,
}

impl<'a> MemoizedFrameSource<'a> {
    pub fn new(dataset: &'a Dataset, tsuid: &str) -> Result<Self> {
        let descriptor = ImageDescriptor::from_dataset(dataset)?;
        let pixel_data = dataset
            .element(tags::PIXEL_DATA)
            .ok()
            .context(NoPixelDataSnafu)?;

        let storage = match pixel_data.value() {
            Value::PixelSequence(seq) => {
                let fragments: Vec<&[u8]> = seq.fragments().iter().map(|f| f.as_slice()).collect();
                if fragments.len() == descriptor.number_of_frames as usize {
                    // one fragment per frame: single-frame encapsulated
                    // (one fragment total) or multi-frame RLE Lossless.
                    PixelStorage::FragmentPerFrame(fragments)
                } else {
                    // JPEG-family multiframe: frame boundaries are found
                    // by scanning fragments for SOI markers, not by
                    // counting fragments. Also covers the single-frame
                    // case where the fragment count after the basic
                    // offset table is greater than one.
                    PixelStorage::JpegFragments(fragments)
                }
            }
            Value::Primitive(p) => PixelStorage::Native(p.to_bytes_ref()),
            Value::Sequence(..) => return NoPixelDataSnafu.fail(),
        };

        Ok(MemoizedFrameSource {
            descriptor,
            tsuid: tsuid.to_string(),
            storage,
            dataset,
            frame_starts: OnceLock::new(),
        })
    }

    fn jpeg_frame_starts(&self, fragments: &[&[u8]]) -> Result<&Vec<(usize, usize)>> {
        self.frame_starts.get_or_try_init(|| jpeg_frame_starts(fragments))
    }
}

/// Scan fragments for JPEG SOI (Start Of Image, `0xFFD8`) markers,
/// recording the (fragment index, byte offset) of each match as a frame
/// start. Frames span from one detected start up to the next.
fn jpeg_frame_starts(fragments: &[&[u8]]) -> Result<Vec<(usize, usize)>> {
    let mut starts = Vec::new();
    for (idx, fragment) in fragments.iter().enumerate() {
        if fragment.len() >= 2 && fragment[0] == 0xFF && fragment[1] == 0xD8 {
            starts.push((idx, 0));
        }
    }
    Ok(starts)
}

impl<'a> FrameSource for MemoizedFrameSource<'a> {
    fn image_descriptor(&self) -> &ImageDescriptor {
        &self.descriptor
    }

    fn transfer_syntax(&self) -> &str {
        &self.tsuid
    }

    fn bytes(&self, frame: u32) -> Result<Vec<u8>> {
        ensure!(
            frame < self.descriptor.number_of_frames,
            FrameOutOfRangeSnafu {
                frame,
                frames: self.descriptor.number_of_frames
            }
        );

        match &self.storage {
            PixelStorage::Native(data) => {
                let len = self.descriptor.native_frame_length();
                let start = len * frame as usize;
                let end = start + len;
                ensure!(
                    end <= data.len(),
                    FrameOutOfRangeSnafu {
                        frame,
                        frames: self.descriptor.number_of_frames
                    }
                );
                Ok(data[start..end].to_vec())
            }
            PixelStorage::FragmentPerFrame(fragments) => {
                if fragments.len() == self.descriptor.number_of_frames as usize {
                    Ok(fragments[frame as usize].to_vec())
                } else {
                    // single-frame encapsulated: concatenate every
                    // fragment after the basic offset table.
                    Ok(fragments.concat())
                }
            }
            PixelStorage::JpegFragments(fragments) => {
                if self.descriptor.number_of_frames == 1 && fragments.len() != 1 {
                    return Ok(fragments.concat());
                }
                let starts = self.jpeg_frame_starts(fragments)?;
                ensure!(
                    starts.len() == self.descriptor.number_of_frames as usize,
                    FragmentFrameMismatchSnafu {
                        found: starts.len(),
                        declared: self.descriptor.number_of_frames,
                    }
                );
                let (frag_idx, _) = starts[frame as usize];
                let next_frag_idx = starts
                    .get(frame as usize + 1)
                    .map(|(idx, _)| *idx)
                    .unwrap_or(fragments.len());
                Ok(fragments[frag_idx..next_frag_idx].concat())
            }
        }
    }

    fn palette_color_lookup_table(&self) -> Option<Dataset> {
        if self.descriptor.photometric_interpretation != PhotometricInterpretation::PaletteColor {
            return None;
        }
        palette_lut_dataset(self.dataset)
    }
}

const PALETTE_DESCRIPTOR_DATA_TAGS: [(dicom_core::Tag, dicom_core::Tag); 3] = [
    (tags::RED_PALETTE_COLOR_LOOKUP_TABLE_DESCRIPTOR, tags::RED_PALETTE_COLOR_LOOKUP_TABLE_DATA),
    (tags::GREEN_PALETTE_COLOR_LOOKUP_TABLE_DESCRIPTOR, tags::GREEN_PALETTE_COLOR_LOOKUP_TABLE_DATA),
    (tags::BLUE_PALETTE_COLOR_LOOKUP_TABLE_DESCRIPTOR, tags::BLUE_PALETTE_COLOR_LOOKUP_TABLE_DATA),
];

const SEGMENTED_PALETTE_DATA_TAGS: [dicom_core::Tag; 3] = [
    tags::SEGMENTED_RED_PALETTE_COLOR_LOOKUP_TABLE_DATA,
    tags::SEGMENTED_GREEN_PALETTE_COLOR_LOOKUP_TABLE_DATA,
    tags::SEGMENTED_BLUE_PALETTE_COLOR_LOOKUP_TABLE_DATA,
];

/// Build a fresh dataset populated only with the six palette-LUT
/// descriptor/data tags, plus the three segmented-palette-LUT tags when
/// present (§4.D).
fn palette_lut_dataset(dataset: &Dataset) -> Option<Dataset> {
    let mut out = InMemDicomObject::new_empty();
    let mut any = false;
    for (descriptor_tag, data_tag) in PALETTE_DESCRIPTOR_DATA_TAGS {
        if let Ok(e) = dataset.element(descriptor_tag) {
            out.put(e.clone());
            any = true;
        }
        if let Ok(e) = dataset.element(data_tag) {
            out.put(e.clone());
            any = true;
        }
    }
    for tag in SEGMENTED_PALETTE_DATA_TAGS {
        if let Ok(e) = dataset.element(tag) {
            out.put(e.clone());
            any = true;
        }
    }
    if !any {
        return None;
    }
    Some(out.with_meta(dataset.meta().clone()).ok()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dicom_core::{dicom_value, DataElement, PrimitiveValue, VR};
    use dicom_object::{FileMetaTableBuilder, InMemDicomObject};

    fn native_dataset(frames: u32, frame_len: usize) -> Dataset {
        let mut obj = InMemDicomObject::new_empty();
        obj.put(DataElement::new(tags::ROWS, VR::US, dicom_value!(U16, [4])));
        obj.put(DataElement::new(tags::COLUMNS, VR::US, dicom_value!(U16, [4])));
        obj.put(DataElement::new(
            tags::SAMPLES_PER_PIXEL,
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
        obj.put(DataElement::new(
            tags::PHOTOMETRIC_INTERPRETATION,
            VR::CS,
            dicom_value!(Str, "MONOCHROME2"),
        ));
        obj.put(DataElement::new(
            tags::NUMBER_OF_FRAMES,
            VR::IS,
            dicom_value!(Str, frames.to_string()),
        ));
        let total = frame_len * frames as usize;
        obj.put(DataElement::new(
            tags::PIXEL_DATA,
            VR::OB,
            PrimitiveValue::U8((0..total as u32).map(|i| i as u8).collect()),
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
    fn native_frames_tile_contiguously() {
        let dataset = native_dataset(3, 16);
        let source = MemoizedFrameSource::new(&dataset, uids::EXPLICIT_VR_LITTLE_ENDIAN).unwrap();
        assert_eq!(source.image_descriptor().number_of_frames, 3);
        for i in 0..3u32 {
            let frame = source.bytes(i).unwrap();
            assert_eq!(frame.len(), 16);
            assert_eq!(frame[0], (i * 16) as u8);
        }
    }

    #[test]
    fn out_of_range_frame_fails() {
        let dataset = native_dataset(1, 16);
        let source = MemoizedFrameSource::new(&dataset, uids::EXPLICIT_VR_LITTLE_ENDIAN).unwrap();
        assert!(source.bytes(5).is_err());
    }

    #[test]
    fn jpeg_frame_starts_detects_soi_markers() {
        let fragments: Vec<&[u8]> = vec![&[0xFF, 0xD8, 1, 2], &[3, 4], &[0xFF, 0xD8, 5]];
        let starts = jpeg_frame_starts(&fragments).unwrap();
        assert_eq!(starts.len(), 2);
        assert_eq!(starts[0].0, 0);
        assert_eq!(starts[1].0, 2);
    }
}
