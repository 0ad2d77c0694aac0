//! Configuration (§6's `DicomDestination`/`WebDestination`): the
//! destinations list, each with its own editor pipeline and optional
//! mask area, loaded from a TOML file.
//!
//! `storescu`'s CLI flattens every option onto the command line because
//! it only ever talks to one destination per run; this engine's
//! multi-destination fan-out (§4.G) needs a list instead, so the
//! destinations move to a config file (`serde` + `toml`, already used
//! elsewhere in the workspace for other structured config) while the
//! per-run options `storescu/src/main.rs`'s `App` struct models —
//! calling AE title, max PDU length — stay as top-level fields shared by
//! every destination unless overridden.

use std::borrow::Cow;
use std::fs;
use std::path::Path;

use dicom_core::header::Tag;
use serde::Deserialize;
use snafu::{OptionExt, ResultExt, Snafu};

use crate::editor::{AttributeEditor, RemoveTagEditor, ReplaceStrEditor, SetStrEditor};
use crate::mask::MaskArea;

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum ConfigError {
    /// failed to read configuration file {path}
    Read {
        path: String,
        source: std::io::Error,
    },

    /// failed to parse configuration file {path}
    Parse {
        path: String,
        source: toml::de::Error,
    },

    /// invalid attribute tag {tag:?}, expected "GGGG,EEEE"
    #[snafu(display("invalid attribute tag {tag:?}, expected \"GGGG,EEEE\""))]
    InvalidTag { tag: String },
}

pub type Result<T, E = ConfigError> = std::result::Result<T, E>;

/// Top-level configuration: one engine-wide calling AE title/max PDU
/// length plus the list of destinations to fan out to.
#[derive(Debug, Deserialize)]
pub struct ForwardConfig {
    #[serde(default = "default_calling_ae_title")]
    pub calling_ae_title: String,
    #[serde(default = "default_max_pdu_length")]
    pub max_pdu_length: u32,
    pub destination: Vec<DestinationConfig>,
}

fn default_calling_ae_title() -> String {
    "FORWARD-SCU".to_string()
}

fn default_max_pdu_length() -> u32 {
    16384
}

impl ForwardConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).context(ReadSnafu {
            path: path.display().to_string(),
        })?;
        toml::from_str(&text).context(ParseSnafu {
            path: path.display().to_string(),
        })
    }
}

/// One destination entry: either a DICOM C-STORE peer or a STOW-RS web
/// endpoint, with its own editors and optional mask area.
#[derive(Debug, Deserialize)]
pub struct DestinationConfig {
    pub name: String,
    #[serde(flatten)]
    pub target: DestinationTarget,
    #[serde(default)]
    pub called_ae_title: Option<String>,
    #[serde(default)]
    pub editors: Vec<EditorConfig>,
    #[serde(default)]
    pub mask: Option<MaskConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum DestinationTarget {
    Dicom { addr: String },
    Web { base_url: String },
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct MaskConfig {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl From<MaskConfig> for MaskArea {
    fn from(value: MaskConfig) -> Self {
        MaskArea {
            x: value.x,
            y: value.y,
            width: value.width,
            height: value.height,
        }
    }
}

/// A single editor operation, deserialized from TOML and compiled into a
/// boxed [`AttributeEditor`] via [`EditorConfig::compile`].
#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case", tag = "op")]
pub enum EditorConfig {
    ReplaceStr { tag: String, value: String },
    SetStr { tag: String, value: String },
    RemoveTag { tag: String },
}

impl EditorConfig {
    pub fn compile(&self) -> Result<Box<dyn AttributeEditor>> {
        match self {
            EditorConfig::ReplaceStr { tag, value } => {
                let selector = parse_tag(tag)?.into();
                Ok(Box::new(ReplaceStrEditor {
                    selector,
                    value: Cow::Owned(value.clone()),
                }))
            }
            EditorConfig::SetStr { tag, value } => {
                let selector = parse_tag(tag)?.into();
                Ok(Box::new(SetStrEditor {
                    selector,
                    value: Cow::Owned(value.clone()),
                }))
            }
            EditorConfig::RemoveTag { tag } => {
                let selector = parse_tag(tag)?.into();
                Ok(Box::new(RemoveTagEditor { selector }))
            }
        }
    }
}

fn parse_tag(text: &str) -> Result<Tag> {
    let (group, element) = text.split_once(',').context(InvalidTagSnafu { tag: text })?;
    let group = u16::from_str_radix(group.trim(), 16)
        .ok()
        .context(InvalidTagSnafu { tag: text })?;
    let element = u16::from_str_radix(element.trim(), 16)
        .ok()
        .context(InvalidTagSnafu { tag: text })?;
    Ok(Tag(group, element))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_tag() {
        let tag = parse_tag("0010,0020").unwrap();
        assert_eq!(tag, Tag(0x0010, 0x0020));
    }

    #[test]
    fn rejects_malformed_tag() {
        assert!(parse_tag("not-a-tag").is_err());
    }

    #[test]
    fn deserializes_dicom_and_web_destinations() {
        let toml = r#"
            calling_ae_title = "FWD-SCU"

            [[destination]]
            name = "peer-a"
            kind = "dicom"
            addr = "127.0.0.1:11112"

            [[destination]]
            name = "peer-b"
            kind = "web"
            base_url = "https://pacs.example.org/dicomweb"

            [[destination.editors]]
            op = "set_str"
            tag = "0010,0020"
            value = "ANON"
        "#;
        let config: ForwardConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.calling_ae_title, "FWD-SCU");
        assert_eq!(config.destination.len(), 2);
        match &config.destination[0].target {
            DestinationTarget::Dicom { addr } => assert_eq!(addr, "127.0.0.1:11112"),
            _ => panic!("expected dicom destination"),
        }
    }
}
