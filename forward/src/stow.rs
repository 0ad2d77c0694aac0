//! Web-destination specifics (§4.H): single-file STOW-RS upload in place
//! of C-STORE, used for `DicomDestination`s configured with an HTTP(S)
//! base URL instead of an AE title/address pair.
//!
//! No STOW-RS client exists anywhere in the pack — the `web` crate here
//! is a WADO-RS/QIDO-RS *server*, not a client — so this module is
//! authored fresh, in the spirit of the fan-out/response-handling shape
//! `other_examples/9dbb357e_FNNDSC-oxidicom__src-cube_sender.rs.rs`'s
//! `CubePacsStorageClient::store` call site expects (one upload call
//! returning a typed response, failures reported through a `Snafu` error
//! rather than bubbling up a raw `reqwest::Error`), built on `reqwest`'s
//! blocking `multipart` API against the DICOMweb STOW-RS
//! `multipart/related; type="application/dicom"` wire format.

use dicom_dictionary_std::uids;
use reqwest::blocking::{multipart, Client};
use snafu::{ensure, ResultExt, Snafu};

use crate::writer::StowPayload;

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum StowError {
    /// failed to build STOW-RS payload
    Payload { source: crate::writer::WriterError },

    /// failed to send STOW-RS request to {url}
    Send { url: String, source: reqwest::Error },

    /// STOW-RS server at {url} rejected upload with status {status}
    Rejected { url: String, status: u16 },
}

pub type Result<T, E = StowError> = std::result::Result<T, E>;

/// One web destination: a STOW-RS base URL such as
/// `https://pacs.example.org/dicomweb`; `studies` is appended per the
/// DICOMweb single-instance-store resource.
#[derive(Debug, Clone)]
pub struct StowDestination {
    pub base_url: String,
}

impl StowDestination {
    fn studies_url(&self) -> String {
        format!("{}/studies", self.base_url.trim_end_matches('/'))
    }
}

/// §4.H's output transfer syntax substitution: defaults to the input
/// syntax, falling back to Explicit VR Little Endian for encodings a
/// STOW-RS receiver cannot be assumed to accept raw (Implicit VR Little
/// Endian, Explicit VR Big Endian) or that this crate cannot itself
/// produce (RLE Lossless, absent a native RLE writer).
pub fn web_output_tsuid(input_tsuid: &str) -> &str {
    match input_tsuid {
        uids::IMPLICIT_VR_LITTLE_ENDIAN
        | uids::EXPLICIT_VR_BIG_ENDIAN
        | uids::RLE_LOSSLESS => uids::EXPLICIT_VR_LITTLE_ENDIAN,
        other => other,
    }
}

pub struct StowClient {
    http: Client,
}

impl StowClient {
    pub fn new() -> Self {
        StowClient { http: Client::new() }
    }

    /// Upload one instance's payload to `destination` as a single-part
    /// STOW-RS multipart/related request, rebuilding the payload bytes
    /// fresh (`StowPayload::bytes` is idempotent) so a retry never reuses
    /// a consumed body.
    pub fn store(&self, destination: &StowDestination, payload: &StowPayload) -> Result<()> {
        let bytes = payload.bytes().context(PayloadSnafu)?;
        let url = destination.studies_url();

        let part = multipart::Part::bytes(bytes).mime_str("application/dicom").expect(
            "\"application/dicom\" is a valid mime type literal",
        );
        let form = multipart::Form::new().part("file", part);

        let response = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .context(SendSnafu { url: url.clone() })?;

        let status = response.status();
        ensure!(
            status.is_success(),
            RejectedSnafu {
                url,
                status: status.as_u16(),
            }
        );
        Ok(())
    }
}

impl Default for StowClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn implicit_vr_and_big_endian_and_rle_substitute_explicit_vr_le() {
        assert_eq!(
            web_output_tsuid(uids::IMPLICIT_VR_LITTLE_ENDIAN),
            uids::EXPLICIT_VR_LITTLE_ENDIAN
        );
        assert_eq!(
            web_output_tsuid(uids::EXPLICIT_VR_BIG_ENDIAN),
            uids::EXPLICIT_VR_LITTLE_ENDIAN
        );
        assert_eq!(
            web_output_tsuid(uids::RLE_LOSSLESS),
            uids::EXPLICIT_VR_LITTLE_ENDIAN
        );
    }

    #[test]
    fn other_syntaxes_pass_through_unchanged() {
        assert_eq!(
            web_output_tsuid(uids::JPEG_BASELINE8_BIT),
            uids::JPEG_BASELINE8_BIT
        );
    }

    #[test]
    fn studies_url_trims_trailing_slash() {
        let dest = StowDestination {
            base_url: "https://pacs.example.org/dicomweb/".to_string(),
        };
        assert_eq!(dest.studies_url(), "https://pacs.example.org/dicomweb/studies");
    }
}
