//! Association acceptor module
use std::{
    borrow::Cow,
    net::{TcpStream, ToSocketAddrs},
};

use crate::pdu::{
    reader::read_pdu, writer::write_pdu, AssociationRJResult, AssociationRJSource, Pdu,
    PresentationContextProposed, PresentationContextResultReason,
};
use snafu::{ensure, OptionExt, ResultExt, Snafu};

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    /// missing abstract syntax to begin negotiation
    MissingAbstractSyntax,

    /// could not connect to server
    Connect { source: std::io::Error },

    /// failed to send association request
    SendRequest { source: crate::pdu::writer::Error },

    /// failed to receive association response
    ReceiveResponse { source: crate::pdu::reader::Error },

    #[snafu(display("unexpected response from server `{:?}`", pdu))]
    #[non_exhaustive]
    UnexpectedResponse {
        /// the PDU obtained from the server
        pdu: Pdu,
    },

    #[snafu(display("unknown response from server `{:?}`", pdu))]
    #[non_exhaustive]
    UnknownResponse {
        /// the PDU obtained from the server, of variant Unknown
        pdu: Pdu,
    },

    #[snafu(display("protocol version mismatch: expected {}, got {}", expected, got))]
    ProtocolVersionMismatch { expected: u16, got: u16 },

    /// the association was rejected by the server
    Rejected {
        association_result: AssociationRJResult,
        association_source: AssociationRJSource,
    },

    /// no presentation contexts accepted by the server
    NoAcceptedPresentationContexts,

    /// failed to send PDU message
    #[non_exhaustive]
    Send { source: crate::pdu::writer::Error },

    /// failed to receive PDU message
    #[non_exhaustive]
    Receive { source: crate::pdu::reader::Error },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A DICOM association builder for client node.
/// The final outcome is a [`ClientAssociation`].
///
/// This is the standard way of requesting and establishing
/// an association with another DICOM node,
/// that one usually taking the role of a service class provider (SCP).
///
/// # Example
///
/// ```no_run
/// # use dicom_ul::association::client::ClientAssociationOptions;
///
/// # fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let association = ClientAssociationOptions::new()
///    .with_abstract_syntax("1.2.840.10008.1.1")
///    .with_transfer_syntax("1.2.840.10008.1.2.1")
///    .establish("129.168.0.5:104")?;
/// # Ok(())
/// # }
/// ```
///
/// The SCU will admit by default the transfer syntaxes
/// _Implicit VR Little Endian_
/// and _Explicit VR Little Endian_.
/// Other transfer syntaxes can be requested in the association
/// via the method `with_transfer_syntax`.
///
#[derive(Debug, Clone)]
pub struct ClientAssociationOptions {
    /// the calling AE title
    calling_ae_title: Cow<'static, str>,
    /// the called AE title
    called_ae_title: Cow<'static, str>,
    /// the requested application context name
    application_context_name: Cow<'static, str>,
    /// the list of requested abstract syntaxes
    abstract_syntax_uids: Vec<Cow<'static, str>>,
    /// the list of requested transfer syntaxes
    transfer_syntax_uids: Vec<Cow<'static, str>>,
    /// per-abstract-syntax presentation context requests, each carrying its
    /// own candidate transfer syntaxes; takes precedence over
    /// `abstract_syntax_uids`/`transfer_syntax_uids` when non-empty, so that
    /// a single association can propose several unrelated (abstract syntax,
    /// transfer syntax candidates) pairs in one negotiation round.
    presentation_context_requests: Vec<(Cow<'static, str>, Vec<Cow<'static, str>>)>,
    /// the expected protocol version
    protocol_version: u16,
    /// the maximum PDU length
    max_pdu_length: u32,
}

impl Default for ClientAssociationOptions {
    fn default() -> Self {
        ClientAssociationOptions {
            /// the calling AE title
            calling_ae_title: "THIS-SCU".into(),
            /// the called AE title
            called_ae_title: "ANY-SCP".into(),
            /// the requested application context name
            application_context_name: "1.2.840.10008.3.1.1.1".into(),
            /// the list of requested abstract syntaxes
            abstract_syntax_uids: Vec::new(),
            /// the application context name
            transfer_syntax_uids: Vec::new(),
            presentation_context_requests: Vec::new(),
            protocol_version: 1,
            max_pdu_length: crate::pdu::reader::DEFAULT_MAX_PDU,
        }
    }
}

impl ClientAssociationOptions {
    /// Create a new set of options for establishing an association.
    pub fn new() -> Self {
        Self::default()
    }

    /// Define the calling application entity title for the association,
    /// which refers to this DICOM node.
    ///
    /// The default is `THIS-SCU`.
    pub fn calling_ae_title<T>(mut self, calling_ae_title: T) -> Self
    where
        T: Into<Cow<'static, str>>,
    {
        self.calling_ae_title = calling_ae_title.into();
        self
    }

    /// Define the called application entity title for the association,
    /// which refers to the target DICOM node.
    ///
    /// The default is `ANY-SCP`.
    pub fn called_ae_title<T>(mut self, called_ae_title: T) -> Self
    where
        T: Into<Cow<'static, str>>,
    {
        self.called_ae_title = called_ae_title.into();
        self
    }

    /// Include this abstract syntax
    /// in the list of proposed presentation contexts.
    pub fn with_abstract_syntax<T>(mut self, abstract_syntax_uid: T) -> Self
    where
        T: Into<Cow<'static, str>>,
    {
        self.abstract_syntax_uids.push(abstract_syntax_uid.into());
        self
    }

    /// Include this transfer syntax in each proposed presentation context.
    pub fn with_transfer_syntax<T>(mut self, transfer_syntax_uid: T) -> Self
    where
        T: Into<Cow<'static, str>>,
    {
        self.transfer_syntax_uids.push(transfer_syntax_uid.into());
        self
    }

    /// Propose a presentation context for `abstract_syntax_uid` carrying its
    /// own list of candidate transfer syntaxes, independent of any other
    /// abstract syntax proposed on the same association. Unlike
    /// `with_abstract_syntax`/`with_transfer_syntax` (which share one
    /// transfer syntax list across every abstract syntax), contexts added
    /// this way keep their own candidates, and all of them are kept around
    /// after negotiation rather than just the first one accepted.
    pub fn with_presentation_context<T, U>(
        mut self,
        abstract_syntax_uid: T,
        transfer_syntax_uids: Vec<U>,
    ) -> Self
    where
        T: Into<Cow<'static, str>>,
        U: Into<Cow<'static, str>>,
    {
        self.presentation_context_requests.push((
            abstract_syntax_uid.into(),
            transfer_syntax_uids.into_iter().map(Into::into).collect(),
        ));
        self
    }

    /// Override the maximum expected PDU length.
    pub fn max_pdu_length(mut self, value: u32) -> Self {
        self.max_pdu_length = value;
        self
    }

    /// Initiate the TCP connection and negotiate the
    pub fn establish<A: ToSocketAddrs>(self, address: A) -> Result<ClientAssociation> {
        let ClientAssociationOptions {
            calling_ae_title,
            called_ae_title,
            application_context_name,
            abstract_syntax_uids,
            mut transfer_syntax_uids,
            presentation_context_requests,
            protocol_version,
            max_pdu_length,
        } = self;

        let presentation_contexts: Vec<_> = if !presentation_context_requests.is_empty() {
            presentation_context_requests
                .into_iter()
                .enumerate()
                .map(|(i, (abstract_syntax, transfer_syntaxes))| PresentationContextProposed {
                    id: (i + 1) as u8,
                    abstract_syntax: abstract_syntax.to_string(),
                    transfer_syntaxes: transfer_syntaxes.iter().map(|uid| uid.to_string()).collect(),
                })
                .collect()
        } else {
            // fail if no abstract syntaxes were provided: they represent
            // intent, should not be omitted by the user
            ensure!(!abstract_syntax_uids.is_empty(), MissingAbstractSyntax);

            // provide default transfer syntaxes
            if transfer_syntax_uids.is_empty() {
                // Explicit VR Little Endian
                transfer_syntax_uids.push("1.2.840.10008.1.2.1".into());
                // Implicit VR Little Endian
                transfer_syntax_uids.push("1.2.840.10008.1.2".into());
            }

            abstract_syntax_uids
                .into_iter()
                .enumerate()
                .map(|(i, abstract_syntax)| PresentationContextProposed {
                    id: (i + 1) as u8,
                    abstract_syntax: abstract_syntax.to_string(),
                    transfer_syntaxes: transfer_syntax_uids
                        .iter()
                        .map(|uid| uid.to_string())
                        .collect(),
                })
                .collect()
        };
        let msg = Pdu::AssociationRQ {
            protocol_version,
            calling_ae_title: calling_ae_title.to_string(),
            called_ae_title: called_ae_title.to_string(),
            application_context_name: application_context_name.to_string(),
            presentation_contexts: presentation_contexts.clone(),
            user_variables: vec![],
        };

        let mut socket = std::net::TcpStream::connect(address).context(Connect)?;

        // send request
        write_pdu(&mut socket, &msg).context(SendRequest)?;

        // receive response
        let msg = read_pdu(&mut socket, max_pdu_length, true).context(ReceiveResponse)?;

        match msg {
            Pdu::AssociationAC {
                protocol_version: protocol_version_scp,
                application_context_name: _,
                presentation_contexts: presentation_contexts_scp,
                user_variables: _,
            } => {
                ensure!(
                    protocol_version == protocol_version_scp,
                    ProtocolVersionMismatch {
                        expected: protocol_version,
                        got: protocol_version_scp,
                    }
                );

                // keep every accepted context, not just the first: a single
                // association may carry several unrelated abstract syntaxes
                // (e.g. one per SOP Class forwarded to the same peer).
                let accepted: Vec<_> = presentation_contexts_scp
                    .into_iter()
                    .filter(|c| c.reason == PresentationContextResultReason::Acceptance)
                    .collect();
                ensure!(!accepted.is_empty(), NoAcceptedPresentationContexts);

                let proposed: Vec<(u8, String)> = presentation_contexts
                    .iter()
                    .map(|pc| (pc.id, pc.abstract_syntax.clone()))
                    .collect();

                Ok(ClientAssociation {
                    accepted,
                    proposed,
                    max_pdu_length,
                    socket,
                })
            }
            Pdu::AssociationRJ { result, source } => Rejected {
                association_result: result,
                association_source: source,
            }
            .fail(),
            pdu @ Pdu::AbortRQ { .. }
            | pdu @ Pdu::ReleaseRQ { .. }
            | pdu @ Pdu::AssociationRQ { .. }
            | pdu @ Pdu::PData { .. }
            | pdu @ Pdu::ReleaseRP { .. } => UnexpectedResponse { pdu }.fail(),
            pdu @ Pdu::Unknown { .. } => UnknownResponse { pdu }.fail(),
        }
    }
}

/// A DICOM upper level association from the perspective
/// of an association requester.
#[derive(Debug)]
pub struct ClientAssociation {
    /// Every presentation context the acceptor agreed to, in the order
    /// returned by the A-ASSOCIATE-AC.
    accepted: Vec<crate::pdu::PresentationContextResult>,
    /// The abstract syntax this requester proposed for each context id,
    /// since the A-ASSOCIATE-AC itself does not repeat it.
    proposed: Vec<(u8, String)>,
    /// The maximum PDU length
    max_pdu_length: u32,
    /// The TCP stream to the other DICOM node
    socket: TcpStream,
}

impl ClientAssociation {
    /// Retrieve the identifier of the first negotiated presentation context.
    pub fn presentation_context_id(&self) -> u8 {
        self.accepted[0].id
    }

    /// Retrieve the abstract syntax UID proposed for the first negotiated
    /// presentation context.
    pub fn abstract_syntax_uid(&self) -> &str {
        self.proposed
            .iter()
            .find(|(id, _)| *id == self.accepted[0].id)
            .map(|(_, uid)| uid.as_str())
            .unwrap_or_default()
    }

    /// Retrieve the transfer syntax UID negotiated for the first accepted
    /// presentation context.
    pub fn transfer_syntax_uid(&self) -> &str {
        &self.accepted[0].transfer_syntax
    }

    /// Every presentation context the acceptor agreed to.
    pub fn presentation_contexts(&self) -> &[crate::pdu::PresentationContextResult] {
        &self.accepted
    }

    /// The abstract syntax UID this requester proposed for `pcid`, if any.
    pub fn abstract_syntax_for(&self, pcid: u8) -> Option<&str> {
        self.proposed
            .iter()
            .find(|(id, _)| *id == pcid)
            .map(|(_, uid)| uid.as_str())
    }

    /// Find the id of an accepted presentation context whose proposed
    /// abstract syntax is `abstract_syntax_uid` and whose negotiated
    /// transfer syntax is `transfer_syntax_uid`.
    pub fn pcid_for(&self, abstract_syntax_uid: &str, transfer_syntax_uid: &str) -> Option<u8> {
        self.accepted
            .iter()
            .find(|pc| {
                pc.transfer_syntax == transfer_syntax_uid
                    && self.abstract_syntax_for(pc.id) == Some(abstract_syntax_uid)
            })
            .map(|pc| pc.id)
    }

    /// Whether `pcid` was accepted with transfer syntax `transfer_syntax_uid`.
    pub fn accepts(&self, pcid: u8, transfer_syntax_uid: &str) -> bool {
        self.accepted
            .iter()
            .any(|pc| pc.id == pcid && pc.transfer_syntax == transfer_syntax_uid)
    }

    /// Send a PDU message to the other intervenient.
    pub fn send(&mut self, msg: &Pdu) -> Result<()> {
        write_pdu(&mut self.socket, &msg).context(Send)
    }

    /// Read a PDU message from the other intervenient.
    pub fn receive(&mut self) -> Result<Pdu> {
        read_pdu(&mut self.socket, self.max_pdu_length, true).context(Receive)
    }

    /// Gracefully release the association.
    pub fn release(&mut self) -> Result<()> {
        write_pdu(&mut self.socket, &Pdu::ReleaseRQ).context(Send)?;

        let pdu = read_pdu(&mut self.socket, self.max_pdu_length, true).context(Receive)?;

        match pdu {
            Pdu::ReleaseRP => {}
            pdu @ Pdu::AbortRQ { .. }
            | pdu @ Pdu::AssociationAC { .. }
            | pdu @ Pdu::AssociationRJ { .. }
            | pdu @ Pdu::AssociationRQ { .. }
            | pdu @ Pdu::PData { .. }
            | pdu @ Pdu::ReleaseRQ { .. } => return UnexpectedResponse { pdu }.fail(),
            pdu @ Pdu::Unknown { .. } => return UnknownResponse { pdu }.fail(),
        }

        let _ = self.socket.shutdown(std::net::Shutdown::Both);
        Ok(())
    }

    /// Abruptly terminate the association without waiting for a reply,
    /// for use when the peer is misbehaving rather than on the happy path.
    pub fn abort(&mut self) -> Result<()> {
        write_pdu(
            &mut self.socket,
            &Pdu::AbortRQ {
                source: crate::pdu::AbortRQSource::ServiceUser,
            },
        )
        .context(Send)?;
        let _ = self.socket.shutdown(std::net::Shutdown::Both);
        Ok(())
    }
}

impl Drop for ClientAssociation {
    fn drop(&mut self) {
        let _ = self.release();
    }
}