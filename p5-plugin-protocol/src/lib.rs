// SPDX-License-Identifier: Apache-2.0
//! Wire message shapes and framing for the p5 plugin host's subprocess RPC.
//!
//! This crate exists so the message shapes in [`messages`] have exactly one
//! definition, shared between the host (`p5-plugin-host`) and any subprocess
//! plugin implementation, the same way `hipcheck-common` factors the gRPC
//! message types out of Hipcheck's main binary crate. It does not provide a
//! plugin-authoring SDK: a plugin author still needs to implement the
//! handshake and dispatch loop themselves, this crate only fixes the shapes.

pub mod framing;
pub mod handshake;
pub mod messages;

pub use framing::{read_message, write_message, FramingError};
pub use handshake::{perform_handshake, HandshakeError};
pub use messages::{
    AuthenticateRequest, AuthenticateResponse, DispenseCapabilityResponse,
    GetImportSuggestionsRequest, GetImportSuggestionsResponse, GetSupportedOpenTypesResponse,
    Hello, HelloAck, ImportSuggestionWire, OpenActionWire, OpenResourceRequest,
    OpenResourceResponse, Request, Response, PROTOCOL_VERSION,
};
