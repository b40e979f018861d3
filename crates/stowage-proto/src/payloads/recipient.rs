//! Recipient payload.

use serde::{Deserialize, Serialize};

/// A recipient known to the account: the account owner, a contact, or a
/// group conversation partner.
///
/// Identity is the embedded `service_id`, never stream position or a local
/// row id. Chats and messages reference recipients by this stable id, so
/// recipient frames must precede any frame that depends on them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    /// Stable service identifier. The frame's identity.
    pub service_id: String,

    /// E.164 phone number, if known.
    pub e164: Option<String>,

    /// Profile given name, if shared.
    pub given_name: Option<String>,

    /// Profile family name, if shared.
    pub family_name: Option<String>,

    /// Whether this recipient is the account owner. The exporter writes the
    /// self recipient before all others to stabilize downstream addressing.
    pub is_self: bool,

    /// Whether the recipient is currently registered.
    pub registered: bool,
}
