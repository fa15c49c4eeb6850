//! Key container formats and algorithms

use std::fmt;

use serde::Serialize;
use zeroize::Zeroizing;

/// Textual container a private key arrived in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeyFormat {
    OpenSsh,
    PemRsa,
    PemEc,
    PemPkcs8,
    PemPkcs8Encrypted,
    Unrecognized,
}

impl KeyFormat {
    /// Formats recognized from the first line, with their marker label
    pub(crate) const MARKERS: [(KeyFormat, &'static str); 5] = [
        (KeyFormat::OpenSsh, "OPENSSH PRIVATE KEY"),
        (KeyFormat::PemRsa, "RSA PRIVATE KEY"),
        (KeyFormat::PemEc, "EC PRIVATE KEY"),
        (KeyFormat::PemPkcs8, "PRIVATE KEY"),
        (KeyFormat::PemPkcs8Encrypted, "ENCRYPTED PRIVATE KEY"),
    ];

    pub fn label(&self) -> Option<&'static str> {
        Self::MARKERS
            .iter()
            .find(|(format, _)| format == self)
            .map(|(_, label)| *label)
    }

    /// `-----BEGIN {label}-----`
    pub fn begin_marker(&self) -> Option<String> {
        self.label().map(|label| format!("-----BEGIN {}-----", label))
    }

    /// `-----END {label}-----`
    pub fn end_marker(&self) -> Option<String> {
        self.label().map(|label| format!("-----END {}-----", label))
    }
}

/// Public key algorithm of a private key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeyAlgorithm {
    Rsa,
    Ed25519,
    EcdsaP256,
    EcdsaP384,
    EcdsaP521,
    Unknown,
}

impl KeyAlgorithm {
    /// Algorithm names searched for in an OpenSSH payload, in priority
    /// order. Ed25519 goes first so it is never shadowed by `ssh-rsa`.
    pub(crate) const SSH_NAMES: [(KeyAlgorithm, &'static str); 5] = [
        (KeyAlgorithm::Ed25519, "ssh-ed25519"),
        (KeyAlgorithm::Rsa, "ssh-rsa"),
        (KeyAlgorithm::EcdsaP256, "ecdsa-sha2-nistp256"),
        (KeyAlgorithm::EcdsaP384, "ecdsa-sha2-nistp384"),
        (KeyAlgorithm::EcdsaP521, "ecdsa-sha2-nistp521"),
    ];

    /// SSH wire name, `None` for unknown keys
    pub fn ssh_name(&self) -> Option<&'static str> {
        Self::SSH_NAMES
            .iter()
            .find(|(algorithm, _)| algorithm == self)
            .map(|(_, name)| *name)
    }
}

impl fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.ssh_name().unwrap_or("unknown"))
    }
}

/// Result of classifying and repairing a pasted key.
///
/// Transient: the vault stores `normalized_text`, never this record.
#[derive(Clone)]
pub struct KeyMaterial {
    pub format: KeyFormat,
    pub algorithm: KeyAlgorithm,
    /// Repaired text, ready for storage and for the SSH library
    pub normalized_text: Zeroizing<String>,
    /// Key needs a passphrase before it can be used
    pub encrypted: bool,
    /// First-character truncation was detected and repaired
    pub recovered: bool,
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("format", &self.format)
            .field("algorithm", &self.algorithm)
            .field("normalized_text", &format_args!("<{} bytes>", self.normalized_text.len()))
            .field("encrypted", &self.encrypted)
            .field("recovered", &self.recovered)
            .finish()
    }
}
