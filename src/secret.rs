//! Operator secret handling.
//!
//! # Security Guarantees
//!
//! - **Shred before release**: [`SecretBuffer`] overwrites its bytes with
//!   [`SHRED_PATTERN`] when [`SecretBuffer::shred`] is called and again when
//!   it is dropped, so no path frees the allocation with the secret intact
//! - **No accidental disclosure**: `Debug` never prints secret bytes
//!
//! The well-known secret is a public constant and is never shredded.

use crate::module::{SecretMode, HASH_LEN};
use std::fmt;
use zeroize::Zeroize;

/// Well-known operator secret: an all-zero digest.
pub const WELL_KNOWN_SECRET: [u8; HASH_LEN] = [0u8; HASH_LEN];

/// Byte every position of a shredded buffer holds.
pub const SHRED_PATTERN: u8 = 0x00;

/// Heap buffer holding an interactively entered secret.
pub struct SecretBuffer {
    bytes: Vec<u8>,
    shredded: bool,
}

impl SecretBuffer {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            shredded: false,
        }
    }

    /// Take ownership of entered text as native (UTF-8) bytes.
    pub fn from_native(text: String) -> Self {
        Self::new(text.into_bytes())
    }

    /// Encode entered text as UTF-16LE with a two-byte NUL terminator.
    ///
    /// The source text is zeroed before it is released.
    pub fn from_unicode(mut text: String) -> Self {
        let mut bytes = Vec::with_capacity((text.len() + 1) * 2);
        for unit in text.encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        bytes.extend_from_slice(&[0, 0]);
        text.zeroize();

        Self::new(bytes)
    }

    pub fn expose(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn is_shredded(&self) -> bool {
        self.shredded
    }

    /// Overwrite every byte with [`SHRED_PATTERN`], keeping the length.
    pub fn shred(&mut self) {
        self.bytes.as_mut_slice().zeroize();
        self.shredded = true;
    }
}

impl Drop for SecretBuffer {
    fn drop(&mut self) {
        // Vec::zeroize also clears spare capacity before truncating.
        self.bytes.zeroize();
    }
}

impl fmt::Debug for SecretBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretBuffer")
            .field("len", &self.bytes.len())
            .field("shredded", &self.shredded)
            .finish()
    }
}

/// The one operator secret of a run.
#[derive(Debug)]
pub enum Secret {
    /// Entered by the operator; shredded after installation.
    Interactive(SecretBuffer),
    /// [`WELL_KNOWN_SECRET`].
    WellKnown,
}

impl Secret {
    pub fn bytes(&self) -> &[u8] {
        match self {
            Secret::Interactive(buffer) => buffer.expose(),
            Secret::WellKnown => &WELL_KNOWN_SECRET,
        }
    }

    /// Mode the module should install these bytes with.
    pub fn mode(&self) -> SecretMode {
        match self {
            Secret::Interactive(_) => SecretMode::Plain,
            Secret::WellKnown => SecretMode::Digest,
        }
    }

    pub fn is_well_known(&self) -> bool {
        matches!(self, Secret::WellKnown)
    }

    /// Whether no operator-entered bytes remain in memory.
    ///
    /// Always true for the well-known secret, which holds nothing to shred.
    pub fn is_shredded(&self) -> bool {
        match self {
            Secret::Interactive(buffer) => buffer.is_shredded(),
            Secret::WellKnown => true,
        }
    }

    /// Shred an interactive secret; the well-known constant is left alone.
    pub fn shred(&mut self) {
        if let Secret::Interactive(buffer) = self {
            buffer.shred();
        }
    }
}
