//! # Wire Codec
//!
//! Word-oriented encoding of the request commands carried inside the payment
//! asset's transfer notification. The broker never parses the request
//! payload itself; this codec only validates the envelope shape so that a
//! short or boundary-length notification cannot cause misaligned decoding
//! downstream.
//!
//! ## Layout
//!
//! ```text
//! selector (4 bytes)
//! word 0: sender            (12 zero bytes ++ 20-byte address)
//! word 1: payment           (16 zero bytes ++ u128 big-endian)
//! word 2: service id        (32 bytes)
//! word 3: callback address  (12 zero bytes ++ 20-byte address)
//! word 4: callback selector (4 bytes ++ 28 zero bytes)
//! word 5: nonce             (24 zero bytes ++ u64 big-endian)
//! word 6: data version      (24 zero bytes ++ u64 big-endian, <= 255)
//! tail:   either no words (no payload), or a length word followed by
//!         exactly ceil(len / 32) padded payload words. A single tail word
//!         is degenerate and rejected.
//! ```
//!
//! Fixed-width fields must be canonically padded with zero bytes; non-zero
//! padding is rejected rather than silently truncated.

use crate::domain::value_objects::{DataVersion, Nonce, ServiceId};
use crate::errors::WireError;
use broker_types::{Address, Bytes, Hash, Payment, Selector};

/// One word, in bytes.
pub const WORD: usize = 32;

/// Fixed head words in every request command.
pub const HEAD_WORDS: usize = 7;

/// Minimum length of a request command: selector plus the fixed head.
pub const MIN_COMMAND_LEN: usize = 4 + HEAD_WORDS * WORD;

/// Request entry-point selectors.
pub mod selectors {
    use broker_types::Selector;

    /// `oracle_request`: id derived from `(sender, nonce)`.
    pub const ORACLE_REQUEST: Selector = Selector::new([0x52, 0x09, 0x7d, 0x7b]);

    /// `operator_request`: id derived from the full request tuple.
    pub const OPERATOR_REQUEST: Selector = Selector::new([0x8e, 0x3d, 0x1a, 0x42]);
}

/// Which request entry point a command targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestEntry {
    /// Id from `(sender, nonce)`.
    Oracle,
    /// Id from the full request tuple.
    Operator,
}

/// A decoded request-intake command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestCommand {
    /// Entry point the selector named.
    pub entry: RequestEntry,
    /// Claimed requester (validated against the authenticated sender).
    pub sender: Address,
    /// Claimed payment (validated against the transferred amount).
    pub payment: Payment,
    /// Off-chain service identifier, uninterpreted.
    pub service_id: ServiceId,
    /// Response delivery target.
    pub callback_address: Address,
    /// Response delivery selector.
    pub callback_selector: Selector,
    /// Requester-side nonce.
    pub nonce: Nonce,
    /// Payload interpretation tag.
    pub data_version: DataVersion,
    /// Opaque request parameters.
    pub payload: Bytes,
}

impl RequestCommand {
    /// Decodes and shape-validates a request command.
    pub fn decode(data: &[u8]) -> Result<Self, WireError> {
        if data.len() < MIN_COMMAND_LEN {
            return Err(WireError::TooShort {
                len: data.len(),
                min: MIN_COMMAND_LEN,
            });
        }
        let selector = Selector::new([data[0], data[1], data[2], data[3]]);
        let entry = match selector {
            s if s == selectors::ORACLE_REQUEST => RequestEntry::Oracle,
            s if s == selectors::OPERATOR_REQUEST => RequestEntry::Operator,
            other => return Err(WireError::UnknownSelector(other)),
        };

        let body = &data[4..];
        if body.len() % WORD != 0 {
            return Err(WireError::Misaligned { len: body.len() });
        }

        let sender = address_word(word(body, 0), "sender")?;
        let payment = payment_word(word(body, 1), "payment")?;
        let service_id = ServiceId::new(hash_word(word(body, 2)));
        let callback_address = address_word(word(body, 3), "callback address")?;
        let callback_selector = selector_word(word(body, 4), "callback selector")?;
        let nonce = u64_word(word(body, 5), "nonce")?;
        let raw_version = u64_word(word(body, 6), "data version")?;
        let data_version =
            DataVersion::from_u64(raw_version).ok_or(WireError::DataVersionOverflow(raw_version))?;

        let payload = decode_tail(&body[HEAD_WORDS * WORD..])?;

        Ok(Self {
            entry,
            sender,
            payment,
            service_id,
            callback_address,
            callback_selector,
            nonce,
            data_version,
            payload,
        })
    }

    /// Encodes this command for a transfer notification.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let selector = match self.entry {
            RequestEntry::Oracle => selectors::ORACLE_REQUEST,
            RequestEntry::Operator => selectors::OPERATOR_REQUEST,
        };
        let mut out = Vec::with_capacity(MIN_COMMAND_LEN + tail_len(self.payload.len()));
        out.extend_from_slice(selector.as_bytes());
        push_address(&mut out, self.sender);
        push_payment(&mut out, self.payment);
        out.extend_from_slice(self.service_id.as_bytes());
        push_address(&mut out, self.callback_address);
        push_selector(&mut out, self.callback_selector);
        push_u64(&mut out, self.nonce);
        push_u64(&mut out, u64::from(self.data_version.get()));
        encode_tail(&mut out, self.payload.as_slice());
        out
    }
}

// =============================================================================
// WORD HELPERS
// =============================================================================

fn word(body: &[u8], index: usize) -> &[u8] {
    &body[index * WORD..(index + 1) * WORD]
}

fn hash_word(word: &[u8]) -> Hash {
    // Callers pass exactly one word.
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(word);
    Hash::new(bytes)
}

fn address_word(word: &[u8], field: &'static str) -> Result<Address, WireError> {
    if word[..12].iter().any(|&b| b != 0) {
        return Err(WireError::NonCanonicalWord { field });
    }
    // Length is fixed by construction.
    Ok(Address::from_slice(&word[12..]).unwrap_or(Address::ZERO))
}

fn payment_word(word: &[u8], field: &'static str) -> Result<Payment, WireError> {
    if word[..16].iter().any(|&b| b != 0) {
        return Err(WireError::NonCanonicalWord { field });
    }
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&word[16..]);
    Ok(Payment::from_be_bytes(bytes))
}

fn selector_word(word: &[u8], field: &'static str) -> Result<Selector, WireError> {
    if word[4..].iter().any(|&b| b != 0) {
        return Err(WireError::NonCanonicalWord { field });
    }
    Ok(Selector::new([word[0], word[1], word[2], word[3]]))
}

fn u64_word(word: &[u8], field: &'static str) -> Result<u64, WireError> {
    if word[..24].iter().any(|&b| b != 0) {
        return Err(WireError::NonCanonicalWord { field });
    }
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&word[24..]);
    Ok(u64::from_be_bytes(bytes))
}

fn decode_tail(tail: &[u8]) -> Result<Bytes, WireError> {
    let words = tail.len() / WORD;
    match words {
        // No payload at all.
        0 => Ok(Bytes::new()),
        // A lone length word (or a lone data word) is a calldata-shape
        // attack surface: neither "no payload" nor a complete payload.
        1 => Err(WireError::DegenerateTail),
        _ => {
            let declared = u64_word(word(tail, 0), "payload length")? as usize;
            let expected_words = declared.div_ceil(WORD);
            if expected_words == 0 || expected_words != words - 1 {
                return Err(WireError::PayloadLengthMismatch { declared, words });
            }
            Ok(Bytes::from_slice(&tail[WORD..WORD + declared]))
        }
    }
}

fn tail_len(payload_len: usize) -> usize {
    if payload_len == 0 {
        0
    } else {
        WORD + payload_len.div_ceil(WORD) * WORD
    }
}

fn encode_tail(out: &mut Vec<u8>, payload: &[u8]) {
    if payload.is_empty() {
        return;
    }
    push_u64(out, payload.len() as u64);
    out.extend_from_slice(payload);
    let pad = payload.len().div_ceil(WORD) * WORD - payload.len();
    out.extend(std::iter::repeat(0u8).take(pad));
}

fn push_address(out: &mut Vec<u8>, addr: Address) {
    out.extend_from_slice(&[0u8; 12]);
    out.extend_from_slice(addr.as_bytes());
}

fn push_payment(out: &mut Vec<u8>, payment: Payment) {
    out.extend_from_slice(&[0u8; 16]);
    out.extend_from_slice(&payment.to_be_bytes());
}

fn push_selector(out: &mut Vec<u8>, selector: Selector) {
    out.extend_from_slice(selector.as_bytes());
    out.extend_from_slice(&[0u8; 28]);
}

fn push_u64(out: &mut Vec<u8>, value: u64) {
    out.extend_from_slice(&[0u8; 24]);
    out.extend_from_slice(&value.to_be_bytes());
}

// =============================================================================
// TESTS
// =============================================================================
