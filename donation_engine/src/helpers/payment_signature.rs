//! # Gateway payment signatures
//!
//! When a donor completes a payment, the gateway hands the client three values: the order id it issued, the payment
//! id it assigned, and a signature over both. The client relays these to us, so we cannot trust any of them until the
//! signature checks out. Only the gateway and this server know the shared secret, so a valid signature proves that
//! the gateway really did see this payment against this order.
//!
//! ## Message format
//!
//! ```text
//!    {order_id}|{payment_id}
//! ```
//!
//! The signature is the lowercase hex encoding of `HMAC-SHA256(secret, message)`.
//!
//! Comparison is always constant-time. Malformed hex is just an invalid signature, never an error.
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub fn payment_signature_message(order_id: &str, payment_id: &str) -> String {
    format!("{order_id}|{payment_id}")
}

/// Produces the signature the gateway would attach to this (order, payment) pair.
pub fn sign_payment(order_id: &str, payment_id: &str, secret: &str) -> String {
    let message = payment_signature_message(order_id, payment_id);
    hmac_hex(secret.as_bytes(), message.as_bytes())
}

/// Returns true iff `signature` is the hex HMAC-SHA256 of `order_id|payment_id` under `secret`.
pub fn verify_payment_signature(order_id: &str, payment_id: &str, signature: &str, secret: &str) -> bool {
    if order_id.is_empty() || payment_id.is_empty() || secret.is_empty() {
        return false;
    }
    let message = payment_signature_message(order_id, payment_id);
    verify_hmac_hex(secret.as_bytes(), message.as_bytes(), signature)
}

/// Checks a hex-encoded HMAC-SHA256 tag over arbitrary data.
pub fn verify_hmac_hex(secret: &[u8], data: &[u8], claimed: &str) -> bool {
    let Ok(claimed) = hex::decode(claimed.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return false;
    };
    mac.update(data);
    mac.verify_slice(&claimed).is_ok()
}

/// The lowercase hex HMAC-SHA256 of `data`. The gateway signs webhook bodies this way.
pub fn hmac_hex(secret: &[u8], data: &[u8]) -> String {
    // HMAC accepts keys of any length
    let mut mac = match HmacSha256::new_from_slice(secret) {
        Ok(m) => m,
        Err(_) => return String::new(),
    };
    mac.update(data);
    hex::encode(mac.finalize().into_bytes())
}

/// Byte-wise comparison whose running time does not depend on where the inputs differ.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
