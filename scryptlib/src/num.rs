//! Script number codec.
//!
//! Script numbers are sign-magnitude little-endian: the magnitude bytes run low to high and the top
//! bit of the final byte carries the sign. A fixed width pads the magnitude with zero bytes and moves
//! the sign into the last padding byte.

use num_bigint::{BigInt, Sign};
use num_traits::{Signed, ToPrimitive, Zero};

use crate::errors::AbiError;

const SIGN_BIT: u8 = 0x80;

fn magnitude_bytes(n: &BigInt) -> Vec<u8> {
    if n.is_zero() {
        return Vec::new();
    }
    let mut bytes = n.magnitude().to_bytes_le();
    if bytes.last().is_some_and(|byte| byte & SIGN_BIT != 0) {
        bytes.push(0);
    }
    bytes
}

/// Minimal encoding. Zero is a single `0x00` byte rather than the empty vector.
pub fn num_to_bytes(n: &BigInt) -> Vec<u8> {
    let mut bytes = magnitude_bytes(n);
    if bytes.is_empty() {
        return vec![0x00];
    }
    if n.is_negative() {
        if let Some(last) = bytes.last_mut() {
            *last |= SIGN_BIT;
        }
    }
    bytes
}

pub fn num_to_fixed_bytes(n: &BigInt, width: usize) -> Result<Vec<u8>, AbiError> {
    let negative = n.is_negative();
    let mut bytes = magnitude_bytes(n);
    if bytes.len() > width {
        return Err(AbiError::EncodingOverflow { value: n.to_string(), width });
    }
    if bytes.len() == width {
        if negative {
            if let Some(last) = bytes.last_mut() {
                *last |= SIGN_BIT;
            }
        }
        return Ok(bytes);
    }
    bytes.resize(width - 1, 0);
    bytes.push(if negative { SIGN_BIT } else { 0 });
    Ok(bytes)
}

pub fn encode_num(n: &BigInt, width: Option<usize>) -> Result<Vec<u8>, AbiError> {
    match width {
        Some(width) => num_to_fixed_bytes(n, width),
        None => Ok(num_to_bytes(n)),
    }
}

pub fn decode_num(bytes: &[u8]) -> BigInt {
    let Some(&last) = bytes.last() else {
        return BigInt::zero();
    };
    let mut magnitude = bytes.to_vec();
    if let Some(top) = magnitude.last_mut() {
        *top &= !SIGN_BIT;
    }
    let value = BigInt::from_bytes_le(Sign::Plus, &magnitude);
    if last & SIGN_BIT != 0 { -value } else { value }
}

/// Hex form of [`num_to_fixed_bytes`], e.g. `num_to_hex(-1000, 4) == "e8030080"`.
pub fn num_to_hex(n: &BigInt, width: usize) -> Result<String, AbiError> {
    num_to_fixed_bytes(n, width).map(hex::encode)
}

pub fn hex_to_num(hex_text: &str) -> Result<BigInt, AbiError> {
    let bytes = hex::decode(hex_text).map_err(|err| AbiError::Script(crate::errors::ScriptError::InvalidHex(err.to_string())))?;
    Ok(decode_num(&bytes))
}

/// Renders an integer as a single ASM token.
pub fn int_to_asm(n: &BigInt) -> String {
    match n.to_i64() {
        Some(-1) => "OP_1NEGATE".to_string(),
        Some(value @ 0..=16) => format!("OP_{value}"),
        _ => hex::encode(num_to_bytes(n)),
    }
}

/// Serde adapter for script integers: written as decimal strings, read from decimal strings or JSON integers.
pub mod decimal {
    use std::fmt;

    use num_bigint::BigInt;
    use serde::de::{self, Unexpected, Visitor};
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &BigInt, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigInt, D::Error> {
        deserializer.deserialize_any(DecimalVisitor)
    }

    struct DecimalVisitor;

    impl Visitor<'_> for DecimalVisitor {
        type Value = BigInt;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("an integer or a decimal string")
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> Result<BigInt, E> {
            Ok(BigInt::from(value))
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> Result<BigInt, E> {
            Ok(BigInt::from(value))
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<BigInt, E> {
            value.trim().parse().map_err(|_| E::invalid_value(Unexpected::Str(value), &self))
        }
    }
}
