//! Contract state trailer.
//!
//! State lives after the final `OP_RETURN` of a locking script as a run of value pushes followed by a
//! fixed-width push holding the byte length of those value pushes:
//!
//! ```text
//! <code> OP_RETURN <v0> <v1> ... <vn> <len>
//! ```
//!
//! The record carries no version or type information; readers supply the expected shape.

use num_bigint::BigInt;
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::AbiError;
use crate::num::{decode_num, num_to_bytes, num_to_fixed_bytes};
use crate::opcodes::codes::{OP_0, OP_1};
use crate::opcodes::small_int_value;
use crate::script::{Chunk, Script};

pub const DEFAULT_STATE_LEN: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StateOptions {
    /// Width in bytes of the trailing length push.
    pub length_width: usize,
}

impl Default for StateOptions {
    fn default() -> Self {
        Self { length_width: DEFAULT_STATE_LEN }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum StateValue {
    Bool(bool),
    Int(#[serde(with = "crate::num::decimal")] BigInt),
    Bytes(#[serde(with = "hex::serde")] Vec<u8>),
}

impl StateValue {
    fn to_chunk(&self) -> Chunk {
        match self {
            Self::Bool(true) => Chunk::op(OP_1),
            Self::Bool(false) => Chunk::op(OP_0),
            Self::Int(value) => Chunk::push(num_to_bytes(value)),
            Self::Bytes(bytes) => Chunk::push(bytes.clone()),
        }
    }
}

impl From<bool> for StateValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for StateValue {
    fn from(value: i32) -> Self {
        Self::Int(BigInt::from(value))
    }
}

impl From<i64> for StateValue {
    fn from(value: i64) -> Self {
        Self::Int(BigInt::from(value))
    }
}

impl From<BigInt> for StateValue {
    fn from(value: BigInt) -> Self {
        Self::Int(value)
    }
}

impl From<Vec<u8>> for StateValue {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

impl From<&[u8]> for StateValue {
    fn from(value: &[u8]) -> Self {
        Self::Bytes(value.to_vec())
    }
}

/// Serializes `values` as state pushes followed by the length push.
pub fn serialize_state(values: &[StateValue], options: StateOptions) -> Result<Script, AbiError> {
    let mut script = Script::from_chunks(values.iter().map(StateValue::to_chunk).collect());
    let body_len = script.to_bytes().len();
    let len = num_to_fixed_bytes(&BigInt::from(body_len), options.length_width)?;
    script.push_chunk(Chunk::push(len));
    debug!(values = values.len(), body_len, length_width = options.length_width, "serialized state");
    Ok(script)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateKind {
    Bool,
    Int,
    Bytes,
}

/// One chunk read back from a state trailer, coerced on demand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateCell {
    index: usize,
    chunk: Chunk,
}

impl StateCell {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn chunk(&self) -> &Chunk {
        &self.chunk
    }

    fn invalid(&self, reason: &str) -> AbiError {
        AbiError::InvalidStateCell { index: self.index, reason: reason.to_owned() }
    }

    pub fn to_bigint(&self) -> Result<BigInt, AbiError> {
        if let Some(data) = self.chunk.data() {
            return Ok(decode_num(data));
        }
        small_int_value(self.chunk.opcode()).map(BigInt::from).ok_or_else(|| self.invalid("does not have a number representation"))
    }

    pub fn to_bool(&self) -> Result<bool, AbiError> {
        Ok(!self.to_bigint()?.is_zero())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, AbiError> {
        match self.chunk.data() {
            Some(data) => Ok(data.to_vec()),
            None if self.chunk.opcode() == OP_0 => Ok(Vec::new()),
            None => Err(self.invalid("does not have a byte representation")),
        }
    }

    pub fn to_hex(&self) -> Result<String, AbiError> {
        self.to_bytes().map(hex::encode)
    }

    pub fn coerce(&self, kind: StateKind) -> Result<StateValue, AbiError> {
        match kind {
            StateKind::Bool => self.to_bool().map(StateValue::Bool),
            StateKind::Int => self.to_bigint().map(StateValue::Int),
            StateKind::Bytes => self.to_bytes().map(StateValue::Bytes),
        }
    }
}

/// Reads the state cells of a locking script, skipping the length push and stopping at the last `OP_RETURN`.
///
/// The length push is not checked against the cells.
pub fn deserialize_state(script: &Script) -> Vec<StateCell> {
    let chunks = script.chunks();
    let Some(end) = chunks.len().checked_sub(1) else {
        return Vec::new();
    };
    let start = script.last_return_index().filter(|&pos| pos < end).map(|pos| pos + 1).unwrap_or(0);
    chunks[start..end].iter().enumerate().map(|(index, chunk)| StateCell { index, chunk: chunk.clone() }).collect()
}

/// Ordered field names and kinds expected in a state trailer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateShape {
    fields: Vec<(String, StateKind)>,
}

impl StateShape {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: impl Into<String>, kind: StateKind) -> Self {
        self.fields.push((name.into(), kind));
        self
    }

    pub fn fields(&self) -> &[(String, StateKind)] {
        &self.fields
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateRecord {
    fields: Vec<(String, StateValue)>,
}

impl StateRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<StateValue>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    pub fn get(&self, name: &str) -> Option<&StateValue> {
        self.fields.iter().find(|(field, _)| field == name).map(|(_, value)| value)
    }

    pub fn fields(&self) -> &[(String, StateValue)] {
        &self.fields
    }

    pub fn values(&self) -> Vec<StateValue> {
        self.fields.iter().map(|(_, value)| value.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn to_script(&self, options: StateOptions) -> Result<Script, AbiError> {
        serialize_state(&self.values(), options)
    }
}

/// Reads state cells and coerces them by position. Cells beyond the shape are ignored and a shape longer
/// than the trailer yields only the fields present.
pub fn deserialize_state_as(script: &Script, shape: &StateShape) -> Result<StateRecord, AbiError> {
    let cells = deserialize_state(script);
    let fields = shape
        .fields
        .iter()
        .zip(&cells)
        .map(|((name, kind), cell)| cell.coerce(*kind).map(|value| (name.clone(), value)).map_err(|err| err.in_param(name)))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(StateRecord { fields })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_a_one_byte_push() {
        let script = serialize_state(&[StateValue::from(0)], StateOptions::default()).expect("zero serializes");
        assert_eq!(script.to_asm(), "00 0200");
    }

    #[test]
    fn length_counts_push_bytes() {
        let values = [StateValue::from(true), StateValue::from(1000), StateValue::Bytes(vec![0x11; 3])];
        let script = serialize_state(&values, StateOptions::default()).expect("state serializes");
        // OP_1 (1) + 02e803 (3) + 03111111 (4)
        assert_eq!(script.to_asm(), "OP_1 e803 111111 0800");
    }

    #[test]
    fn narrow_length_overflows() {
        let values = [StateValue::Bytes(vec![0; 200])];
        let err = serialize_state(&values, StateOptions { length_width: 1 }).expect_err("202 bytes need two length bytes");
        assert!(matches!(err, AbiError::EncodingOverflow { width: 1, .. }));
    }

    #[test]
    fn reads_after_last_return() {
        let script = Script::from_asm("OP_DUP OP_RETURN 01 OP_RETURN OP_16 05 0300").expect("valid asm");
        let cells = deserialize_state(&script);
        assert_eq!(cells.len(), 2);
        assert_eq!(cells[0].to_bigint().expect("small int"), BigInt::from(16));
        assert_eq!(cells[1].to_hex().expect("push"), "05");
        assert!(cells[0].to_bytes().is_err());
    }

    #[test]
    fn empty_and_return_only_scripts() {
        assert!(deserialize_state(&Script::new()).is_empty());
        assert!(deserialize_state(&Script::from_asm("OP_RETURN").expect("valid asm")).is_empty());
        let no_return = Script::from_asm("OP_1 01 0200").expect("valid asm");
        assert_eq!(deserialize_state(&no_return).len(), 2);
    }

    #[test]
    fn coercions() {
        let script = Script::from_asm("OP_RETURN OP_0 OP_1NEGATE 80 0300").expect("valid asm");
        let cells = deserialize_state(&script);
        assert_eq!(cells[0].to_bytes().expect("OP_0 is empty bytes"), Vec::<u8>::new());
        assert!(!cells[0].to_bool().expect("OP_0 is false"));
        assert_eq!(cells[1].to_bigint().expect("OP_1NEGATE"), BigInt::from(-1));
        assert!(!cells[2].to_bool().expect("negative zero is false"));

        let cell = Script::from_asm("OP_RETURN OP_CHECKSIG 0100").expect("valid asm");
        let err = deserialize_state(&cell)[0].to_bigint().expect_err("opcode has no number");
        assert!(matches!(err, AbiError::InvalidStateCell { index: 0, .. }));
    }
}
