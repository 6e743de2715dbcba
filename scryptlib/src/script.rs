use std::fmt;

use crate::errors::ScriptError;
use crate::opcodes::codes::{OP_0, OP_PUSHDATA1, OP_PUSHDATA2, OP_PUSHDATA4, OP_RETURN};
use crate::opcodes::{opcode_by_name, opcode_name};

/// One instruction: a bare opcode or a data push together with the push opcode used to encode it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    opcode: u8,
    data: Option<Vec<u8>>,
}

impl Chunk {
    pub fn op(opcode: u8) -> Self {
        Self { opcode, data: None }
    }

    /// Pushes `data` with the shortest push opcode for its length. Empty data becomes `OP_0`.
    pub fn push(data: Vec<u8>) -> Self {
        let opcode = match data.len() {
            0 => return Self::op(OP_0),
            len if len < OP_PUSHDATA1 as usize => len as u8,
            len if len <= 0xff => OP_PUSHDATA1,
            len if len <= 0xffff => OP_PUSHDATA2,
            _ => OP_PUSHDATA4,
        };
        Self { opcode, data: Some(data) }
    }

    pub fn opcode(&self) -> u8 {
        self.opcode
    }

    pub fn data(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }

    pub fn is_push_data(&self) -> bool {
        self.data.is_some()
    }

    fn write_to(&self, out: &mut Vec<u8>) {
        out.push(self.opcode);
        let Some(data) = &self.data else {
            return;
        };
        match self.opcode {
            OP_PUSHDATA1 => out.push(data.len() as u8),
            OP_PUSHDATA2 => out.extend_from_slice(&(data.len() as u16).to_le_bytes()),
            OP_PUSHDATA4 => out.extend_from_slice(&(data.len() as u32).to_le_bytes()),
            _ => {}
        }
        out.extend_from_slice(data);
    }

    fn asm_token(&self) -> String {
        match &self.data {
            Some(data) => hex::encode(data),
            None => opcode_name(self.opcode).map(str::to_owned).unwrap_or_else(|| format!("OP_UNKNOWN{}", self.opcode)),
        }
    }
}

/// Parsed instruction stream, convertible between ASM text, raw bytes and hex.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Script {
    chunks: Vec<Chunk>,
}

impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_chunks(chunks: Vec<Chunk>) -> Self {
        Self { chunks }
    }

    pub fn from_asm(asm: &str) -> Result<Self, ScriptError> {
        let chunks = asm.split_whitespace().map(parse_asm_token).collect::<Result<Vec<_>, _>>()?;
        Ok(Self { chunks })
    }

    pub fn from_hex(hex_text: &str) -> Result<Self, ScriptError> {
        let bytes = hex::decode(hex_text.trim()).map_err(|err| ScriptError::InvalidHex(err.to_string()))?;
        Self::from_bytes(&bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ScriptError> {
        let mut chunks = Vec::new();
        let mut offset = 0;
        while offset < bytes.len() {
            let opcode = bytes[offset];
            offset += 1;
            let len = match opcode {
                1..OP_PUSHDATA1 => opcode as usize,
                OP_PUSHDATA1 => read_len::<1>(bytes, &mut offset)?,
                OP_PUSHDATA2 => read_len::<2>(bytes, &mut offset)?,
                OP_PUSHDATA4 => read_len::<4>(bytes, &mut offset)?,
                _ => {
                    chunks.push(Chunk::op(opcode));
                    continue;
                }
            };
            let data = bytes.get(offset..offset + len).ok_or(ScriptError::UnexpectedEnd { offset })?;
            chunks.push(Chunk { opcode, data: Some(data.to_vec()) });
            offset += len;
        }
        Ok(Self { chunks })
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn push_chunk(&mut self, chunk: Chunk) {
        self.chunks.push(chunk);
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Index of the last `OP_RETURN`, which separates contract code from its data part.
    pub fn last_return_index(&self) -> Option<usize> {
        self.chunks.iter().rposition(|chunk| !chunk.is_push_data() && chunk.opcode == OP_RETURN)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for chunk in &self.chunks {
            chunk.write_to(&mut out);
        }
        out
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    pub fn to_asm(&self) -> String {
        self.chunks.iter().map(Chunk::asm_token).collect::<Vec<_>>().join(" ")
    }
}

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_asm())
    }
}

fn parse_asm_token(token: &str) -> Result<Chunk, ScriptError> {
    if let Some(opcode) = opcode_by_name(token) {
        return Ok(Chunk::op(opcode));
    }
    if token.starts_with('$') {
        return Err(ScriptError::UnresolvedPlaceholder(token.to_owned()));
    }
    if token.starts_with("OP_") {
        return Err(ScriptError::UnknownToken(token.to_owned()));
    }
    let data = hex::decode(token).map_err(|_| ScriptError::UnknownToken(token.to_owned()))?;
    Ok(Chunk::push(data))
}

fn read_len<const N: usize>(bytes: &[u8], offset: &mut usize) -> Result<usize, ScriptError> {
    let raw = bytes.get(*offset..*offset + N).ok_or(ScriptError::UnexpectedEnd { offset: *offset })?;
    *offset += N;
    let mut le = [0u8; 4];
    le[..N].copy_from_slice(raw);
    Ok(u32::from_le_bytes(le) as usize)
}
