use num_bigint::BigInt;
use num_traits::ToPrimitive;
use pest::iterators::Pair;

use crate::diagnostic::{ErrorSpan, invalid_hex_digits, oversized_sighash_flag, unrecognized_literal};
use crate::errors::{AbiError, LiteralDiagnostic};
use crate::num::int_to_asm;
use crate::parser::{Rule, parse_literal_text};
use crate::types::{SigHashType, TypeTag, TypedValue};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiteralValue {
    Bool(bool),
    Int(BigInt),
    Bytes(Vec<u8>),
}

/// A parsed literal: its ASM token, its host value and the kind it was written as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Literal {
    pub asm: String,
    pub value: LiteralValue,
    pub kind: TypeTag,
}

pub fn parse_literal(text: &str) -> Result<Literal, AbiError> {
    let input = text.trim();
    let mut pairs = parse_literal_text(input)?;
    let body = pairs.next().and_then(|literal| literal.into_inner().next()).ok_or_else(|| whole_input_error(input))?;
    let literal = literal_from_pair(input, body)?;
    tracing::trace!(literal = input, asm = %literal.asm, kind = literal.kind.name(), "parsed literal");
    Ok(literal)
}

fn literal_from_pair(input: &str, pair: Pair<'_, Rule>) -> Result<Literal, LiteralDiagnostic> {
    match pair.as_rule() {
        Rule::bool_literal => {
            let value = pair.as_str() == "true";
            Ok(Literal { asm: bool_asm(value).to_owned(), value: LiteralValue::Bool(value), kind: TypeTag::Bool })
        }
        Rule::dec_int | Rule::hex_int => {
            let value = int_from_pair(input, &pair)?;
            Ok(Literal { asm: int_to_asm(&value), value: LiteralValue::Int(value), kind: TypeTag::Int })
        }
        Rule::bytes_literal => {
            let bytes = bytes_from_pair(input, pair)?;
            Ok(Literal { asm: bytes_asm(&bytes), value: LiteralValue::Bytes(bytes), kind: TypeTag::Bytes })
        }
        Rule::privkey_literal => {
            let inner = pair.into_inner().next().ok_or_else(|| whole_input_error(input))?;
            let value = int_from_pair(input, &inner)?;
            Ok(Literal { asm: int_to_asm(&value), value: LiteralValue::Int(value), kind: TypeTag::PrivKey })
        }
        Rule::tagged_bytes_literal => tagged_literal(input, pair),
        _ => Err(whole_input_error(input)),
    }
}

fn tagged_literal(input: &str, pair: Pair<'_, Rule>) -> Result<Literal, LiteralDiagnostic> {
    let mut inner = pair.into_inner();
    let (Some(kind_pair), Some(bytes_pair)) = (inner.next(), inner.next()) else {
        return Err(whole_input_error(input));
    };
    let kind = TypeTag::from_name(kind_pair.as_str()).ok_or_else(|| whole_input_error(input))?;
    let bytes_span = span_of(&bytes_pair);
    let bytes = bytes_from_pair(input, bytes_pair)?;

    if kind == TypeTag::SigHashType {
        let &[flag] = bytes.as_slice() else {
            return Err(oversized_sighash_flag(input, bytes_span));
        };
        return Ok(Literal { asm: hex::encode([flag]), value: LiteralValue::Int(BigInt::from(flag)), kind });
    }
    Ok(Literal { asm: bytes_asm(&bytes), value: LiteralValue::Bytes(bytes), kind })
}

fn int_from_pair(input: &str, pair: &Pair<'_, Rule>) -> Result<BigInt, LiteralDiagnostic> {
    let text = pair.as_str();
    let parsed = match pair.as_rule() {
        Rule::hex_int => text.strip_prefix("0x").and_then(|digits| BigInt::parse_bytes(digits.as_bytes(), 16)),
        _ => BigInt::parse_bytes(text.as_bytes(), 10),
    };
    parsed.ok_or_else(|| unrecognized_literal(input, span_of(pair)))
}

fn bytes_from_pair(input: &str, pair: Pair<'_, Rule>) -> Result<Vec<u8>, LiteralDiagnostic> {
    let digits = pair.into_inner().next().ok_or_else(|| whole_input_error(input))?;
    let span = span_of(&digits);
    if digits.as_str().len() % 2 != 0 {
        return Err(invalid_hex_digits(input, span));
    }
    hex::decode(digits.as_str()).map_err(|_| invalid_hex_digits(input, span))
}

fn span_of(pair: &Pair<'_, Rule>) -> ErrorSpan {
    let span = pair.as_span();
    ErrorSpan { start: span.start(), end: span.end() }
}

fn whole_input_error(input: &str) -> LiteralDiagnostic {
    unrecognized_literal(input, ErrorSpan { start: 0, end: input.len() })
}

pub(crate) fn bool_asm(value: bool) -> &'static str {
    if value { "OP_TRUE" } else { "OP_FALSE" }
}

/// Byte strings render as lowercase hex; the empty string is `OP_0`.
pub(crate) fn bytes_asm(bytes: &[u8]) -> String {
    if bytes.is_empty() { "OP_0".to_owned() } else { hex::encode(bytes) }
}

impl TryFrom<Literal> for TypedValue {
    type Error = AbiError;

    fn try_from(literal: Literal) -> Result<Self, Self::Error> {
        let kind = literal.kind;
        let mismatch = |actual: &str| AbiError::TypeMismatch { expected: kind.name().to_owned(), actual: actual.to_owned() };
        match (kind, literal.value) {
            (TypeTag::Bool, LiteralValue::Bool(value)) => Ok(TypedValue::Bool(value)),
            (TypeTag::Int, LiteralValue::Int(value)) => Ok(TypedValue::Int(value)),
            (TypeTag::PrivKey, LiteralValue::Int(value)) => Ok(TypedValue::PrivKey(value)),
            (TypeTag::SigHashType, LiteralValue::Int(value)) => {
                value.to_u8().map(|flag| TypedValue::SigHashType(SigHashType(flag))).ok_or_else(|| mismatch("int"))
            }
            (_, LiteralValue::Bytes(bytes)) => TypedValue::from_tagged_bytes(kind, bytes).ok_or_else(|| mismatch("bytes")),
            (_, LiteralValue::Bool(_)) => Err(mismatch("bool")),
            (_, LiteralValue::Int(_)) => Err(mismatch("int")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asm_of(text: &str) -> String {
        parse_literal(text).expect("literal should parse").asm
    }

    #[test]
    fn integers_use_small_int_opcodes() {
        assert_eq!(asm_of("0"), "OP_0");
        assert_eq!(asm_of("16"), "OP_16");
        assert_eq!(asm_of("17"), "11");
        assert_eq!(asm_of("-1"), "OP_1NEGATE");
        assert_eq!(asm_of("-111111"), "07b281");
        assert_eq!(asm_of("9007199254740991"), "ffffffffffff1f");
        assert_eq!(asm_of("0xdebc9a78563"), "6385a7c9eb0d");
    }

    #[test]
    fn bools_and_bytes() {
        let literal = parse_literal(" false ").expect("bool literal");
        assert_eq!(literal.asm, "OP_FALSE");
        assert_eq!(literal.value, LiteralValue::Bool(false));
        assert_eq!(literal.kind, TypeTag::Bool);

        assert_eq!(asm_of("b''"), "OP_0");
        let literal = parse_literal("b'1234AB'").expect("bytes literal");
        assert_eq!(literal.asm, "1234ab");
        assert_eq!(literal.value, LiteralValue::Bytes(vec![0x12, 0x34, 0xab]));
    }

    #[test]
    fn tagged_kinds() {
        let literal = parse_literal("PrivKey(0x12)").expect("privkey literal");
        assert_eq!(literal.kind, TypeTag::PrivKey);
        assert_eq!(literal.value, LiteralValue::Int(BigInt::from(0x12)));
        assert_eq!(literal.asm, "12");

        let literal = parse_literal("SigHashType(b'41')").expect("sighash literal");
        assert_eq!(literal.kind, TypeTag::SigHashType);
        assert_eq!(literal.value, LiteralValue::Int(BigInt::from(0x41)));
        assert_eq!(literal.asm, "41");

        assert_eq!(parse_literal("Sig(b'30')").expect("sig literal").kind, TypeTag::Sig);
        assert_eq!(parse_literal("SigHashPreimage(b'00ff')").expect("preimage literal").kind, TypeTag::SigHashPreimage);
        assert_eq!(parse_literal("OpCodeType(b'76')").expect("opcode literal").kind, TypeTag::OpCodeType);
    }

    #[test]
    fn odd_hex_is_rejected_with_span() {
        let err = parse_literal("Sha256(b'abc')").expect_err("odd hex must fail");
        let AbiError::MalformedLiteral(diagnostic) = err else {
            panic!("expected malformed literal, got {err:?}");
        };
        assert_eq!(diagnostic.code(), "odd_hex_length");
        assert_eq!(diagnostic.span(), ErrorSpan { start: 9, end: 12 });
    }

    #[test]
    fn wide_sighash_flag_is_rejected() {
        let err = parse_literal("SigHashType(b'4141')").expect_err("two-byte flag");
        assert!(matches!(&err, AbiError::MalformedLiteral(diagnostic) if diagnostic.code() == "oversized_sighash_flag"));
    }

    #[test]
    fn literal_converts_to_typed_value() {
        let value = TypedValue::try_from(parse_literal("Ripemd160(b'0011')").expect("ripemd literal")).expect("typed");
        assert_eq!(value, TypedValue::Ripemd160(vec![0x00, 0x11]));
        let value = TypedValue::try_from(parse_literal("SigHashType(b'c1')").expect("sighash literal")).expect("typed");
        assert_eq!(value, TypedValue::SigHashType(SigHashType(0xc1)));
    }
}
