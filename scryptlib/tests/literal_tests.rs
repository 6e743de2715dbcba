use num_bigint::BigInt;
use scryptlib::literal::{LiteralValue, parse_literal};
use scryptlib::types::{SigHashType, TypeTag, TypedValue};

const KEY: &str = "3847f126769a6c65d281d925f9ff990f431d19c8c314f9180def0ab95b24f062";
const DIGEST: &str = "3847f126769a6c65d281d925f9ff99";

fn bytes(hex_text: &str) -> Vec<u8> {
    hex::decode(hex_text).expect("test hex")
}

#[test]
fn integer_literals() {
    let literal = parse_literal("9007199254740991").expect("safe integer");
    assert_eq!(literal.asm, "ffffffffffff1f");
    assert_eq!(literal.value, LiteralValue::Int(BigInt::from(9007199254740991i64)));
    assert_eq!(literal.kind, TypeTag::Int);

    let literal = parse_literal("0xdebc9a78563").expect("hex integer");
    assert_eq!(literal.asm, "6385a7c9eb0d");
    assert_eq!(literal.value, LiteralValue::Int(BigInt::from(15306351674723i64)));

    assert_eq!(parse_literal("0").expect("zero").asm, "OP_0");
    assert_eq!(parse_literal("16").expect("sixteen").asm, "OP_16");
    assert_eq!(parse_literal("-1").expect("minus one").asm, "OP_1NEGATE");
    assert_eq!(parse_literal("-111111").expect("negative").asm, "07b281");
}

#[test]
fn bool_and_bytes_literals() {
    let literal = parse_literal("false").expect("bool");
    assert_eq!((literal.asm.as_str(), literal.kind), ("OP_FALSE", TypeTag::Bool));
    assert_eq!(parse_literal("true").expect("bool").asm, "OP_TRUE");

    let literal = parse_literal("b''").expect("empty bytes");
    assert_eq!(literal.asm, "OP_0");
    assert_eq!(literal.value, LiteralValue::Bytes(Vec::new()));

    let literal = parse_literal("b'62f0245bb9'").expect("bytes");
    assert_eq!(literal.asm, "62f0245bb9");
    assert_eq!(literal.kind, TypeTag::Bytes);
}

#[test]
fn typed_literals() {
    let literal = parse_literal(&format!("PrivKey(0x{KEY})")).expect("private key");
    assert_eq!(literal.kind, TypeTag::PrivKey);
    assert_eq!(literal.value, LiteralValue::Int(BigInt::parse_bytes(KEY.as_bytes(), 16).expect("key")));

    let literal = parse_literal(&format!("PubKey(b'{KEY}')")).expect("public key");
    assert_eq!((literal.asm.as_str(), literal.kind), (KEY, TypeTag::PubKey));
    assert_eq!(parse_literal(&format!("Sig(b'{KEY}')")).expect("sig").kind, TypeTag::Sig);

    for (text, kind) in [
        (format!("Ripemd160(b'{DIGEST}')"), TypeTag::Ripemd160),
        (format!("Sha1(b'{DIGEST}')"), TypeTag::Sha1),
        (format!("Sha256(b'{DIGEST}')"), TypeTag::Sha256),
        (format!("SigHashPreimage(b'{DIGEST}')"), TypeTag::SigHashPreimage),
    ] {
        let literal = parse_literal(&text).expect("digest literal");
        assert_eq!(literal.asm, DIGEST);
        assert_eq!(literal.kind, kind);
        assert_eq!(literal.value, LiteralValue::Bytes(bytes(DIGEST)));
    }

    for flag in [0x01u8, 0x02, 0x03, 0x40, 0x80] {
        let literal = parse_literal(&format!("SigHashType(b'{flag:02x}')")).expect("sighash flag");
        assert_eq!(literal.asm, format!("{flag:02x}"));
        assert_eq!(literal.value, LiteralValue::Int(BigInt::from(flag)));
    }

    let literal = parse_literal("OpCodeType(b'01')").expect("opcode");
    assert_eq!((literal.asm.as_str(), literal.kind), ("01", TypeTag::OpCodeType));
}

#[test]
fn private_key_asm_uses_number_encoding() {
    assert_eq!(parse_literal("PrivKey(1)").expect("small key").asm, "OP_1");
    assert_eq!(parse_literal("PrivKey(0x1234)").expect("key").asm, "3412");
}

#[test]
fn typed_values_round_trip_through_literals() {
    let cases = [
        "PrivKey(0x01)".to_owned(),
        format!("PrivKey(0x{KEY})"),
        format!("PubKey(b'{KEY}')"),
        format!("Sig(b'{KEY}')"),
        format!("Ripemd160(b'{DIGEST}')"),
        format!("Sha1(b'{DIGEST}')"),
        format!("Sha256(b'{DIGEST}')"),
        "SigHashType(b'01')".to_owned(),
        format!("SigHashPreimage(b'{DIGEST}')"),
        "OpCodeType(b'01')".to_owned(),
        "b'62f0245bb9'".to_owned(),
        "false".to_owned(),
        "-1".to_owned(),
    ];
    for text in cases {
        let value = TypedValue::from_literal(&text).expect("literal parses");
        assert_eq!(value.to_literal(), text);
    }

    assert_eq!(TypedValue::from_literal("PrivKey(1)").expect("key").to_literal(), "PrivKey(0x01)");
    assert_eq!(TypedValue::from_literal("SigHashType(b'80')").expect("flag"), TypedValue::SigHashType(SigHashType::ANYONECANPAY));
}
