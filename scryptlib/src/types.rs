use std::fmt;
use std::mem::discriminant;
use std::ops::BitOr;
use std::str::FromStr;

use num_bigint::BigInt;
use num_traits::Signed;
use serde::{Deserialize, Serialize};

use crate::descriptor::StructSchema;
use crate::errors::AbiError;
use crate::literal::{bool_asm, bytes_asm, parse_literal};
use crate::num::int_to_asm;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeTag {
    Bool,
    Int,
    Bytes,
    PrivKey,
    PubKey,
    Sig,
    Ripemd160,
    Sha1,
    Sha256,
    SigHashType,
    SigHashPreimage,
    OpCodeType,
}

impl TypeTag {
    pub const ALL: [TypeTag; 12] = [
        Self::Bool,
        Self::Int,
        Self::Bytes,
        Self::PrivKey,
        Self::PubKey,
        Self::Sig,
        Self::Ripemd160,
        Self::Sha1,
        Self::Sha256,
        Self::SigHashType,
        Self::SigHashPreimage,
        Self::OpCodeType,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Bytes => "bytes",
            Self::PrivKey => "PrivKey",
            Self::PubKey => "PubKey",
            Self::Sig => "Sig",
            Self::Ripemd160 => "Ripemd160",
            Self::Sha1 => "Sha1",
            Self::Sha256 => "Sha256",
            Self::SigHashType => "SigHashType",
            Self::SigHashPreimage => "SigHashPreimage",
            Self::OpCodeType => "OpCodeType",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tag| tag.name() == name)
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Declared parameter type as written by the compiler, e.g. `int`, `bytes[4]`, `Person[2][3]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeSpec {
    Scalar(TypeTag),
    Array { element: Box<TypeSpec>, size: usize },
    Struct(String),
}

impl TypeSpec {
    pub fn parse(type_name: &str) -> Result<Self, AbiError> {
        let malformed = || AbiError::Descriptor(format!("malformed type name '{type_name}'"));
        let trimmed = type_name.trim();
        let (base, dims) = match trimmed.find('[') {
            Some(pos) => (&trimmed[..pos], &trimmed[pos..]),
            None => (trimmed, ""),
        };
        let base = base.trim();
        let base = base.strip_prefix("struct ").unwrap_or(base);
        let base = base.strip_suffix("{}").unwrap_or(base).trim();
        if base.is_empty() || !base.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '_') {
            return Err(malformed());
        }

        let mut sizes = Vec::new();
        let mut rest = dims;
        while !rest.is_empty() {
            let inner = rest.strip_prefix('[').ok_or_else(malformed)?;
            let close = inner.find(']').ok_or_else(malformed)?;
            sizes.push(inner[..close].trim().parse::<usize>().map_err(|_| malformed())?);
            rest = &inner[close + 1..];
        }

        let mut spec = match TypeTag::from_name(base) {
            Some(tag) => Self::Scalar(tag),
            None => Self::Struct(base.to_owned()),
        };
        for size in sizes.into_iter().rev() {
            spec = Self::Array { element: Box::new(spec), size };
        }
        Ok(spec)
    }
}

impl fmt::Display for TypeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(tag) => f.write_str(tag.name()),
            Self::Struct(name) => f.write_str(name),
            Self::Array { .. } => {
                let mut sizes = Vec::new();
                let mut current = self;
                while let Self::Array { element, size } = current {
                    sizes.push(*size);
                    current = &**element;
                }
                write!(f, "{current}")?;
                sizes.iter().try_for_each(|size| write!(f, "[{size}]"))
            }
        }
    }
}

/// Signature hash flag byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SigHashType(pub u8);

impl SigHashType {
    pub const ALL: Self = Self(0x01);
    pub const NONE: Self = Self(0x02);
    pub const SINGLE: Self = Self(0x03);
    pub const FORKID: Self = Self(0x40);
    pub const ANYONECANPAY: Self = Self(0x80);

    pub fn flag(self) -> u8 {
        self.0
    }
}

impl BitOr for SigHashType {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum TypedValue {
    Bool(bool),
    Int(#[serde(with = "crate::num::decimal")] BigInt),
    Bytes(#[serde(with = "hex::serde")] Vec<u8>),
    PrivKey(#[serde(with = "crate::num::decimal")] BigInt),
    PubKey(#[serde(with = "hex::serde")] Vec<u8>),
    Sig(#[serde(with = "hex::serde")] Vec<u8>),
    Ripemd160(#[serde(with = "hex::serde")] Vec<u8>),
    Sha1(#[serde(with = "hex::serde")] Vec<u8>),
    Sha256(#[serde(with = "hex::serde")] Vec<u8>),
    SigHashType(SigHashType),
    SigHashPreimage(#[serde(with = "hex::serde")] Vec<u8>),
    OpCodeType(#[serde(with = "hex::serde")] Vec<u8>),
    Struct(StructValue),
    Array(Vec<TypedValue>),
}

impl TypedValue {
    /// Wraps `bytes` in the byte-string variant for `tag`; `None` for non-byte kinds.
    pub fn from_tagged_bytes(tag: TypeTag, bytes: Vec<u8>) -> Option<Self> {
        match tag {
            TypeTag::Bytes => Some(Self::Bytes(bytes)),
            TypeTag::PubKey => Some(Self::PubKey(bytes)),
            TypeTag::Sig => Some(Self::Sig(bytes)),
            TypeTag::Ripemd160 => Some(Self::Ripemd160(bytes)),
            TypeTag::Sha1 => Some(Self::Sha1(bytes)),
            TypeTag::Sha256 => Some(Self::Sha256(bytes)),
            TypeTag::SigHashPreimage => Some(Self::SigHashPreimage(bytes)),
            TypeTag::OpCodeType => Some(Self::OpCodeType(bytes)),
            TypeTag::Bool | TypeTag::Int | TypeTag::PrivKey | TypeTag::SigHashType => None,
        }
    }

    /// Parses a scalar literal such as `42`, `b'00ff'` or `PubKey(b'02..')`.
    pub fn from_literal(text: &str) -> Result<Self, AbiError> {
        Self::try_from(parse_literal(text)?)
    }

    pub fn tag(&self) -> Option<TypeTag> {
        match self {
            Self::Bool(_) => Some(TypeTag::Bool),
            Self::Int(_) => Some(TypeTag::Int),
            Self::Bytes(_) => Some(TypeTag::Bytes),
            Self::PrivKey(_) => Some(TypeTag::PrivKey),
            Self::PubKey(_) => Some(TypeTag::PubKey),
            Self::Sig(_) => Some(TypeTag::Sig),
            Self::Ripemd160(_) => Some(TypeTag::Ripemd160),
            Self::Sha1(_) => Some(TypeTag::Sha1),
            Self::Sha256(_) => Some(TypeTag::Sha256),
            Self::SigHashType(_) => Some(TypeTag::SigHashType),
            Self::SigHashPreimage(_) => Some(TypeTag::SigHashPreimage),
            Self::OpCodeType(_) => Some(TypeTag::OpCodeType),
            Self::Struct(_) | Self::Array(_) => None,
        }
    }

    /// Compiler-facing type name; arrays list their sizes outermost first, e.g. `int[2][3]`.
    pub fn type_name(&self) -> String {
        match self {
            Self::Struct(value) => value.schema_name().unwrap_or("struct").to_owned(),
            Self::Array(items) => {
                let element = items.first().map(Self::type_name).unwrap_or_else(|| "unknown".to_owned());
                match element.find('[') {
                    Some(pos) => format!("{}[{}]{}", &element[..pos], items.len(), &element[pos..]),
                    None => format!("{element}[{}]", items.len()),
                }
            }
            scalar => scalar.tag().map(TypeTag::name).unwrap_or("unknown").to_owned(),
        }
    }

    pub fn to_asm(&self) -> Result<String, AbiError> {
        match self {
            Self::Bool(value) => Ok(bool_asm(*value).to_owned()),
            Self::Int(value) | Self::PrivKey(value) => Ok(int_to_asm(value)),
            Self::SigHashType(flag) => Ok(hex::encode([flag.0])),
            Self::Bytes(bytes)
            | Self::PubKey(bytes)
            | Self::Sig(bytes)
            | Self::Ripemd160(bytes)
            | Self::Sha1(bytes)
            | Self::Sha256(bytes)
            | Self::SigHashPreimage(bytes)
            | Self::OpCodeType(bytes) => Ok(bytes_asm(bytes)),
            Self::Struct(value) if !value.is_bound() => Err(AbiError::UnboundStructType(value.describe())),
            Self::Struct(value) => join_asm(value.fields.iter().map(|(_, field)| field)),
            Self::Array(items) => join_asm(items.iter()),
        }
    }

    /// Source-literal form, e.g. `PrivKey(0x0f)`, `Sha256(b'ab..')`, `[1, 2]`.
    pub fn to_literal(&self) -> String {
        match self {
            Self::Bool(value) => value.to_string(),
            Self::Int(value) => value.to_string(),
            Self::PrivKey(value) if value.is_negative() => format!("PrivKey({value})"),
            Self::PrivKey(value) => {
                let digits = value.magnitude().to_str_radix(16);
                let pad = if digits.len() % 2 == 1 { "0" } else { "" };
                format!("PrivKey(0x{pad}{digits})")
            }
            Self::SigHashType(flag) => format!("SigHashType(b'{}')", hex::encode([flag.0])),
            Self::Bytes(bytes) => format!("b'{}'", hex::encode(bytes)),
            Self::PubKey(bytes)
            | Self::Sig(bytes)
            | Self::Ripemd160(bytes)
            | Self::Sha1(bytes)
            | Self::Sha256(bytes)
            | Self::SigHashPreimage(bytes)
            | Self::OpCodeType(bytes) => format!("{}(b'{}')", self.type_name(), hex::encode(bytes)),
            Self::Struct(value) => {
                format!("{{{}}}", value.fields.iter().map(|(_, field)| field.to_literal()).collect::<Vec<_>>().join(", "))
            }
            Self::Array(items) => format!("[{}]", items.iter().map(Self::to_literal).collect::<Vec<_>>().join(", ")),
        }
    }

    /// Checks this value against a declared type and returns it with every struct bound to its schema.
    pub fn conform(&self, spec: &TypeSpec, structs: &[StructSchema]) -> Result<TypedValue, AbiError> {
        match (spec, self) {
            (TypeSpec::Array { element, size }, Self::Array(items)) => {
                if items.len() != *size {
                    return Err(AbiError::ArraySizeMismatch { expected: *size, actual: items.len() });
                }
                if items.windows(2).any(|pair| discriminant(&pair[0]) != discriminant(&pair[1])) {
                    return Err(AbiError::HeterogeneousArray);
                }
                let items = items.iter().map(|item| item.conform(element, structs)).collect::<Result<Vec<_>, _>>()?;
                Ok(Self::Array(items))
            }
            (TypeSpec::Struct(name), Self::Struct(value)) => {
                let schema =
                    structs.iter().find(|schema| &schema.name == name).ok_or_else(|| AbiError::UnboundStructType(name.clone()))?;
                Ok(Self::Struct(value.bind(schema, structs)?))
            }
            (TypeSpec::Scalar(tag), value) if value.tag() == Some(*tag) => Ok(value.clone()),
            (spec, value) => Err(AbiError::TypeMismatch { expected: spec.to_string(), actual: value.type_name() }),
        }
    }
}

fn join_asm<'a>(values: impl Iterator<Item = &'a TypedValue>) -> Result<String, AbiError> {
    let parts = values.map(TypedValue::to_asm).collect::<Result<Vec<_>, _>>()?;
    Ok(parts.into_iter().filter(|part| !part.is_empty()).collect::<Vec<_>>().join(" "))
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_literal())
    }
}

impl FromStr for TypedValue {
    type Err = AbiError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        Self::from_literal(text)
    }
}

impl From<bool> for TypedValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for TypedValue {
    fn from(value: i32) -> Self {
        Self::Int(BigInt::from(value))
    }
}

impl From<i64> for TypedValue {
    fn from(value: i64) -> Self {
        Self::Int(BigInt::from(value))
    }
}

impl From<BigInt> for TypedValue {
    fn from(value: BigInt) -> Self {
        Self::Int(value)
    }
}

impl From<SigHashType> for TypedValue {
    fn from(value: SigHashType) -> Self {
        Self::SigHashType(value)
    }
}

impl From<StructValue> for TypedValue {
    fn from(value: StructValue) -> Self {
        Self::Struct(value)
    }
}

impl<T: Into<TypedValue>> From<Vec<T>> for TypedValue {
    fn from(items: Vec<T>) -> Self {
        Self::Array(items.into_iter().map(Into::into).collect())
    }
}

/// Named aggregate. Field order follows the schema once bound.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructValue {
    schema: Option<String>,
    fields: Vec<(String, TypedValue)>,
}

impl StructValue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<TypedValue>) -> Self {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name, value)),
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&TypedValue> {
        self.fields.iter().find(|(field, _)| field == name).map(|(_, value)| value)
    }

    pub fn fields(&self) -> &[(String, TypedValue)] {
        &self.fields
    }

    pub fn schema_name(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    pub fn is_bound(&self) -> bool {
        self.schema.is_some()
    }

    fn describe(&self) -> String {
        let names = self.fields.iter().map(|(name, _)| name.as_str()).collect::<Vec<_>>().join(", ");
        format!("{{{names}}}")
    }

    /// Returns a copy bound to `schema`, with nested struct members bound as well.
    pub fn bind(&self, schema: &StructSchema, structs: &[StructSchema]) -> Result<StructValue, AbiError> {
        let mismatch = |reason: String| AbiError::SchemaMismatch { struct_name: schema.name.clone(), reason };
        if let Some(bound) = self.schema.as_deref().filter(|bound| *bound != schema.name) {
            return Err(mismatch(format!("value is already bound to struct {bound}")));
        }
        if let Some((extra, _)) = self.fields.iter().find(|(name, _)| !schema.params.iter().any(|param| &param.name == name)) {
            return Err(mismatch(format!("{extra} is not a member of struct {}", schema.name)));
        }

        let mut fields = Vec::with_capacity(schema.params.len());
        for param in &schema.params {
            let value = self.get(&param.name).ok_or_else(|| mismatch(format!("missing member {}", param.name)))?;
            let spec = TypeSpec::parse(&param.type_name)?;
            let value = value.conform(&spec, structs).map_err(|err| err.in_param(&param.name))?;
            fields.push((param.name.clone(), value));
        }
        Ok(StructValue { schema: Some(schema.name.clone()), fields })
    }
}
