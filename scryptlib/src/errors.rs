use thiserror::Error;

pub use crate::diagnostic::{ErrorSpan, LiteralDiagnostic, LiteralDiagnosticLabel, LiteralDisplayLocation, LiteralErrorInterpretation};

#[derive(Debug, Error)]
pub enum AbiError {
    #[error("{value} cannot fit in {width} byte(s)")]
    EncodingOverflow { value: String, width: usize },
    #[error("malformed literal: {0}")]
    MalformedLiteral(Box<LiteralDiagnostic>),
    #[error("wrong number of arguments for #{method}, expected {expected} but got {actual}")]
    ArityMismatch { method: String, expected: usize, actual: usize },
    #[error("array argument has wrong size, expected [{expected}] but got [{actual}]")]
    ArraySizeMismatch { expected: usize, actual: usize },
    #[error("array arguments are not of the same type")]
    HeterogeneousArray,
    #[error("no struct schema bound for type {0}")]
    UnboundStructType(String),
    #[error("struct {struct_name}: {reason}")]
    SchemaMismatch { struct_name: String, reason: String },
    #[error("wrong argument type, expected {expected} but got {actual}")]
    TypeMismatch { expected: String, actual: String },
    #[error("missing ${0} in ASM template")]
    MissingTemplateSlot(String),
    #[error("no function named '{0}' found in abi")]
    UnknownMethod(String),
    #[error("state cell {index} {reason}")]
    InvalidStateCell { index: usize, reason: String },
    #[error("unsupported slot naming version {0}")]
    UnsupportedSlotNaming(u32),
    #[error("invalid contract descriptor: {0}")]
    Descriptor(String),
    #[error("contract descriptor json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("script error: {0}")]
    Script(#[from] ScriptError),
    #[error("'{param}': {source}")]
    Context {
        #[source]
        source: Box<AbiError>,
        param: String,
    },
}

impl AbiError {
    pub fn root(&self) -> &AbiError {
        let mut current = self;
        while let Self::Context { source, .. } = current {
            current = source;
        }
        current
    }

    /// The innermost parameter slot the failure was reported against.
    pub fn param(&self) -> Option<&str> {
        let mut found = None;
        let mut current = self;
        while let Self::Context { source, param } = current {
            found = Some(param.as_str());
            current = source;
        }
        found
    }

    pub fn in_param(self, param: &str) -> Self {
        if self.param().is_some() {
            return self;
        }
        Self::Context { source: Box::new(self), param: param.to_owned() }
    }
}

impl From<LiteralDiagnostic> for AbiError {
    fn from(diagnostic: LiteralDiagnostic) -> Self {
        Self::MalformedLiteral(Box::new(diagnostic))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptError {
    #[error("unknown ASM token '{0}'")]
    UnknownToken(String),
    #[error("unresolved template placeholder '{0}'")]
    UnresolvedPlaceholder(String),
    #[error("invalid hex: {0}")]
    InvalidHex(String),
    #[error("script ends inside a push at offset {offset}")]
    UnexpectedEnd { offset: usize },
}
