use std::io::Read;

use serde::{Deserialize, Serialize};

use crate::errors::AbiError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

impl ParamSpec {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self { name: name.into(), type_name: type_name.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructSchema {
    pub name: String,
    pub params: Vec<ParamSpec>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AbiEntryType {
    Constructor,
    Function,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbiEntry {
    #[serde(rename = "type")]
    pub kind: AbiEntryType,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    #[serde(default)]
    pub params: Vec<ParamSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugAsmWord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    pub opcode: String,
}

fn default_slot_naming() -> u32 {
    SlotNaming::V1.version()
}

/// Compiler output for one contract: ABI, struct schemas and the ASM template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractDescriptor {
    #[serde(default)]
    pub compiler_version: String,
    pub contract: String,
    #[serde(default)]
    pub md5: String,
    #[serde(default)]
    pub structs: Vec<StructSchema>,
    pub abi: Vec<AbiEntry>,
    pub asm: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug_asm: Option<Vec<DebugAsmWord>>,
    #[serde(default = "default_slot_naming")]
    pub slot_naming: u32,
}

impl ContractDescriptor {
    pub fn from_json(json: &str) -> Result<Self, AbiError> {
        let descriptor: Self = serde_json::from_str(json)?;
        descriptor.validate()?;
        Ok(descriptor)
    }

    pub fn from_reader(reader: impl Read) -> Result<Self, AbiError> {
        let descriptor: Self = serde_json::from_reader(reader)?;
        descriptor.validate()?;
        Ok(descriptor)
    }

    pub fn validate(&self) -> Result<(), AbiError> {
        if self.contract.trim().is_empty() {
            return Err(AbiError::Descriptor("contract name is empty".to_owned()));
        }
        if self.asm.trim().is_empty() {
            return Err(AbiError::Descriptor(format!("contract {} has no asm", self.contract)));
        }
        if self.abi.iter().filter(|entry| entry.kind == AbiEntryType::Constructor).count() > 1 {
            return Err(AbiError::Descriptor(format!("contract {} declares more than one constructor", self.contract)));
        }
        self.slot_naming()?;
        Ok(())
    }

    /// Constructor parameters; a descriptor without a constructor entry takes none.
    pub fn constructor_params(&self) -> &[ParamSpec] {
        self.abi.iter().find(|entry| entry.kind == AbiEntryType::Constructor).map(|entry| entry.params.as_slice()).unwrap_or(&[])
    }

    pub fn functions(&self) -> impl Iterator<Item = &AbiEntry> {
        self.abi.iter().filter(|entry| entry.kind == AbiEntryType::Function)
    }

    /// Looks up a public function together with its position among the public functions.
    pub fn function(&self, name: &str) -> Option<(usize, &AbiEntry)> {
        self.functions().enumerate().find(|(_, entry)| entry.name == name)
    }

    pub fn public_function_count(&self) -> usize {
        self.functions().count()
    }

    pub fn find_struct(&self, name: &str) -> Option<&StructSchema> {
        self.structs.iter().find(|schema| schema.name == name)
    }

    pub fn slot_naming(&self) -> Result<SlotNaming, AbiError> {
        SlotNaming::from_version(self.slot_naming)
    }
}

/// How flattened constructor slots are named inside the ASM template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SlotNaming {
    /// `base[i]` for array elements and `base.field` for struct members.
    #[default]
    V1,
}

impl SlotNaming {
    pub fn from_version(version: u32) -> Result<Self, AbiError> {
        match version {
            1 => Ok(Self::V1),
            other => Err(AbiError::UnsupportedSlotNaming(other)),
        }
    }

    pub fn version(self) -> u32 {
        match self {
            Self::V1 => 1,
        }
    }

    pub fn array_slot(self, base: &str, index: usize) -> String {
        match self {
            Self::V1 => format!("{base}[{index}]"),
        }
    }

    pub fn field_slot(self, base: &str, field: &str) -> String {
        match self {
            Self::V1 => format!("{base}.{field}"),
        }
    }
}
