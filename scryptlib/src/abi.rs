use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use num_bigint::BigInt;
use tracing::{debug, trace};

use crate::descriptor::{AbiEntry, AbiEntryType, ContractDescriptor, ParamSpec, SlotNaming, StructSchema};
use crate::errors::AbiError;
use crate::num::int_to_asm;
use crate::script::Script;
use crate::template::AsmTemplate;
use crate::types::{TypeSpec, TypedValue};

pub const CONSTRUCTOR: &str = "constructor";

/// The rendered side of a call. A constructor produces a locking script, a public function an unlocking one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallScript {
    Locking(String),
    Unlocking(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionCall {
    method_name: String,
    args: Vec<TypedValue>,
    script: CallScript,
}

impl FunctionCall {
    pub fn new(method_name: impl Into<String>, args: Vec<TypedValue>, script: CallScript) -> Self {
        Self { method_name: method_name.into(), args, script }
    }

    pub fn method_name(&self) -> &str {
        &self.method_name
    }

    pub fn args(&self) -> &[TypedValue] {
        &self.args
    }

    pub fn script(&self) -> &CallScript {
        &self.script
    }

    pub fn is_constructor(&self) -> bool {
        matches!(self.script, CallScript::Locking(_))
    }

    pub fn to_asm(&self) -> &str {
        match &self.script {
            CallScript::Locking(asm) | CallScript::Unlocking(asm) => asm,
        }
    }

    pub fn locking_asm(&self) -> Option<&str> {
        match &self.script {
            CallScript::Locking(asm) => Some(asm),
            CallScript::Unlocking(_) => None,
        }
    }

    pub fn unlocking_asm(&self) -> Option<&str> {
        match &self.script {
            CallScript::Unlocking(asm) => Some(asm),
            CallScript::Locking(_) => None,
        }
    }

    pub fn to_script(&self) -> Result<Script, AbiError> {
        Ok(Script::from_asm(self.to_asm())?)
    }

    pub fn locking_script(&self) -> Result<Option<Script>, AbiError> {
        self.locking_asm().map(Script::from_asm).transpose().map_err(AbiError::from)
    }

    pub fn unlocking_script(&self) -> Result<Option<Script>, AbiError> {
        self.unlocking_asm().map(Script::from_asm).transpose().map_err(AbiError::from)
    }

    pub fn to_hex(&self) -> Result<String, AbiError> {
        Ok(self.to_script()?.to_hex())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, AbiError> {
        Ok(self.to_script()?.to_bytes())
    }

    /// Fills placeholders left open at bind time. The call itself is unchanged.
    pub fn with_asm_vars(&self, vars: &HashMap<String, String>) -> FunctionCall {
        let asm = AsmTemplate::parse(self.to_asm()).substitute(vars);
        let script = match self.script {
            CallScript::Locking(_) => CallScript::Locking(asm),
            CallScript::Unlocking(_) => CallScript::Unlocking(asm),
        };
        FunctionCall { method_name: self.method_name.clone(), args: self.args.clone(), script }
    }
}

impl fmt::Display for FunctionCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_asm())
    }
}

fn check_arity(method: &str, expected: usize, actual: usize) -> Result<(), AbiError> {
    if expected != actual {
        return Err(AbiError::ArityMismatch { method: method.to_owned(), expected, actual });
    }
    Ok(())
}

fn conform_param(param: &ParamSpec, arg: &TypedValue, structs: &[StructSchema]) -> Result<TypedValue, AbiError> {
    let spec = TypeSpec::parse(&param.type_name).map_err(|err| err.in_param(&param.name))?;
    arg.conform(&spec, structs).map_err(|err| err.in_param(&param.name))
}

fn flatten_slots(naming: SlotNaming, slot: String, value: TypedValue, leaves: &mut Vec<(String, TypedValue)>) {
    match value {
        TypedValue::Array(items) => {
            for (index, item) in items.into_iter().enumerate() {
                flatten_slots(naming, naming.array_slot(&slot, index), item, leaves);
            }
        }
        TypedValue::Struct(value) => {
            for (field, item) in value.fields() {
                flatten_slots(naming, naming.field_slot(&slot, field), item.clone(), leaves);
            }
        }
        leaf => leaves.push((slot, leaf)),
    }
}

/// Binds constructor arguments into the contract's ASM template.
///
/// Arrays and structs are flattened into one slot per scalar (`arr[0]`, `p.age`, ...) and every slot
/// must occur in the template. Placeholders the call does not bind stay in the output.
pub fn bind_constructor(
    template: &AsmTemplate,
    params: &[ParamSpec],
    structs: &[StructSchema],
    naming: SlotNaming,
    args: &[TypedValue],
) -> Result<FunctionCall, AbiError> {
    check_arity(CONSTRUCTOR, params.len(), args.len())?;

    let mut leaves = Vec::new();
    for (param, arg) in params.iter().zip(args) {
        let value = conform_param(param, arg, structs)?;
        flatten_slots(naming, param.name.clone(), value, &mut leaves);
    }

    let mut values = HashMap::with_capacity(leaves.len());
    for (slot, leaf) in leaves {
        if !template.has_slot(&slot) {
            return Err(AbiError::MissingTemplateSlot(slot));
        }
        let asm = leaf.to_asm().map_err(|err| err.in_param(&slot))?;
        trace!(slot = %slot, asm = %asm, "bound constructor slot");
        values.insert(slot, asm);
    }

    let asm = template.substitute(&values);
    debug!(slots = values.len(), "encoded constructor call");
    Ok(FunctionCall::new(CONSTRUCTOR, args.to_vec(), CallScript::Locking(asm)))
}

/// Encodes the unlocking ASM for a public function: the arguments in order, then the selector when the
/// contract has more than one public function.
pub fn bind_method(abi: &[AbiEntry], structs: &[StructSchema], name: &str, args: &[TypedValue]) -> Result<FunctionCall, AbiError> {
    let is_function = |entry: &&AbiEntry| entry.kind == AbiEntryType::Function;
    let (position, entry) = abi
        .iter()
        .filter(is_function)
        .enumerate()
        .find(|(_, entry)| entry.name == name)
        .ok_or_else(|| AbiError::UnknownMethod(name.to_owned()))?;
    check_arity(name, entry.params.len(), args.len())?;

    let mut parts = Vec::with_capacity(args.len() + 1);
    for (param, arg) in entry.params.iter().zip(args) {
        let asm = conform_param(param, arg, structs)?.to_asm().map_err(|err| err.in_param(&param.name))?;
        if !asm.is_empty() {
            parts.push(asm);
        }
    }

    if abi.iter().filter(is_function).count() > 1 {
        let selector = entry.index.unwrap_or(position);
        parts.push(int_to_asm(&BigInt::from(selector)));
    }

    let asm = parts.join(" ");
    debug!(method = name, asm = %asm, "encoded method call");
    Ok(FunctionCall::new(name, args.to_vec(), CallScript::Unlocking(asm)))
}

/// Descriptor-bound encoder, shared read-only by every instance of a contract.
#[derive(Debug, Clone)]
pub struct AbiCoder {
    descriptor: Arc<ContractDescriptor>,
    template: AsmTemplate,
    naming: SlotNaming,
}

impl AbiCoder {
    pub fn new(descriptor: Arc<ContractDescriptor>) -> Result<Self, AbiError> {
        let naming = descriptor.slot_naming()?;
        let template = AsmTemplate::parse(&descriptor.asm);
        Ok(Self { descriptor, template, naming })
    }

    pub fn descriptor(&self) -> &ContractDescriptor {
        &self.descriptor
    }

    pub fn template(&self) -> &AsmTemplate {
        &self.template
    }

    pub fn encode_constructor_call(&self, args: &[TypedValue]) -> Result<FunctionCall, AbiError> {
        bind_constructor(&self.template, self.descriptor.constructor_params(), &self.descriptor.structs, self.naming, args)
    }

    pub fn encode_method_call(&self, name: &str, args: &[TypedValue]) -> Result<FunctionCall, AbiError> {
        bind_method(&self.descriptor.abi, &self.descriptor.structs, name, args)
    }
}
