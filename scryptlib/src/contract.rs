use std::collections::HashMap;
use std::ops::Deref;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::abi::{AbiCoder, FunctionCall};
use crate::debug::describe_failure;
use crate::descriptor::ContractDescriptor;
use crate::errors::AbiError;
use crate::script::Script;
use crate::state::{StateOptions, StateValue, serialize_state};
use crate::types::TypedValue;

pub const MISSING_UNLOCKING_SCRIPT: &str = "verification failed, missing unlockingScript";

/// Spending transaction the scripts are evaluated against.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TxContext {
    pub tx: Option<Vec<u8>>,
    pub input_index: Option<usize>,
    pub input_satoshis: Option<u64>,
}

impl TxContext {
    /// Fields set in `overrides` win; the rest come from `self`.
    pub fn merge(&self, overrides: &TxContext) -> TxContext {
        TxContext {
            tx: overrides.tx.clone().or_else(|| self.tx.clone()),
            input_index: overrides.input_index.or(self.input_index),
            input_satoshis: overrides.input_satoshis.or(self.input_satoshis),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct VerifyFailure {
    pub message: String,
    /// Number of words the interpreter executed before failing, if it reports one.
    pub pc: Option<usize>,
}

/// Script execution, supplied by the host.
pub trait ScriptVerifier {
    fn verify(&self, unlocking: &Script, locking: &Script, tx_context: &TxContext) -> Result<(), VerifyFailure>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl VerifyResult {
    pub fn ok() -> Self {
        Self { success: true, error: None }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self { success: false, error: Some(error.into()) }
    }
}

/// A deployed instance: the constructor call plus an optional data part after `OP_RETURN`.
#[derive(Debug, Clone)]
pub struct Contract {
    coder: Arc<AbiCoder>,
    constructor: FunctionCall,
    data_part: Option<String>,
    tx_context: TxContext,
}

impl Contract {
    pub fn new(coder: Arc<AbiCoder>, args: &[TypedValue]) -> Result<Self, AbiError> {
        let constructor = coder.encode_constructor_call(args)?;
        Ok(Self { coder, constructor, data_part: None, tx_context: TxContext::default() })
    }

    pub fn from_descriptor(descriptor: Arc<ContractDescriptor>, args: &[TypedValue]) -> Result<Self, AbiError> {
        Self::new(Arc::new(AbiCoder::new(descriptor)?), args)
    }

    pub fn name(&self) -> &str {
        &self.coder.descriptor().contract
    }

    pub fn coder(&self) -> &AbiCoder {
        &self.coder
    }

    pub fn constructor(&self) -> &FunctionCall {
        &self.constructor
    }

    pub fn locking_script_asm(&self) -> String {
        match &self.data_part {
            Some(data) => format!("{} OP_RETURN {data}", self.constructor.to_asm()).trim().to_owned(),
            None => self.constructor.to_asm().trim().to_owned(),
        }
    }

    pub fn locking_script(&self) -> Result<Script, AbiError> {
        Ok(Script::from_asm(&self.locking_script_asm())?)
    }

    pub fn code_part_asm(&self) -> String {
        format!("{} OP_RETURN", self.constructor.to_asm())
    }

    pub fn code_part(&self) -> Result<Script, AbiError> {
        Ok(Script::from_asm(&self.code_part_asm())?)
    }

    pub fn set_data_part_asm(&mut self, asm: &str) {
        self.data_part = Some(asm.trim().to_owned());
    }

    pub fn set_data_part(&mut self, data: &Script) {
        self.data_part = Some(data.to_asm());
    }

    pub fn set_state(&mut self, values: &[StateValue]) -> Result<(), AbiError> {
        self.set_state_with(values, StateOptions::default())
    }

    pub fn set_state_with(&mut self, values: &[StateValue], options: StateOptions) -> Result<(), AbiError> {
        self.data_part = Some(serialize_state(values, options)?.to_asm());
        Ok(())
    }

    pub fn data_part_asm(&self) -> Option<&str> {
        self.data_part.as_deref()
    }

    pub fn data_part(&self) -> Result<Option<Script>, AbiError> {
        self.data_part.as_deref().map(Script::from_asm).transpose().map_err(AbiError::from)
    }

    pub fn tx_context(&self) -> &TxContext {
        &self.tx_context
    }

    pub fn set_tx_context(&mut self, tx_context: TxContext) {
        self.tx_context = tx_context;
    }

    /// Substitutes values for placeholders the constructor left unbound.
    pub fn replace_asm_vars(&mut self, vars: &HashMap<String, String>) {
        self.constructor = self.constructor.with_asm_vars(vars);
    }

    /// Recovers placeholder values by aligning the template's words with this instance's words.
    pub fn asm_vars(&self) -> Option<HashMap<String, String>> {
        let template = &self.coder.descriptor().asm;
        let instance = self.constructor.to_asm().split_whitespace().collect::<Vec<_>>();
        let vars = template
            .split_whitespace()
            .enumerate()
            .filter_map(|(pos, word)| {
                let name = word.strip_prefix('$').filter(|name| !name.is_empty())?;
                Some((name.to_owned(), instance.get(pos).map(|value| (*value).to_owned())))
            })
            .collect::<Vec<_>>();
        if vars.is_empty() {
            return None;
        }
        Some(vars.into_iter().filter_map(|(name, value)| Some((name, value?))).collect())
    }

    pub fn method(&self, name: &str, args: &[TypedValue]) -> Result<ContractCall<'_>, AbiError> {
        let call = self.coder.encode_method_call(name, args)?;
        Ok(ContractCall { contract: self, call })
    }

    pub fn constructor_call(&self) -> ContractCall<'_> {
        ContractCall { contract: self, call: self.constructor.clone() }
    }

    /// Runs `unlocking_asm` against this instance's locking script. Interpreter failures are reported in
    /// the result; malformed scripts are errors.
    pub fn run_verify(
        &self,
        unlocking_asm: &str,
        verifier: &dyn ScriptVerifier,
        tx_context: Option<&TxContext>,
    ) -> Result<VerifyResult, AbiError> {
        let tx_context = match tx_context {
            Some(overrides) => self.tx_context.merge(overrides),
            None => self.tx_context.clone(),
        };
        let unlocking = Script::from_asm(unlocking_asm)?;
        let locking = self.locking_script()?;

        let Err(failure) = verifier.verify(&unlocking, &locking, &tx_context) else {
            return Ok(VerifyResult::ok());
        };
        debug!(contract = self.name(), pc = ?failure.pc, error = %failure.message, "script verification failed");

        let words = self.coder.descriptor().debug_asm.as_deref();
        let enriched = words.zip(failure.pc).and_then(|(words, pc)| describe_failure(self.name(), words, pc, &failure.message));
        Ok(VerifyResult::failed(enriched.unwrap_or(failure.message)))
    }
}

/// A call bound to the contract instance it will be verified against.
#[derive(Debug, Clone)]
pub struct ContractCall<'c> {
    contract: &'c Contract,
    call: FunctionCall,
}

impl<'c> ContractCall<'c> {
    pub fn contract(&self) -> &'c Contract {
        self.contract
    }

    pub fn into_call(self) -> FunctionCall {
        self.call
    }

    pub fn verify(&self, verifier: &dyn ScriptVerifier, tx_context: Option<&TxContext>) -> Result<VerifyResult, AbiError> {
        match self.call.unlocking_asm() {
            Some(asm) => self.contract.run_verify(asm, verifier, tx_context),
            None => Ok(VerifyResult::failed(MISSING_UNLOCKING_SCRIPT)),
        }
    }
}

impl Deref for ContractCall<'_> {
    type Target = FunctionCall;

    fn deref(&self) -> &FunctionCall {
        &self.call
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn shared_types_are_send_and_sync() {
        assert_send_sync::<Contract>();
        assert_send_sync::<AbiCoder>();
        assert_send_sync::<FunctionCall>();
        assert_send_sync::<ContractCall<'static>>();
    }

    #[test]
    fn later_context_fields_win() {
        let base = TxContext { tx: Some(vec![1]), input_index: Some(0), input_satoshis: Some(1000) };
        let merged = base.merge(&TxContext { input_index: Some(2), ..TxContext::default() });
        assert_eq!(merged, TxContext { tx: Some(vec![1]), input_index: Some(2), input_satoshis: Some(1000) });
    }
}
