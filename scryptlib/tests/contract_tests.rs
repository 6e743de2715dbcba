use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::sync::Arc;

use scryptlib::contract::{Contract, MISSING_UNLOCKING_SCRIPT, ScriptVerifier, TxContext, VerifyFailure};
use scryptlib::descriptor::ContractDescriptor;
use scryptlib::script::Script;
use scryptlib::state::{StateKind, StateOptions, StateRecord, StateShape, StateValue, deserialize_state_as};
use scryptlib::types::TypedValue;

#[derive(Default)]
struct RecordingVerifier {
    failure: Option<VerifyFailure>,
    seen: RefCell<Vec<(String, String, TxContext)>>,
}

impl ScriptVerifier for RecordingVerifier {
    fn verify(&self, unlocking: &Script, locking: &Script, tx_context: &TxContext) -> Result<(), VerifyFailure> {
        self.seen.borrow_mut().push((unlocking.to_asm(), locking.to_asm(), tx_context.clone()));
        match &self.failure {
            Some(failure) => Err(failure.clone()),
            None => Ok(()),
        }
    }
}

fn counter_descriptor(debug_asm: &str) -> Arc<ContractDescriptor> {
    let json = format!(
        r#"{{
            "compilerVersion": "0.4.0",
            "contract": "Counter",
            "md5": "",
            "structs": [],
            "abi": [
                {{ "type": "function", "name": "increment", "index": 0, "params": [{{ "name": "amount", "type": "int" }}] }},
                {{ "type": "function", "name": "reset", "index": 1, "params": [] }},
                {{ "type": "constructor", "params": [{{ "name": "owner", "type": "PubKey" }}] }}
            ],
            "asm": "$owner OP_DROP $salt OP_DROP OP_1"
            {debug_asm}
        }}"#
    );
    Arc::new(ContractDescriptor::from_json(&json).expect("descriptor parses"))
}

fn counter(debug_asm: &str) -> Contract {
    let owner = TypedValue::PubKey(vec![0x02, 0xaa]);
    Contract::from_descriptor(counter_descriptor(debug_asm), &[owner]).expect("counter builds")
}

#[test]
fn locking_script_carries_data_part() {
    let mut contract = counter("");
    assert_eq!(contract.name(), "Counter");
    assert_eq!(contract.locking_script_asm(), "02aa OP_DROP $salt OP_DROP OP_1");
    assert!(contract.locking_script().is_err());

    contract.replace_asm_vars(&HashMap::from([("salt".to_owned(), "0102".to_owned())]));
    assert_eq!(contract.code_part_asm(), "02aa OP_DROP 0102 OP_DROP OP_1 OP_RETURN");
    assert_eq!(contract.code_part().expect("code part").len(), 6);

    contract.set_state(&[StateValue::from(7), StateValue::from(true)]).expect("state serializes");
    assert_eq!(contract.locking_script_asm(), "02aa OP_DROP 0102 OP_DROP OP_1 OP_RETURN 07 OP_1 0300");

    let shape = StateShape::new().field("count", StateKind::Int).field("live", StateKind::Bool);
    let record = deserialize_state_as(&contract.locking_script().expect("locking script"), &shape).expect("state reads back");
    assert_eq!(record.get("count"), Some(&StateValue::from(7)));

    let record = StateRecord::new().with("count", 8).with("live", false);
    contract.set_data_part(&record.to_script(StateOptions::default()).expect("record serializes"));
    assert_eq!(contract.data_part_asm(), Some("08 OP_0 0300"));

    contract.set_data_part_asm("  OP_0 0100 ");
    assert_eq!(contract.data_part_asm(), Some("OP_0 0100"));
    assert_eq!(contract.data_part().expect("data part").map(|script| script.len()), Some(2));
}

#[test]
fn asm_vars_align_template_with_instance() {
    let mut contract = counter("");
    contract.replace_asm_vars(&HashMap::from([("salt".to_owned(), "ff".to_owned())]));
    let vars = contract.asm_vars().expect("template has placeholders");
    assert_eq!(vars.get("owner").map(String::as_str), Some("02aa"));
    assert_eq!(vars.get("salt").map(String::as_str), Some("ff"));
}

#[test]
fn verify_passes_scripts_and_merged_context() {
    let mut contract = counter("");
    contract.replace_asm_vars(&HashMap::from([("salt".to_owned(), "00".to_owned())]));
    contract.set_tx_context(TxContext { tx: Some(vec![0x01]), input_index: Some(0), input_satoshis: Some(5000) });

    let verifier = RecordingVerifier::default();
    let call = contract.method("increment", &[TypedValue::from(3)]).expect("increment binds");
    assert_eq!(call.to_asm(), "OP_3 OP_0");

    let result = call.verify(&verifier, Some(&TxContext { input_index: Some(1), ..TxContext::default() })).expect("scripts parse");
    assert!(result.success);
    assert_eq!(result.error, None);

    let seen = verifier.seen.borrow();
    let (unlocking, locking, tx_context) = &seen[0];
    assert_eq!(unlocking, "OP_3 OP_0");
    assert_eq!(locking, "02aa OP_DROP 00 OP_DROP OP_1");
    assert_eq!(tx_context, &TxContext { tx: Some(vec![0x01]), input_index: Some(1), input_satoshis: Some(5000) });
}

#[test]
fn constructor_call_cannot_be_verified() {
    let contract = counter("");
    let result = contract.constructor_call().verify(&RecordingVerifier::default(), None).expect("no scripts are parsed");
    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some(MISSING_UNLOCKING_SCRIPT));
}

#[test]
fn failure_without_debug_info_keeps_interpreter_message() {
    let mut contract = counter("");
    contract.replace_asm_vars(&HashMap::from([("salt".to_owned(), "00".to_owned())]));
    let failure = VerifyFailure { message: "SCRIPT_ERR_EVAL_FALSE".to_owned(), pc: Some(3) };
    let verifier = RecordingVerifier { failure: Some(failure), ..Default::default() };
    let result = contract.method("reset", &[]).expect("reset binds").verify(&verifier, None).expect("scripts parse");
    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("SCRIPT_ERR_EVAL_FALSE"));
}

#[test]
fn failure_with_debug_info_names_source_line() {
    let source = std::env::temp_dir().join(format!("scryptlib-counter-{}.scrypt", std::process::id()));
    let text = "contract Counter {\n  public function increment(int amount) {\n    require(amount > 0);\n  }\n}\n";
    fs::write(&source, text).expect("write source");
    let file = source.display().to_string().replace('\\', "\\\\");
    let debug_asm = format!(
        r#", "debugAsm": [
            {{ "file": "{file}", "line": 3, "opcode": "OP_DROP" }},
            {{ "opcode": "OP_DROP" }},
            {{ "opcode": "OP_VERIFY" }}
        ]"#
    );

    let mut contract = counter(&debug_asm);
    contract.replace_asm_vars(&HashMap::from([("salt".to_owned(), "00".to_owned())]));
    let failure = VerifyFailure { message: "SCRIPT_ERR_VERIFY".to_owned(), pc: Some(3) };
    let verifier = RecordingVerifier { failure: Some(failure), ..Default::default() };
    let call = contract.method("increment", &[TypedValue::from(0)]).expect("increment binds");
    let result = call.verify(&verifier, None).expect("scripts parse");
    fs::remove_file(&source).expect("remove source");

    assert!(!result.success);
    assert_eq!(
        result.error.as_deref(),
        Some("VerifyError: SCRIPT_ERR_VERIFY on contract:Counter line:3:require(amount > 0); opcode:OP_VERIFY\n")
    );
}

#[test]
fn malformed_unlocking_asm_is_an_error() {
    let mut contract = counter("");
    contract.replace_asm_vars(&HashMap::from([("salt".to_owned(), "00".to_owned())]));
    assert!(contract.run_verify("OP_BOGUS", &RecordingVerifier::default(), None).is_err());
}
