pub mod abi;
pub mod contract;
pub mod debug;
pub mod descriptor;
pub mod diagnostic;
pub mod errors;
pub mod literal;
pub mod num;
pub mod opcodes;
pub mod parser;
pub mod script;
pub mod state;
pub mod template;
pub mod types;

pub use abi::{AbiCoder, CallScript, FunctionCall};
pub use contract::{Contract, ContractCall, ScriptVerifier, TxContext, VerifyFailure, VerifyResult};
pub use descriptor::ContractDescriptor;
pub use errors::{AbiError, ScriptError};
pub use script::Script;
pub use state::{StateOptions, StateRecord, StateShape, StateValue};
pub use types::{StructValue, TypedValue};
