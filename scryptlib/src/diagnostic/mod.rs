mod literal;
mod literal_diagnostics;

pub use literal::{ErrorSpan, LiteralDiagnostic, LiteralDiagnosticLabel, LiteralDisplayLocation, LiteralErrorInterpretation};
pub(crate) use literal_diagnostics::{interpret_parse_error, invalid_hex_digits, oversized_sighash_flag, unrecognized_literal};
