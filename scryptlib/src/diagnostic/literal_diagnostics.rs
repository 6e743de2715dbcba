use std::collections::BTreeSet;

use super::literal::{ErrorSpan, LiteralDiagnostic, LiteralDiagnosticLabel, LiteralErrorInterpretation};
use crate::parser::Rule;

#[derive(Clone, Copy)]
enum SpanStrategy {
    AtFailure,
    EndOfInput,
}

impl SpanStrategy {
    fn resolve(self, input: &str, failure_pos: usize) -> ErrorSpan {
        let start = match self {
            Self::AtFailure => failure_pos.min(input.len()),
            Self::EndOfInput => input.len(),
        };
        ErrorSpan { start, end: start }
    }
}

#[derive(Clone, Copy)]
struct InterpretationSpec {
    interpretation: LiteralErrorInterpretation,
    span_strategy: SpanStrategy,
    expected_tokens_override: Option<&'static [&'static str]>,
    help: Option<&'static str>,
    primary_label: Option<&'static str>,
}

const UNCLASSIFIED_SPEC: InterpretationSpec = InterpretationSpec {
    interpretation: LiteralErrorInterpretation::Unclassified,
    span_strategy: SpanStrategy::AtFailure,
    expected_tokens_override: None,
    help: Some("expected a bool, an integer, b'<hex>' or a typed constructor such as PubKey(b'..')"),
    primary_label: None,
};

const INTERPRETATION_SPECS: &[InterpretationSpec] = &[
    InterpretationSpec {
        interpretation: LiteralErrorInterpretation::UnterminatedBytes,
        span_strategy: SpanStrategy::EndOfInput,
        expected_tokens_override: Some(&["'"]),
        help: Some("bytes literals are written b'<hex>' and must end with a quote"),
        primary_label: Some("expected closing quote"),
    },
    InterpretationSpec {
        interpretation: LiteralErrorInterpretation::UnclosedConstructor,
        span_strategy: SpanStrategy::EndOfInput,
        expected_tokens_override: Some(&[")"]),
        help: Some("typed literals are written Type(<value>) and must end with ')'"),
        primary_label: Some("expected ')' to close the constructor"),
    },
    UNCLASSIFIED_SPEC,
];

#[derive(Clone, Copy)]
struct InterpretationHeuristic {
    interpretation: LiteralErrorInterpretation,
    matches: fn(&str, &ParseAttemptData) -> bool,
}

const INTERPRETATION_HEURISTICS: &[InterpretationHeuristic] = &[
    InterpretationHeuristic { interpretation: LiteralErrorInterpretation::UnclosedConstructor, matches: misses_closing_paren },
    InterpretationHeuristic { interpretation: LiteralErrorInterpretation::UnterminatedBytes, matches: misses_closing_quote },
];

#[derive(Default)]
struct ParseAttemptData {
    expected_tokens: Vec<String>,
}

impl ParseAttemptData {
    fn from_error(err: &pest::error::Error<Rule>) -> Self {
        let Some(attempts) = err.parse_attempts() else {
            return Self::default();
        };
        let expected_tokens = attempts.expected_tokens().into_iter().map(|token| token.to_string()).collect::<Vec<_>>();
        Self { expected_tokens }
    }

    fn expects_token(&self, token: &str) -> bool {
        self.expected_tokens.iter().any(|candidate| candidate == token)
    }
}

pub(crate) fn interpret_parse_error(input: &str, err: &pest::error::Error<Rule>) -> LiteralDiagnostic {
    let failure_pos = error_start_offset(err);
    let attempt_data = ParseAttemptData::from_error(err);
    let interpretation = classify_interpretation(input, &attempt_data);
    let spec = interpretation_spec(interpretation);
    let span = spec.span_strategy.resolve(input, failure_pos);
    let primary_message = match interpretation {
        LiteralErrorInterpretation::Unclassified => format!("cannot parse literal `{input}`"),
        LiteralErrorInterpretation::UnterminatedBytes => "unterminated bytes literal".to_owned(),
        _ => "unclosed literal constructor".to_owned(),
    };

    let mut diagnostic = LiteralDiagnostic::new(interpretation, span, input, primary_message)
        .with_expected_tokens(normalize_expected_tokens(&attempt_data.expected_tokens, spec))
        .with_labels(primary_labels(spec, span));
    if let Some(help) = spec.help {
        diagnostic = diagnostic.with_help(help);
    }
    diagnostic
}

/// Hex body with an odd number of digits; `span` covers the digits.
pub(crate) fn invalid_hex_digits(input: &str, span: ErrorSpan) -> LiteralDiagnostic {
    let digits = span.end - span.start;
    LiteralDiagnostic::new(LiteralErrorInterpretation::OddHexLength, span, input, format!("odd number of hex digits ({digits})"))
        .with_labels(vec![LiteralDiagnosticLabel::new(span, "hex bytes need two digits each")])
        .with_help("pad the value with a leading zero")
}

pub(crate) fn oversized_sighash_flag(input: &str, span: ErrorSpan) -> LiteralDiagnostic {
    LiteralDiagnostic::new(LiteralErrorInterpretation::OversizedSigHashFlag, span, input, "sighash flag must be exactly one byte")
        .with_labels(vec![LiteralDiagnosticLabel::new(span, "flag bytes")])
        .with_help("use a single byte such as SigHashType(b'41')")
}

fn classify_interpretation(input: &str, attempt_data: &ParseAttemptData) -> LiteralErrorInterpretation {
    INTERPRETATION_HEURISTICS
        .iter()
        .find(|heuristic| (heuristic.matches)(input, attempt_data))
        .map(|heuristic| heuristic.interpretation)
        .unwrap_or(LiteralErrorInterpretation::Unclassified)
}

fn misses_closing_quote(input: &str, attempt_data: &ParseAttemptData) -> bool {
    input.contains("b'") && (input.matches('\'').count() % 2 == 1 || attempt_data.expects_token("'"))
}

fn misses_closing_paren(input: &str, attempt_data: &ParseAttemptData) -> bool {
    input.matches('(').count() > input.matches(')').count() || (input.contains('(') && attempt_data.expects_token(")"))
}

fn interpretation_spec(interpretation: LiteralErrorInterpretation) -> &'static InterpretationSpec {
    INTERPRETATION_SPECS.iter().find(|spec| spec.interpretation == interpretation).unwrap_or(&UNCLASSIFIED_SPEC)
}

fn normalize_expected_tokens(expected_tokens: &[String], spec: &InterpretationSpec) -> Vec<String> {
    if let Some(tokens) = spec.expected_tokens_override {
        return tokens.iter().map(|token| (*token).to_owned()).collect();
    }

    expected_tokens.iter().cloned().collect::<BTreeSet<_>>().into_iter().collect()
}

fn primary_labels(spec: &InterpretationSpec, span: ErrorSpan) -> Vec<LiteralDiagnosticLabel> {
    spec.primary_label.map(|label| vec![LiteralDiagnosticLabel::new(span, label)]).unwrap_or_default()
}

fn error_start_offset(err: &pest::error::Error<Rule>) -> usize {
    match err.location {
        pest::error::InputLocation::Pos(pos) => pos,
        pest::error::InputLocation::Span((start, _)) => start,
    }
}

pub(crate) fn unrecognized_literal(input: &str, span: ErrorSpan) -> LiteralDiagnostic {
    LiteralDiagnostic::new(LiteralErrorInterpretation::Unclassified, span, input, format!("cannot parse literal `{input}`"))
}
