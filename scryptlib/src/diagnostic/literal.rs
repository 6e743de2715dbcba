use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorSpan {
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum LiteralErrorInterpretation {
    UnterminatedBytes,
    UnclosedConstructor,
    OddHexLength,
    OversizedSigHashFlag,
    Unclassified,
}

impl LiteralErrorInterpretation {
    pub const fn code(self) -> &'static str {
        match self {
            Self::UnterminatedBytes => "unterminated_bytes",
            Self::UnclosedConstructor => "unclosed_constructor",
            Self::OddHexLength => "odd_hex_length",
            Self::OversizedSigHashFlag => "oversized_sighash_flag",
            Self::Unclassified => "literal_error",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "unterminated_bytes" => Some(Self::UnterminatedBytes),
            "unclosed_constructor" => Some(Self::UnclosedConstructor),
            "odd_hex_length" => Some(Self::OddHexLength),
            "oversized_sighash_flag" => Some(Self::OversizedSigHashFlag),
            "literal_error" => Some(Self::Unclassified),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralDiagnosticLabel {
    span: ErrorSpan,
    message: String,
}

impl LiteralDiagnosticLabel {
    pub fn new(span: ErrorSpan, message: impl Into<String>) -> Self {
        Self { span, message: message.into() }
    }

    pub fn span(&self) -> ErrorSpan {
        self.span
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Column (1-based, in characters) of a failure inside a single-line literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralDisplayLocation {
    column: usize,
    text: String,
}

impl LiteralDisplayLocation {
    pub fn new(column: usize, text: impl Into<String>) -> Self {
        Self { column, text: text.into() }
    }

    pub fn column(&self) -> usize {
        self.column
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralDiagnostic {
    interpretation: LiteralErrorInterpretation,
    span: ErrorSpan,
    primary_message: String,
    expected_tokens: Vec<String>,
    labels: Vec<LiteralDiagnosticLabel>,
    help: Option<String>,
    source_text: Box<str>,
}

impl LiteralDiagnostic {
    pub(crate) fn new(
        interpretation: LiteralErrorInterpretation,
        span: ErrorSpan,
        source_text: &str,
        primary_message: impl Into<String>,
    ) -> Self {
        Self {
            interpretation,
            span,
            primary_message: primary_message.into(),
            expected_tokens: Vec::new(),
            labels: Vec::new(),
            help: None,
            source_text: source_text.to_owned().into_boxed_str(),
        }
    }

    pub(crate) fn with_expected_tokens(mut self, expected_tokens: Vec<String>) -> Self {
        self.expected_tokens = expected_tokens;
        self
    }

    pub(crate) fn with_labels(mut self, labels: Vec<LiteralDiagnosticLabel>) -> Self {
        self.labels = labels;
        self
    }

    pub(crate) fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn code(&self) -> &'static str {
        self.interpretation.code()
    }

    pub fn interpretation(&self) -> LiteralErrorInterpretation {
        self.interpretation
    }

    pub fn span(&self) -> ErrorSpan {
        self.span
    }

    pub fn primary_message(&self) -> &str {
        &self.primary_message
    }

    pub fn expected_tokens(&self) -> &[String] {
        &self.expected_tokens
    }

    pub fn labels(&self) -> &[LiteralDiagnosticLabel] {
        &self.labels
    }

    pub fn help(&self) -> Option<&str> {
        self.help.as_deref()
    }

    pub fn source_text(&self) -> &str {
        &self.source_text
    }

    pub fn display_location(&self) -> LiteralDisplayLocation {
        let pos = self.span.start.min(self.source_text.len());
        let column = self.source_text.get(..pos).map(|prefix| prefix.chars().count()).unwrap_or(pos) + 1;
        LiteralDisplayLocation::new(column, self.source_text.to_string())
    }
}

impl fmt::Display for LiteralDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let location = self.display_location();
        let underline_pad = " ".repeat(location.column().saturating_sub(1));
        writeln!(f, "<{}> at column {}", location.text(), location.column())?;
        writeln!(f, " | {}", location.text())?;
        writeln!(f, " | {underline_pad}^---")?;
        writeln!(f, " = error: {}", self.primary_message)?;

        if !self.expected_tokens.is_empty() {
            let expected_tokens = self.expected_tokens.iter().map(|token| format!("`{token}`")).collect::<Vec<_>>().join(", ");
            writeln!(f, "   note: expected one of tokens: {expected_tokens}")?;
        }
        if let Some(help) = &self.help {
            writeln!(f, "   help: {help}")?;
        }

        Ok(())
    }
}

impl std::error::Error for LiteralDiagnostic {}
