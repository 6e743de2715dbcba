use pest::Parser;
use pest::iterators::Pairs;
use pest_derive::Parser;

use crate::errors::LiteralDiagnostic;

#[derive(Parser)]
#[grammar = "literal.pest"]
pub struct LiteralParser;

pub fn parse_literal_text(input: &str) -> Result<Pairs<'_, Rule>, LiteralDiagnostic> {
    pest::set_error_detail(true);
    LiteralParser::parse(Rule::literal, input).map_err(|err| crate::diagnostic::interpret_parse_error(input, &err))
}
