use std::fs;
use std::path::Path;

use crate::descriptor::DebugAsmWord;

/// Source position of a failing opcode, resolved through the descriptor's `debugAsm`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureLocation {
    pub file: String,
    pub line: u32,
    pub opcode: String,
}

fn is_mappable(word: &DebugAsmWord) -> bool {
    word.file.as_deref().is_some_and(|file| !file.is_empty()) && word.line.is_some_and(|line| line > 0)
}

/// Nearest word before `index` that carries a file and a positive line.
pub fn find_mappable_word(words: &[DebugAsmWord], index: usize) -> Option<&DebugAsmWord> {
    words.get(..index.min(words.len()))?.iter().rev().find(|word| is_mappable(word))
}

/// Maps the interpreter's program counter to a source location. `pc` counts executed words, so the
/// failing word is `pc - 1`; words without a position borrow the nearest earlier mapped one.
pub fn locate_failure(words: &[DebugAsmWord], pc: usize) -> Option<FailureLocation> {
    let index = pc.checked_sub(1)?;
    let word = words.get(index)?;
    let mapped = if is_mappable(word) { word } else { find_mappable_word(words, index)? };
    Some(FailureLocation { file: mapped.file.clone()?, line: mapped.line?, opcode: word.opcode.clone() })
}

/// Reads one 1-based line of a source file.
pub fn read_source_line(file: impl AsRef<Path>, line: u32) -> Option<String> {
    let text = fs::read_to_string(file).ok()?;
    let index = usize::try_from(line).ok()?.checked_sub(1)?;
    text.lines().nth(index).map(str::to_owned)
}

pub fn format_verify_error(message: &str, contract: &str, location: &FailureLocation, source_line: Option<&str>) -> String {
    let text = source_line.map(str::trim).unwrap_or_default();
    format!("VerifyError: {message} on contract:{contract} line:{}:{text} opcode:{}\n", location.line, location.opcode)
}

/// Enriches an interpreter error with the contract source line it came from, when the words allow it.
pub fn describe_failure(contract: &str, words: &[DebugAsmWord], pc: usize, message: &str) -> Option<String> {
    let location = locate_failure(words, pc)?;
    let source_line = read_source_line(&location.file, location.line);
    if source_line.is_none() {
        tracing::debug!(file = %location.file, line = location.line, "source line unavailable");
    }
    Some(format_verify_error(message, contract, &location, source_line.as_deref()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(file: Option<&str>, line: Option<u32>, opcode: &str) -> DebugAsmWord {
        DebugAsmWord { file: file.map(str::to_owned), line, opcode: opcode.to_owned() }
    }

    #[test]
    fn unmapped_words_borrow_earlier_position() {
        let words = vec![
            word(Some("demo.scrypt"), Some(3), "OP_DUP"),
            word(None, None, "OP_ADD"),
            word(Some("demo.scrypt"), Some(0), "OP_1"),
            word(None, None, "OP_NUMEQUAL"),
        ];
        let location = locate_failure(&words, 4).expect("maps to line 3");
        assert_eq!(location, FailureLocation { file: "demo.scrypt".to_owned(), line: 3, opcode: "OP_NUMEQUAL".to_owned() });
        assert!(locate_failure(&words, 0).is_none());
        assert!(locate_failure(&words, 9).is_none());
        assert!(find_mappable_word(&words, 0).is_none());
    }

    #[test]
    fn formats_error_with_trimmed_line() {
        let location = FailureLocation { file: "demo.scrypt".to_owned(), line: 7, opcode: "OP_VERIFY".to_owned() };
        let text = format_verify_error("SCRIPT_ERR_VERIFY", "Demo", &location, Some("    require(x == y);"));
        assert_eq!(text, "VerifyError: SCRIPT_ERR_VERIFY on contract:Demo line:7:require(x == y); opcode:OP_VERIFY\n");
    }

    #[test]
    fn reads_source_lines() {
        let path = std::env::temp_dir().join(format!("scryptlib-debug-{}.scrypt", std::process::id()));
        fs::write(&path, "contract Demo {\n  public function unlock(int x) {\n    require(x == 1);\n  }\n}\n").expect("write source");
        assert_eq!(read_source_line(&path, 3).as_deref(), Some("    require(x == 1);"));
        assert_eq!(read_source_line(&path, 0), None);
        assert_eq!(read_source_line(&path, 40), None);
        fs::remove_file(&path).expect("remove source");
    }
}
