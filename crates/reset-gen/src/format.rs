//! Canonical formatting of generated Go source.

use std::io::{ErrorKind, Write};
use std::iter::Peekable;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::str::Chars;

use crate::error::FormatError;

/// Strategy for turning a generated buffer into its canonical form.
pub trait Formatter {
    fn format(&self, source: &[u8]) -> Result<Vec<u8>, FormatError>;
}

/// Built-in formatter: tab indentation by nesting depth and normalized blank
/// lines. Token spacing is left as generated.
#[derive(Debug, Clone, Copy, Default)]
pub struct CanonicalFormatter;

impl CanonicalFormatter {
    pub fn new() -> Self {
        Self
    }
}

impl Formatter for CanonicalFormatter {
    fn format(&self, source: &[u8]) -> Result<Vec<u8>, FormatError> {
        let source = String::from_utf8(source.to_vec())?;
        Ok(canonicalize(&source)?.into_bytes())
    }
}

/// Runs an external `gofmt` over the buffer.
#[derive(Debug, Clone)]
pub struct Gofmt {
    program: PathBuf,
}

impl Default for Gofmt {
    fn default() -> Self {
        Self::new()
    }
}

impl Gofmt {
    /// Use `gofmt` from `PATH`.
    pub fn new() -> Self {
        Self::with_program("gofmt")
    }

    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Formatter for Gofmt {
    fn format(&self, source: &[u8]) -> Result<Vec<u8>, FormatError> {
        let spawn_error = |source| FormatError::Spawn {
            program: self.program.clone(),
            source,
        };

        let mut child = Command::new(&self.program)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_error)?;

        // gofmt reads its whole input before writing anything.
        if let Some(mut stdin) = child.stdin.take() {
            match stdin.write_all(source) {
                Ok(()) => {}
                // Exited before reading everything; its status tells why.
                Err(err) if err.kind() == ErrorKind::BrokenPipe => {}
                Err(err) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(spawn_error(err));
                }
            }
        }
        let output = child.wait_with_output().map_err(spawn_error)?;

        if !output.status.success() {
            return Err(FormatError::Gofmt {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim_end().to_string(),
            });
        }
        Ok(output.stdout)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Code,
    RawString,
    BlockComment,
}

/// Tracks open delimiters and multi-line tokens across lines.
#[derive(Debug)]
struct Scanner {
    mode: Mode,
    stack: Vec<char>,
}

impl Scanner {
    fn new() -> Self {
        Self {
            mode: Mode::Code,
            stack: Vec::new(),
        }
    }

    fn scan_line(&mut self, line: &str, number: usize) -> Result<(), FormatError> {
        let mut chars = line.chars().peekable();
        while let Some(c) = chars.next() {
            match self.mode {
                Mode::RawString => {
                    if c == '`' {
                        self.mode = Mode::Code;
                    }
                }
                Mode::BlockComment => {
                    if c == '*' && chars.peek() == Some(&'/') {
                        chars.next();
                        self.mode = Mode::Code;
                    }
                }
                Mode::Code => match c {
                    '/' if chars.peek() == Some(&'/') => break,
                    '/' if chars.peek() == Some(&'*') => {
                        chars.next();
                        self.mode = Mode::BlockComment;
                    }
                    '`' => self.mode = Mode::RawString,
                    '"' | '\'' => skip_quoted(&mut chars, c)?,
                    '{' | '(' | '[' => self.stack.push(c),
                    '}' | ')' | ']' => {
                        if self.stack.pop() != Some(opener(c)) {
                            return Err(FormatError::Unbalanced {
                                line: number,
                                delimiter: c,
                            });
                        }
                    }
                    _ => {}
                },
            }
        }
        Ok(())
    }

    fn finish(self) -> Result<(), FormatError> {
        match self.mode {
            Mode::RawString => Err(FormatError::Unclosed { delimiter: '`' }),
            Mode::BlockComment => Err(FormatError::Unclosed { delimiter: '*' }),
            Mode::Code => match self.stack.last() {
                Some(&delimiter) => Err(FormatError::Unclosed { delimiter }),
                None => Ok(()),
            },
        }
    }
}

fn opener(closer: char) -> char {
    match closer {
        '}' => '{',
        ')' => '(',
        _ => '[',
    }
}

fn skip_quoted(chars: &mut Peekable<Chars>, quote: char) -> Result<(), FormatError> {
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            c if c == quote => return Ok(()),
            _ => {}
        }
    }
    Err(FormatError::Unclosed { delimiter: quote })
}

fn leading_closers(line: &str) -> usize {
    line.chars()
        .take_while(|c| matches!(c, '}' | ')' | ']'))
        .count()
}

fn canonicalize(source: &str) -> Result<String, FormatError> {
    let mut scanner = Scanner::new();
    let mut lines: Vec<String> = Vec::new();
    let mut pending_blank = false;

    for (index, raw) in source.lines().enumerate() {
        let number = index + 1;

        // Inside multi-line tokens the text is kept as written.
        if scanner.mode != Mode::Code {
            let verbatim = if scanner.mode == Mode::RawString {
                raw.to_string()
            } else {
                raw.trim_end().to_string()
            };
            scanner.scan_line(raw, number)?;
            lines.push(verbatim);
            continue;
        }

        let text = raw.trim();
        if text.is_empty() {
            pending_blank = !lines.is_empty();
            continue;
        }

        if pending_blank {
            let after_opener = lines
                .last()
                .is_some_and(|prev| prev.ends_with('{') || prev.ends_with('('));
            if !after_opener && leading_closers(text) == 0 {
                lines.push(String::new());
            }
            pending_blank = false;
        }

        let indent = scanner.stack.len().saturating_sub(leading_closers(text));
        let mut line = "\t".repeat(indent);
        line.push_str(text);
        lines.push(line);

        scanner.scan_line(text, number)?;
    }
    scanner.finish()?;

    if lines.is_empty() {
        return Ok(String::new());
    }
    let mut out = lines.join("\n");
    out.push('\n');
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format(source: &str) -> Result<String, FormatError> {
        CanonicalFormatter::new()
            .format(source.as_bytes())
            .map(|bytes| String::from_utf8(bytes).unwrap())
    }

    #[test]
    fn test_reindents_by_depth() {
        let source = "package model\n\nfunc (obj *A) Reset() {\n  if obj == nil {\n return\n}\n    obj.X = 0\n      }\n";
        assert_eq!(
            format(source).unwrap(),
            "package model\n\nfunc (obj *A) Reset() {\n\tif obj == nil {\n\t\treturn\n\t}\n\tobj.X = 0\n}\n"
        );
    }

    #[test]
    fn test_blank_lines_normalized() {
        let source = "\n\n// banner\n\n\n\npackage model\n\nimport (\n\n\t\"time\"\n\n)\n\nfunc f() {\n\n\tx := 1\n\n\n\t_ = x\n\n}\n\n\n";
        assert_eq!(
            format(source).unwrap(),
            "// banner\n\npackage model\n\nimport (\n\t\"time\"\n)\n\nfunc f() {\n\tx := 1\n\n\t_ = x\n}\n"
        );
    }

    #[test]
    fn test_delimiters_in_literals_and_comments_ignored() {
        let source = "func f() {\ns := \"}{\"\nr := '}'\n// }\n/* { */\nt := `{`\n}\n";
        assert_eq!(
            format(source).unwrap(),
            "func f() {\n\ts := \"}{\"\n\tr := '}'\n\t// }\n\t/* { */\n\tt := `{`\n}\n"
        );
    }

    #[test]
    fn test_raw_string_kept_verbatim() {
        let source = "var s = `a\n   {\n\n b`\nvar t = 1\n";
        assert_eq!(format(source).unwrap(), "var s = `a\n   {\n\n b`\nvar t = 1\n");
    }

    #[test]
    fn test_closers_on_one_line() {
        let source = "var x = f(g(\n1,\n))\n";
        assert_eq!(format(source).unwrap(), "var x = f(g(\n\t\t1,\n))\n");
    }

    #[test]
    fn test_unbalanced() {
        assert!(matches!(
            format("func f() {\n)\n"),
            Err(FormatError::Unbalanced { line: 2, delimiter: ')' })
        ));
        assert!(matches!(
            format("func f() {\n"),
            Err(FormatError::Unclosed { delimiter: '{' })
        ));
        assert!(matches!(
            format("var s = \"abc\n"),
            Err(FormatError::Unclosed { delimiter: '"' })
        ));
        assert!(matches!(
            format("var s = `abc\n"),
            Err(FormatError::Unclosed { delimiter: '`' })
        ));
    }

    #[test]
    fn test_not_utf8() {
        let err = CanonicalFormatter::new().format(&[0x66, 0xff, 0xfe]).unwrap_err();
        assert!(matches!(err, FormatError::NotUtf8(_)));
    }

    #[test]
    fn test_idempotent() {
        let source = "package model\n\nfunc (obj *A) Reset() {\n\tif obj == nil {\n\t\treturn\n\t}\n\n\tclear(obj.M)\n}\n";
        let once = format(source).unwrap();
        assert_eq!(once, source);
        assert_eq!(format(&once).unwrap(), once);
    }

    #[test]
    fn test_gofmt_missing_program() {
        let err = Gofmt::with_program("/nonexistent/gofmt")
            .format(b"package x\n")
            .unwrap_err();
        assert!(matches!(err, FormatError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_gofmt_passes_stdout_through() {
        let out = Gofmt::with_program("cat").format(b"package x\n").unwrap();
        assert_eq!(out, b"package x\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_gofmt_early_exit_reports_status() {
        let source = vec![b'x'; 1 << 20];
        let err = Gofmt::with_program("false").format(&source).unwrap_err();
        assert!(matches!(err, FormatError::Gofmt { .. }), "got {err:?}");
    }
}
