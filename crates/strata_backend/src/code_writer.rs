//! Indentation-aware text output.

use std::fmt::Write;

use crate::error::BackendError;

/// Writes lines of code at a tracked indentation level.
pub struct CodeWriter<W: Write> {
    w: W,
    indent_level: u32,
}

impl<W: Write> CodeWriter<W> {
    /// Wraps `w`.
    pub fn new(w: W) -> CodeWriter<W> {
        CodeWriter { w, indent_level: 0 }
    }

    /// Indents following lines one more level.
    pub fn indent(&mut self) {
        self.indent_level += 1;
    }

    /// Undoes one [`indent`](Self::indent).
    pub fn unindent(&mut self) -> Result<(), BackendError> {
        if self.indent_level == 0 {
            return Err(BackendError::IndentUnderflow);
        }
        self.indent_level -= 1;
        Ok(())
    }

    /// Writes the current indentation.
    pub fn append_indent(&mut self) -> Result<(), BackendError> {
        for _ in 0..self.indent_level {
            self.w.write_str("    ")?;
        }
        Ok(())
    }

    /// Ends the current line.
    pub fn append_newline(&mut self) -> Result<(), BackendError> {
        self.w.write_char('\n')?;
        Ok(())
    }

    /// Writes `s` without indentation or newline.
    pub fn append(&mut self, s: &str) -> Result<(), BackendError> {
        self.w.write_str(s)?;
        Ok(())
    }

    /// Writes one indented line.
    pub fn append_line(&mut self, s: &str) -> Result<(), BackendError> {
        self.append_indent()?;
        self.append(s)?;
        self.append_newline()
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.w
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indents_lines() {
        let mut w = CodeWriter::new(String::new());
        w.append_line("module m;").unwrap();
        w.indent();
        w.append_line("wire a;").unwrap();
        w.unindent().unwrap();
        w.append_line("endmodule").unwrap();
        assert_eq!(w.into_inner(), "module m;\n    wire a;\nendmodule\n");
    }

    #[test]
    fn unindent_underflow() {
        let mut w = CodeWriter::new(String::new());
        assert!(matches!(w.unindent(), Err(BackendError::IndentUnderflow)));
    }
}
