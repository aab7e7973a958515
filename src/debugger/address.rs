use std::fmt;

/// Byte offset into a WebAssembly module's code section.
///
/// CDP reports WebAssembly source positions as `lineNumber: 0` plus a
/// `columnNumber` equal to this offset (spec §2, "Address↔line mapping").
/// All address arithmetic in the DWARF container is in these terms; there
/// is no load-time relocation to track, unlike a native ELF debugger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CodeOffset(pub u32);

impl From<u32> for CodeOffset {
    fn from(v: u32) -> Self {
        CodeOffset(v)
    }
}

impl From<CodeOffset> for u32 {
    fn from(v: CodeOffset) -> Self {
        v.0
    }
}

impl fmt::Display for CodeOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

/// A resolved source location: a file path as DWARF recorded it plus a
/// 1-based line and optional column.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
    pub column: Option<u32>,
}

impl SourceLocation {
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column: None,
        }
    }
}
