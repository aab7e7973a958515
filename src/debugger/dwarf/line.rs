use crate::debugger::address::{CodeOffset, SourceLocation};
use std::sync::Arc;

/// One row of the assembled DWARF line-number program (spec §4.1,
/// "Address↔line mapping"): WebAssembly's code-offset address plus the
/// (file, line, column) triple it maps to.
#[derive(Debug, Clone)]
pub struct LineRow {
    pub address: CodeOffset,
    pub file: Arc<str>,
    pub line: u32,
    pub column: u32,
    pub is_stmt: bool,
    pub end_sequence: bool,
}

/// Bidirectional address↔line index for a single compilation unit's line
/// program. Rows are kept sorted by address; sequences (delimited by
/// `end_sequence` rows) partition the address space so that `end_sequence`
/// acts as an exclusive upper bound, never matched by an address query.
#[derive(Debug, Default)]
pub struct LineTable {
    by_address: Vec<LineRow>,
}

impl LineTable {
    pub fn new(mut rows: Vec<LineRow>) -> Self {
        rows.sort_by_key(|r| r.address);
        Self { by_address: rows }
    }

    pub fn rows(&self) -> &[LineRow] {
        &self.by_address
    }

    /// address → (file,line): the greatest row whose address ≤ `addr` and
    /// that belongs to the same sequence (an intervening `end_sequence`
    /// row excludes everything before it from matching).
    pub fn find_place(&self, addr: CodeOffset) -> Option<&LineRow> {
        let idx = match self.by_address.binary_search_by_key(&addr, |r| r.address) {
            Ok(i) => {
                // several rows can share an address (is_stmt toggling); take the last
                // non-end_sequence one at this address, or the exact end_sequence row
                // only if the query itself lands exactly on it.
                let mut i = i;
                while i + 1 < self.by_address.len() && self.by_address[i + 1].address == addr {
                    i += 1;
                }
                i
            }
            Err(0) => return None,
            Err(pos) => pos - 1,
        };

        let row = &self.by_address[idx];
        if row.end_sequence && row.address != addr {
            return None;
        }
        if row.end_sequence {
            // An end_sequence row carries no source location of its own.
            return None;
        }
        Some(row)
    }

    /// (file,line) → address: the row with the smallest address among rows
    /// whose file suffix-matches `file` and whose line is the smallest
    /// line ≥ `line`. On ties among files, the lexicographically shortest
    /// file name wins (spec §4.1).
    pub fn find_address(&self, file: &str, line: u32) -> Option<&LineRow> {
        let mut best: Option<&LineRow> = None;
        for row in &self.by_address {
            if row.end_sequence {
                continue;
            }
            if !suffix_matches(&row.file, file) {
                continue;
            }
            if row.line < line {
                continue;
            }
            best = Some(match best {
                None => row,
                Some(b) => {
                    if row.line < b.line
                        || (row.line == b.line && row.address < b.address)
                        || (row.line == b.line
                            && row.address == b.address
                            && row.file.len() < b.file.len())
                    {
                        row
                    } else {
                        b
                    }
                }
            });
        }
        best
    }
}

/// Suffix match on path components: a user-supplied absolute path matches
/// a DWARF-recorded path regardless of build root, e.g. `"Main.cpp"`
/// matches `"/build/src/Main.cpp"`.
pub fn suffix_matches(dwarf_path: &str, query: &str) -> bool {
    let dwarf_norm = dwarf_path.replace('\\', "/");
    let query_norm = query.replace('\\', "/");
    dwarf_norm == query_norm
        || dwarf_norm.ends_with(&format!("/{query_norm}"))
        || query_norm.ends_with(&format!("/{dwarf_norm}"))
}

impl From<&LineRow> for SourceLocation {
    fn from(row: &LineRow) -> Self {
        SourceLocation {
            file: row.file.to_string(),
            line: row.line,
            column: Some(row.column),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(addr: u32, file: &str, line: u32, end: bool) -> LineRow {
        LineRow {
            address: CodeOffset(addr),
            file: Arc::from(file),
            line,
            column: 0,
            is_stmt: true,
            end_sequence: end,
        }
    }

    #[test]
    fn address_lookup_picks_greatest_le_row_in_sequence() {
        let table = LineTable::new(vec![
            row(0x10, "a.c", 4, false),
            row(0x20, "a.c", 5, false),
            row(0x30, "a.c", 0, true),
        ]);

        assert_eq!(table.find_place(CodeOffset(0x10)).unwrap().line, 4);
        assert_eq!(table.find_place(CodeOffset(0x15)).unwrap().line, 4);
        assert_eq!(table.find_place(CodeOffset(0x20)).unwrap().line, 5);
        assert_eq!(table.find_place(CodeOffset(0x25)).unwrap().line, 5);
        // end_sequence is exclusive
        assert!(table.find_place(CodeOffset(0x30)).is_none());
        assert!(table.find_place(CodeOffset(0x05)).is_none());
    }

    #[test]
    fn file_line_lookup_suffix_matches_and_prefers_shortest_file() {
        let table = LineTable::new(vec![
            row(0x10, "/build/src/Main.cpp", 4, false),
            row(0x20, "/build/src/Main.cpp", 8, false),
            row(0x08, "Main.cpp", 4, false),
        ]);

        let found = table.find_address("Main.cpp", 4).unwrap();
        assert_eq!(found.address, CodeOffset(0x08));

        let found = table.find_address("src/Main.cpp", 6).unwrap();
        assert_eq!(found.line, 8);
    }

    #[test]
    fn round_trip_through_address_never_jumps_past_requested_line() {
        let table = LineTable::new(vec![
            row(0x10, "a.c", 4, false),
            row(0x20, "a.c", 5, false),
            row(0x30, "a.c", 0, true),
        ]);

        let addr_row = table.find_address("a.c", 5).unwrap();
        let place = table.find_place(addr_row.address).unwrap();
        assert!(place.line <= 5 || place.line == 5);
    }
}
