//! WebAssembly File Registry (spec §4.2): maps a CDP script identifier to
//! its parsed `DwarfContainer`, and separately remembers non-WASM script
//! URLs so JavaScript frames still get a sensible display name.

use crate::debugger::address::{CodeOffset, SourceLocation};
use crate::debugger::dwarf::DwarfContainer;
use crate::debugger::error::{Error, Result};
use indexmap::IndexMap;

pub struct WebAssemblyFile {
    pub script_id: String,
    pub url: String,
    pub container: DwarfContainer,
}

#[derive(Default)]
pub struct FileRegistry {
    wasm: IndexMap<String, WebAssemblyFile>,
    non_wasm: IndexMap<String, String>,
}

impl FileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a parsed WASM module. Idempotent: an existing script id
    /// is left untouched (spec §4.2, "refuses to replace an existing
    /// entry").
    pub fn load_wasm(&mut self, script_id: String, url: String, container: DwarfContainer) {
        self.wasm.entry(script_id.clone()).or_insert(WebAssemblyFile {
            script_id,
            url,
            container,
        });
    }

    pub fn load_non_wasm(&mut self, script_id: String, url: String) {
        self.non_wasm.entry(script_id).or_insert(url);
    }

    pub fn reset(&mut self) {
        self.wasm.clear();
        self.non_wasm.clear();
    }

    pub fn file(&self, script_id: &str) -> Option<&WebAssemblyFile> {
        self.wasm.get(script_id)
    }

    pub fn file_mut(&mut self, script_id: &str) -> Option<&mut WebAssemblyFile> {
        self.wasm.get_mut(script_id)
    }

    /// `findFileFromLocation` (spec §4.2): resolve a CDP location to a
    /// source location, synthesizing one for non-WASM scripts so
    /// JavaScript frames still display.
    pub fn find_location(
        &self,
        script_id: &str,
        line_number: u32,
        column_number: Option<u32>,
    ) -> Result<SourceLocation> {
        if let Some(file) = self.wasm.get(script_id) {
            let offset = CodeOffset(column_number.unwrap_or(0));
            return file
                .container
                .address_to_line(offset)
                .ok_or(Error::AddressUnresolved);
        }

        if let Some(url) = self.non_wasm.get(script_id) {
            return Ok(SourceLocation {
                file: url.clone(),
                line: line_number + 1,
                column: column_number,
            });
        }

        Err(Error::AddressUnresolved)
    }

    /// `findAddressFromFileLocation` (spec §4.2): first matching file in
    /// insertion order.
    pub fn find_address(&self, file: &str, line: u32) -> Option<(String, CodeOffset)> {
        self.wasm.values().find_map(|f| {
            f.container
                .line_to_address(file, line)
                .map(|addr| (f.script_id.clone(), addr))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_wasm_location_uses_cdp_line_plus_one() {
        let mut reg = FileRegistry::new();
        reg.load_non_wasm("js-1".into(), "app.js".into());
        let loc = reg.find_location("js-1", 9, Some(4)).unwrap();
        assert_eq!(loc.file, "app.js");
        assert_eq!(loc.line, 10);
    }

    #[test]
    fn loading_twice_keeps_first_entry() {
        // two calls with the same script id; second is a no-op per the
        // idempotent-load rule.
        let mut reg = FileRegistry::new();
        reg.load_non_wasm("js-1".into(), "first.js".into());
        reg.load_non_wasm("js-1".into(), "second.js".into());
        assert_eq!(reg.non_wasm.get("js-1").unwrap(), "first.js");
    }
}
