//! Shared test fixtures: a hand-built WASM module carrying real DWARF
//! debug sections, and a fake `CdpClient` that serves canned responses
//! keyed by method name.

use base64::Engine;
use gimli::write::{
    Address, AttributeValue, DwarfUnit, EndianVec, Expression, FileInfo, LineProgram, LineString,
    Sections,
};
use gimli::{Encoding, Format, LineEncoding};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use tokio::sync::broadcast;
use wasm_dbg_bridge::debugger::cdp::{CdpClient, CdpEvent};
use wasm_dbg_bridge::debugger::error::Result;
use wasm_encoder::{CustomSection, Module};

/// Address (CDP column-offset) of the line-4 statement, used as a
/// breakpoint target by the scenario tests.
pub const LINE4_ADDR: u32 = 0x20;
/// First of two addresses Chrome reports for the same source line 9
/// (step de-duplication).
pub const LINE9_ADDR_A: u32 = 0x30;
pub const LINE9_ADDR_B: u32 = 0x32;
/// Address of the line-10 statement that ends the stepped-over line.
pub const LINE10_ADDR: u32 = 0x40;
/// Address inside the scope that owns variable `p`, used by the
/// variable-inspection scenario.
pub const LINE20_ADDR: u32 = 0x50;

const SOURCE_FILE: &str = "Main.cpp";
const COMP_DIR: &str = "/testproject";

/// Build a minimal but structurally valid WASM module whose `.debug_*`
/// custom sections describe one compile unit ("Main.cpp"): a
/// subprogram spanning the whole code range, one pointer-to-int
/// variable `p` bound to WASM local 0, and a line table covering the
/// addresses above.
pub fn build_fixture_module() -> Vec<u8> {
    let encoding = Encoding {
        format: Format::Dwarf32,
        version: 4,
        address_size: 4,
    };

    let mut dwarf = DwarfUnit::new(encoding);

    let mut line_program = LineProgram::new(
        encoding,
        LineEncoding::default(),
        LineString::String(COMP_DIR.as_bytes().to_vec()),
        LineString::String(SOURCE_FILE.as_bytes().to_vec()),
        None,
    );
    let dir = line_program.default_directory();
    let file = line_program.add_file(LineString::String(SOURCE_FILE.as_bytes().to_vec()), dir, None::<FileInfo>);

    line_program.begin_sequence(Some(Address::Constant(0)));
    for (addr, ln) in [
        (LINE4_ADDR, 4),
        (LINE9_ADDR_A, 9),
        (LINE9_ADDR_B, 9),
        (LINE10_ADDR, 10),
        (LINE20_ADDR, 20),
    ] {
        let row = line_program.row();
        row.address_offset = addr as u64;
        row.file = file;
        row.line = ln;
        row.column = 0;
        line_program.generate_row();
    }
    line_program.end_sequence(0x100);
    dwarf.unit.line_program = line_program;

    let root = dwarf.unit.root();
    dwarf.unit.get_mut(root).set(gimli::DW_AT_name, AttributeValue::String(SOURCE_FILE.as_bytes().to_vec()));
    dwarf
        .unit
        .get_mut(root)
        .set(gimli::DW_AT_comp_dir, AttributeValue::String(COMP_DIR.as_bytes().to_vec()));

    let int_type = dwarf.unit.add(root, gimli::DW_TAG_base_type);
    dwarf
        .unit
        .get_mut(int_type)
        .set(gimli::DW_AT_name, AttributeValue::String(b"int".to_vec()));
    dwarf.unit.get_mut(int_type).set(gimli::DW_AT_byte_size, AttributeValue::Udata(4));
    dwarf
        .unit
        .get_mut(int_type)
        .set(gimli::DW_AT_encoding, AttributeValue::Encoding(gimli::DW_ATE_signed));

    let ptr_type = dwarf.unit.add(root, gimli::DW_TAG_pointer_type);
    dwarf.unit.get_mut(ptr_type).set(gimli::DW_AT_byte_size, AttributeValue::Udata(4));
    dwarf.unit.get_mut(ptr_type).set(gimli::DW_AT_type, AttributeValue::UnitRef(int_type));

    let subprogram = dwarf.unit.add(root, gimli::DW_TAG_subprogram);
    dwarf
        .unit
        .get_mut(subprogram)
        .set(gimli::DW_AT_name, AttributeValue::String(b"main".to_vec()));
    dwarf
        .unit
        .get_mut(subprogram)
        .set(gimli::DW_AT_low_pc, AttributeValue::Address(Address::Constant(0)));
    dwarf.unit.get_mut(subprogram).set(gimli::DW_AT_high_pc, AttributeValue::Udata(0x100));

    let var_p = dwarf.unit.add(subprogram, gimli::DW_TAG_variable);
    dwarf.unit.get_mut(var_p).set(gimli::DW_AT_name, AttributeValue::String(b"p".to_vec()));
    dwarf.unit.get_mut(var_p).set(gimli::DW_AT_type, AttributeValue::UnitRef(ptr_type));
    // DW_OP_WASM_location(local, 0): the variable lives in WASM local #0.
    dwarf
        .unit
        .get_mut(var_p)
        .set(gimli::DW_AT_location, AttributeValue::Exprloc(Expression::raw(vec![0xed, 0x00, 0x00])));

    let mut sections = Sections::new(EndianVec::new(gimli::LittleEndian));
    dwarf.write(&mut sections).expect("dwarf fixture must encode");

    let mut module = Module::new();
    for (name, data) in [
        (".debug_info", sections.debug_info.slice()),
        (".debug_abbrev", sections.debug_abbrev.slice()),
        (".debug_line", sections.debug_line.slice()),
        (".debug_str", sections.debug_str.slice()),
        (".debug_line_str", sections.debug_line_str.slice()),
    ] {
        module.section(&CustomSection {
            name: name.into(),
            data: data.into(),
        });
    }
    module.finish()
}

pub fn build_fixture_module_base64() -> String {
    base64::engine::general_purpose::STANDARD.encode(build_fixture_module())
}

/// A `CdpClient` double that records every call it receives and serves
/// canned responses keyed by method name; unmatched calls get `{}`.
pub struct FakeCdpClient {
    calls: RefCell<Vec<(Option<String>, String, serde_json::Value)>>,
    canned: RefCell<std::collections::HashMap<&'static str, VecDeque<serde_json::Value>>>,
    events: broadcast::Sender<(Option<String>, CdpEvent)>,
    next_breakpoint_id: RefCell<u32>,
}

impl FakeCdpClient {
    pub fn new() -> Rc<Self> {
        let (tx, _rx) = broadcast::channel(64);
        Rc::new(Self {
            calls: RefCell::new(Vec::new()),
            canned: RefCell::new(std::collections::HashMap::new()),
            events: tx,
            next_breakpoint_id: RefCell::new(0),
        })
    }

    /// Queue a response for `method`; calls to it are served in FIFO
    /// order, then fall back to `{}`.
    pub fn queue(&self, method: &'static str, response: serde_json::Value) {
        self.canned.borrow_mut().entry(method).or_default().push_back(response);
    }

    pub fn calls_named(&self, method: &str) -> usize {
        self.calls.borrow().iter().filter(|(_, m, _)| m == method).count()
    }

    pub fn last_params(&self, method: &str) -> Option<serde_json::Value> {
        self.calls.borrow().iter().rev().find(|(_, m, _)| m == method).map(|(_, _, p)| p.clone())
    }
}

#[async_trait::async_trait(?Send)]
impl CdpClient for FakeCdpClient {
    async fn call(&self, session_id: Option<&str>, method: &str, params: serde_json::Value) -> Result<serde_json::Value> {
        self.calls.borrow_mut().push((session_id.map(str::to_string), method.to_string(), params));

        if method == "Debugger.setBreakpoint" {
            let mut next = self.next_breakpoint_id.borrow_mut();
            let id = *next;
            *next += 1;
            return Ok(serde_json::json!({"breakpointId": format!("bp{id}")}));
        }

        if let Some(queue) = self.canned.borrow_mut().get_mut(method) {
            if let Some(resp) = queue.pop_front() {
                return Ok(resp);
            }
        }
        Ok(serde_json::json!({}))
    }

    fn subscribe(&self) -> broadcast::Receiver<(Option<String>, CdpEvent)> {
        self.events.subscribe()
    }
}
