//! The DWARF expression machine (spec §4.1, "Expression evaluation").
//!
//! WebAssembly toolchains encode a variable's location with the vendor
//! opcode `DW_OP_WASM_location` (0xED) — a location is a WASM local,
//! global, or operand-stack slot, optionally followed by ordinary DWARF
//! ops (`DW_OP_plus_uconst`, `DW_OP_deref`) to describe structure member
//! access or pointer indirection once the base address is in linear
//! memory.

use crate::debugger::error::{Error, Result};
use crate::debugger::value::TypedValue;

const DW_OP_WASM_LOCATION: u8 = 0xed;
const DW_OP_ADDR: u8 = 0x03;
const DW_OP_DEREF: u8 = 0x06;
const DW_OP_CONSTU: u8 = 0x10;
const DW_OP_PLUS_UCONST: u8 = 0x23;
const DW_OP_STACK_VALUE: u8 = 0x9f;

const WASM_LOC_LOCAL: u64 = 0;
const WASM_LOC_GLOBAL_I32: u64 = 1;
const WASM_LOC_OPERAND_STACK: u64 = 2;
const WASM_LOC_GLOBAL_I64: u64 = 3;

/// Snapshot of the paused frame's registers the location machine reads
/// from: WASM locals, globals (all modules, flat), and the current
/// operand stack.
pub struct RegisterSnapshot<'a> {
    pub locals: &'a [TypedValue],
    pub globals: &'a [TypedValue],
    pub stack: &'a [TypedValue],
}

/// Where a location expression says a variable's value lives.
#[derive(Debug, Clone)]
pub enum Located {
    /// The value is already fully formed (it lives in a WASM local/global/
    /// operand-stack slot).
    Register(TypedValue),
    /// The value lives at this linear-memory address; the caller must read
    /// `byte_size` bytes from it (possibly via a `MemoryEvaluator`) to
    /// obtain the final representation.
    Memory(u64),
}

fn read_uleb128(bytes: &[u8], pos: &mut usize) -> Result<u64> {
    let mut result = 0u64;
    let mut shift = 0;
    loop {
        let byte = *bytes
            .get(*pos)
            .ok_or_else(|| Error::EvaluationFailure("truncated location expression".into()))?;
        *pos += 1;
        result |= ((byte & 0x7f) as u64) << shift;
        if byte & 0x80 == 0 {
            break;
        }
        shift += 7;
    }
    Ok(result)
}

/// Resolve a raw DWARF location-expression byte string to a [`Located`]
/// value. This never itself performs a memory read; when the location
/// describes linear memory, it reports the address and lets the caller
/// (which may need to await a CDP round-trip) fetch the bytes.
pub fn resolve_location(expr: &[u8], regs: &RegisterSnapshot<'_>) -> Result<Located> {
    let mut pos = 0usize;
    // address accumulator used while chasing DW_OP_addr/plus_uconst/deref
    let mut addr_stack: Vec<u64> = Vec::new();
    let mut as_value = false;

    while pos < expr.len() {
        let op = expr[pos];
        pos += 1;
        match op {
            DW_OP_WASM_LOCATION => {
                let kind = read_uleb128(expr, &mut pos)?;
                let index = read_uleb128(expr, &mut pos)? as usize;
                let value = match kind {
                    WASM_LOC_LOCAL => regs
                        .locals
                        .get(index)
                        .ok_or_else(|| Error::EvaluationFailure(format!("no local #{index}")))?,
                    WASM_LOC_GLOBAL_I32 | WASM_LOC_GLOBAL_I64 => regs
                        .globals
                        .get(index)
                        .ok_or_else(|| Error::EvaluationFailure(format!("no global #{index}")))?,
                    WASM_LOC_OPERAND_STACK => regs
                        .stack
                        .get(index)
                        .ok_or_else(|| Error::EvaluationFailure(format!("no stack slot #{index}")))?,
                    other => {
                        return Err(Error::EvaluationFailure(format!(
                            "unsupported WASM location kind {other}"
                        )))
                    }
                };
                if as_value || pos >= expr.len() {
                    return Ok(Located::Register(value.clone()));
                }
                // A register can also carry an address (e.g. a local
                // holding a struct's base address); keep chasing.
                addr_stack.push(value.as_address()?);
            }
            DW_OP_ADDR => {
                let mut buf = [0u8; 4];
                buf.copy_from_slice(
                    expr.get(pos..pos + 4)
                        .ok_or_else(|| Error::EvaluationFailure("truncated DW_OP_addr".into()))?,
                );
                pos += 4;
                addr_stack.push(u32::from_le_bytes(buf) as u64);
            }
            DW_OP_CONSTU => {
                let v = read_uleb128(expr, &mut pos)?;
                addr_stack.push(v);
            }
            DW_OP_PLUS_UCONST => {
                let off = read_uleb128(expr, &mut pos)?;
                let top = addr_stack
                    .pop()
                    .ok_or_else(|| Error::EvaluationFailure("stack underflow".into()))?;
                addr_stack.push(top + off);
            }
            DW_OP_DEREF => {
                // Cannot deref without a memory read; the caller resolves
                // one hop at a time, so a bare deref at the end of an
                // expression just means "this IS a memory address".
                break;
            }
            DW_OP_STACK_VALUE => {
                as_value = true;
            }
            other => {
                return Err(Error::EvaluationFailure(format!(
                    "unsupported DWARF expression opcode 0x{other:02x}"
                )))
            }
        }
    }

    let addr = addr_stack
        .pop()
        .ok_or_else(|| Error::EvaluationFailure("empty location expression".into()))?;
    Ok(Located::Memory(addr))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uleb(mut v: u64) -> Vec<u8> {
        let mut out = vec![];
        loop {
            let mut byte = (v & 0x7f) as u8;
            v >>= 7;
            if v != 0 {
                byte |= 0x80;
            }
            out.push(byte);
            if v == 0 {
                break;
            }
        }
        out
    }

    #[test]
    fn resolves_local_register_directly() {
        let mut expr = vec![DW_OP_WASM_LOCATION];
        expr.extend(uleb(WASM_LOC_LOCAL));
        expr.extend(uleb(2));

        let locals = vec![TypedValue::I32(1), TypedValue::I32(2), TypedValue::I32(42)];
        let regs = RegisterSnapshot {
            locals: &locals,
            globals: &[],
            stack: &[],
        };

        match resolve_location(&expr, &regs).unwrap() {
            Located::Register(TypedValue::I32(42)) => {}
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn resolves_memory_address_through_local_plus_offset() {
        let mut expr = vec![DW_OP_WASM_LOCATION];
        expr.extend(uleb(WASM_LOC_LOCAL));
        expr.extend(uleb(0));
        expr.push(DW_OP_PLUS_UCONST);
        expr.extend(uleb(8));

        let locals = vec![TypedValue::I32(0x1000)];
        let regs = RegisterSnapshot {
            locals: &locals,
            globals: &[],
            stack: &[],
        };

        match resolve_location(&expr, &regs).unwrap() {
            Located::Memory(addr) => assert_eq!(addr, 0x1008),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
