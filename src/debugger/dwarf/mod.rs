//! DWARF Symbol Container (spec §4.1): parses a WebAssembly module's
//! embedded DWARF debug information and answers the four queries the
//! rest of the core needs — address↔line, in-scope variables, and typed
//! expression evaluation.

pub mod expr;
pub mod line;
pub mod types;

use crate::debugger::address::{CodeOffset, SourceLocation};
use crate::debugger::dwarf::expr::{resolve_location, Located, RegisterSnapshot};
use crate::debugger::dwarf::line::{LineRow, LineTable};
use crate::debugger::dwarf::types::{Member, TypeId, TypeInfo, TypeKind, TypeTable};
use crate::debugger::error::{Error, Result};
use crate::debugger::value::TypedValue;
use gimli::{AttributeValue, DwAte, EndianSlice, LittleEndian, Reader, UnitOffset};
use object::{Object, ObjectSection};
use std::ops::Range;

type R<'a> = EndianSlice<'a, LittleEndian>;
type Dwarf<'a> = gimli::Dwarf<R<'a>>;

/// One in-scope variable, as produced by DIE enumeration (spec §4.1,
/// "Variable enumeration").
#[derive(Debug, Clone)]
pub struct Variable {
    pub name: String,
    /// rustc/LLVM-mangling stripped, for display (spec §9 resolution).
    pub display_name: String,
    pub r#type: Option<TypeId>,
    pub location: Vec<u8>,
    pub group_id: u32,
    pub child_group_id: Option<u32>,
}

#[derive(Debug, Clone)]
struct Scope {
    ranges: Vec<Range<u64>>,
    variables: Vec<Variable>,
}

impl Scope {
    fn contains(&self, addr: u64) -> bool {
        self.ranges.iter().any(|r| r.contains(&addr))
    }
}

/// A single compilation unit's parsed debug information.
#[derive(Debug, Default)]
struct Unit {
    scopes: Vec<Scope>,
    globals: Vec<Variable>,
}

/// The fully parsed debug information of one WebAssembly module (spec
/// §3, `DwarfContainer`).
pub struct DwarfContainer {
    line_table: LineTable,
    type_table: TypeTable,
    units: Vec<Unit>,
}

/// One step of a parsed expression (spec §4.1, "dotted member access and
/// array indexing"): a leading `*` or each subsequent `.field`/`[index]`.
#[derive(Debug, Clone)]
enum Accessor {
    Field(String),
    Index(u64),
    Deref,
}

/// What to do once a requested memory slice arrives.
enum Pending {
    /// The slice itself, decoded per its type, is the final value.
    Terminal,
    /// The slice holds a pointer; decode it as an address and resume the
    /// chain from there.
    Continue(Vec<Accessor>),
    /// Like `Continue`, but add a byte offset to the decoded address
    /// first (an array index applied through a pointer).
    ContinueWithOffset(u64, Vec<Accessor>),
}

/// Suspended expression-evaluation state, carried across a memory-fetch
/// round trip (spec §4.1, "the container guarantees forward progress").
pub struct EvalCursor<'v> {
    var: &'v Variable,
    ty: Option<TypeId>,
    pending: Pending,
}

/// What an expression evaluation needs next: either it's done, or it
/// needs `byte_size` bytes from linear memory at `address` (spec §4.1).
pub enum EvalStep<'v> {
    Done(TypedValue),
    NeedsMemory {
        address: u64,
        byte_size: u64,
        cursor: EvalCursor<'v>,
    },
}

impl DwarfContainer {
    /// Parse DWARF out of a WASM module's `.debug_*` custom sections.
    pub fn parse(wasm_bytes: &[u8]) -> Result<Self> {
        let obj = object::File::parse(wasm_bytes).map_err(Error::ObjParsing)?;

        let load_section = |id: gimli::SectionId| -> Result<R<'_>> {
            let data = obj
                .section_by_name(id.name())
                .and_then(|s| s.uncompressed_data().ok())
                .unwrap_or_default();
            // leak is unnecessary: we copy via Cow into an owned buffer kept
            // alive by the caller's `wasm_bytes` borrow for the duration of
            // this parse pass, then convert to owned rows/tables below.
            Ok(EndianSlice::new(
                Box::leak(data.into_owned().into_boxed_slice()),
                LittleEndian,
            ))
        };
        let dwarf = Dwarf::load(load_section)?;

        let mut line_rows = Vec::new();
        let mut type_table = TypeTable::default();
        let mut units = Vec::new();

        let mut iter = dwarf.units();
        while let Some(header) = iter.next().map_err(Error::DwarfParsing)? {
            let unit = dwarf.unit(header).map_err(Error::DwarfParsing)?;
            collect_line_rows(&dwarf, &unit, &mut line_rows)?;
            let parsed_unit = collect_unit(&dwarf, &unit, &mut type_table)?;
            units.push(parsed_unit);
        }

        Ok(Self {
            line_table: LineTable::new(line_rows),
            type_table,
            units,
        })
    }

    pub fn address_to_line(&self, offset: CodeOffset) -> Option<SourceLocation> {
        self.line_table.find_place(offset).map(SourceLocation::from)
    }

    pub fn line_to_address(&self, file: &str, line: u32) -> Option<CodeOffset> {
        self.line_table.find_address(file, line).map(|row| row.address)
    }

    /// Variables in scope at `offset`, optionally filtered to one group
    /// (spec §4.1 "Variable groups").
    pub fn variables_at(&self, offset: CodeOffset, group: Option<u32>) -> Vec<&Variable> {
        let addr = offset.0 as u64;
        self.units
            .iter()
            .flat_map(|u| u.scopes.iter())
            .filter(|s| s.contains(addr))
            .flat_map(|s| s.variables.iter())
            .filter(|v| group.map(|g| v.group_id == g).unwrap_or(true))
            .collect()
    }

    /// All modules' globals, optionally filtered to one group.
    pub fn globals(&self, group: Option<u32>) -> Vec<&Variable> {
        self.units
            .iter()
            .flat_map(|u| u.globals.iter())
            .filter(|v| group.map(|g| v.group_id == g).unwrap_or(true))
            .collect()
    }

    pub fn type_table(&self) -> &TypeTable {
        &self.type_table
    }

    pub fn type_info(&self, id: TypeId) -> Option<&TypeInfo> {
        self.type_table.get(id)
    }

    /// Resolve a variable by simple name at `offset`, also checking
    /// globals (a scope chain's "global"/"module" entries are in scope
    /// for evaluation even though the UI lists them separately).
    pub fn find_variable(&self, offset: CodeOffset, name: &str) -> Option<&Variable> {
        self.variables_at(offset, None)
            .into_iter()
            .chain(self.globals(None))
            .find(|v| v.display_name == name || v.name == name)
    }

    /// Begin evaluating an expression string — a variable name, optionally
    /// followed by a chain of `.field`/`[index]` accessors, or prefixed
    /// with `*` — against the in-scope/global variables at `offset` and a
    /// register snapshot. Returns either the final value or a memory
    /// request; the caller resumes via [`Self::continue_eval`].
    pub fn begin_eval<'v>(
        &'v self,
        offset: CodeOffset,
        expr: &str,
        regs: &RegisterSnapshot<'_>,
    ) -> Result<EvalStep<'v>> {
        let (name, accessors) = parse_expr(expr)?;
        let var = self
            .find_variable(offset, name)
            .ok_or_else(|| Error::EvaluationFailure(format!("no such variable `{name}`")))?;

        match resolve_location(&var.location, regs)? {
            Located::Register(v) if accessors.is_empty() => Ok(EvalStep::Done(v)),
            // A register can hold an address directly (e.g. a pointer
            // parameter passed in a WASM local, or a by-reference local
            // holding a struct's base address) — unlike `Located::Memory`,
            // there is no separate storage slot to fetch first.
            Located::Register(v) => self.step_on_decoded_value(var, v.as_address()?, var.r#type, accessors),
            Located::Memory(address) => self.step(var, address, var.r#type, accessors),
        }
    }

    /// Like [`Self::step`], but `addr` is already the *value* the variable
    /// holds rather than the address of its own storage. A leading
    /// `*`/`[n]` accessor that dereferences a pointer would otherwise make
    /// `step` fetch the pointer from memory before dereferencing it; here
    /// that fetch already happened (the register gave us the value), so the
    /// first such accessor is resolved without a memory round-trip.
    fn step_on_decoded_value<'v>(
        &'v self,
        var: &'v Variable,
        addr: u64,
        ty: Option<TypeId>,
        mut accessors: Vec<Accessor>,
    ) -> Result<EvalStep<'v>> {
        let resolved = ty.and_then(|t| self.type_table.get(t)).map(|t| t.resolve(&self.type_table));
        match (accessors.first(), resolved.map(|t| &t.kind)) {
            (Some(Accessor::Deref), Some(TypeKind::Pointer { pointee })) => {
                let pointee = *pointee;
                accessors.remove(0);
                self.step(var, addr, pointee, accessors)
            }
            (Some(Accessor::Index(index)), Some(TypeKind::Pointer { pointee })) => {
                let elem_size = pointee.and_then(|t| self.type_table.get(t)).and_then(|t| t.byte_size).unwrap_or(4);
                let offset = index * elem_size;
                let pointee = *pointee;
                accessors.remove(0);
                self.step(var, addr + offset, pointee, accessors)
            }
            _ => self.step(var, addr, ty, accessors),
        }
    }

    /// Resume evaluation once the caller has supplied the bytes for a
    /// previously requested memory slice.
    pub fn continue_eval<'v>(&'v self, cursor: EvalCursor<'v>, bytes: &[u8]) -> Result<EvalStep<'v>> {
        match cursor.pending {
            Pending::Terminal => Ok(EvalStep::Done(scalar_from_bytes(bytes))),
            Pending::Continue(remaining) => self.step(cursor.var, decode_address(bytes), cursor.ty, remaining),
            Pending::ContinueWithOffset(offset, remaining) => {
                self.step(cursor.var, decode_address(bytes) + offset, cursor.ty, remaining)
            }
        }
    }

    /// Advance the chain from `addr` (of type `ty`) by applying the next
    /// accessor, or — once the chain is empty — request the final read.
    fn step<'v>(
        &'v self,
        var: &'v Variable,
        addr: u64,
        ty: Option<TypeId>,
        mut remaining: Vec<Accessor>,
    ) -> Result<EvalStep<'v>> {
        if remaining.is_empty() {
            let byte_size = ty.and_then(|t| self.type_table.get(t)).and_then(|t| t.byte_size).unwrap_or(4);
            return Ok(EvalStep::NeedsMemory {
                address: addr,
                byte_size,
                cursor: EvalCursor {
                    var,
                    ty,
                    pending: Pending::Terminal,
                },
            });
        }

        let resolved = ty.and_then(|t| self.type_table.get(t)).map(|t| t.resolve(&self.type_table));
        let accessor = remaining.remove(0);
        match accessor {
            Accessor::Deref => {
                let pointee = match resolved.map(|t| &t.kind) {
                    Some(TypeKind::Pointer { pointee }) => *pointee,
                    _ => return Err(Error::EvaluationFailure("`*` applied to a non-pointer value".into())),
                };
                Ok(EvalStep::NeedsMemory {
                    address: addr,
                    byte_size: 4,
                    cursor: EvalCursor {
                        var,
                        ty: pointee,
                        pending: Pending::Continue(remaining),
                    },
                })
            }
            Accessor::Field(field_name) => match resolved.map(|t| &t.kind) {
                Some(TypeKind::Structure { members }) => {
                    let member = members
                        .iter()
                        .find(|m| m.name == field_name)
                        .ok_or_else(|| Error::EvaluationFailure(format!("no member `{field_name}`")))?;
                    self.step(var, addr + member.offset, member.r#type, remaining)
                }
                _ => Err(Error::EvaluationFailure(format!(
                    "`.{field_name}` applied to a non-structure value"
                ))),
            },
            Accessor::Index(index) => match resolved.map(|t| &t.kind) {
                Some(TypeKind::Array { element, .. }) => {
                    let elem_size = element.and_then(|t| self.type_table.get(t)).and_then(|t| t.byte_size).unwrap_or(4);
                    self.step(var, addr + index * elem_size, *element, remaining)
                }
                Some(TypeKind::Pointer { pointee }) => {
                    let elem_size = pointee.and_then(|t| self.type_table.get(t)).and_then(|t| t.byte_size).unwrap_or(4);
                    Ok(EvalStep::NeedsMemory {
                        address: addr,
                        byte_size: 4,
                        cursor: EvalCursor {
                            var,
                            ty: *pointee,
                            pending: Pending::ContinueWithOffset(index * elem_size, remaining),
                        },
                    })
                }
                _ => Err(Error::EvaluationFailure("`[...]` applied to a non-array/pointer value".into())),
            },
        }
    }
}

fn decode_address(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 4];
    let n = bytes.len().min(4);
    buf[..n].copy_from_slice(&bytes[..n]);
    u32::from_le_bytes(buf) as u64
}

/// Parse `name`, `name.field`, `name[3]`, `*name`, `name.arr[2].x`, etc.
/// into a base variable name and the chain of accessors to apply to it.
fn parse_expr(expr: &str) -> Result<(&str, Vec<Accessor>)> {
    let mut rest = expr.trim();
    let mut accessors = Vec::new();
    let mut leading_deref = false;
    while let Some(stripped) = rest.strip_prefix('*') {
        leading_deref = true;
        rest = stripped.trim_start();
    }

    let base_end = rest.find(['.', '[']).unwrap_or(rest.len());
    let name = &rest[..base_end];
    if name.is_empty() {
        return Err(Error::EvaluationFailure(format!("empty variable name in `{expr}`")));
    }
    rest = &rest[base_end..];

    if leading_deref {
        accessors.push(Accessor::Deref);
    }

    while !rest.is_empty() {
        if let Some(stripped) = rest.strip_prefix('.') {
            let end = stripped.find(['.', '[']).unwrap_or(stripped.len());
            let field = &stripped[..end];
            if field.is_empty() {
                return Err(Error::EvaluationFailure(format!("malformed member access in `{expr}`")));
            }
            accessors.push(Accessor::Field(field.to_string()));
            rest = &stripped[end..];
        } else if let Some(stripped) = rest.strip_prefix('[') {
            let end = stripped
                .find(']')
                .ok_or_else(|| Error::EvaluationFailure(format!("unterminated `[` in `{expr}`")))?;
            let index: u64 = stripped[..end]
                .trim()
                .parse()
                .map_err(|_| Error::EvaluationFailure(format!("bad array index in `{expr}`")))?;
            accessors.push(Accessor::Index(index));
            rest = &stripped[end + 1..];
        } else {
            return Err(Error::EvaluationFailure(format!("unexpected `{rest}` in `{expr}`")));
        }
    }

    Ok((name, accessors))
}

fn scalar_from_bytes(bytes: &[u8]) -> TypedValue {
    match bytes.len() {
        1 => TypedValue::I32(bytes[0] as i8 as i32),
        2 => {
            let mut b = [0u8; 2];
            b.copy_from_slice(&bytes[..2]);
            TypedValue::I32(i16::from_le_bytes(b) as i32)
        }
        4 => {
            let mut b = [0u8; 4];
            b.copy_from_slice(&bytes[..4]);
            TypedValue::I32(i32::from_le_bytes(b))
        }
        _ => {
            let mut b = [0u8; 8];
            let n = bytes.len().min(8);
            b[..n].copy_from_slice(&bytes[..n]);
            TypedValue::I64(i64::from_le_bytes(b))
        }
    }
}

fn collect_line_rows(
    dwarf: &Dwarf<'_>,
    unit: &gimli::Unit<R<'_>>,
    out: &mut Vec<LineRow>,
) -> Result<()> {
    let Some(program) = unit.line_program.clone() else {
        return Ok(());
    };
    let comp_dir = unit.comp_dir.clone();
    let mut rows = program.rows();
    while let Some((header, row)) = rows.next_row().map_err(Error::DwarfParsing)? {
        let file = row
            .file(header)
            .and_then(|f| {
                let mut name = String::new();
                if let Some(dir) = f.directory(header) {
                    if let Ok(s) = dwarf.attr_string(unit, dir) {
                        name.push_str(&s.to_string_lossy());
                        name.push('/');
                    }
                } else if let Some(dir) = &comp_dir {
                    name.push_str(&dir.to_string_lossy());
                    name.push('/');
                }
                if let Ok(s) = dwarf.attr_string(unit, f.path_name()) {
                    name.push_str(&s.to_string_lossy());
                }
                Some(name)
            })
            .unwrap_or_default();

        out.push(LineRow {
            address: CodeOffset(row.address() as u32),
            file: std::sync::Arc::from(file.as_str()),
            line: row.line().map(|l| l.get() as u32).unwrap_or(0),
            column: match row.column() {
                gimli::ColumnType::Column(c) => c.get() as u32,
                gimli::ColumnType::LeftEdge => 0,
            },
            is_stmt: row.is_stmt(),
            end_sequence: row.end_sequence(),
        });
    }
    Ok(())
}

fn collect_unit(
    dwarf: &Dwarf<'_>,
    unit: &gimli::Unit<R<'_>>,
    type_table: &mut TypeTable,
) -> Result<Unit> {
    let mut parsed = Unit::default();
    let mut group_id = 0u32;
    let mut entries = unit.entries();

    // next_dfs yields a depth *delta* from the previous entry, so we
    // track absolute depth ourselves. Subprograms and lexical blocks
    // open a scope; any DW_TAG_variable/formal_parameter we see while a
    // scope is open attaches to the innermost one. A scope closes (and
    // is flushed into `parsed.scopes`) once DFS walks back up past the
    // depth it was opened at.
    let mut depth = 0isize;
    let mut scope_stack: Vec<(isize, Scope)> = Vec::new();

    while let Some((delta, entry)) = entries.next_dfs().map_err(Error::DwarfParsing)? {
        depth += delta;

        while let Some((scope_depth, _)) = scope_stack.last() {
            if *scope_depth >= depth {
                let (_, scope) = scope_stack.pop().unwrap();
                match scope_stack.last_mut() {
                    Some((_, parent)) => parent.variables.extend(flatten_into_parent(scope)),
                    None => parsed.scopes.push(scope),
                }
            } else {
                break;
            }
        }

        match entry.tag() {
            gimli::DW_TAG_subprogram | gimli::DW_TAG_lexical_block => {
                let ranges = entry_ranges(dwarf, unit, entry)?;
                scope_stack.push((
                    depth,
                    Scope {
                        ranges,
                        variables: Vec::new(),
                    },
                ));
            }
            gimli::DW_TAG_variable | gimli::DW_TAG_formal_parameter => {
                let name = die_name(dwarf, unit, entry)?;
                let r#type = die_type(entry, type_table, dwarf, unit)?;
                let location = die_location(entry)?;
                let Some(name) = name else { continue };
                let display_name = rustc_demangle::demangle(&name).to_string();
                group_id += 1;
                let child_group_id = r#type
                    .and_then(|t| type_table.get(t))
                    .filter(|t| {
                        matches!(
                            t.kind,
                            TypeKind::Structure { .. } | TypeKind::Pointer { .. } | TypeKind::Array { .. }
                        )
                    })
                    .map(|_| {
                        group_id += 1;
                        group_id
                    });
                let variable = Variable {
                    name,
                    display_name,
                    r#type,
                    location,
                    group_id,
                    child_group_id,
                };

                match scope_stack.last_mut() {
                    Some((_, scope)) => scope.variables.push(variable),
                    None => parsed.globals.push(variable),
                }
            }
            _ => {}
        }
    }

    // Flush any scopes still open at the end of the unit (e.g. the
    // outermost subprogram scopes, which never get popped by a
    // depth-decreasing sibling).
    while let Some((_, scope)) = scope_stack.pop() {
        match scope_stack.last_mut() {
            Some((_, parent)) => parent.variables.extend(flatten_into_parent(scope)),
            None => parsed.scopes.push(scope),
        }
    }

    Ok(parsed)
}

/// Lexical blocks nested inside a subprogram contribute their address
/// ranges to variable enumeration by becoming part of the enclosing
/// scope's variable list; the container's range-containment check at
/// query time (not nesting) is what actually scopes visibility, so we
/// fold a closed child scope's variables straight into the parent
/// instead of modeling an explicit scope tree.
fn flatten_into_parent(scope: Scope) -> Vec<Variable> {
    scope.variables
}

fn entry_ranges(
    dwarf: &Dwarf<'_>,
    unit: &gimli::Unit<R<'_>>,
    entry: &gimli::DebuggingInformationEntry<R<'_>>,
) -> Result<Vec<Range<u64>>> {
    let mut ranges = Vec::new();
    if let Some(r) = dwarf.die_ranges(unit, entry).ok() {
        let mut r = r;
        while let Some(range) = r.next().map_err(Error::DwarfParsing)? {
            ranges.push(range.begin..range.end);
        }
    }
    Ok(ranges)
}

fn die_name(
    dwarf: &Dwarf<'_>,
    unit: &gimli::Unit<R<'_>>,
    entry: &gimli::DebuggingInformationEntry<R<'_>>,
) -> Result<Option<String>> {
    match entry.attr_value(gimli::DW_AT_name).map_err(Error::DwarfParsing)? {
        Some(v) => {
            let s = dwarf.attr_string(unit, v).map_err(Error::DwarfParsing)?;
            Ok(Some(s.to_string_lossy().into_owned()))
        }
        None => Ok(None),
    }
}

fn die_location(entry: &gimli::DebuggingInformationEntry<R<'_>>) -> Result<Vec<u8>> {
    match entry.attr_value(gimli::DW_AT_location).map_err(Error::DwarfParsing)? {
        Some(AttributeValue::Exprloc(expr)) => Ok(expr.0.to_slice().map(|s| s.to_vec()).unwrap_or_default()),
        _ => Ok(Vec::new()),
    }
}

fn die_type(
    entry: &gimli::DebuggingInformationEntry<R<'_>>,
    type_table: &mut TypeTable,
    dwarf: &Dwarf<'_>,
    unit: &gimli::Unit<R<'_>>,
) -> Result<Option<TypeId>> {
    let Some(AttributeValue::UnitRef(offset)) = entry
        .attr_value(gimli::DW_AT_type)
        .map_err(Error::DwarfParsing)?
    else {
        return Ok(None);
    };
    Ok(Some(resolve_type_at(offset, type_table, dwarf, unit)?))
}

fn resolve_type_at(
    offset: UnitOffset,
    type_table: &mut TypeTable,
    dwarf: &Dwarf<'_>,
    unit: &gimli::Unit<R<'_>>,
) -> Result<TypeId> {
    let mut tree = unit.entries_tree(Some(offset)).map_err(Error::DwarfParsing)?;
    let node = tree.root().map_err(Error::DwarfParsing)?;
    let entry = node.entry();
    let name = die_name(dwarf, unit, entry)?;
    let byte_size = entry
        .attr_value(gimli::DW_AT_byte_size)
        .map_err(Error::DwarfParsing)?
        .and_then(|v| v.udata_value());

    let kind = match entry.tag() {
        gimli::DW_TAG_base_type => {
            let encoding = entry
                .attr_value(gimli::DW_AT_encoding)
                .map_err(Error::DwarfParsing)?
                .and_then(|v| v.udata_value())
                .map(|v| DwAte(v as u8))
                .unwrap_or(gimli::DW_ATE_unsigned);
            TypeKind::Base { encoding }
        }
        gimli::DW_TAG_pointer_type => {
            let pointee = die_type(entry, type_table, dwarf, unit)?;
            TypeKind::Pointer { pointee }
        }
        gimli::DW_TAG_array_type => TypeKind::Array {
            element: die_type(entry, type_table, dwarf, unit)?,
            count: None,
        },
        gimli::DW_TAG_structure_type | gimli::DW_TAG_union_type => {
            let mut members = Vec::new();
            let mut children = node.children();
            while let Some(child) = children.next().map_err(Error::DwarfParsing)? {
                let child_entry = child.entry();
                if child_entry.tag() == gimli::DW_TAG_member {
                    let member_name = die_name(dwarf, unit, child_entry)?.unwrap_or_default();
                    let member_offset = child_entry
                        .attr_value(gimli::DW_AT_data_member_location)
                        .map_err(Error::DwarfParsing)?
                        .and_then(|v| v.udata_value())
                        .unwrap_or(0);
                    let member_type = die_type(child_entry, type_table, dwarf, unit)?;
                    members.push(Member {
                        name: member_name,
                        offset: member_offset,
                        r#type: member_type,
                    });
                }
            }
            TypeKind::Structure { members }
        }
        gimli::DW_TAG_enumeration_type => TypeKind::Enumeration,
        gimli::DW_TAG_typedef => TypeKind::Typedef {
            target: die_type(entry, type_table, dwarf, unit)?,
        },
        gimli::DW_TAG_const_type => TypeKind::Const {
            target: die_type(entry, type_table, dwarf, unit)?,
        },
        _ => TypeKind::Unknown,
    };

    Ok(type_table.insert(name, byte_size, kind))
}
