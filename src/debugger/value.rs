//! Value Store Adapter (spec §4.7): turns CDP `Runtime.getProperties`
//! results over a paused frame's scope chain into the typed value vectors
//! the DWARF expression machine reads from.

use crate::debugger::cdp::{PropertyDescriptor, RemoteObject};
use crate::debugger::error::{Error, Result};
use futures_util::future::try_join3;

/// A single WASM-typed value, as it would sit in a local, a global, or on
/// the operand stack.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
}

impl TypedValue {
    /// Reinterpret this value as a linear-memory address (only sound for
    /// i32-typed pointers, which is how WASM32 represents them).
    pub fn as_address(&self) -> Result<u64> {
        match self {
            TypedValue::I32(v) => Ok(*v as u32 as u64),
            TypedValue::I64(v) => Ok(*v as u64),
            other => Err(Error::EvaluationFailure(format!(
                "{other:?} is not address-shaped"
            ))),
        }
    }

    pub fn to_i64(&self) -> Option<i64> {
        match self {
            TypedValue::I32(v) => Some(*v as i64),
            TypedValue::I64(v) => Some(*v),
            _ => None,
        }
    }
}

impl std::fmt::Display for TypedValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TypedValue::I32(v) => write!(f, "{v}"),
            TypedValue::I64(v) => write!(f, "{v}"),
            TypedValue::F32(v) => write!(f, "{v}"),
            TypedValue::F64(v) => write!(f, "{v}"),
        }
    }
}

/// The three value stores associated with a paused call frame: operand
/// stack, locals, globals (spec §3, `CallFrameSnapshot`).
#[derive(Debug, Clone, Default)]
pub struct FrameValues {
    pub stack: Vec<TypedValue>,
    pub locals: Vec<TypedValue>,
    pub globals: Vec<TypedValue>,
}

/// Build a `FrameValues` from CDP `Runtime.getProperties` descriptor lists
/// over the paused frame's scope chain. Each descriptor either already
/// carries a directly-typed scalar (a CDP `number` or a BigInt-spelled
/// value), or is itself an object whose own properties are `{type,
/// value}`.
///
/// The three stores share no mutable state, so building them is done
/// concurrently (spec §4.7).
pub async fn build_frame_values(
    stack_props: Vec<PropertyDescriptor>,
    locals_props: Vec<PropertyDescriptor>,
    globals_props: Vec<PropertyDescriptor>,
    resolver: &impl PropertyResolver,
) -> Result<FrameValues> {
    let (stack, locals, globals) = try_join3(
        convert_all(stack_props, resolver),
        convert_all(locals_props, resolver),
        convert_all(globals_props, resolver),
    )
    .await?;

    Ok(FrameValues {
        stack,
        locals,
        globals,
    })
}

/// Abstraction over the single CDP call this adapter needs:
/// `Runtime.getProperties` on a remote object id, used when a property
/// descriptor's value is itself an object we must expand.
#[async_trait::async_trait(?Send)]
pub trait PropertyResolver {
    async fn get_properties(&self, object_id: &str) -> Result<Vec<PropertyDescriptor>>;
}

async fn convert_all(
    props: Vec<PropertyDescriptor>,
    resolver: &impl PropertyResolver,
) -> Result<Vec<TypedValue>> {
    let mut out = Vec::with_capacity(props.len());
    for prop in props {
        out.push(convert_one(&prop.value, resolver).await?);
    }
    Ok(out)
}

async fn convert_one(obj: &RemoteObject, resolver: &impl PropertyResolver) -> Result<TypedValue> {
    if let Some(direct) = direct_scalar(obj) {
        return Ok(direct);
    }

    let object_id = obj.object_id.as_ref().ok_or_else(|| {
        Error::ProtocolViolation("scope entry has neither a scalar nor an object id".into())
    })?;
    let members = resolver.get_properties(object_id).await?;

    let ty = members
        .iter()
        .find(|m| m.name == "type")
        .and_then(|m| m.value.value.as_ref())
        .and_then(|v| v.as_str())
        .ok_or_else(|| Error::ProtocolViolation("wasm value missing `type` member".into()))?;
    let raw = members
        .iter()
        .find(|m| m.name == "value")
        .ok_or_else(|| Error::ProtocolViolation("wasm value missing `value` member".into()))?;

    parse_wasm_scalar(ty, raw)
}

fn direct_scalar(obj: &RemoteObject) -> Option<TypedValue> {
    match obj.r#type.as_str() {
        "number" => obj.value.as_ref()?.as_f64().map(|n| TypedValue::I32(n as i32)),
        "bigint" => obj
            .unserializable_value
            .as_deref()
            .or(obj.description.as_deref())
            .and_then(parse_bigint_literal)
            .map(TypedValue::I64),
        _ => None,
    }
}

fn parse_wasm_scalar(ty: &str, prop: &PropertyDescriptor) -> Result<TypedValue> {
    let remote = &prop.value;
    match ty {
        "i32" => {
            let n = remote
                .value
                .as_ref()
                .and_then(|v| v.as_f64())
                .ok_or_else(|| Error::ProtocolViolation("i32 value missing".into()))?;
            Ok(TypedValue::I32(n as i32))
        }
        "i64" => {
            let literal = remote
                .unserializable_value
                .as_deref()
                .or(remote.description.as_deref())
                .ok_or_else(|| Error::ProtocolViolation("i64 value missing".into()))?;
            let v = parse_bigint_literal(literal)
                .ok_or_else(|| Error::ProtocolViolation(format!("bad bigint literal {literal}")))?;
            Ok(TypedValue::I64(v))
        }
        "f32" => {
            let n = remote
                .value
                .as_ref()
                .and_then(|v| v.as_f64())
                .ok_or_else(|| Error::ProtocolViolation("f32 value missing".into()))?;
            Ok(TypedValue::F32(n as f32))
        }
        "f64" => {
            let n = remote
                .value
                .as_ref()
                .and_then(|v| v.as_f64())
                .ok_or_else(|| Error::ProtocolViolation("f64 value missing".into()))?;
            Ok(TypedValue::F64(n))
        }
        other => Err(Error::ProtocolViolation(format!("unknown wasm value type {other}"))),
    }
}

/// Parse a BigInt spelled as `"123n"` (decimal digits followed by a
/// literal `n`), the not-directly-serializable representation CDP uses
/// for 64-bit WASM integers.
fn parse_bigint_literal(s: &str) -> Option<i64> {
    s.strip_suffix('n')?.parse::<i64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bigint_literal_strips_trailing_n() {
        assert_eq!(parse_bigint_literal("123n"), Some(123));
        assert_eq!(parse_bigint_literal("-45n"), Some(-45));
        assert_eq!(parse_bigint_literal("45"), None);
    }
}
