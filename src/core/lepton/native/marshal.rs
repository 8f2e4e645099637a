use std::ffi::{CStr, CString, c_char};

use serde_json::Number;

use super::NativeSymbol;
use crate::core::lepton::argtypes::{ArgType, Direction, NativeType};
use crate::core::lepton::error::LeptonError;
use crate::core::sync_impl::NodeValue;

/// Every argument travels in a general-purpose register, so this is the
/// largest arity the dispatch table covers.
const MAX_ARGS: usize = 6;

/// A converted argument before it is placed in a register or a slot.
#[derive(Debug, Clone, Copy)]
enum Scalar {
    Word(u64),
    Float(f64),
}

/// How the native return value comes back.
#[derive(Debug, Clone, Copy)]
enum ReturnClass {
    Void,
    Word,
    F32,
    F64,
}

#[derive(Debug, Clone, Copy)]
enum RawReturn {
    Void,
    Word(u64),
    F32(f32),
    F64(f64),
}

/// An argument written by the callee, read back after the call.
struct Slot {
    native: NativeType,
    cell: Box<u64>,
}

/// Calls `symbol` with `args` marshaled according to `argtypes`.
///
/// With no declared argtypes, every value is an input whose type is inferred
/// from the value. Otherwise INPUT and INPUT_OUTPUT entries consume one value
/// each, OUTPUT entries consume none. The result is the return value, or
/// `[return_value, outputs...]` when any argument is written by the callee.
///
/// # Safety
///
/// `symbol` must point to a function whose C signature matches `argtypes` and
/// `return_type`, and the library it came from must still be loaded.
pub(crate) unsafe fn invoke(
    symbol: NativeSymbol,
    argtypes: &[ArgType],
    return_type: NativeType,
    args: &[NodeValue],
) -> Result<NodeValue, LeptonError> {
    let declared = argtypes
        .iter()
        .map(|arg| Ok((arg.native()?, arg.direction)))
        .collect::<Result<Vec<_>, LeptonError>>()?;

    let plan = if declared.is_empty() {
        args.iter()
            .enumerate()
            .map(|(index, value)| Ok((infer_type(index, value)?, Direction::Input)))
            .collect::<Result<Vec<_>, LeptonError>>()?
    } else {
        let expected = declared.iter().filter(|(_, d)| d.consumes_value()).count();
        if expected != args.len() {
            return Err(LeptonError::ArgumentCount {
                expected,
                got: args.len(),
            });
        }
        declared
    };

    if plan.len() > MAX_ARGS {
        return Err(LeptonError::TooManyArguments(plan.len()));
    }

    // Owned buffers referenced by the words below; they must outlive the call.
    let mut strings: Vec<CString> = Vec::new();
    let mut slots: Vec<Slot> = Vec::new();
    let mut words: Vec<u64> = Vec::with_capacity(plan.len());
    let mut values = args.iter();

    for (index, (native, direction)) in plan.into_iter().enumerate() {
        if native == NativeType::Void {
            return Err(LeptonError::UnsupportedType(format!(
                "void (argument {})",
                index
            )));
        }
        if !direction.is_written() {
            if native.is_float() {
                return Err(LeptonError::UnsupportedType(format!(
                    "{} passed by value (argument {}); \
                     declare it INPUT_OUTPUT to pass by address",
                    native, index
                )));
            }
            let value = values.next().unwrap_or(&NodeValue::Null);
            if let Scalar::Word(word) = to_scalar(index, value, native, &mut strings)? {
                words.push(word);
            }
            continue;
        }

        let mut cell = Box::new(0u64);
        if direction.consumes_value() {
            let value = values.next().unwrap_or(&NodeValue::Null);
            let scalar = to_scalar(index, value, native, &mut strings)?;
            unsafe { write_slot(&mut *cell, native, scalar) };
        }
        words.push(&mut *cell as *mut u64 as u64);
        slots.push(Slot { native, cell });
    }

    let class = match return_type {
        NativeType::Void => ReturnClass::Void,
        NativeType::F32 => ReturnClass::F32,
        NativeType::F64 => ReturnClass::F64,
        _ => ReturnClass::Word,
    };

    let raw = unsafe { call_raw(symbol, class, &words)? };
    let returned = from_return(raw, return_type);

    if slots.is_empty() {
        return Ok(returned);
    }

    let mut results = Vec::with_capacity(slots.len() + 1);
    results.push(returned);
    for slot in &slots {
        results.push(unsafe { read_slot(&*slot.cell, slot.native) });
    }
    Ok(NodeValue::Array(results))
}

fn infer_type(index: usize, value: &NodeValue) -> Result<NativeType, LeptonError> {
    match value {
        NodeValue::Null => Ok(NativeType::Ptr),
        NodeValue::Bool(_) => Ok(NativeType::Bool),
        NodeValue::Number(n) if n.is_i64() => Ok(NativeType::I64),
        NodeValue::Number(n) if n.is_u64() => Ok(NativeType::U64),
        NodeValue::Number(_) => Err(LeptonError::UnsupportedType(format!(
            "f64 passed by value (argument {}); declare argtypes to pass floats by address",
            index
        ))),
        NodeValue::String(_) => Ok(NativeType::CStr),
        other => Err(LeptonError::ArgumentValue {
            index,
            expected: "a scalar, string or null".to_string(),
            reason: format!("got {}", other),
        }),
    }
}

fn to_scalar(
    index: usize,
    value: &NodeValue,
    native: NativeType,
    strings: &mut Vec<CString>,
) -> Result<Scalar, LeptonError> {
    let mismatch = |reason: String| LeptonError::ArgumentValue {
        index,
        expected: native.to_string(),
        reason,
    };

    match native {
        NativeType::Void => Err(LeptonError::UnsupportedType("void".to_string())),
        NativeType::Bool => match value {
            NodeValue::Bool(b) => Ok(Scalar::Word(*b as u64)),
            NodeValue::Number(n) if n.as_u64() == Some(0) || n.as_u64() == Some(1) => {
                Ok(Scalar::Word(n.as_u64().unwrap_or_default()))
            }
            other => Err(mismatch(format!("got {}", other))),
        },
        NativeType::I8 | NativeType::I16 | NativeType::I32 | NativeType::I64 => {
            let v = value
                .as_i64()
                .ok_or_else(|| mismatch(format!("got {}", value)))?;
            let fits = match native {
                NativeType::I8 => i8::try_from(v).is_ok(),
                NativeType::I16 => i16::try_from(v).is_ok(),
                NativeType::I32 => i32::try_from(v).is_ok(),
                _ => true,
            };
            if !fits {
                return Err(mismatch(format!("{} is out of range", v)));
            }
            Ok(Scalar::Word(v as u64))
        }
        NativeType::U8 | NativeType::U16 | NativeType::U32 | NativeType::U64 => {
            let v = value
                .as_u64()
                .ok_or_else(|| mismatch(format!("got {}", value)))?;
            let fits = match native {
                NativeType::U8 => u8::try_from(v).is_ok(),
                NativeType::U16 => u16::try_from(v).is_ok(),
                NativeType::U32 => u32::try_from(v).is_ok(),
                _ => true,
            };
            if !fits {
                return Err(mismatch(format!("{} is out of range", v)));
            }
            Ok(Scalar::Word(v))
        }
        NativeType::F32 | NativeType::F64 => value
            .as_f64()
            .map(Scalar::Float)
            .ok_or_else(|| mismatch(format!("got {}", value))),
        NativeType::Ptr => match value {
            NodeValue::Null => Ok(Scalar::Word(0)),
            other => other
                .as_u64()
                .map(Scalar::Word)
                .ok_or_else(|| mismatch(format!("expected an address, got {}", other))),
        },
        NativeType::CStr => match value {
            NodeValue::Null => Ok(Scalar::Word(0)),
            NodeValue::String(s) => {
                let owned = CString::new(s.as_str())
                    .map_err(|e| mismatch(format!("string contains NUL: {}", e)))?;
                let address = owned.as_ptr() as u64;
                strings.push(owned);
                Ok(Scalar::Word(address))
            }
            other => Err(mismatch(format!("got {}", other))),
        },
    }
}

/// # Safety
///
/// `cell` must be valid for writes of `native`'s size and alignment.
unsafe fn write_slot(cell: *mut u64, native: NativeType, scalar: Scalar) {
    let (word, float) = match scalar {
        Scalar::Word(w) => (w, w as f64),
        Scalar::Float(f) => (f as u64, f),
    };
    unsafe {
        match native {
            NativeType::Void => {}
            NativeType::Bool => cell.cast::<bool>().write(word != 0),
            NativeType::I8 => cell.cast::<i8>().write(word as i8),
            NativeType::I16 => cell.cast::<i16>().write(word as i16),
            NativeType::I32 => cell.cast::<i32>().write(word as i32),
            NativeType::I64 => cell.cast::<i64>().write(word as i64),
            NativeType::U8 => cell.cast::<u8>().write(word as u8),
            NativeType::U16 => cell.cast::<u16>().write(word as u16),
            NativeType::U32 => cell.cast::<u32>().write(word as u32),
            NativeType::U64 | NativeType::Ptr | NativeType::CStr => cell.write(word),
            NativeType::F32 => cell.cast::<f32>().write(float as f32),
            NativeType::F64 => cell.cast::<f64>().write(float),
        }
    }
}

/// # Safety
///
/// `cell` must hold a value of type `native`. For `cstr` the stored pointer
/// must be null or point to a NUL-terminated string.
unsafe fn read_slot(cell: *const u64, native: NativeType) -> NodeValue {
    unsafe {
        match native {
            NativeType::Void => NodeValue::Null,
            NativeType::Bool => NodeValue::Bool(cell.cast::<u8>().read() != 0),
            NativeType::I8 => NodeValue::from(cell.cast::<i8>().read()),
            NativeType::I16 => NodeValue::from(cell.cast::<i16>().read()),
            NativeType::I32 => NodeValue::from(cell.cast::<i32>().read()),
            NativeType::I64 => NodeValue::from(cell.cast::<i64>().read()),
            NativeType::U8 => NodeValue::from(cell.cast::<u8>().read()),
            NativeType::U16 => NodeValue::from(cell.cast::<u16>().read()),
            NativeType::U32 => NodeValue::from(cell.cast::<u32>().read()),
            NativeType::U64 | NativeType::Ptr => NodeValue::from(cell.read()),
            NativeType::F32 => float_value(cell.cast::<f32>().read() as f64),
            NativeType::F64 => float_value(cell.cast::<f64>().read()),
            NativeType::CStr => string_value(cell.read()),
        }
    }
}

fn from_return(raw: RawReturn, return_type: NativeType) -> NodeValue {
    match raw {
        RawReturn::Void => NodeValue::Null,
        RawReturn::F32(f) => float_value(f as f64),
        RawReturn::F64(f) => float_value(f),
        RawReturn::Word(w) => match return_type {
            NativeType::Void => NodeValue::Null,
            NativeType::Bool => NodeValue::Bool(w as u8 != 0),
            NativeType::I8 => NodeValue::from(w as i8),
            NativeType::I16 => NodeValue::from(w as i16),
            NativeType::I32 => NodeValue::from(w as i32),
            NativeType::I64 => NodeValue::from(w as i64),
            NativeType::U8 => NodeValue::from(w as u8),
            NativeType::U16 => NodeValue::from(w as u16),
            NativeType::U32 => NodeValue::from(w as u32),
            NativeType::U64 | NativeType::Ptr => NodeValue::from(w),
            // Safety: a cstr return is a callee-owned NUL-terminated string or null.
            NativeType::CStr => unsafe { string_value(w) },
            NativeType::F32 => float_value(f32::from_bits(w as u32) as f64),
            NativeType::F64 => float_value(f64::from_bits(w)),
        },
    }
}

fn float_value(f: f64) -> NodeValue {
    Number::from_f64(f).map_or(NodeValue::Null, NodeValue::Number)
}

unsafe fn string_value(address: u64) -> NodeValue {
    if address == 0 {
        return NodeValue::Null;
    }
    let s = unsafe { CStr::from_ptr(address as *const c_char) };
    NodeValue::String(s.to_string_lossy().into_owned())
}

macro_rules! dispatch {
    ($symbol:expr, $ret:ty, $w:expr) => {{
        let address = $symbol.as_ptr();
        let w = $w;
        match w.len() {
            0 => {
                let f: unsafe extern "C" fn() -> $ret = unsafe { std::mem::transmute(address) };
                unsafe { f() }
            }
            1 => {
                let f: unsafe extern "C" fn(u64) -> $ret = unsafe { std::mem::transmute(address) };
                unsafe { f(w[0]) }
            }
            2 => {
                let f: unsafe extern "C" fn(u64, u64) -> $ret =
                    unsafe { std::mem::transmute(address) };
                unsafe { f(w[0], w[1]) }
            }
            3 => {
                let f: unsafe extern "C" fn(u64, u64, u64) -> $ret =
                    unsafe { std::mem::transmute(address) };
                unsafe { f(w[0], w[1], w[2]) }
            }
            4 => {
                let f: unsafe extern "C" fn(u64, u64, u64, u64) -> $ret =
                    unsafe { std::mem::transmute(address) };
                unsafe { f(w[0], w[1], w[2], w[3]) }
            }
            5 => {
                let f: unsafe extern "C" fn(u64, u64, u64, u64, u64) -> $ret =
                    unsafe { std::mem::transmute(address) };
                unsafe { f(w[0], w[1], w[2], w[3], w[4]) }
            }
            6 => {
                let f: unsafe extern "C" fn(u64, u64, u64, u64, u64, u64) -> $ret =
                    unsafe { std::mem::transmute(address) };
                unsafe { f(w[0], w[1], w[2], w[3], w[4], w[5]) }
            }
            n => return Err(LeptonError::TooManyArguments(n)),
        }
    }};
}

/// # Safety
///
/// See [`invoke`].
unsafe fn call_raw(
    symbol: NativeSymbol,
    class: ReturnClass,
    words: &[u64],
) -> Result<RawReturn, LeptonError> {
    if symbol.is_null() {
        return Err(LeptonError::ForeignCall("symbol resolved to a null address".to_string()));
    }
    let raw = match class {
        ReturnClass::Void => {
            dispatch!(symbol, (), words);
            RawReturn::Void
        }
        ReturnClass::Word => RawReturn::Word(dispatch!(symbol, u64, words)),
        ReturnClass::F32 => RawReturn::F32(dispatch!(symbol, f32, words)),
        ReturnClass::F64 => RawReturn::F64(dispatch!(symbol, f64, words)),
    };
    Ok(raw)
}
