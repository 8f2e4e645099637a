//! Native argument type declarations.
//!
//! An [`ArgType`] pairs a native value type with a [`Direction`]. Types are
//! normalized to their canonical name when declared, so `ArgType::of::<i32>`,
//! `ArgType::parse("int", ..)` and `ArgType::parse("int32_t", ..)` all store
//! `"i32"`.

use std::ffi::{c_char, c_void};
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use super::error::LeptonError;

/// Data flow of a native argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u8)]
pub enum Direction {
    Input = 0,
    Output = 1,
    InputOutput = 2,
}

impl Direction {
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Whether the caller supplies a positional value for this argument.
    pub fn consumes_value(self) -> bool {
        matches!(self, Direction::Input | Direction::InputOutput)
    }

    /// Whether the argument is passed by address and read back after the call.
    pub fn is_written(self) -> bool {
        matches!(self, Direction::Output | Direction::InputOutput)
    }
}

impl TryFrom<u8> for Direction {
    type Error = LeptonError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Direction::Input),
            1 => Ok(Direction::Output),
            2 => Ok(Direction::InputOutput),
            other => Err(LeptonError::ArgumentValue {
                index: 0,
                expected: "direction code 0, 1 or 2".to_string(),
                reason: format!("got {}", other),
            }),
        }
    }
}

/// Native value types understood by the C marshaler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeType {
    Void,
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    /// Opaque pointer (`void*`)
    Ptr,
    /// NUL-terminated string (`const char*`)
    CStr,
}

impl NativeType {
    /// Canonical name stored in normalized argtypes.
    pub fn name(&self) -> &'static str {
        match self {
            NativeType::Void => "void",
            NativeType::Bool => "bool",
            NativeType::I8 => "i8",
            NativeType::I16 => "i16",
            NativeType::I32 => "i32",
            NativeType::I64 => "i64",
            NativeType::U8 => "u8",
            NativeType::U16 => "u16",
            NativeType::U32 => "u32",
            NativeType::U64 => "u64",
            NativeType::F32 => "f32",
            NativeType::F64 => "f64",
            NativeType::Ptr => "ptr",
            NativeType::CStr => "cstr",
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(self, NativeType::F32 | NativeType::F64)
    }
}

impl FromStr for NativeType {
    type Err = LeptonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ty = match s.trim().to_lowercase().as_str() {
            "void" | "()" => NativeType::Void,
            "bool" | "_bool" => NativeType::Bool,
            "i8" | "int8" | "int8_t" | "char" | "signed char" => NativeType::I8,
            "i16" | "int16" | "int16_t" | "short" => NativeType::I16,
            "i32" | "int32" | "int32_t" | "int" => NativeType::I32,
            "i64" | "int64" | "int64_t" | "long" | "long long" | "isize" | "ssize_t" => {
                NativeType::I64
            }
            "u8" | "uint8" | "uint8_t" | "byte" | "unsigned char" => NativeType::U8,
            "u16" | "uint16" | "uint16_t" | "unsigned short" => NativeType::U16,
            "u32" | "uint32" | "uint32_t" | "unsigned" | "unsigned int" => NativeType::U32,
            "u64" | "uint64" | "uint64_t" | "unsigned long" | "usize" | "size_t" => {
                NativeType::U64
            }
            "f32" | "float" => NativeType::F32,
            "f64" | "double" => NativeType::F64,
            "ptr" | "pointer" | "void*" | "void *" => NativeType::Ptr,
            "cstr" | "string" | "char*" | "char *" | "const char*" | "const char *" => {
                NativeType::CStr
            }
            other => return Err(LeptonError::UnsupportedType(other.to_string())),
        };
        Ok(ty)
    }
}

impl fmt::Display for NativeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Rust types with a native counterpart, usable with [`ArgType::of`].
pub trait NativeRepr {
    const NATIVE: NativeType;
}

macro_rules! native_repr {
    ($($ty:ty => $native:ident),* $(,)?) => {
        $(impl NativeRepr for $ty {
            const NATIVE: NativeType = NativeType::$native;
        })*
    };
}

native_repr! {
    () => Void,
    bool => Bool,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    isize => I64,
    usize => U64,
    *mut c_void => Ptr,
    *const c_void => Ptr,
    *const c_char => CStr,
}

/// A normalized `(type, direction)` argument declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ArgType {
    /// Canonical type name, e.g. `"i32"`
    pub type_name: String,
    pub direction: Direction,
}

impl ArgType {
    /// Declares an argument from a Rust type.
    pub fn of<T: NativeRepr>(direction: Direction) -> Self {
        Self::from_native(T::NATIVE, direction)
    }

    /// Declares an argument from a type name or alias.
    pub fn parse(type_name: &str, direction: Direction) -> Result<Self, LeptonError> {
        Ok(Self::from_native(type_name.parse()?, direction))
    }

    pub fn from_native(native: NativeType, direction: Direction) -> Self {
        ArgType {
            type_name: native.name().to_string(),
            direction,
        }
    }

    /// Resolves the stored name back to a [`NativeType`].
    pub fn native(&self) -> Result<NativeType, LeptonError> {
        self.type_name.parse()
    }

    /// The `(type, direction)` pair as stored.
    pub fn as_pair(&self) -> (&str, Direction) {
        (&self.type_name, self.direction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rust_types_normalize_to_names() {
        assert_eq!(ArgType::of::<i32>(Direction::Input).as_pair(), ("i32", Direction::Input));
        assert_eq!(ArgType::of::<f64>(Direction::Output).type_name, "f64");
        assert_eq!(ArgType::of::<*const c_char>(Direction::Input).type_name, "cstr");
        assert_eq!(ArgType::of::<usize>(Direction::Input).type_name, "u64");
    }

    #[test]
    fn test_aliases_normalize() {
        for alias in ["int", "int32_t", "I32", " int "] {
            assert_eq!(ArgType::parse(alias, Direction::Input).unwrap().type_name, "i32");
        }
        assert_eq!(ArgType::parse("double", Direction::Input).unwrap().type_name, "f64");
        assert_eq!(ArgType::parse("const char*", Direction::Input).unwrap().type_name, "cstr");
    }

    #[test]
    fn test_unknown_type_rejected() {
        let err = ArgType::parse("struct foo", Direction::Input).unwrap_err();
        assert!(matches!(err, LeptonError::UnsupportedType(_)));
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_direction_codes() {
        assert_eq!(Direction::Input.code(), 0);
        assert_eq!(Direction::Output.code(), 1);
        assert_eq!(Direction::InputOutput.code(), 2);
        assert_eq!(Direction::try_from(2).unwrap(), Direction::InputOutput);
        assert!(Direction::try_from(3).is_err());
        assert!(!Direction::Output.consumes_value());
        assert!(Direction::InputOutput.is_written());
    }
}
