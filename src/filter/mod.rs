//! Typed filter population from `name=value` command line attributes
//!
//! Every filter record declares a table of its attributes and their
//! [`FieldKind`]. Raw strings are converted per kind into a [`FieldValue`]
//! and handed to the record's `assign`, so no runtime type inspection is
//! involved. Records are declared with [`filter_record!`].

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::warn;

pub const TIME_LABEL: &str = "time (milliseconds since Unix epoch)";

/// Filter population errors
#[derive(Debug, Error, PartialEq)]
pub enum FilterError {
    #[error("unable to set {field}: {reason}")]
    Parse { field: String, reason: String },

    #[error("{field} has unsupported type for value {value:?}")]
    Unsupported { field: String, value: String },
}

/// Integer widths accepted by filter attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntKind {
    I8,
    I16,
    I32,
    I64,
    Isize,
    U8,
    U16,
    U32,
    U64,
    Usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloatKind {
    F32,
    F64,
}

/// The closed set of attribute kinds a filter may carry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Str,
    Bool,
    Int(IntKind),
    Float(FloatKind),
    Time,
    Optional(Box<FieldKind>),
    List(Box<FieldKind>),
}

/// A converted attribute value, shaped like its [`FieldKind`]
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Str(String),
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    Time(DateTime<Utc>),
    List(Vec<FieldValue>),
}

/// Case-insensitive truthiness: true, t, yes, y and 1 are true, anything else false
pub fn boolish(s: &str) -> bool {
    matches!(
        s.to_lowercase().as_str(),
        "true" | "t" | "yes" | "y" | "1"
    )
}

impl IntKind {
    fn label(self) -> &'static str {
        match self {
            IntKind::I8 => "int8",
            IntKind::I16 => "int16",
            IntKind::I32 => "int32",
            IntKind::I64 => "int64",
            IntKind::Isize => "int",
            IntKind::U8 => "uint8",
            IntKind::U16 => "uint16",
            IntKind::U32 => "uint32",
            IntKind::U64 => "uint64",
            IntKind::Usize => "uint",
        }
    }

    fn parse(self, raw: &str) -> Result<FieldValue, String> {
        fn fits<T: TryFrom<i128>>(v: i128, label: &str) -> Result<(), String> {
            T::try_from(v)
                .map(|_| ())
                .map_err(|_| format!("{} out of range for {}", v, label))
        }

        let v: i128 = raw
            .trim()
            .parse()
            .map_err(|e| format!("{:?} is not an integer: {}", raw, e))?;

        match self {
            IntKind::I8 => fits::<i8>(v, self.label())?,
            IntKind::I16 => fits::<i16>(v, self.label())?,
            IntKind::I32 => fits::<i32>(v, self.label())?,
            IntKind::I64 => fits::<i64>(v, self.label())?,
            IntKind::Isize => fits::<isize>(v, self.label())?,
            IntKind::U8 => fits::<u8>(v, self.label())?,
            IntKind::U16 => fits::<u16>(v, self.label())?,
            IntKind::U32 => fits::<u32>(v, self.label())?,
            IntKind::U64 => fits::<u64>(v, self.label())?,
            IntKind::Usize => fits::<usize>(v, self.label())?,
        }

        if self.is_signed() {
            Ok(FieldValue::Int(v as i64))
        } else {
            Ok(FieldValue::Uint(v as u64))
        }
    }

    fn is_signed(self) -> bool {
        matches!(
            self,
            IntKind::I8 | IntKind::I16 | IntKind::I32 | IntKind::I64 | IntKind::Isize
        )
    }
}

impl FieldKind {
    /// Human readable type description shown by `list --show-filter-fields`
    pub fn label(&self) -> String {
        match self {
            FieldKind::Str => "string".to_string(),
            FieldKind::Bool => "bool".to_string(),
            FieldKind::Int(k) => k.label().to_string(),
            FieldKind::Float(FloatKind::F32) => "float32".to_string(),
            FieldKind::Float(FloatKind::F64) => "float64".to_string(),
            FieldKind::Time => TIME_LABEL.to_string(),
            FieldKind::Optional(inner) => inner.label(),
            FieldKind::List(inner) => format!("slice<{}>", inner.label()),
        }
    }

    /// Convert a raw attribute string. List elements are split on `slice_sep`.
    pub fn parse(&self, raw: &str, slice_sep: &str) -> Result<FieldValue, String> {
        match self {
            FieldKind::Str => Ok(FieldValue::Str(raw.to_string())),
            FieldKind::Bool => Ok(FieldValue::Bool(boolish(raw))),
            FieldKind::Int(k) => k.parse(raw),
            FieldKind::Float(k) => {
                let f: f64 = raw
                    .trim()
                    .parse()
                    .map_err(|e| format!("{:?} is not a number: {}", raw, e))?;
                if *k == FloatKind::F32 && f.is_finite() && (f as f32).is_infinite() {
                    return Err(format!("{} out of range for float32", f));
                }
                Ok(FieldValue::Float(f))
            }
            FieldKind::Time => {
                let ms: i64 = raw.trim().parse().map_err(|e| {
                    format!("time must be provided as MS since Unix epoch: {}", e)
                })?;
                DateTime::from_timestamp_millis(ms)
                    .map(FieldValue::Time)
                    .ok_or_else(|| format!("{} ms is outside the supported time range", ms))
            }
            FieldKind::Optional(inner) => inner.parse(raw, slice_sep),
            FieldKind::List(inner) => raw
                .split(slice_sep)
                .map(|element| {
                    inner.parse(element, slice_sep).map_err(|e| {
                        format!("unable to assign element {:?} in slice: {}", element, e)
                    })
                })
                .collect::<Result<Vec<_>, _>>()
                .map(FieldValue::List),
        }
    }
}

/// A Rust type usable as a filter attribute
pub trait FieldType: Sized {
    fn kind() -> FieldKind;

    /// Convert a value produced by `Self::kind()`; `None` on a shape mismatch
    fn from_value(value: FieldValue) -> Option<Self>;

    /// Unset attributes are omitted when the filter is serialized
    fn is_unset(&self) -> bool {
        false
    }
}

impl FieldType for String {
    fn kind() -> FieldKind {
        FieldKind::Str
    }

    fn from_value(value: FieldValue) -> Option<Self> {
        match value {
            FieldValue::Str(s) => Some(s),
            _ => None,
        }
    }

    fn is_unset(&self) -> bool {
        self.is_empty()
    }
}

impl FieldType for bool {
    fn kind() -> FieldKind {
        FieldKind::Bool
    }

    fn from_value(value: FieldValue) -> Option<Self> {
        match value {
            FieldValue::Bool(b) => Some(b),
            _ => None,
        }
    }
}

macro_rules! int_field_type {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl FieldType for $ty {
                fn kind() -> FieldKind {
                    FieldKind::Int(IntKind::$kind)
                }

                fn from_value(value: FieldValue) -> Option<Self> {
                    match value {
                        FieldValue::Int(i) => <$ty>::try_from(i).ok(),
                        FieldValue::Uint(u) => <$ty>::try_from(u).ok(),
                        _ => None,
                    }
                }
            }
        )*
    };
}

int_field_type! {
    i8 => I8, i16 => I16, i32 => I32, i64 => I64, isize => Isize,
    u8 => U8, u16 => U16, u32 => U32, u64 => U64, usize => Usize,
}

impl FieldType for f32 {
    fn kind() -> FieldKind {
        FieldKind::Float(FloatKind::F32)
    }

    fn from_value(value: FieldValue) -> Option<Self> {
        match value {
            FieldValue::Float(f) => Some(f as f32),
            _ => None,
        }
    }
}

impl FieldType for f64 {
    fn kind() -> FieldKind {
        FieldKind::Float(FloatKind::F64)
    }

    fn from_value(value: FieldValue) -> Option<Self> {
        match value {
            FieldValue::Float(f) => Some(f),
            _ => None,
        }
    }
}

impl FieldType for DateTime<Utc> {
    fn kind() -> FieldKind {
        FieldKind::Time
    }

    fn from_value(value: FieldValue) -> Option<Self> {
        match value {
            FieldValue::Time(t) => Some(t),
            _ => None,
        }
    }
}

impl<T: FieldType> FieldType for Option<T> {
    fn kind() -> FieldKind {
        FieldKind::Optional(Box::new(T::kind()))
    }

    fn from_value(value: FieldValue) -> Option<Self> {
        T::from_value(value).map(Some)
    }

    fn is_unset(&self) -> bool {
        self.is_none()
    }
}

impl<T: FieldType> FieldType for Vec<T> {
    fn kind() -> FieldKind {
        FieldKind::List(Box::new(T::kind()))
    }

    fn from_value(value: FieldValue) -> Option<Self> {
        match value {
            FieldValue::List(values) => values.into_iter().map(T::from_value).collect(),
            _ => None,
        }
    }

    fn is_unset(&self) -> bool {
        self.is_empty()
    }
}

/// A filter record narrowing an index query
pub trait Filter: Default {
    /// Attribute names and kinds, in declaration order
    fn fields() -> Vec<(&'static str, FieldKind)>;

    /// Assign an already converted value to the named attribute
    fn assign(&mut self, field: &str, value: FieldValue) -> Result<(), FilterError>;
}

/// Fill `filter` from `attrs`, converting each value per the attribute's kind.
///
/// Attribute names the filter does not declare are skipped with a warning.
/// Any conversion failure aborts the whole call.
pub fn populate<F: Filter>(
    filter: &mut F,
    attrs: &BTreeMap<String, String>,
    slice_sep: &str,
) -> Result<(), FilterError> {
    let fields = F::fields();

    for (name, raw) in attrs {
        let Some((field, kind)) = fields.iter().find(|(f, _)| f == name) else {
            warn!("ignoring unknown filter attribute {}", name);
            continue;
        };

        let value = kind.parse(raw, slice_sep).map_err(|reason| FilterError::Parse {
            field: field.to_string(),
            reason,
        })?;

        filter.assign(field, value)?;
    }

    Ok(())
}

/// Attribute name to type description for a filter record
pub fn describe<F: Filter>() -> BTreeMap<&'static str, String> {
    F::fields()
        .into_iter()
        .map(|(name, kind)| (name, kind.label()))
        .collect()
}

/// Declare a filter record together with its attribute table.
///
/// Each attribute may carry `as "wire_name"` to use a serialization name
/// different from the Rust field name; that name is also the attribute
/// name accepted on the command line.
#[macro_export]
macro_rules! filter_record {
    (
        $(#[$meta:meta])*
        pub struct $name:ident {
            $(
                $(#[$fmeta:meta])*
                pub $field:ident $(as $wire:literal)?: $ty:ty,
            )*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
        pub struct $name {
            $(
                $(#[$fmeta])*
                $(#[serde(rename = $wire)])?
                #[serde(default, skip_serializing_if = "crate::filter::FieldType::is_unset")]
                pub $field: $ty,
            )*
        }

        impl $crate::filter::Filter for $name {
            fn fields() -> Vec<(&'static str, $crate::filter::FieldKind)> {
                vec![
                    $((
                        $crate::filter_record!(@name $field $($wire)?),
                        <$ty as $crate::filter::FieldType>::kind(),
                    ),)*
                ]
            }

            fn assign(
                &mut self,
                field: &str,
                value: $crate::filter::FieldValue,
            ) -> Result<(), $crate::filter::FilterError> {
                $(
                    if field == $crate::filter_record!(@name $field $($wire)?) {
                        let raw = format!("{:?}", value);
                        self.$field = <$ty as $crate::filter::FieldType>::from_value(value)
                            .ok_or_else(|| $crate::filter::FilterError::Unsupported {
                                field: field.to_string(),
                                value: raw,
                            })?;
                        return Ok(());
                    }
                )*
                Err($crate::filter::FilterError::Unsupported {
                    field: field.to_string(),
                    value: format!("{:?}", value),
                })
            }
        }
    };
    (@name $field:ident $wire:literal) => { $wire };
    (@name $field:ident) => { stringify!($field) };
}
