//! Cell value ↔ field value coercions
//!
//! Every bindable field type implements [`FieldValue`]. Decoding returns
//! `Ok(None)` when the field must be left untouched (absent date, nullable
//! number on a blank cell, non-byte value for a byte field) and `Err(detail)`
//! when the raw value cannot be converted.

use super::binding::FieldKind;
use crate::error::SheetError;
use crate::types::CellValue;
use crate::workbook::reader::serial_to_datetime;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::fmt::Display;

/// Date/time text layouts accepted when a string cell feeds a date field.
const DATETIME_PATTERNS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];
const DATE_PATTERNS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

/// A Rust type that can be bound to a spreadsheet column.
pub trait FieldValue: Sized {
    const KIND: FieldKind;
    const NULLABLE: bool = false;

    /// Convert a raw cell; `Ok(None)` leaves the field unset.
    fn from_cell(raw: &CellValue) -> Result<Option<Self>, String>;

    fn to_cell(&self) -> CellValue;
}

fn empty_error(target: &str) -> String {
    format!("empty cell cannot be converted to {}", target)
}

fn type_error(raw: &CellValue, target: &str) -> String {
    format!("cannot convert {} '{}' to {}", raw.value_type(), raw, target)
}

/// True when a nullable numeric field should stay unset.
fn is_blank(raw: &CellValue) -> bool {
    raw.is_none() || raw.is_empty_string()
}

//==============================================================================
// Numbers
//==============================================================================

fn to_f64(raw: &CellValue, target: &str) -> Result<f64, String> {
    match raw {
        CellValue::Numeric(n) => Ok(*n),
        CellValue::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("'{}' is not a valid {}", s, target)),
        CellValue::Boolean(b) => Ok(if *b { 1.0 } else { 0.0 }),
        CellValue::None => Err(empty_error(target)),
        CellValue::DateTime(_) | CellValue::Bytes(_) => Err(type_error(raw, target)),
    }
}

/// Whole-number conversion: numerics round half-to-even, strings must parse as integers.
fn to_i128(raw: &CellValue, target: &str) -> Result<i128, String> {
    match raw {
        CellValue::Numeric(n) => {
            let rounded = n.round_ties_even();
            let wide = rounded as i128;
            if !rounded.is_finite() || wide as f64 != rounded {
                return Err(format!("{} is out of range for {}", n, target));
            }
            Ok(wide)
        }
        CellValue::String(s) => s
            .trim()
            .parse::<i128>()
            .map_err(|_| format!("'{}' is not a valid {}", s, target)),
        CellValue::Boolean(b) => Ok(i128::from(*b)),
        CellValue::None => Err(empty_error(target)),
        CellValue::DateTime(_) | CellValue::Bytes(_) => Err(type_error(raw, target)),
    }
}

macro_rules! integer_field {
    ($($int:ty),*) => {
        $(
            impl FieldValue for $int {
                const KIND: FieldKind = FieldKind::Integer;

                fn from_cell(raw: &CellValue) -> Result<Option<Self>, String> {
                    let target = stringify!($int);
                    let wide = to_i128(raw, target)?;
                    <$int>::try_from(wide)
                        .map(Some)
                        .map_err(|_| format!("{} is out of range for {}", wide, target))
                }

                fn to_cell(&self) -> CellValue {
                    CellValue::Numeric(*self as f64)
                }
            }

            impl FieldValue for Option<$int> {
                const KIND: FieldKind = FieldKind::Integer;
                const NULLABLE: bool = true;

                fn from_cell(raw: &CellValue) -> Result<Option<Self>, String> {
                    if is_blank(raw) {
                        return Ok(None);
                    }
                    Ok(<$int as FieldValue>::from_cell(raw)?.map(Some))
                }

                fn to_cell(&self) -> CellValue {
                    self.as_ref().map_or(CellValue::None, FieldValue::to_cell)
                }
            }
        )*
    };
}

integer_field!(i8, i16, i32, i64, u8, u16, u32, u64, isize, usize);

macro_rules! decimal_field {
    ($($float:ty),*) => {
        $(
            impl FieldValue for $float {
                const KIND: FieldKind = FieldKind::Decimal;

                fn from_cell(raw: &CellValue) -> Result<Option<Self>, String> {
                    let target = stringify!($float);
                    let value = to_f64(raw, target)? as $float;
                    if !value.is_finite() {
                        return Err(format!("'{}' is out of range for {}", raw, target));
                    }
                    Ok(Some(value))
                }

                fn to_cell(&self) -> CellValue {
                    CellValue::Numeric(f64::from(*self))
                }
            }

            impl FieldValue for Option<$float> {
                const KIND: FieldKind = FieldKind::Decimal;
                const NULLABLE: bool = true;

                fn from_cell(raw: &CellValue) -> Result<Option<Self>, String> {
                    if is_blank(raw) {
                        return Ok(None);
                    }
                    Ok(<$float as FieldValue>::from_cell(raw)?.map(Some))
                }

                fn to_cell(&self) -> CellValue {
                    self.as_ref().map_or(CellValue::None, FieldValue::to_cell)
                }
            }
        )*
    };
}

decimal_field!(f32, f64);

//==============================================================================
// Booleans
//==============================================================================

impl FieldValue for bool {
    const KIND: FieldKind = FieldKind::Boolean;

    fn from_cell(raw: &CellValue) -> Result<Option<Self>, String> {
        match raw {
            CellValue::Boolean(b) => Ok(Some(*b)),
            CellValue::Numeric(n) => Ok(Some(*n != 0.0)),
            CellValue::String(s) => {
                let text = s.trim();
                if text.eq_ignore_ascii_case("true") {
                    Ok(Some(true))
                } else if text.eq_ignore_ascii_case("false") {
                    Ok(Some(false))
                } else {
                    Err(format!("'{}' is not a valid bool", s))
                }
            }
            CellValue::None => Err(empty_error("bool")),
            CellValue::DateTime(_) | CellValue::Bytes(_) => Err(type_error(raw, "bool")),
        }
    }

    fn to_cell(&self) -> CellValue {
        CellValue::Boolean(*self)
    }
}

/// Only a missing cell leaves a nullable bool unset; `""` is still converted.
impl FieldValue for Option<bool> {
    const KIND: FieldKind = FieldKind::Boolean;
    const NULLABLE: bool = true;

    fn from_cell(raw: &CellValue) -> Result<Option<Self>, String> {
        if raw.is_none() {
            return Ok(None);
        }
        Ok(bool::from_cell(raw)?.map(Some))
    }

    fn to_cell(&self) -> CellValue {
        self.map_or(CellValue::None, CellValue::Boolean)
    }
}

//==============================================================================
// Dates
//==============================================================================

fn to_datetime(raw: &CellValue) -> Result<NaiveDateTime, String> {
    match raw {
        CellValue::DateTime(dt) => Ok(*dt),
        CellValue::Numeric(n) => serial_to_datetime(*n)
            .ok_or_else(|| format!("{} is not a valid date serial", n)),
        CellValue::String(s) => parse_datetime(s.trim())
            .ok_or_else(|| format!("'{}' is not a recognised date", s)),
        CellValue::None | CellValue::Boolean(_) | CellValue::Bytes(_) => {
            Err(type_error(raw, "datetime"))
        }
    }
}

fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    DATETIME_PATTERNS
        .iter()
        .find_map(|pattern| NaiveDateTime::parse_from_str(text, pattern).ok())
        .or_else(|| {
            DATE_PATTERNS
                .iter()
                .find_map(|pattern| NaiveDate::parse_from_str(text, pattern).ok())
                .map(|date| date.and_time(NaiveTime::MIN))
        })
}

impl FieldValue for NaiveDateTime {
    const KIND: FieldKind = FieldKind::DateTime;

    fn from_cell(raw: &CellValue) -> Result<Option<Self>, String> {
        if raw.is_none() {
            return Ok(None);
        }
        to_datetime(raw).map(Some)
    }

    fn to_cell(&self) -> CellValue {
        CellValue::DateTime(*self)
    }
}

impl FieldValue for Option<NaiveDateTime> {
    const KIND: FieldKind = FieldKind::DateTime;
    const NULLABLE: bool = true;

    fn from_cell(raw: &CellValue) -> Result<Option<Self>, String> {
        Ok(NaiveDateTime::from_cell(raw)?.map(Some))
    }

    fn to_cell(&self) -> CellValue {
        self.map_or(CellValue::None, CellValue::DateTime)
    }
}

impl FieldValue for NaiveDate {
    const KIND: FieldKind = FieldKind::DateTime;

    fn from_cell(raw: &CellValue) -> Result<Option<Self>, String> {
        Ok(NaiveDateTime::from_cell(raw)?.map(|dt| dt.date()))
    }

    fn to_cell(&self) -> CellValue {
        CellValue::DateTime(self.and_time(NaiveTime::MIN))
    }
}

impl FieldValue for Option<NaiveDate> {
    const KIND: FieldKind = FieldKind::DateTime;
    const NULLABLE: bool = true;

    fn from_cell(raw: &CellValue) -> Result<Option<Self>, String> {
        Ok(NaiveDate::from_cell(raw)?.map(Some))
    }

    fn to_cell(&self) -> CellValue {
        self.as_ref().map_or(CellValue::None, FieldValue::to_cell)
    }
}

//==============================================================================
// Bytes
//==============================================================================

impl FieldValue for Vec<u8> {
    const KIND: FieldKind = FieldKind::Bytes;

    fn from_cell(raw: &CellValue) -> Result<Option<Self>, String> {
        match raw {
            CellValue::Bytes(bytes) => Ok(Some(bytes.clone())),
            _ => Ok(None),
        }
    }

    fn to_cell(&self) -> CellValue {
        CellValue::Bytes(self.clone())
    }
}

impl FieldValue for Option<Vec<u8>> {
    const KIND: FieldKind = FieldKind::Bytes;
    const NULLABLE: bool = true;

    fn from_cell(raw: &CellValue) -> Result<Option<Self>, String> {
        Ok(Vec::<u8>::from_cell(raw)?.map(Some))
    }

    fn to_cell(&self) -> CellValue {
        self.as_ref().map_or(CellValue::None, FieldValue::to_cell)
    }
}

//==============================================================================
// Strings and passthrough
//==============================================================================

impl FieldValue for String {
    const KIND: FieldKind = FieldKind::String;

    fn from_cell(raw: &CellValue) -> Result<Option<Self>, String> {
        Ok(Some(raw.to_string()))
    }

    fn to_cell(&self) -> CellValue {
        CellValue::String(self.clone())
    }
}

impl FieldValue for Option<String> {
    const KIND: FieldKind = FieldKind::String;
    const NULLABLE: bool = true;

    fn from_cell(raw: &CellValue) -> Result<Option<Self>, String> {
        if is_blank(raw) {
            return Ok(None);
        }
        Ok(Some(Some(raw.to_string())))
    }

    fn to_cell(&self) -> CellValue {
        self.as_ref().map_or(CellValue::None, FieldValue::to_cell)
    }
}

/// Raw passthrough: the field receives the cell value as read.
impl FieldValue for CellValue {
    const KIND: FieldKind = FieldKind::Other;
    const NULLABLE: bool = true;

    fn from_cell(raw: &CellValue) -> Result<Option<Self>, String> {
        Ok(Some(raw.clone()))
    }

    fn to_cell(&self) -> CellValue {
        self.clone()
    }
}

/// Best-effort assignment for [`FieldKind::Other`] fields, used by
/// [`Binding::direct`](super::Binding::direct) and the `bind_direct!` macro.
pub fn assign_direct<V>(raw: &CellValue) -> Result<V, String>
where
    V: TryFrom<CellValue>,
    V::Error: Display,
{
    V::try_from(raw.clone()).map_err(|e| {
        SheetError::UnsupportedType {
            type_name: std::any::type_name::<V>(),
            detail: e.to_string(),
        }
        .to_string()
    })
}
