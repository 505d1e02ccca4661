//! Column binding resolution
//!
//! A record type declares its column ↔ field bindings once through
//! [`SheetRecord::columns`]. [`Schema::resolve`] validates them, orders them
//! by ascending column index and caches the result per type.

use super::coerce::{assign_direct, FieldValue};
use crate::error::{SheetError, SheetResult};
use crate::types::CellValue;
use crate::workbook::MAX_COLUMN;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Semantic category of a bound field; drives coercion on import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Integer,
    Decimal,
    Boolean,
    DateTime,
    Bytes,
    String,
    /// Anything else: assigned directly when the raw value is compatible
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldType {
    pub kind: FieldKind,
    pub nullable: bool,
}

impl FieldType {
    pub fn of<F: FieldValue>() -> Self {
        Self {
            kind: F::KIND,
            nullable: F::NULLABLE,
        }
    }
}

type DecodeFn<T> = Box<dyn Fn(&mut T, &CellValue) -> Result<(), String> + Send + Sync>;
type EncodeFn<T> = Box<dyn Fn(&T) -> CellValue + Send + Sync>;

/// One column ↔ field association of record type `T`.
pub struct Binding<T> {
    column: u16,
    field: &'static str,
    field_type: FieldType,
    decode: DecodeFn<T>,
    encode: EncodeFn<T>,
}

impl<T: 'static> Binding<T> {
    /// Bind `column` to a field reached through the two accessors.
    ///
    /// ```
    /// use royalbit_sheetmap::mapping::Binding;
    ///
    /// #[derive(Default)]
    /// struct Person {
    ///     name: String,
    /// }
    ///
    /// let binding = Binding::new(0, "name", |p: &Person| &p.name, |p: &mut Person| &mut p.name);
    /// assert_eq!(binding.column(), 0);
    /// ```
    pub fn new<F, G, M>(column: u16, field: &'static str, get: G, get_mut: M) -> Self
    where
        F: FieldValue + 'static,
        G: for<'a> Fn(&'a T) -> &'a F + Send + Sync + 'static,
        M: for<'a> Fn(&'a mut T) -> &'a mut F + Send + Sync + 'static,
    {
        Self {
            column,
            field,
            field_type: FieldType::of::<F>(),
            decode: Box::new(move |record, raw| {
                if let Some(value) = F::from_cell(raw)? {
                    *get_mut(record) = value;
                }
                Ok(())
            }),
            encode: Box::new(move |record| get(record).to_cell()),
        }
    }

    /// Bind a column with hand-written conversions, for fields that need
    /// more than the stock [`FieldValue`] coercions.
    pub fn custom<D, E>(
        column: u16,
        field: &'static str,
        field_type: FieldType,
        decode: D,
        encode: E,
    ) -> Self
    where
        D: Fn(&mut T, &CellValue) -> Result<(), String> + Send + Sync + 'static,
        E: Fn(&T) -> CellValue + Send + Sync + 'static,
    {
        Self {
            column,
            field,
            field_type,
            decode: Box::new(decode),
            encode: Box::new(encode),
        }
    }

    /// Bind a field of a type outside the stock coercions. Present cells
    /// are handed to the field's `TryFrom<CellValue>`; absent cells leave
    /// the field unset.
    pub fn direct<V, G, M>(column: u16, field: &'static str, get: G, get_mut: M) -> Self
    where
        V: TryFrom<CellValue> + Clone + Into<CellValue> + 'static,
        V::Error: fmt::Display,
        G: for<'a> Fn(&'a T) -> &'a V + Send + Sync + 'static,
        M: for<'a> Fn(&'a mut T) -> &'a mut V + Send + Sync + 'static,
    {
        Self::custom(
            column,
            field,
            FieldType {
                kind: FieldKind::Other,
                nullable: true,
            },
            move |record, raw| {
                if !raw.is_none() {
                    *get_mut(record) = assign_direct(raw)?;
                }
                Ok(())
            },
            move |record| get(record).clone().into(),
        )
    }
}

impl<T> Binding<T> {
    pub fn column(&self) -> u16 {
        self.column
    }

    pub fn field(&self) -> &'static str {
        self.field
    }

    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    /// Coerce `raw` into the bound field of `record`.
    pub fn decode(&self, record: &mut T, raw: &CellValue) -> Result<(), String> {
        (self.decode)(record, raw)
    }

    /// Read the bound field of `record` as a cell value.
    pub fn encode(&self, record: &T) -> CellValue {
        (self.encode)(record)
    }
}

impl<T> fmt::Debug for Binding<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("column", &self.column)
            .field("field", &self.field)
            .field("field_type", &self.field_type)
            .finish()
    }
}

/// Bind a column to a named field of a record type.
///
/// ```
/// use royalbit_sheetmap::bind;
/// use royalbit_sheetmap::mapping::{Binding, SheetRecord};
///
/// #[derive(Default)]
/// struct Person {
///     name: String,
///     age: i32,
/// }
///
/// impl SheetRecord for Person {
///     fn columns() -> Vec<Binding<Self>> {
///         vec![bind!(Person, 0 => name), bind!(Person, 1 => age)]
///     }
/// }
/// ```
#[macro_export]
macro_rules! bind {
    ($record:ty, $column:expr => $field:ident) => {
        $crate::mapping::Binding::new(
            $column,
            stringify!($field),
            |record: &$record| &record.$field,
            |record: &mut $record| &mut record.$field,
        )
    };
}

/// Bind a column to a field whose type converts through `TryFrom<CellValue>`
/// rather than [`FieldValue`](crate::mapping::FieldValue).
#[macro_export]
macro_rules! bind_direct {
    ($record:ty, $column:expr => $field:ident) => {
        $crate::mapping::Binding::direct(
            $column,
            stringify!($field),
            |record: &$record| &record.$field,
            |record: &mut $record| &mut record.$field,
        )
    };
}

/// A record type that maps onto spreadsheet rows.
pub trait SheetRecord: Default + Sized + 'static {
    /// Column bindings in any order; unbound fields are never read or written.
    fn columns() -> Vec<Binding<Self>>;
}

//==============================================================================
// Schema
//==============================================================================

/// Resolved, column-ordered bindings of a record type.
#[derive(Debug)]
pub struct Schema<T> {
    bindings: Vec<Binding<T>>,
}

type SchemaCache = RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>;

static SCHEMAS: Lazy<SchemaCache> = Lazy::new(|| RwLock::new(HashMap::new()));

impl<T: SheetRecord> Schema<T> {
    /// Resolve the bindings of `T`, building them on first use.
    ///
    /// Failed resolutions are not cached, so a broken declaration reports
    /// the same error on every call.
    pub fn resolve() -> SheetResult<Arc<Self>> {
        let key = TypeId::of::<T>();

        if let Some(schema) = SCHEMAS.read().get(&key).cloned() {
            if let Ok(schema) = schema.downcast::<Self>() {
                return Ok(schema);
            }
        }

        let schema = Arc::new(Self::build(T::columns())?);
        debug!(
            record = std::any::type_name::<T>(),
            columns = schema.len(),
            "bindings resolved"
        );

        let cached = SCHEMAS
            .write()
            .entry(key)
            .or_insert_with(|| schema.clone() as Arc<dyn Any + Send + Sync>)
            .clone();
        Ok(cached.downcast::<Self>().unwrap_or(schema))
    }
}

impl<T> Schema<T> {
    /// Validate and order a binding list without touching the cache.
    pub fn build(mut bindings: Vec<Binding<T>>) -> SheetResult<Self> {
        let mut seen = HashSet::new();
        for binding in &bindings {
            if binding.column > MAX_COLUMN {
                return Err(SheetError::Schema(format!(
                    "field '{}' is bound to column {}, beyond the last column {}",
                    binding.field, binding.column, MAX_COLUMN
                )));
            }
            if !seen.insert(binding.column) {
                return Err(SheetError::Schema(format!(
                    "column {} is bound more than once (field '{}')",
                    binding.column, binding.field
                )));
            }
        }

        bindings.sort_by_key(|binding| binding.column);
        Ok(Self { bindings })
    }

    pub fn bindings(&self) -> &[Binding<T>] {
        &self.bindings
    }

    /// Bound column indices, ascending.
    pub fn columns(&self) -> impl Iterator<Item = u16> + '_ {
        self.bindings.iter().map(|binding| binding.column)
    }

    pub fn binding(&self, column: u16) -> Option<&Binding<T>> {
        self.bindings
            .binary_search_by_key(&column, |binding| binding.column)
            .ok()
            .map(|index| &self.bindings[index])
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
