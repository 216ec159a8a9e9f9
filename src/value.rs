//! Recursive row value model and Arrow-to-value conversion.
//!
//! Rows are modeled as a tagged variant tree (`Scalar | List | Struct`), per
//! the shape Parquet/Arrow schemas allow. Tabular schemas cannot form cycles,
//! so plain recursion is sufficient everywhere values are walked.
//!
//! Arrow scalar types without a dedicated variant (timestamps, decimals,
//! dictionaries, ...) are rendered through an Arrow cast to Utf8, so every
//! cell has a JSON representation even when it is not indexable.

use arrow::array::*;
use arrow::compute::cast;
use arrow::datatypes::DataType;
use indexmap::IndexMap;
use serde::Serialize;

use crate::error::Result;

/// A single cell value, possibly nested.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    Struct(IndexMap<String, Value>),
}

/// A fully materialized row: column name to cell value, in schema order.
pub type RowValues = IndexMap<String, Value>;

impl Value {
    /// Approximate serialized size of this value in bytes.
    ///
    /// Used for budget accounting during index builds. The estimate follows
    /// the in-file representation (string/binary payload length, 8 bytes per
    /// numeric, field names for structs) and is a deterministic function of
    /// the value, which is what budget-cutoff determinism requires.
    pub fn byte_size(&self) -> u64 {
        match self {
            Value::Null => 1,
            Value::Bool(_) => 1,
            Value::Int(_) | Value::Float(_) => 8,
            Value::Str(s) => s.len() as u64,
            Value::Bytes(b) => b.len() as u64,
            Value::List(items) => items.iter().map(Value::byte_size).sum(),
            Value::Struct(fields) => fields
                .iter()
                .map(|(name, v)| name.len() as u64 + v.byte_size())
                .sum(),
        }
    }
}

/// Approximate serialized size of a whole row in bytes.
pub fn row_byte_size(row: &RowValues) -> u64 {
    row.iter()
        .map(|(name, v)| name.len() as u64 + v.byte_size())
        .sum()
}

/// Converts one cell of an Arrow array into a [`Value`].
///
/// Nulls become [`Value::Null`] regardless of the array type. Lists and
/// structs recurse. Anything not covered by a concrete variant is cast to
/// Utf8 and carried as a string.
pub fn array_value(array: &dyn Array, row: usize) -> Result<Value> {
    if array.is_null(row) {
        return Ok(Value::Null);
    }

    match array.data_type() {
        DataType::Null => Ok(Value::Null),
        DataType::Boolean => {
            let arr = array
                .as_any()
                .downcast_ref::<BooleanArray>()
                .expect("Boolean data type downcasts to BooleanArray");
            Ok(Value::Bool(arr.value(row)))
        }
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32 => {
            let cast_arr = cast(array, &DataType::Int64)?;
            let arr = cast_arr
                .as_any()
                .downcast_ref::<Int64Array>()
                .expect("cast to Int64 produces Int64Array");
            Ok(Value::Int(arr.value(row)))
        }
        DataType::Float16 | DataType::Float32 | DataType::Float64 => {
            let cast_arr = cast(array, &DataType::Float64)?;
            let arr = cast_arr
                .as_any()
                .downcast_ref::<Float64Array>()
                .expect("cast to Float64 produces Float64Array");
            Ok(Value::Float(arr.value(row)))
        }
        DataType::Utf8 => {
            let arr = array
                .as_any()
                .downcast_ref::<StringArray>()
                .expect("Utf8 data type downcasts to StringArray");
            Ok(Value::Str(arr.value(row).to_string()))
        }
        DataType::LargeUtf8 => {
            let arr = array
                .as_any()
                .downcast_ref::<LargeStringArray>()
                .expect("LargeUtf8 data type downcasts to LargeStringArray");
            Ok(Value::Str(arr.value(row).to_string()))
        }
        DataType::Binary => {
            let arr = array
                .as_any()
                .downcast_ref::<BinaryArray>()
                .expect("Binary data type downcasts to BinaryArray");
            Ok(Value::Bytes(arr.value(row).to_vec()))
        }
        DataType::LargeBinary => {
            let arr = array
                .as_any()
                .downcast_ref::<LargeBinaryArray>()
                .expect("LargeBinary data type downcasts to LargeBinaryArray");
            Ok(Value::Bytes(arr.value(row).to_vec()))
        }
        DataType::List(_) => {
            let arr = array
                .as_any()
                .downcast_ref::<ListArray>()
                .expect("List data type downcasts to ListArray");
            let inner = arr.value(row);
            let mut items = Vec::with_capacity(inner.len());
            for i in 0..inner.len() {
                items.push(array_value(inner.as_ref(), i)?);
            }
            Ok(Value::List(items))
        }
        DataType::LargeList(_) => {
            let arr = array
                .as_any()
                .downcast_ref::<LargeListArray>()
                .expect("LargeList data type downcasts to LargeListArray");
            let inner = arr.value(row);
            let mut items = Vec::with_capacity(inner.len());
            for i in 0..inner.len() {
                items.push(array_value(inner.as_ref(), i)?);
            }
            Ok(Value::List(items))
        }
        DataType::Struct(fields) => {
            let arr = array
                .as_any()
                .downcast_ref::<StructArray>()
                .expect("Struct data type downcasts to StructArray");
            let mut map = IndexMap::with_capacity(fields.len());
            for (field, column) in fields.iter().zip(arr.columns()) {
                map.insert(field.name().clone(), array_value(column.as_ref(), row)?);
            }
            Ok(Value::Struct(map))
        }
        // UInt64 can exceed i64; render through the string fallback along
        // with timestamps, decimals, dictionaries and the rest.
        _ => {
            let cast_arr = cast(array, &DataType::Utf8)?;
            let arr = cast_arr
                .as_any()
                .downcast_ref::<StringArray>()
                .expect("cast to Utf8 produces StringArray");
            Ok(Value::Str(arr.value(row).to_string()))
        }
    }
}

/// Converts one row of a record batch into a [`RowValues`] map.
pub fn batch_row(batch: &RecordBatch, row: usize) -> Result<RowValues> {
    let schema = batch.schema();
    let mut values = IndexMap::with_capacity(batch.num_columns());
    for (field, column) in schema.fields().iter().zip(batch.columns()) {
        values.insert(field.name().clone(), array_value(column.as_ref(), row)?);
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use arrow::datatypes::{Field, Fields, Schema};

    #[test]
    fn scalars_convert_with_nulls() {
        let arr = StringArray::from(vec![Some("hello"), None]);
        assert_eq!(array_value(&arr, 0).unwrap(), Value::Str("hello".into()));
        assert_eq!(array_value(&arr, 1).unwrap(), Value::Null);

        let ints = Int32Array::from(vec![7]);
        assert_eq!(array_value(&ints, 0).unwrap(), Value::Int(7));

        let bools = BooleanArray::from(vec![true]);
        assert_eq!(array_value(&bools, 0).unwrap(), Value::Bool(true));
    }

    #[test]
    fn structs_recurse() {
        let names = StringArray::from(vec!["ada"]);
        let ages = Int64Array::from(vec![36i64]);
        let fields = Fields::from(vec![
            Field::new("name", DataType::Utf8, false),
            Field::new("age", DataType::Int64, false),
        ]);
        let arr = StructArray::new(
            fields,
            vec![
                Arc::new(names) as ArrayRef,
                Arc::new(ages) as ArrayRef,
            ],
            None,
        );

        let value = array_value(&arr, 0).unwrap();
        match value {
            Value::Struct(map) => {
                assert_eq!(map["name"], Value::Str("ada".into()));
                assert_eq!(map["age"], Value::Int(36));
            }
            other => panic!("expected struct, got {other:?}"),
        }
    }

    #[test]
    fn batch_rows_keep_schema_order() {
        let schema = Arc::new(Schema::new(vec![
            Field::new("b_col", DataType::Utf8, true),
            Field::new("a_col", DataType::Int64, true),
        ]));
        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(vec!["x"])) as ArrayRef,
                Arc::new(Int64Array::from(vec![1i64])) as ArrayRef,
            ],
        )
        .unwrap();

        let row = batch_row(&batch, 0).unwrap();
        let keys: Vec<&String> = row.keys().collect();
        assert_eq!(keys, vec!["b_col", "a_col"]);
    }

    #[test]
    fn byte_size_tracks_string_payload() {
        let mut row = RowValues::new();
        row.insert("text".to_string(), Value::Str("abcdef".to_string()));
        // 4 bytes of column name + 6 bytes of payload.
        assert_eq!(row_byte_size(&row), 10);
    }
}
