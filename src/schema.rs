//! Feature descriptors resolved once per split from the Parquet/Arrow schema.
//!
//! The descriptor serves two consumers: the text extractor, which needs to
//! know where the string-typed leaves are, and the response serializer, which
//! echoes the full column list back to the caller. Resolving it once per
//! split avoids per-value runtime type inspection.

use arrow::datatypes::{DataType, Schema};
use serde::Serialize;

/// One column of a split, in schema order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Feature {
    pub feature_idx: usize,
    pub name: String,
    #[serde(rename = "type")]
    pub feature_type: FeatureType,
}

/// Recursive type descriptor for a column or nested field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "_type")]
pub enum FeatureType {
    /// Scalar leaf with a dtype name ("string", "int64", "float64", "bool",
    /// "binary"). Only "string" leaves are indexable.
    Value { dtype: String },
    /// Homogeneous list of a nested feature type.
    List { feature: Box<FeatureType> },
    /// Named nested fields.
    Struct { fields: Vec<StructField> },
}

/// A named field inside a [`FeatureType::Struct`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructField {
    pub name: String,
    #[serde(rename = "type")]
    pub feature_type: FeatureType,
}

impl FeatureType {
    /// True when this descriptor is a string scalar leaf.
    pub fn is_string_leaf(&self) -> bool {
        matches!(self, FeatureType::Value { dtype } if dtype == "string")
    }

    /// True when this type can contain string leaves anywhere beneath it.
    pub fn contains_text(&self) -> bool {
        match self {
            FeatureType::Value { .. } => self.is_string_leaf(),
            FeatureType::List { feature } => feature.contains_text(),
            FeatureType::Struct { fields } => {
                fields.iter().any(|f| f.feature_type.contains_text())
            }
        }
    }
}

/// Maps an Arrow data type to a feature descriptor.
///
/// Scalar types without a dedicated dtype name resolve to "string" because
/// that is how [`crate::value::array_value`] renders them (Utf8 cast). The
/// extractor therefore never sees a leaf it cannot interpret.
pub fn feature_type_of(data_type: &DataType) -> FeatureType {
    match data_type {
        DataType::List(field) | DataType::LargeList(field) => FeatureType::List {
            feature: Box::new(feature_type_of(field.data_type())),
        },
        DataType::Struct(fields) => FeatureType::Struct {
            fields: fields
                .iter()
                .map(|f| StructField {
                    name: f.name().clone(),
                    feature_type: feature_type_of(f.data_type()),
                })
                .collect(),
        },
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => FeatureType::Value {
            dtype: "string".to_string(),
        },
        DataType::Boolean => FeatureType::Value {
            dtype: "bool".to_string(),
        },
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32 => FeatureType::Value {
            dtype: "int64".to_string(),
        },
        DataType::Float16 | DataType::Float32 | DataType::Float64 => FeatureType::Value {
            dtype: "float64".to_string(),
        },
        DataType::Binary | DataType::LargeBinary => FeatureType::Value {
            dtype: "binary".to_string(),
        },
        DataType::Null => FeatureType::Value {
            dtype: "null".to_string(),
        },
        // Timestamps, decimals, dictionaries, ... are rendered as strings.
        _ => FeatureType::Value {
            dtype: "string".to_string(),
        },
    }
}

/// Resolves the ordered feature list of a split from its Arrow schema.
pub fn features_of(schema: &Schema) -> Vec<Feature> {
    schema
        .fields()
        .iter()
        .enumerate()
        .map(|(feature_idx, field)| Feature {
            feature_idx,
            name: field.name().clone(),
            feature_type: feature_type_of(field.data_type()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::datatypes::{Field, Fields};

    #[test]
    fn string_leaves_are_detected() {
        assert!(feature_type_of(&DataType::Utf8).is_string_leaf());
        assert!(!feature_type_of(&DataType::Int64).is_string_leaf());
    }

    #[test]
    fn nested_text_is_visible_through_containers() {
        let list_of_strings = DataType::List(
            Field::new("item", DataType::Utf8, true).into(),
        );
        assert!(feature_type_of(&list_of_strings).contains_text());

        let numeric_struct = DataType::Struct(Fields::from(vec![
            Field::new("a", DataType::Int64, true),
            Field::new("b", DataType::Float64, true),
        ]));
        assert!(!feature_type_of(&numeric_struct).contains_text());

        let mixed_struct = DataType::Struct(Fields::from(vec![
            Field::new("a", DataType::Int64, true),
            Field::new("title", DataType::Utf8, true),
        ]));
        assert!(feature_type_of(&mixed_struct).contains_text());
    }

    #[test]
    fn features_keep_schema_order_and_indices() {
        let schema = Schema::new(vec![
            Field::new("text", DataType::Utf8, true),
            Field::new("count", DataType::Int32, true),
        ]);
        let features = features_of(&schema);
        assert_eq!(features.len(), 2);
        assert_eq!(features[0].feature_idx, 0);
        assert_eq!(features[0].name, "text");
        assert_eq!(features[1].feature_idx, 1);
        assert_eq!(
            features[1].feature_type,
            FeatureType::Value { dtype: "int64".to_string() }
        );
    }

    #[test]
    fn descriptor_serializes_with_type_tag() {
        let feature = Feature {
            feature_idx: 0,
            name: "text".to_string(),
            feature_type: FeatureType::Value { dtype: "string".to_string() },
        };
        let json = serde_json::to_value(&feature).unwrap();
        assert_eq!(json["type"]["_type"], "Value");
        assert_eq!(json["type"]["dtype"], "string");
    }
}
