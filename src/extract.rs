//! Text extraction: walks a row's value tree and yields the indexable text.
//!
//! Extraction is a pure function of the row and the resolved feature
//! descriptors. Every `string` leaf contributes one `(column, text)` pair,
//! recursing through lists and structs without a depth limit (tabular
//! schemas cannot be cyclic). Non-string leaves and nulls contribute
//! nothing. A leaf that the schema declares as string but whose value is
//! anything else is a per-row extraction error; the build skips that row
//! rather than aborting.

use smallvec::SmallVec;

use crate::error::{Result, SearchError};
use crate::schema::{Feature, FeatureType};
use crate::value::{RowValues, Value};

/// One extracted text field: the top-level column it came from and the text.
#[derive(Debug, Clone, PartialEq)]
pub struct TextField<'a> {
    pub column: &'a str,
    pub text: &'a str,
}

/// Extracted fields for one row. Most rows have only a handful of text
/// columns, so the buffer stays on the stack.
pub type ExtractedText<'a> = SmallVec<[TextField<'a>; 4]>;

/// Extracts all indexable text fields of `row` according to `features`.
///
/// Columns missing from the row map are treated as null. `row_idx` is only
/// used to label the error when the row contradicts its declared schema.
pub fn extract_text<'a>(
    features: &'a [Feature],
    row: &'a RowValues,
    row_idx: u32,
) -> Result<ExtractedText<'a>> {
    let mut fields = ExtractedText::new();
    for feature in features {
        if !feature.feature_type.contains_text() {
            continue;
        }
        if let Some(value) = row.get(&feature.name) {
            walk(&feature.name, &feature.feature_type, value, row_idx, &mut fields)?;
        }
    }
    Ok(fields)
}

fn walk<'a>(
    column: &'a str,
    feature_type: &FeatureType,
    value: &'a Value,
    row_idx: u32,
    out: &mut ExtractedText<'a>,
) -> Result<()> {
    if matches!(value, Value::Null) {
        return Ok(());
    }
    match feature_type {
        FeatureType::Value { .. } => {
            if !feature_type.is_string_leaf() {
                return Ok(());
            }
            match value {
                Value::Str(text) => {
                    out.push(TextField { column, text });
                    Ok(())
                }
                other => Err(SearchError::Extraction {
                    row_idx,
                    reason: format!(
                        "column '{column}' is declared string but holds {}",
                        kind_name(other)
                    ),
                }),
            }
        }
        FeatureType::List { feature } => match value {
            Value::List(items) => {
                for item in items {
                    walk(column, feature, item, row_idx, out)?;
                }
                Ok(())
            }
            other => Err(SearchError::Extraction {
                row_idx,
                reason: format!(
                    "column '{column}' is declared list but holds {}",
                    kind_name(other)
                ),
            }),
        },
        FeatureType::Struct { fields: schema_fields } => match value {
            Value::Struct(entries) => {
                for field in schema_fields {
                    if let Some(inner) = entries.get(&field.name) {
                        walk(column, &field.feature_type, inner, row_idx, out)?;
                    }
                }
                Ok(())
            }
            other => Err(SearchError::Extraction {
                row_idx,
                reason: format!(
                    "column '{column}' is declared struct but holds {}",
                    kind_name(other)
                ),
            }),
        },
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a bool",
        Value::Int(_) => "an integer",
        Value::Float(_) => "a float",
        Value::Str(_) => "a string",
        Value::Bytes(_) => "binary data",
        Value::List(_) => "a list",
        Value::Struct(_) => "a struct",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::StructField;
    use indexmap::IndexMap;

    fn string_feature(idx: usize, name: &str) -> Feature {
        Feature {
            feature_idx: idx,
            name: name.to_string(),
            feature_type: FeatureType::Value { dtype: "string".to_string() },
        }
    }

    #[test]
    fn extracts_top_level_strings_only() {
        let features = vec![
            string_feature(0, "text"),
            Feature {
                feature_idx: 1,
                name: "count".to_string(),
                feature_type: FeatureType::Value { dtype: "int64".to_string() },
            },
        ];
        let mut row = RowValues::new();
        row.insert("text".to_string(), Value::Str("hello world".to_string()));
        row.insert("count".to_string(), Value::Int(3));

        let fields = extract_text(&features, &row, 0).unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].column, "text");
        assert_eq!(fields[0].text, "hello world");
    }

    #[test]
    fn recurses_into_lists_and_structs() {
        let features = vec![Feature {
            feature_idx: 0,
            name: "messages".to_string(),
            feature_type: FeatureType::List {
                feature: Box::new(FeatureType::Struct {
                    fields: vec![
                        StructField {
                            name: "role".to_string(),
                            feature_type: FeatureType::Value { dtype: "string".to_string() },
                        },
                        StructField {
                            name: "score".to_string(),
                            feature_type: FeatureType::Value { dtype: "float64".to_string() },
                        },
                    ],
                }),
            },
        }];

        let mut inner = IndexMap::new();
        inner.insert("role".to_string(), Value::Str("assistant".to_string()));
        inner.insert("score".to_string(), Value::Float(0.9));
        let mut row = RowValues::new();
        row.insert(
            "messages".to_string(),
            Value::List(vec![Value::Struct(inner)]),
        );

        let fields = extract_text(&features, &row, 5).unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].column, "messages");
        assert_eq!(fields[0].text, "assistant");
    }

    #[test]
    fn nulls_and_missing_columns_yield_nothing() {
        let features = vec![string_feature(0, "text"), string_feature(1, "absent")];
        let mut row = RowValues::new();
        row.insert("text".to_string(), Value::Null);

        let fields = extract_text(&features, &row, 0).unwrap();
        assert!(fields.is_empty());
    }

    #[test]
    fn schema_mismatch_is_a_row_error() {
        let features = vec![string_feature(0, "text")];
        let mut row = RowValues::new();
        row.insert("text".to_string(), Value::Int(42));

        let err = extract_text(&features, &row, 7).unwrap_err();
        match err {
            SearchError::Extraction { row_idx, reason } => {
                assert_eq!(row_idx, 7);
                assert!(reason.contains("text"));
            }
            other => panic!("expected extraction error, got {other}"),
        }
    }

    #[test]
    fn multiple_text_columns_stay_in_schema_order() {
        let features = vec![string_feature(0, "title"), string_feature(1, "body")];
        let mut row = RowValues::new();
        row.insert("title".to_string(), Value::Str("a".to_string()));
        row.insert("body".to_string(), Value::Str("b".to_string()));

        let fields = extract_text(&features, &row, 0).unwrap();
        let columns: Vec<&str> = fields.iter().map(|f| f.column).collect();
        assert_eq!(columns, vec!["title", "body"]);
    }
}
