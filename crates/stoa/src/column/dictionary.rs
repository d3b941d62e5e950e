//! Dictionary columns: a sorted unique dictionary plus a compressed
//! attribute vector of dictionary indices. A reserved top index
//! (`dictionary.len()`) denotes NULL.

use crate::column::typed::TypedValues;
use crate::column::value::ValueColumn;
use crate::types::{DataType, Value, ValueId};
use crate::zs::{ZsType, ZsVector};

#[derive(Debug, Clone)]
pub struct DictionaryColumn {
    dictionary: TypedValues,
    attributes: ZsVector,
    null_value_id: ValueId,
}

impl DictionaryColumn {
    /// Encode a value column: copy the values dropping NULL positions,
    /// sort ascending, deduplicate, shrink, then map every row to its
    /// `lower_bound` index. NULL rows get the reserved top index. The
    /// attribute vector uses the narrowest fixed byte width that covers
    /// `dictionary.len()`.
    pub fn from_value_column(column: &ValueColumn) -> DictionaryColumn {
        let mut dictionary = TypedValues::new(column.data_type());
        for row in 0..column.len() {
            if !column.is_null(row) {
                // Cannot fail: the value was read out of a column of the
                // same type.
                let _ = dictionary.push(&column.get(row));
            }
        }
        dictionary.sort_unique_shrink();

        let null_value_id = dictionary.len() as ValueId;
        let mut indices = Vec::with_capacity(column.len());
        for row in 0..column.len() {
            if column.is_null(row) {
                indices.push(null_value_id);
            } else {
                indices.push(dictionary.lower_bound(&column.get(row)) as ValueId);
            }
        }

        let attributes = ZsVector::encode(&indices, ZsType::fixed_for_max(null_value_id));
        DictionaryColumn {
            dictionary,
            attributes,
            null_value_id,
        }
    }

    pub fn data_type(&self) -> DataType {
        self.dictionary.data_type()
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn get(&self, index: usize) -> Value {
        let value_id = self.attributes.get(index);
        if value_id == self.null_value_id {
            Value::Null
        } else {
            self.dictionary.get(value_id as usize)
        }
    }

    pub fn dictionary(&self) -> &TypedValues {
        &self.dictionary
    }

    pub fn attribute_vector(&self) -> &ZsVector {
        &self.attributes
    }

    pub fn null_value_id(&self) -> ValueId {
        self.null_value_id
    }

    pub fn unique_values_count(&self) -> usize {
        self.dictionary.len()
    }

    /// First dictionary index whose value is >= `value`.
    pub fn lower_bound(&self, value: &Value) -> ValueId {
        self.dictionary.lower_bound(value) as ValueId
    }

    /// First dictionary index whose value is > `value`.
    pub fn upper_bound(&self, value: &Value) -> ValueId {
        self.dictionary.upper_bound(value) as ValueId
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DataType;

    fn text_column(values: &[Option<&str>]) -> ValueColumn {
        let typed: Vec<Value> = values
            .iter()
            .map(|v| match v {
                Some(s) => Value::Text((*s).into()),
                None => Value::Null,
            })
            .collect();
        ValueColumn::from_values(DataType::Text, &typed, true).unwrap()
    }

    #[test]
    fn encodes_with_null_at_reserved_index() {
        let column = text_column(&[Some("b"), None, Some("a"), Some("a")]);
        let encoded = DictionaryColumn::from_value_column(&column);
        assert_eq!(
            *encoded.dictionary(),
            TypedValues::Text(vec!["a".into(), "b".into()])
        );
        assert_eq!(encoded.null_value_id(), 2);
        assert_eq!(encoded.attribute_vector().decode(), vec![1, 2, 0, 0]);
    }

    #[test]
    fn round_trips_every_row() {
        let values: Vec<Value> = (0..300)
            .map(|i| {
                if i % 7 == 0 {
                    Value::Null
                } else {
                    Value::Int32(i % 13)
                }
            })
            .collect();
        let column = ValueColumn::from_values(DataType::Int32, &values, true).unwrap();
        let encoded = DictionaryColumn::from_value_column(&column);
        for (row, expected) in values.iter().enumerate() {
            assert_eq!(&encoded.get(row), expected, "row {row}");
        }
        assert_eq!(encoded.unique_values_count(), 12);
    }

    #[test]
    fn attribute_vector_width_tracks_dictionary_size() {
        let values: Vec<Value> = (0..300).map(Value::Int32).collect();
        let column = ValueColumn::from_values(DataType::Int32, &values, false).unwrap();
        let encoded = DictionaryColumn::from_value_column(&column);
        assert_eq!(
            encoded.attribute_vector().zs_type(),
            crate::zs::ZsType::Fixed2
        );
    }

    #[test]
    fn bound_lookups() {
        let column = text_column(&[Some("b"), Some("d"), Some("b")]);
        let encoded = DictionaryColumn::from_value_column(&column);
        assert_eq!(encoded.lower_bound(&Value::Text("b".into())), 0);
        assert_eq!(encoded.upper_bound(&Value::Text("b".into())), 1);
        assert_eq!(encoded.lower_bound(&Value::Text("c".into())), 1);
        assert_eq!(encoded.lower_bound(&Value::Text("z".into())), 2);
    }
}
