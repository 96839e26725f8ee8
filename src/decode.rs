use crate::{
    wire::{self, FloatRepr},
    MultiQueryError, Row, Value,
};

/// Column names for a result set. Unnamed columns are called `column<N>`.
pub(crate) fn column_names(cols: Vec<wire::Col>) -> Vec<String> {
    cols.into_iter()
        .enumerate()
        .map(|(index, col)| col.name.unwrap_or_else(|| format!("column{index}")))
        .collect()
}

pub(crate) fn decode_row(
    names: &[String],
    values: Vec<wire::Value>,
) -> Result<Row, MultiQueryError> {
    if values.len() != names.len() {
        return Err(MultiQueryError::Decode(format!(
            "row has {} value(s) but result has {} column(s)",
            values.len(),
            names.len()
        )));
    }

    names
        .iter()
        .zip(values)
        .map(|(name, value)| Ok((name.clone(), decode_value(value)?)))
        .collect()
}

pub(crate) fn decode_value(value: wire::Value) -> Result<Value, MultiQueryError> {
    match value {
        wire::Value::Null {} => Ok(Value::Null),
        wire::Value::Integer { value } => value.parse::<i64>().map(Value::Integer).map_err(|err| {
            MultiQueryError::Decode(format!("invalid integer value '{value}': {err}"))
        }),
        wire::Value::Float { value } => {
            let parsed = match value {
                FloatRepr::Number(number) => number,
                FloatRepr::Text(text) => text.parse::<f64>().map_err(|err| {
                    MultiQueryError::Decode(format!("invalid float value '{text}': {err}"))
                })?,
            };
            if parsed.is_finite() {
                Ok(Value::Float(parsed))
            } else {
                Err(MultiQueryError::Decode(format!(
                    "non-finite float value '{parsed}' is unsupported"
                )))
            }
        }
        wire::Value::Text { value } => Ok(Value::Text(value)),
        wire::Value::Blob { base64 } => Ok(Value::BlobBase64(base64)),
    }
}

#[cfg(test)]
mod tests {
    use crate::{decode, wire, MultiQueryError, Value};

    #[test]
    fn decode_integer_parse_error() {
        let value = wire::Value::Integer {
            value: "nope".to_owned(),
        };
        let err = decode::decode_value(value).expect_err("must fail");
        assert!(matches!(err, MultiQueryError::Decode(_)));
    }

    #[test]
    fn decode_rejects_non_finite_float_text() {
        let value = wire::Value::Float {
            value: wire::FloatRepr::Text("inf".to_owned()),
        };
        let err = decode::decode_value(value).expect_err("must fail");
        assert!(matches!(err, MultiQueryError::Decode(_)));
    }

    #[test]
    fn unnamed_columns_get_positional_names() {
        let names = decode::column_names(vec![
            wire::Col {
                name: Some("id".to_owned()),
            },
            wire::Col { name: None },
        ]);
        assert_eq!(names, vec!["id".to_owned(), "column1".to_owned()]);
    }

    #[test]
    fn decode_row_pairs_names_with_values() {
        let names = vec!["id".to_owned(), "name".to_owned()];
        let row = decode::decode_row(
            &names,
            vec![
                wire::Value::Integer {
                    value: "1".to_owned(),
                },
                wire::Value::Text {
                    value: "Kit".to_owned(),
                },
            ],
        )
        .expect("must decode");

        assert_eq!(row.get("id"), Some(&Value::Integer(1)));
        assert_eq!(row.get_text("name"), Some("Kit"));
    }

    #[test]
    fn decode_row_rejects_width_mismatch() {
        let names = vec!["id".to_owned()];
        let err = decode::decode_row(&names, vec![]).expect_err("must fail");
        assert!(matches!(err, MultiQueryError::Decode(_)));
    }
}
