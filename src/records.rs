//! JSON record I/O at the process boundary.

use std::io::{Read, Write};

use serde::Serialize;
use serde_json::Value;

use crate::error::{Error, Result};

/// Read a batch of records: a JSON array, a single object, or JSON Lines.
pub fn read_records<R: Read>(mut reader: R) -> Result<Vec<Value>> {
    let mut buf = String::new();
    reader.read_to_string(&mut buf)?;
    parse_records(&buf)
}

pub fn parse_records(src: &str) -> Result<Vec<Value>> {
    let trimmed = src.trim_start();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    if trimmed.starts_with('[') {
        return match serde_json::from_str(trimmed)? {
            Value::Array(items) => Ok(items),
            _ => Err(Error::InvalidInput("expected a JSON array".into())),
        };
    }
    serde_json::Deserializer::from_str(trimmed)
        .into_iter::<Value>()
        .map(|r| r.map_err(Error::from))
        .collect()
}

/// Decode each record into `T`, naming the failing record by position.
pub fn decode_records<T: serde::de::DeserializeOwned>(records: Vec<Value>) -> Result<Vec<T>> {
    records
        .into_iter()
        .enumerate()
        .map(|(i, v)| {
            serde_json::from_value(v).map_err(|e| Error::InvalidInput(format!("record {}: {}", i, e)))
        })
        .collect()
}

pub fn write_records<W: Write, T: Serialize>(mut writer: W, records: &[T], pretty: bool) -> Result<()> {
    if pretty {
        serde_json::to_writer_pretty(&mut writer, records)?;
    } else {
        serde_json::to_writer(&mut writer, records)?;
    }
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ScrapeInput;
    use serde_json::json;

    #[test]
    fn accepts_array_object_and_lines() {
        assert_eq!(parse_records(r#"[{"a":1},{"a":2}]"#).unwrap().len(), 2);
        assert_eq!(parse_records(r#"{"a":1}"#).unwrap(), vec![json!({"a": 1})]);
        assert_eq!(parse_records("{\"a\":1}\n{\"a\":2}\n\n").unwrap().len(), 2);
        assert!(parse_records("  \n").unwrap().is_empty());
    }

    #[test]
    fn malformed_input_is_an_error() {
        assert!(matches!(parse_records("{\"a\":"), Err(Error::Json(_))));
        assert!(matches!(parse_records("[1,"), Err(Error::Json(_))));
    }

    #[test]
    fn decode_names_the_bad_record() {
        let records = vec![json!({"url": "ok"}), json!({"url": "bad", "workflow_demo": 5})];
        let err = decode_records::<ScrapeInput>(records).unwrap_err();
        assert!(err.to_string().contains("record 1"), "{}", err);
    }

    #[test]
    fn writes_one_array_line() {
        let mut out = Vec::new();
        write_records(&mut out, &[json!({"a": 1})], false).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "[{\"a\":1}]\n");
    }
}
