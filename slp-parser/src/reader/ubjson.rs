//! A small UBJSON reader, enough to pull the `metadata` object out of the replay container.

use serde_json::{Map, Number, Value};

use crate::errors::SlpError;

/// Why a read stopped early. Running out of bytes is expected for replays that are still
/// being written, so callers treat it differently from genuinely bad markers.
#[derive(Debug)]
pub(crate) enum UbjsonError {
    UnexpectedEnd,
    Invalid(String),
}

impl From<UbjsonError> for SlpError {
    fn from(error: UbjsonError) -> Self {
        match error {
            UbjsonError::UnexpectedEnd => SlpError::MetadataParse("unexpected end of data".into()),
            UbjsonError::Invalid(reason) => SlpError::MetadataParse(reason),
        }
    }
}

type UbjsonResult<T> = std::result::Result<T, UbjsonError>;

pub(crate) struct UbjsonReader<'a> {
    bytes: &'a [u8],
    position: usize,
}

impl<'a> UbjsonReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, position: 0 }
    }

    /// Walks the remaining keys of an already-opened object and returns the value stored
    /// under `key`, if any.
    pub fn find_in_open_object(&mut self, key: &str) -> UbjsonResult<Option<Value>> {
        loop {
            if self.peek()? == b'}' {
                return Ok(None);
            }

            let current_key = self.read_key()?;
            let value = self.read_value()?;

            if current_key == key {
                return Ok(Some(value));
            }
        }
    }

    pub fn read_value(&mut self) -> UbjsonResult<Value> {
        let marker = self.next_byte()?;
        self.read_value_of(marker)
    }

    fn read_value_of(&mut self, marker: u8) -> UbjsonResult<Value> {
        Ok(match marker {
            b'N' => return self.read_value(),
            b'Z' => Value::Null,
            b'T' => Value::Bool(true),
            b'F' => Value::Bool(false),
            b'i' | b'U' | b'I' | b'l' | b'L' => Value::from(self.read_integer_of(marker)?),
            b'd' => float_value(f32::from_be_bytes(self.take_array()?) as f64),
            b'D' => float_value(f64::from_be_bytes(self.take_array()?)),
            b'C' => Value::String(char::from(self.next_byte()?).to_string()),
            b'S' | b'H' => Value::String(self.read_string()?),
            b'[' => self.read_array()?,
            b'{' => self.read_object()?,
            other => return Err(UbjsonError::Invalid(format!("unknown marker 0x{other:02x}"))),
        })
    }

    fn read_array(&mut self) -> UbjsonResult<Value> {
        let (element_marker, count) = self.read_container_header()?;
        let mut values = Vec::new();

        match count {
            Some(count) => {
                for _ in 0..count {
                    values.push(self.read_element(element_marker)?);
                }
            },

            None => loop {
                if self.peek()? == b']' {
                    self.position += 1;
                    break;
                }
                values.push(self.read_value()?);
            },
        }

        Ok(Value::Array(values))
    }

    fn read_object(&mut self) -> UbjsonResult<Value> {
        let (element_marker, count) = self.read_container_header()?;
        let mut map = Map::new();

        match count {
            Some(count) => {
                for _ in 0..count {
                    let key = self.read_key()?;
                    map.insert(key, self.read_element(element_marker)?);
                }
            },

            None => loop {
                if self.peek()? == b'}' {
                    self.position += 1;
                    break;
                }
                let key = self.read_key()?;
                map.insert(key, self.read_value()?);
            },
        }

        Ok(Value::Object(map))
    }

    /// Reads the optional `$<type>` / `#<count>` prefix of an optimized container.
    fn read_container_header(&mut self) -> UbjsonResult<(Option<u8>, Option<usize>)> {
        let mut element_marker = None;

        if self.peek()? == b'$' {
            self.position += 1;
            element_marker = Some(self.next_byte()?);

            if self.peek()? != b'#' {
                return Err(UbjsonError::Invalid("typed container without a count".into()));
            }
        }

        if self.peek()? == b'#' {
            self.position += 1;
            return Ok((element_marker, Some(self.read_length()?)));
        }

        Ok((element_marker, None))
    }

    fn read_element(&mut self, element_marker: Option<u8>) -> UbjsonResult<Value> {
        match element_marker {
            Some(marker) => self.read_value_of(marker),
            None => self.read_value(),
        }
    }

    fn read_key(&mut self) -> UbjsonResult<String> {
        self.read_string()
    }

    fn read_string(&mut self) -> UbjsonResult<String> {
        let length = self.read_length()?;
        let bytes = self.take(length)?;

        String::from_utf8(bytes.to_vec()).map_err(|e| UbjsonError::Invalid(format!("invalid utf-8 string: {e}")))
    }

    fn read_length(&mut self) -> UbjsonResult<usize> {
        let marker = self.next_byte()?;
        let length = self.read_integer_of(marker)?;

        usize::try_from(length).map_err(|_| UbjsonError::Invalid(format!("negative length {length}")))
    }

    fn read_integer_of(&mut self, marker: u8) -> UbjsonResult<i64> {
        Ok(match marker {
            b'i' => i8::from_be_bytes(self.take_array()?) as i64,
            b'U' => u8::from_be_bytes(self.take_array()?) as i64,
            b'I' => i16::from_be_bytes(self.take_array()?) as i64,
            b'l' => i32::from_be_bytes(self.take_array()?) as i64,
            b'L' => i64::from_be_bytes(self.take_array()?),
            other => return Err(UbjsonError::Invalid(format!("expected an integer marker, got 0x{other:02x}"))),
        })
    }

    fn peek(&self) -> UbjsonResult<u8> {
        self.bytes.get(self.position).copied().ok_or(UbjsonError::UnexpectedEnd)
    }

    fn next_byte(&mut self) -> UbjsonResult<u8> {
        let byte = self.peek()?;
        self.position += 1;
        Ok(byte)
    }

    fn take(&mut self, length: usize) -> UbjsonResult<&'a [u8]> {
        let end = self.position.checked_add(length).ok_or(UbjsonError::UnexpectedEnd)?;
        let bytes = self.bytes.get(self.position..end).ok_or(UbjsonError::UnexpectedEnd)?;
        self.position = end;
        Ok(bytes)
    }

    fn take_array<const N: usize>(&mut self) -> UbjsonResult<[u8; N]> {
        let bytes = self.take(N)?;
        bytes.try_into().map_err(|_| UbjsonError::UnexpectedEnd)
    }
}

fn float_value(value: f64) -> Value {
    Number::from_f64(value).map(Value::Number).unwrap_or(Value::Null)
}
