//! Query templates with named placeholders
//!
//! A template is SQL text containing `:name` placeholders. At request time
//! each placeholder with a supplied value is replaced by the driver's
//! positional bind marker and the value travels separately as a bound
//! argument, so request input never becomes part of the statement text.

use crate::policy::ParameterBinding;
use serde::Serialize;
use serde_json::{Map, Value};

/// A value ready to be bound to a statement argument
#[derive(Debug, Clone, PartialEq)]
pub enum BoundValue {
    Null,
    Bool(bool),
    Integer(i64),
    /// Integers above `i64::MAX`
    Unsigned(u64),
    Float(f64),
    Text(String),
}

impl From<&Value> for BoundValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => BoundValue::Null,
            Value::Bool(flag) => BoundValue::Bool(*flag),
            Value::Number(number) => {
                if let Some(integer) = number.as_i64() {
                    BoundValue::Integer(integer)
                } else if let Some(unsigned) = number.as_u64() {
                    BoundValue::Unsigned(unsigned)
                } else {
                    number
                        .as_f64()
                        .map(BoundValue::Float)
                        .unwrap_or_else(|| BoundValue::Text(number.to_string()))
                }
            }
            Value::String(text) => BoundValue::Text(text.clone()),
            // Nested structures are passed as their JSON text
            Value::Array(_) | Value::Object(_) => BoundValue::Text(value.to_string()),
        }
    }
}

/// Statement text with positional markers plus the values to bind, in order
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub sql: String,
    pub values: Vec<BoundValue>,
}

/// SQL text with `:name` placeholders
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryTemplate {
    /// Statement text
    pub sql: String,

    /// Declared parameters in placeholder order; placeholders use the exposed name
    pub bindings: Vec<ParameterBinding>,
}

impl QueryTemplate {
    /// Template without parameters
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            bindings: Vec::new(),
        }
    }

    /// Template whose placeholders follow the given bindings
    pub fn with_bindings(sql: impl Into<String>, bindings: Vec<ParameterBinding>) -> Self {
        Self {
            sql: sql.into(),
            bindings,
        }
    }

    /// Comma separated placeholder list for the bindings, e.g. `:quantity, :price`
    pub fn placeholder_list(bindings: &[ParameterBinding]) -> String {
        bindings
            .iter()
            .map(|binding| format!(":{}", binding.exposed))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Placeholder names in order of appearance (outside quoted text)
    pub fn placeholders(&self) -> Vec<String> {
        let mut names = Vec::new();
        scan(&self.sql, |segment| {
            if let Segment::Placeholder(name) = segment {
                names.push(name.to_string());
            }
        });
        names
    }

    /// Replace supplied placeholders with `?` markers and collect their values
    ///
    /// Placeholders without a value in `parameters` stay in the text verbatim,
    /// which makes the database reject the statement.
    pub fn compile(&self, parameters: &Map<String, Value>) -> CompiledQuery {
        let mut sql = String::with_capacity(self.sql.len());
        let mut values = Vec::new();

        scan(&self.sql, |segment| match segment {
            Segment::Text(text) => sql.push_str(text),
            Segment::Placeholder(name) => match parameters.get(name) {
                Some(value) => {
                    sql.push('?');
                    values.push(BoundValue::from(value));
                }
                None => {
                    sql.push(':');
                    sql.push_str(name);
                }
            },
        });

        CompiledQuery { sql, values }
    }
}

enum Segment<'a> {
    Text(&'a str),
    Placeholder(&'a str),
}

fn is_placeholder_character(character: char) -> bool {
    character.is_ascii_alphanumeric() || character == '_'
}

/// Split SQL into plain text and placeholders, skipping quoted regions and `::` casts
fn scan<'a>(sql: &'a str, mut visit: impl FnMut(Segment<'a>)) {
    let bytes = sql.as_bytes();
    let mut text_start = 0;
    let mut index = 0;

    while index < bytes.len() {
        match bytes[index] {
            quote @ (b'\'' | b'"' | b'`') => {
                index += 1;
                while index < bytes.len() {
                    if bytes[index] == quote {
                        // A doubled quote is an escaped quote inside the region
                        if index + 1 < bytes.len() && bytes[index + 1] == quote {
                            index += 2;
                            continue;
                        }
                        break;
                    }
                    index += 1;
                }
                index += 1;
            }
            b':' if index + 1 < bytes.len() && bytes[index + 1] == b':' => {
                index += 2;
            }
            b':' => {
                let name_start = index + 1;
                let name_end = sql[name_start..]
                    .char_indices()
                    .find(|(_, character)| !is_placeholder_character(*character))
                    .map(|(offset, _)| name_start + offset)
                    .unwrap_or(sql.len());

                if name_end > name_start {
                    if text_start < index {
                        visit(Segment::Text(&sql[text_start..index]));
                    }
                    visit(Segment::Placeholder(&sql[name_start..name_end]));
                    text_start = name_end;
                }
                index = name_end.max(index + 1);
            }
            _ => index += 1,
        }
    }

    if text_start < sql.len() {
        visit(Segment::Text(&sql[text_start..]));
    }
}
