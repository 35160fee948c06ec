use crate::error::{CoreError, CoreResult};
use serde_json::{Map, Value};
use std::fmt;

pub type Row = Map<String, Value>;

/// A typed query parameter. Values travel separately from the SQL text.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryParam {
    Str(String),
    UInt(u64),
    /// `YYYY-MM-DD HH:MM:SS`, UTC.
    DateTime(String),
    Identifier(String),
}

impl fmt::Display for QueryParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryParam::Str(s) | QueryParam::DateTime(s) | QueryParam::Identifier(s) => {
                f.write_str(s)
            }
            QueryParam::UInt(n) => write!(f, "{}", n),
        }
    }
}

/// SQL with `{name:Type}` placeholders plus the values bound to them.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundQuery {
    pub sql: String,
    pub params: Vec<(String, QueryParam)>,
}

impl BoundQuery {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    pub fn bind(mut self, name: &str, value: QueryParam) -> Self {
        self.params.push((name.to_string(), value));
        self
    }

    pub fn param(&self, name: &str) -> Option<&QueryParam> {
        self.params.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Every `{name:` placeholder in the SQL must have a bound value.
    pub fn check_bindings(&self) -> CoreResult<()> {
        let mut rest = self.sql.as_str();
        while let Some(start) = rest.find('{') {
            let after = &rest[start + 1..];
            let Some(colon) = after.find(':') else { break };
            let name = &after[..colon];
            if self.param(name).is_none() {
                return Err(CoreError::InvalidInput(format!(
                    "query placeholder {{{}}} has no bound value",
                    name
                )));
            }
            rest = &after[colon..];
        }
        Ok(())
    }
}

/// A SQL warehouse answering with rows as JSON object maps.
pub trait SqlWarehouse {
    fn query(&self, query: &BoundQuery) -> CoreResult<Vec<Row>>;
}

impl<W: SqlWarehouse + ?Sized> SqlWarehouse for &W {
    fn query(&self, query: &BoundQuery) -> CoreResult<Vec<Row>> {
        (**self).query(query)
    }
}

impl<W: SqlWarehouse + ?Sized> SqlWarehouse for Box<W> {
    fn query(&self, query: &BoundQuery) -> CoreResult<Vec<Row>> {
        (**self).query(query)
    }
}

/// Reads a column as a string, accepting plain numbers too.
pub fn row_str(row: &Row, key: &str) -> String {
    match row.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// Reads an integer column; 64-bit integers often arrive quoted.
pub fn row_u64(row: &Row, key: &str) -> u64 {
    match row.get(key) {
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unbound_placeholder_is_reported() {
        let q = BoundQuery::new("SELECT 1 WHERE ip = {ip:String} AND x = {x:UInt32}")
            .bind("ip", QueryParam::Str("1.2.3.4".to_string()));
        assert!(q.check_bindings().is_err());
        let q = q.bind("x", QueryParam::UInt(3));
        assert!(q.check_bindings().is_ok());
    }

    #[test]
    fn row_accessors_tolerate_quoted_integers() {
        let row: Row = json!({"failed_count": "7", "n": 3, "ip": "10.0.0.1"})
            .as_object()
            .cloned()
            .unwrap();
        assert_eq!(row_u64(&row, "failed_count"), 7);
        assert_eq!(row_u64(&row, "n"), 3);
        assert_eq!(row_u64(&row, "missing"), 0);
        assert_eq!(row_str(&row, "ip"), "10.0.0.1");
        assert_eq!(row_str(&row, "n"), "3");
    }
}
