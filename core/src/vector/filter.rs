use super::schema::CollectionSchema;
use super::ScalarValue;
use crate::error::{CoreError, CoreResult};
use std::collections::BTreeMap;

/// Conjunction of equality clauses over scalar fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScalarFilter {
    clauses: Vec<(String, ScalarValue)>,
}

impl ScalarFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: &str, value: impl Into<ScalarValue>) -> Self {
        self.clauses.push((field.to_string(), value.into()));
        self
    }

    /// Filter on the brute-force schema's `ip` and/or `tenant_id`.
    pub fn incidents(ip: Option<&str>, tenant_id: Option<&str>) -> Self {
        let mut f = Self::new();
        if let Some(ip) = ip.filter(|s| !s.is_empty()) {
            f = f.eq("ip", ip);
        }
        if let Some(t) = tenant_id.filter(|s| !s.is_empty()) {
            f = f.eq("tenant_id", t);
        }
        f
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn matches(&self, fields: &BTreeMap<String, ScalarValue>) -> bool {
        self.clauses
            .iter()
            .all(|(name, want)| fields.get(name) == Some(want))
    }

    /// Render as a boolean expression. Field names must belong to the schema
    /// and string literals are escaped, so caller input cannot widen the match.
    pub fn to_expr(&self, schema: &CollectionSchema) -> CoreResult<String> {
        if self.clauses.is_empty() {
            return Ok(format!("{} != \"\"", schema.primary_field));
        }
        let mut parts = Vec::with_capacity(self.clauses.len());
        for (name, value) in &self.clauses {
            if schema.field(name).is_none() && *name != schema.primary_field {
                return Err(CoreError::InvalidInput(format!(
                    "unknown filter field {} for collection {}",
                    name, schema.name
                )));
            }
            let literal = match value {
                ScalarValue::Int(i) => i.to_string(),
                ScalarValue::Str(s) => quote_literal(s),
            };
            parts.push(format!("{} == {}", name, literal));
        }
        Ok(parts.join(" and "))
    }
}

fn quote_literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}
