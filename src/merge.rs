//! Materializing new user rows from a template account plus input records.
//!
//! A [`TemplateRow`] is the immutable base: the template account's columns and
//! values, minus the auto-increment key. Merging an [`InputRecord`] never
//! touches the base; it produces a [`MergedRow`] holding a short ordered list
//! of overrides on top of it. Values always come out in template column order
//! so they bind positionally to [`TemplateRow::insert_statement`].

use rusqlite::types::Value;
use tracing::{debug, warn};

use crate::error::Result;
use crate::password::PasswordHasher;
use crate::record::InputRecord;

pub const PASSWORD: &str = "password";
pub const NICKNAME: &str = "nickname";
pub const EMAIL: &str = "email";

#[derive(Debug, Clone, PartialEq)]
pub struct TemplateRow {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl TemplateRow {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = (S, Value)>,
        S: Into<String>,
    {
        let (columns, values): (Vec<String>, Vec<Value>) =
            fields.into_iter().map(|(c, v)| (c.into(), v)).unzip();
        Self { columns, values }
    }

    /// Builds the template from a stored account, leaving out its `key` column.
    pub fn from_account(columns: Vec<String>, values: Vec<Value>, key: &str) -> Self {
        Self::new(
            columns
                .into_iter()
                .zip(values)
                .filter(|(column, _)| !column.eq_ignore_ascii_case(key)),
        )
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn position(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.eq_ignore_ascii_case(column))
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.position(column).map(|i| &self.values[i])
    }

    pub fn insert_statement(&self, table: &str) -> String {
        let columns: Vec<String> = self.columns.iter().map(|c| quote_identifier(c)).collect();
        let placeholders = vec!["?"; self.columns.len()];
        format!(
            "INSERT OR IGNORE INTO {}({}) VALUES ({})",
            quote_identifier(table),
            columns.join(", "),
            placeholders.join(", ")
        )
    }
}

pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Ordered overrides keyed by template column position; a later value for
/// the same column replaces the earlier one in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    fields: Vec<(usize, Value)>,
}

impl Overrides {
    fn set(&mut self, position: usize, value: Value) {
        match self.fields.iter_mut().find(|(p, _)| *p == position) {
            Some(existing) => existing.1 = value,
            None => self.fields.push((position, value)),
        }
    }

    fn get(&self, position: usize) -> Option<&Value> {
        self.fields.iter().find(|(p, _)| *p == position).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MergedRow<'t> {
    template: &'t TemplateRow,
    overrides: Overrides,
}

impl<'t> MergedRow<'t> {
    pub fn get(&self, column: &str) -> Option<&Value> {
        let position = self.template.position(column)?;
        self.overrides
            .get(position)
            .or_else(|| self.template.values.get(position))
    }

    pub fn overrides(&self) -> &Overrides {
        &self.overrides
    }

    pub fn into_values(self) -> Vec<Value> {
        let mut values = self.template.values.clone();
        for (position, value) in self.overrides.fields {
            values[position] = value;
        }
        values
    }

    fn set(&mut self, column: &str, value: Value) {
        match self.template.position(column) {
            Some(position) => self.overrides.set(position, value),
            None => warn!(column, "template has no such column, value dropped"),
        }
    }
}

pub struct RowMerger<'t, H> {
    template: &'t TemplateRow,
    hasher: H,
    default_domain: Option<String>,
    default_password: Option<String>,
}

impl<'t, H: PasswordHasher> RowMerger<'t, H> {
    /// Hashes `default_password` right away; rows without a password of their
    /// own all receive this one hash.
    pub fn new(
        template: &'t TemplateRow,
        hasher: H,
        default_domain: Option<String>,
        default_password: Option<&str>,
    ) -> Result<Self> {
        let default_password = match default_password {
            Some(password) => Some(hasher.hash(password)?),
            None => None,
        };
        Ok(Self {
            template,
            hasher,
            default_domain,
            default_password,
        })
    }

    pub fn default_password_hash(&self) -> Option<&str> {
        self.default_password.as_deref()
    }

    pub fn merge(&self, record: &InputRecord) -> Result<MergedRow<'t>> {
        let mut row = MergedRow {
            template: self.template,
            overrides: Overrides::default(),
        };
        for (name, value) in record.fields() {
            if name == PASSWORD {
                // one full key derivation per row
                row.set(PASSWORD, Value::Text(self.hasher.hash(value)?));
            } else if self.template.position(name).is_some() {
                row.set(name, Value::Text(value.to_string()));
            } else {
                debug!(
                    field = name,
                    line = record.line(),
                    "ignoring field unknown to the template"
                );
            }
        }

        if !record.contains(PASSWORD) {
            if let Some(hash) = &self.default_password {
                row.set(PASSWORD, Value::Text(hash.clone()));
            }
        }
        match (record.get(NICKNAME), record.get(EMAIL)) {
            (None, Some(email)) => row.set(NICKNAME, Value::Text(email.to_string())),
            (Some(nickname), None) => {
                if let Some(domain) = &self.default_domain {
                    row.set(EMAIL, Value::Text(format!("{nickname}@{domain}")));
                }
            }
            _ => {}
        }
        Ok(row)
    }

    /// Lazily merges every record into insertable values. The first error is
    /// yielded as is; callers stop there.
    pub fn rows<I>(&self, records: I) -> impl Iterator<Item = Result<Vec<Value>>>
    where
        I: IntoIterator<Item = Result<InputRecord>>,
    {
        records
            .into_iter()
            .map(move |record| self.merge(&record?).map(MergedRow::into_values))
    }
}
