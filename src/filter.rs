//! Filters used to select accounts for deletion.
//!
//! A [`FilterSet`] holds zero or more SQL `LIKE` patterns per recognized
//! [`Column`]. Only the columns that actually received patterns take part in
//! the generated predicate, and [`FilterSet::combinations`] walks the
//! Cartesian product of exactly those pattern lists. Every produced tuple
//! therefore lines up positionally with the `?` placeholders of the predicate.
//!
//! ```
//! use shelfkeeper::filter::{Column, FilterSet};
//! let filters = FilterSet::new()
//!     .with(Column::Nickname, ["alice", "bob"])
//!     .with(Column::Email, ["%@example.com"]);
//! assert_eq!(filters.predicate().unwrap(), "nickname LIKE ? AND email LIKE ?");
//! let tuples: Vec<_> = filters.combinations().unwrap().collect();
//! assert_eq!(tuples, vec![vec!["alice", "%@example.com"], vec!["bob", "%@example.com"]]);
//! ```

use std::collections::BTreeMap;
use std::fmt;

use crate::error::{Result, ShelfkeeperError};

/// Columns of the user table that can be filtered on. Declaration order is
/// the order of clauses in the predicate and of values in each tuple.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Column {
    Nickname,
    Email,
}

impl Column {
    pub const ALL: [Column; 2] = [Column::Nickname, Column::Email];

    pub fn name(&self) -> &'static str {
        match self {
            Column::Nickname => "nickname",
            Column::Email => "email",
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Default)]
pub struct FilterSet {
    patterns: BTreeMap<Column, Vec<String>>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds patterns for a column, keeping any given earlier.
    pub fn with<I, S>(mut self, column: Column, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.add(column, patterns);
        self
    }

    pub fn add<I, S>(&mut self, column: Column, patterns: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.patterns
            .entry(column)
            .or_default()
            .extend(patterns.into_iter().map(Into::into));
    }

    /// The columns that received at least one pattern, in column order.
    pub fn included(&self) -> impl Iterator<Item = (Column, &[String])> + '_ {
        self.patterns
            .iter()
            .filter(|(_, patterns)| !patterns.is_empty())
            .map(|(column, patterns)| (*column, patterns.as_slice()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.included().next().is_none() {
            return Err(ShelfkeeperError::InvalidFilter);
        }
        Ok(())
    }

    pub fn predicate(&self) -> Result<String> {
        self.validate()?;
        let clauses: Vec<String> = self
            .included()
            .map(|(column, _)| format!("{} LIKE ?", column.name()))
            .collect();
        Ok(clauses.join(" AND "))
    }

    pub fn combinations(&self) -> Result<Combinations<'_>> {
        self.validate()?;
        Ok(Combinations::new(
            self.included().map(|(_, patterns)| patterns).collect(),
        ))
    }

    /// Number of tuples [`FilterSet::combinations`] yields, zero when invalid.
    pub fn combination_count(&self) -> usize {
        if self.validate().is_err() {
            return 0;
        }
        self.included().map(|(_, patterns)| patterns.len()).product()
    }
}

/// Lazy Cartesian product over the included pattern lists, with the
/// rightmost list varying fastest.
#[derive(Debug, Clone)]
pub struct Combinations<'f> {
    lists: Vec<&'f [String]>,
    cursor: Vec<usize>,
    exhausted: bool,
}

impl<'f> Combinations<'f> {
    fn new(lists: Vec<&'f [String]>) -> Self {
        let exhausted = lists.is_empty() || lists.iter().any(|l| l.is_empty());
        Self {
            cursor: vec![0; lists.len()],
            lists,
            exhausted,
        }
    }

    fn remaining(&self) -> usize {
        if self.exhausted {
            return 0;
        }
        // positions already consumed, read as a mixed-radix number
        let mut consumed = 0;
        for (list, index) in self.lists.iter().zip(&self.cursor) {
            consumed = consumed * list.len() + index;
        }
        let total: usize = self.lists.iter().map(|l| l.len()).product();
        total - consumed
    }
}

impl<'f> Iterator for Combinations<'f> {
    type Item = Vec<&'f str>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }
        let tuple = self
            .lists
            .iter()
            .zip(&self.cursor)
            .map(|(list, &index)| list[index].as_str())
            .collect();
        let mut position = self.lists.len();
        loop {
            if position == 0 {
                self.exhausted = true;
                break;
            }
            position -= 1;
            self.cursor[position] += 1;
            if self.cursor[position] < self.lists[position].len() {
                break;
            }
            self.cursor[position] = 0;
        }
        Some(tuple)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining();
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Combinations<'_> {}
