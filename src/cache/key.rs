// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Resource keys

use std::fmt;

/// A queryable remote resource: endpoint path plus query parameters
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceQuery {
    path: String,
    params: Vec<(String, String)>,
}

impl ResourceQuery {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            params: Vec::new(),
        }
    }

    /// Adds a query parameter, keeping parameters ordered by name
    #[must_use]
    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        let at = self
            .params
            .partition_point(|(existing, _)| existing.as_str() <= name.as_str());
        self.params.insert(at, (name, value));
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    /// Cache/dedup key; identical for every equivalent query.
    ///
    /// Names and values are percent-encoded, so a value containing `&` or
    /// `=` cannot collide with a different set of parameters.
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ResourceQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)?;
        for (i, (name, value)) in self.params.iter().enumerate() {
            let sep = if i == 0 { '?' } else { '&' };
            write!(
                f,
                "{sep}{}={}",
                urlencoding::encode(name),
                urlencoding::encode(value)
            )?;
        }
        Ok(())
    }
}

impl From<&str> for ResourceQuery {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}
