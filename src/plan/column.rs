use serde::{Deserialize, Serialize};
use std::fmt;

use crate::graph::{LineageError, LineageResult};

/// A column reference inside an expression.
///
/// Builders accept `Name` references; binding against the input schema turns
/// them into `Bound` references, which are the only form lineage rules accept.
#[derive(Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Column {
    Bound { ordinal: usize, name: String },
    Name { name: String },
}

impl Column {
    pub fn name(&self) -> &str {
        match self {
            Column::Name { name } | Column::Bound { name, .. } => name,
        }
    }

    pub fn ordinal(&self) -> Option<usize> {
        match self {
            Column::Bound { ordinal, .. } => Some(*ordinal),
            Column::Name { .. } => None,
        }
    }

    /// Resolve this reference against an ordered input schema.
    pub fn bind(&self, schema: &[String]) -> LineageResult<Column> {
        match self {
            Column::Bound { ordinal, name } => {
                if *ordinal >= schema.len() {
                    return LineageError::structural(format!(
                        "column `{}` bound to ordinal {} but input has {} columns",
                        name, ordinal, schema.len()
                    )).err();
                }
                Ok(self.clone())
            }
            Column::Name { name } => {
                let matches: Vec<usize> = schema.iter()
                    .enumerate()
                    .filter(|(_, candidate)| candidate.eq_ignore_ascii_case(name))
                    .map(|(i, _)| i)
                    .collect();

                match matches.as_slice() {
                    [ordinal] => Ok(Column::Bound { ordinal: *ordinal, name: schema[*ordinal].clone() }),
                    [] => LineageError::UnknownColumn {
                        name: name.clone(),
                        candidates: schema.to_vec(),
                    }.err(),
                    _ => LineageError::AmbiguousColumn {
                        name: name.clone(),
                        ordinals: matches,
                    }.err(),
                }
            }
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl fmt::Debug for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Column::Bound { ordinal, name } => write!(f, "Bound(#{} {})", ordinal, name),
            Column::Name { name } => write!(f, "Name({})", name),
        }
    }
}
