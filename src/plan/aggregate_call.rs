use std::{collections::{BTreeSet, HashMap}, fmt};

use serde::{Deserialize, Serialize};

use crate::{graph::LineageResult, plan::{Column, Function, NamedExpr, ScalarExpr}};

/// A normalized aggregate call extracted from expressions.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Deserialize, Serialize)]
pub struct AggregateCall {
    pub func: String,            // normalized lowercase
    #[serde(default)]
    pub args: Vec<ScalarExpr>,
    #[serde(default)]
    pub distinct: bool,
}

impl From<&Function> for AggregateCall {
    fn from(f: &Function) -> Self {
        Self {
            func: f.name.to_ascii_lowercase(),
            args: f.args.clone(),
            distinct: f.distinct,
        }
    }
}

impl fmt::Display for AggregateCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let function = Function { name: self.func.clone(), args: self.args.clone(), distinct: self.distinct };
        write!(f, "{}", function)
    }
}

impl AggregateCall {
    pub fn new(func: &str, args: Vec<ScalarExpr>) -> Self {
        Self { func: func.to_ascii_lowercase(), args, distinct: false }
    }

    pub fn distinct(func: &str, args: Vec<ScalarExpr>) -> Self {
        Self { func: func.to_ascii_lowercase(), args, distinct: true }
    }

    pub fn is_aggregate_name(name: &str) -> bool {
        matches!(
            name.to_ascii_lowercase().as_str(),
            "count" | "sum" | "avg" | "min" | "max" | "first" | "last" | "collect_list" | "collect_set"
        )
    }

    pub fn bind(&self, schema: &[String]) -> LineageResult<AggregateCall> {
        Ok(Self {
            func: self.func.clone(),
            args: self.args.iter().map(|a| a.bind(schema)).collect::<LineageResult<_>>()?,
            distinct: self.distinct,
        })
    }

    /// Input ordinals referenced by the aggregate arguments.
    pub fn input_ordinals(&self) -> LineageResult<BTreeSet<usize>> {
        let mut ordinals = BTreeSet::new();
        for a in &self.args {
            ordinals.extend(a.input_ordinals()?);
        }
        Ok(ordinals)
    }

    /// Collect aggregate calls appearing in an expression, deduplicated in
    /// first-seen order.
    pub fn collect_in_scalar(
        e: &ScalarExpr,
        table: &mut HashMap<AggregateCall, usize>,
        calls: &mut Vec<AggregateCall>,
    ) {
        match e {
            ScalarExpr::Function(f) if Self::is_aggregate_name(&f.name) => {
                let key: AggregateCall = f.into();
                if !table.contains_key(&key) {
                    table.insert(key.clone(), calls.len());
                    calls.push(key);
                }
            }
            ScalarExpr::Function(f) => {
                for a in &f.args {
                    Self::collect_in_scalar(a, table, calls);
                }
            }
            ScalarExpr::Binary { left, right, .. } => {
                Self::collect_in_scalar(left, table, calls);
                Self::collect_in_scalar(right, table, calls);
            }
            _ => {}
        }
    }

    /// Replace aggregate calls with references to the aggregate output columns.
    pub fn rewrite_scalar_using_call_names(expr: &ScalarExpr, map: &HashMap<AggregateCall, String>) -> ScalarExpr {
        match expr {
            ScalarExpr::Function(f) if Self::is_aggregate_name(&f.name) => {
                let key: AggregateCall = f.into();
                match map.get(&key) {
                    Some(name) => ScalarExpr::Column(Column::Name { name: name.clone() }),
                    None => expr.clone(),
                }
            }
            ScalarExpr::Function(f) => {
                let new_args = f.args.iter()
                    .map(|a| Self::rewrite_scalar_using_call_names(a, map))
                    .collect();
                ScalarExpr::Function(Function {
                    name: f.name.clone(),
                    args: new_args,
                    distinct: f.distinct
                })
            }
            ScalarExpr::Binary { left, op, right } => ScalarExpr::Binary {
                left: Box::new(Self::rewrite_scalar_using_call_names(left, map)),
                op: *op,
                right: Box::new(Self::rewrite_scalar_using_call_names(right, map)),
            },
            _ => expr.clone(),
        }
    }
}

/// An aggregate result column of an `Aggregate` node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct NamedAggregate {
    pub call: AggregateCall,
    #[serde(default)]
    pub alias: Option<String>,
}

impl NamedAggregate {
    pub fn new(call: AggregateCall) -> Self {
        Self { call, alias: None }
    }

    pub fn aliased(call: AggregateCall, alias: &str) -> Self {
        Self { call, alias: Some(alias.to_string()) }
    }

    pub fn output_name(&self) -> String {
        self.alias.clone().unwrap_or_else(|| self.call.to_string())
    }

    pub fn bind(&self, schema: &[String]) -> LineageResult<NamedAggregate> {
        Ok(Self { call: self.call.bind(schema)?, alias: self.alias.clone() })
    }
}

impl From<AggregateCall> for NamedAggregate {
    fn from(call: AggregateCall) -> Self {
        NamedAggregate::new(call)
    }
}

/// Split a grouped SELECT list into the aggregate calls it needs and the
/// projection evaluated over the aggregate output.
pub(crate) fn split_grouped_select(select: &[NamedExpr]) -> (Vec<AggregateCall>, Vec<NamedExpr>, HashMap<AggregateCall, String>) {
    let mut calls: Vec<AggregateCall> = Vec::new();
    let mut call_to_index: HashMap<AggregateCall, usize> = HashMap::new();
    for id in select {
        AggregateCall::collect_in_scalar(&id.expr, &mut call_to_index, &mut calls);
    }

    let call_to_name: HashMap<AggregateCall, String> = calls.iter()
        .map(|c| (c.clone(), c.to_string()))
        .collect();

    let projection = select.iter()
        .map(|id| NamedExpr {
            // keep the user-facing name stable after the rewrite
            alias: Some(id.output_name()),
            expr: AggregateCall::rewrite_scalar_using_call_names(&id.expr, &call_to_name),
        })
        .collect();

    (calls, projection, call_to_name)
}
