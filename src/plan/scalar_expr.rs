use std::{collections::BTreeSet, fmt};

use ordered_float::NotNan;
use serde::{Deserialize, Serialize};

use crate::{graph::{LineageError, LineageResult}, plan::{Column, Literal}};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOperator {
    Plus,
    Minus,
    Multiply,
    Divide,
    Modulo,
    Concat,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            BinaryOperator::Plus => "+",
            BinaryOperator::Minus => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulo => "%",
            BinaryOperator::Concat => "||",
            BinaryOperator::Eq => "=",
            BinaryOperator::NotEq => "!=",
            BinaryOperator::Lt => "<",
            BinaryOperator::LtEq => "<=",
            BinaryOperator::Gt => ">",
            BinaryOperator::GtEq => ">=",
            BinaryOperator::And => "AND",
            BinaryOperator::Or => "OR",
        };
        f.write_str(symbol)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct Function {
    pub name: String,
    #[serde(default)]
    pub args: Vec<ScalarExpr>,
    #[serde(default)]
    pub distinct: bool,
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args = self.args.iter()
            .map(|a| a.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        if self.distinct {
            write!(f, "{}(DISTINCT {})", self.name, args)
        } else {
            write!(f, "{}({})", self.name, args)
        }
    }
}

/// A resolved scalar expression as it appears in an analyzed plan.
#[derive(Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarExpr {
    Literal(Literal),
    Column(Column),
    Function(Function),
    Binary {
        left: Box<ScalarExpr>,
        op: BinaryOperator,
        right: Box<ScalarExpr>,
    },
    WildCard,
}

impl ScalarExpr {
    pub fn column(name: &str) -> Self {
        ScalarExpr::Column(Column::Name { name: name.to_string() })
    }

    pub fn bound(ordinal: usize, name: &str) -> Self {
        ScalarExpr::Column(Column::Bound { ordinal, name: name.to_string() })
    }

    pub fn int(value: i64) -> Self {
        ScalarExpr::Literal(Literal::Int(value))
    }

    pub fn float(value: f64) -> Self {
        match NotNan::new(value) {
            Ok(n) => ScalarExpr::Literal(Literal::Float(n)),
            Err(_) => ScalarExpr::Literal(Literal::Null),
        }
    }

    pub fn string(value: &str) -> Self {
        ScalarExpr::Literal(Literal::String(value.to_string()))
    }

    pub fn call(name: &str, args: Vec<ScalarExpr>) -> Self {
        ScalarExpr::Function(Function { name: name.to_string(), args, distinct: false })
    }

    pub fn binary(left: ScalarExpr, op: BinaryOperator, right: ScalarExpr) -> Self {
        ScalarExpr::Binary { left: Box::new(left), op, right: Box::new(right) }
    }

    /// Bind every column reference against the input schema.
    pub fn bind(&self, schema: &[String]) -> LineageResult<ScalarExpr> {
        Ok(match self {
            ScalarExpr::Column(c) => ScalarExpr::Column(c.bind(schema)?),
            ScalarExpr::Function(f) => ScalarExpr::Function(Function {
                name: f.name.clone(),
                args: f.args.iter().map(|a| a.bind(schema)).collect::<LineageResult<_>>()?,
                distinct: f.distinct,
            }),
            ScalarExpr::Binary { left, op, right } => ScalarExpr::Binary {
                left: Box::new(left.bind(schema)?),
                op: *op,
                right: Box::new(right.bind(schema)?),
            },
            ScalarExpr::Literal(_) | ScalarExpr::WildCard => self.clone(),
        })
    }

    /// Distinct input ordinals this expression reads, in ascending order.
    ///
    /// An empty set means the expression is literal-only (constants,
    /// `rand()`, `count(*)`).
    pub fn input_ordinals(&self) -> LineageResult<BTreeSet<usize>> {
        let mut ordinals = BTreeSet::new();
        self.collect_ordinals(&mut ordinals)?;
        Ok(ordinals)
    }

    fn collect_ordinals(&self, out: &mut BTreeSet<usize>) -> LineageResult<()> {
        match self {
            ScalarExpr::Column(c) => match c.ordinal() {
                Some(ordinal) => { out.insert(ordinal); }
                None => return LineageError::structural(
                    format!("unbound column reference `{}`", c.name())
                ).err(),
            },
            ScalarExpr::Function(f) => {
                for a in &f.args { a.collect_ordinals(out)?; }
            }
            ScalarExpr::Binary { left, right, .. } => {
                left.collect_ordinals(out)?;
                right.collect_ordinals(out)?;
            }
            ScalarExpr::Literal(_) | ScalarExpr::WildCard => {}
        }
        Ok(())
    }
}

impl fmt::Display for ScalarExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarExpr::Literal(l) => write!(f, "{}", l),
            ScalarExpr::Column(c) => write!(f, "{}", c),
            ScalarExpr::Function(fun) => write!(f, "{}", fun),
            ScalarExpr::Binary { left, op, right } => write!(f, "({} {} {})", left, op, right),
            ScalarExpr::WildCard => write!(f, "*"),
        }
    }
}

impl fmt::Debug for ScalarExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarExpr::Literal(l) => write!(f, "Literal({:?})", l),
            ScalarExpr::Column(c) => write!(f, "Column({:?})", c),
            ScalarExpr::Function(_) => write!(f, "Function({})", self),
            ScalarExpr::Binary { .. } => write!(f, "Binary{}", self),
            ScalarExpr::WildCard => write!(f, "WildCard(*)"),
        }
    }
}

/// A projected expression and the name it is exposed under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct NamedExpr {
    pub expr: ScalarExpr,
    #[serde(default)]
    pub alias: Option<String>,
}

impl NamedExpr {
    pub fn new(expr: ScalarExpr) -> Self {
        Self { expr, alias: None }
    }

    pub fn aliased(expr: ScalarExpr, alias: &str) -> Self {
        Self { expr, alias: Some(alias.to_string()) }
    }

    pub fn output_name(&self) -> String {
        self.alias.clone().unwrap_or_else(|| self.expr.to_string())
    }

    pub fn bind(&self, schema: &[String]) -> LineageResult<NamedExpr> {
        Ok(Self { expr: self.expr.bind(schema)?, alias: self.alias.clone() })
    }
}

impl From<ScalarExpr> for NamedExpr {
    fn from(expr: ScalarExpr) -> Self {
        NamedExpr::new(expr)
    }
}
