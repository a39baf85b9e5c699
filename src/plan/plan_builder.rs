use std::sync::Arc;

use tracing::debug;

use crate::{
    graph::{LineageError, LineageResult},
    plan::{aggregate_call::split_grouped_select, IdManager, JoinType, LogicalNode, LogicalOp, LogicalPlan, NamedAggregate, NamedExpr, ScalarExpr},
};

/// Fluent builder for analyzed plans.
///
/// Every call allocates a fresh node id from the shared `IdManager` and binds
/// column names against the input schema, so the finished plan only holds
/// ordinal references.
#[derive(Debug, Clone)]
pub struct PlanBuilder {
    ids: Arc<IdManager>,
    plan: LogicalPlan,
}

impl PlanBuilder {
    pub fn local_relation(ids: &Arc<IdManager>, columns: &[&str]) -> Self {
        Self::leaf(ids, LogicalOp::LocalRelation, columns.iter().map(|c| c.to_string()).collect())
    }

    pub fn range(ids: &Arc<IdManager>, start: i64, end: i64) -> Self {
        Self::leaf(ids, LogicalOp::Range { start, end }, vec!["id".to_string()])
    }

    pub fn scan(ids: &Arc<IdManager>, table: &str, columns: &[&str]) -> Self {
        Self::leaf(
            ids,
            LogicalOp::Scan { table: table.to_string() },
            columns.iter().map(|c| c.to_string()).collect(),
        )
    }

    /// Continue from an existing plan, e.g. a view fetched from the catalog.
    /// The node keeps its identity, which is what makes sharing visible.
    pub fn from_plan(ids: &Arc<IdManager>, plan: LogicalPlan) -> Self {
        Self { ids: Arc::clone(ids), plan }
    }

    fn leaf(ids: &Arc<IdManager>, op: LogicalOp, output: Vec<String>) -> Self {
        let plan = LogicalNode::new(ids.next_id(), op, output, vec![]);
        Self { ids: Arc::clone(ids), plan }
    }

    fn wrap(self, op: LogicalOp, output: Vec<String>) -> Self {
        let id = self.ids.next_id();
        debug!(id = %id, op = op.kind_name(), "planned node");
        let plan = LogicalNode::new(id, op, output, vec![self.plan]);
        Self { ids: self.ids, plan }
    }

    pub fn schema(&self) -> &[String] {
        &self.plan.output
    }

    pub fn plan(&self) -> &LogicalPlan {
        &self.plan
    }

    pub fn project(self, exprs: Vec<NamedExpr>) -> LineageResult<Self> {
        let exprs = exprs.iter()
            .map(|e| e.bind(self.schema()))
            .collect::<LineageResult<Vec<_>>>()?;
        let output = exprs.iter().map(NamedExpr::output_name).collect();
        Ok(self.wrap(LogicalOp::Project { exprs }, output))
    }

    /// Shorthand for projecting plain columns by name.
    pub fn select(self, columns: &[&str]) -> LineageResult<Self> {
        self.project(columns.iter().map(|c| NamedExpr::new(ScalarExpr::column(c))).collect())
    }

    pub fn filter(self, predicate: ScalarExpr) -> LineageResult<Self> {
        let predicate = predicate.bind(self.schema())?;
        let output = self.schema().to_vec();
        Ok(self.wrap(LogicalOp::Filter { predicate }, output))
    }

    pub fn aggregate(self, group_keys: Vec<NamedExpr>, aggs: Vec<NamedAggregate>) -> LineageResult<Self> {
        let group_keys = group_keys.iter()
            .map(|k| k.bind(self.schema()))
            .collect::<LineageResult<Vec<_>>>()?;
        let aggs = aggs.iter()
            .map(|a| a.bind(self.schema()))
            .collect::<LineageResult<Vec<_>>>()?;
        let output = group_keys.iter().map(NamedExpr::output_name)
            .chain(aggs.iter().map(NamedAggregate::output_name))
            .collect();
        Ok(self.wrap(LogicalOp::Aggregate { group_keys, aggs }, output))
    }

    /// GROUP BY with a free-form SELECT list: aggregate calls are extracted
    /// into an `Aggregate` node and the SELECT list becomes a `Project` over
    /// its output. The projection is skipped when it would only repeat the
    /// aggregate output.
    pub fn group_by(self, keys: Vec<ScalarExpr>, select: Vec<NamedExpr>) -> LineageResult<Self> {
        let (calls, projection, _) = split_grouped_select(&select);
        let group_keys = keys.into_iter().map(NamedExpr::new).collect();
        let aggs = calls.into_iter().map(NamedAggregate::new).collect();
        let aggregated = self.aggregate(group_keys, aggs)?;

        let identity = projection.len() == aggregated.schema().len()
            && projection.iter().zip(aggregated.schema()).all(|(p, name)| {
                matches!(&p.expr, ScalarExpr::Column(c) if c.name() == name) && &p.output_name() == name
            });
        if identity {
            return Ok(aggregated);
        }
        aggregated.project(projection)
    }

    pub fn sort(self, keys: Vec<ScalarExpr>) -> LineageResult<Self> {
        let keys = keys.iter()
            .map(|k| k.bind(self.schema()))
            .collect::<LineageResult<Vec<_>>>()?;
        let output = self.schema().to_vec();
        Ok(self.wrap(LogicalOp::Sort { keys }, output))
    }

    pub fn limit(self, limit: u64) -> Self {
        let output = self.schema().to_vec();
        self.wrap(LogicalOp::Limit { limit }, output)
    }

    pub fn alias(self, alias: &str) -> Self {
        let output = self.schema().to_vec();
        self.wrap(LogicalOp::SubqueryAlias { alias: alias.to_string() }, output)
    }

    /// Wrap the plan in a catalog view node.
    pub fn view(self, name: &str) -> Self {
        let output = self.schema().to_vec();
        self.wrap(LogicalOp::View { name: name.to_string() }, output)
    }

    pub fn union(self, other: PlanBuilder) -> LineageResult<Self> {
        if self.schema().len() != other.schema().len() {
            return LineageError::structural(format!(
                "union inputs have {} and {} columns",
                self.schema().len(),
                other.schema().len()
            )).err();
        }
        let id = self.ids.next_id();
        let output = self.schema().to_vec();
        let plan = LogicalNode::new(id, LogicalOp::Union, output, vec![self.plan, other.plan]);
        Ok(Self { ids: self.ids, plan })
    }

    pub fn join(self, other: PlanBuilder, join_type: JoinType, on: Option<ScalarExpr>) -> LineageResult<Self> {
        let mut combined = self.schema().to_vec();
        combined.extend(other.schema().iter().cloned());
        let on = on.map(|p| p.bind(&combined)).transpose()?;

        let output = if join_type.emits_right() {
            combined
        } else {
            self.schema().to_vec()
        };
        let id = self.ids.next_id();
        let plan = LogicalNode::new(id, LogicalOp::Join { join_type, on }, output, vec![self.plan, other.plan]);
        Ok(Self { ids: self.ids, plan })
    }

    pub fn build(self) -> LogicalPlan {
        self.plan
    }
}
