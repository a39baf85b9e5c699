use tracing::info;

use crate::{
    catalog::{Catalog, CatalogCommon, CatalogSnapshot},
    graph::{LineageGraph, LineageResult},
    lineage::{ColumnPropagator, Contraction, IdentityResolver},
    render::{AdjacencyListWriter, DotWriter, LineageConfig, LineageDocuments, OutputWriter, WrittenOutput},
};

/// Full operator-level graph and its anchor-level contraction, built from
/// one catalog snapshot.
#[derive(Debug, Clone)]
pub struct Lineage {
    pub full: LineageGraph,
    pub contracted: LineageGraph,
}

impl Lineage {
    pub fn build(snapshot: &CatalogSnapshot) -> LineageResult<Self> {
        // 1) Merge shared plan nodes
        let mut full = IdentityResolver::resolve(snapshot)?;

        // 2) Column edges
        ColumnPropagator::propagate(&mut full)?;
        full.validate()?;

        // 3) Anchors only
        let contracted = Contraction::contract(&full)?;

        info!(
            artifacts = snapshot.artifacts().len(),
            nodes = full.node_count(),
            edges = full.edge_count(),
            anchors = contracted.node_count(),
            "built lineage graph"
        );
        Ok(Self { full, contracted })
    }

    /// (full, contracted) DOT documents.
    pub fn to_dot(&self) -> LineageResult<(String, String)> {
        Ok((DotWriter::render(&self.full)?, DotWriter::render(&self.contracted)?))
    }

    pub fn documents(&self, config: &LineageConfig) -> LineageResult<LineageDocuments> {
        let (full_dot, contracted_dot) = self.to_dot()?;
        let (full_json, contracted_json) = if config.adjacency_list {
            (
                Some(AdjacencyListWriter::render(&self.full)?),
                Some(AdjacencyListWriter::render(&self.contracted)?),
            )
        } else {
            (None, None)
        };
        Ok(LineageDocuments { full_dot, contracted_dot, full_json, contracted_json })
    }
}

pub trait LineageRunner {
    /// Build both graphs from the current state.
    fn lineage(&self) -> LineageResult<Lineage>;

    /// (full, contracted) DOT documents.
    fn lineage_dot(&self) -> LineageResult<(String, String)> {
        self.lineage()?.to_dot()
    }

    /// Build, render and write everything `config` asks for.
    fn save_lineage(&self, config: &LineageConfig) -> LineageResult<WrittenOutput> {
        let documents = self.lineage()?.documents(config)?;
        OutputWriter::new(config).write(&documents)
    }
}

impl LineageRunner for CatalogSnapshot {
    fn lineage(&self) -> LineageResult<Lineage> {
        Lineage::build(self)
    }
}

impl LineageRunner for Catalog {
    fn lineage(&self) -> LineageResult<Lineage> {
        // the lock is released before any graph work starts
        let snapshot = self.snapshot();
        Lineage::build(&snapshot)
    }
}
