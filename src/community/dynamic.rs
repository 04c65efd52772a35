//! Convergence driver: keep a Louvain partition current under an edge stream.
//!
//! ## State Machine
//!
//! ```text
//!            ┌──────────── improved or events pending ───────────┐
//!            ▼                                                   │
//!      OPTIMIZING ── neither ──▶ DONE (labels canonicalized)      │
//!            │                                                   │
//!            └──────────────▶ REPAIRING ── one event ────────────┘
//! ```
//!
//! - **OPTIMIZING**: local moving to a fixed point on a snapshot of the coarse
//!   graph; every fine node carrying a moved coarse id adopts the coarse
//!   node's new label; labels are re-anchored onto member ids; modularity is
//!   recomputed on the fine graph and the coarse graph is rebuilt.
//! - **REPAIRING**: pop one event (insertions first) and hand it to
//!   [`repair`]. A rejected event is recorded and skipped; it never stops
//!   the run.
//! - **DONE**: community ids are renumbered densely `0..k` in node order.
//!
//! Modularity can keep creeping up on adversarial streams, so the number of
//! OPTIMIZING rounds is capped ([`EngineConfig::max_rounds`]).
//!
//! ## Usage
//!
//! ```rust
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//! use ripple::community::{DynamicLouvain, EdgeStream};
//! use ripple::graph::WeightedGraph;
//!
//! let mut graph = WeightedGraph::with_nodes(6);
//! for (u, v) in [(0, 1), (1, 2), (0, 2), (3, 4), (4, 5), (3, 5), (2, 3)] {
//!     graph.add_edge(u, v, 1.0).unwrap();
//! }
//!
//! let stream = EdgeStream::new([(0, 3)], [(2, 3)]);
//! let mut engine = DynamicLouvain::new(graph, 2, stream).unwrap();
//! let summary = engine.run(&mut StdRng::seed_from_u64(42)).unwrap();
//!
//! assert_eq!(summary.applied, 2);
//! assert_eq!(engine.communities().len(), 2);
//! ```

use super::aggregate::partition_to_graph;
use super::local_moving::LocalMoving;
use super::repair::{repair, EdgeEvent, EdgeStream};
use super::traits::PermutationSource;
use crate::error::{Error, Result};
use crate::graph::{CommunityIndex, Label, NodeId, WeightedGraph};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Tunables of the engine.
///
/// Deserializes from partial documents: absent fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Resolution parameter (gamma).
    pub resolution: f64,
    /// Minimum gain for a single-node move (ε).
    pub min_gain: f64,
    /// Maximum local-moving passes per round.
    pub max_passes: usize,
    /// Modularity increase a round must beat to count as an improvement.
    pub min_modularity_improvement: f64,
    /// Maximum OPTIMIZING rounds; `None` removes the cap.
    pub max_rounds: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            resolution: 1.0,
            min_gain: 1e-4,
            max_passes: 100,
            min_modularity_improvement: 1e-7,
            max_rounds: Some(1000),
        }
    }
}

impl EngineConfig {
    /// Set resolution parameter.
    ///
    /// Higher values produce smaller communities.
    pub fn with_resolution(mut self, resolution: f64) -> Self {
        self.resolution = resolution;
        self
    }

    /// Set the minimum gain for a single-node move.
    pub fn with_min_gain(mut self, min_gain: f64) -> Self {
        self.min_gain = min_gain;
        self
    }

    /// Set maximum local-moving passes per round.
    pub fn with_max_passes(mut self, max_passes: usize) -> Self {
        self.max_passes = max_passes;
        self
    }

    /// Set the improvement threshold between rounds.
    pub fn with_min_modularity_improvement(mut self, delta: f64) -> Self {
        self.min_modularity_improvement = delta;
        self
    }

    /// Set (or remove) the round cap.
    pub fn with_max_rounds(mut self, max_rounds: Option<usize>) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    /// Reject settings the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if !(self.resolution.is_finite() && self.resolution > 0.0) {
            return Err(Error::InvalidParameter {
                name: "resolution",
                message: "must be finite and positive",
            });
        }
        if !(self.min_gain.is_finite() && self.min_gain > 0.0) {
            return Err(Error::InvalidParameter {
                name: "min_gain",
                message: "must be finite and positive",
            });
        }
        if self.max_passes == 0 {
            return Err(Error::InvalidParameter {
                name: "max_passes",
                message: "must be at least 1",
            });
        }
        if !(self.min_modularity_improvement.is_finite() && self.min_modularity_improvement >= 0.0)
        {
            return Err(Error::InvalidParameter {
                name: "min_modularity_improvement",
                message: "must be finite and non-negative",
            });
        }
        if self.max_rounds == Some(0) {
            return Err(Error::InvalidParameter {
                name: "max_rounds",
                message: "must be at least 1",
            });
        }
        Ok(())
    }

    fn optimizer(&self) -> LocalMoving {
        LocalMoving::new()
            .with_resolution(self.resolution)
            .with_min_gain(self.min_gain)
            .with_max_passes(self.max_passes)
    }
}

/// Driver state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Next step runs local moving and rebuilds the coarse graph.
    Optimizing,
    /// Next step consumes one stream event.
    Repairing,
    /// Converged and stream drained; labels are dense.
    Done,
}

/// Outcome of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// OPTIMIZING rounds executed.
    pub rounds: usize,
    /// Events applied.
    pub applied: usize,
    /// Events rejected (self-loop, unknown node, bad weight).
    pub rejected: usize,
    /// Events left in the stream.
    pub pending: usize,
    /// Whether the round cap ended the run.
    pub round_cap_hit: bool,
    /// Final fine-graph modularity.
    pub modularity: f64,
    /// Number of communities.
    pub communities: usize,
}

/// Incremental Louvain engine over a fine graph and its coarse aggregate.
#[derive(Debug)]
pub struct DynamicLouvain {
    fine: WeightedGraph,
    coarse: WeightedGraph,
    stream: EdgeStream,
    config: EngineConfig,
    optimizer: LocalMoving,
    /// Accepted for parity with fixed-k detectors; not enforced.
    community_count_hint: usize,
    modularity: f64,
    phase: Phase,
    rounds: usize,
    applied: usize,
    round_cap_hit: bool,
    rejected: usize,
    /// Rejected events not yet drained by the caller.
    rejection_log: Vec<(EdgeEvent, Error)>,
}

impl DynamicLouvain {
    /// Engine with default settings.
    ///
    /// Every node of `graph` starts in its own community.
    pub fn new(graph: WeightedGraph, community_count_hint: usize, stream: EdgeStream) -> Result<Self> {
        Self::with_config(graph, community_count_hint, stream, EngineConfig::default())
    }

    /// Engine with explicit settings.
    pub fn with_config(
        mut graph: WeightedGraph,
        community_count_hint: usize,
        stream: EdgeStream,
        config: EngineConfig,
    ) -> Result<Self> {
        config.validate()?;
        graph.validate()?;
        graph.relabel_with(|n| n.id());

        let optimizer = config.optimizer();
        let modularity = optimizer.modularity().score(&graph)?;
        let coarse = partition_to_graph(&graph)?;
        tracing::debug!(
            nodes = graph.len(),
            weight = graph.total_weight(),
            pending = stream.pending(),
            "engine bootstrapped"
        );

        Ok(Self {
            fine: graph,
            coarse,
            stream,
            config,
            optimizer,
            community_count_hint,
            modularity,
            phase: Phase::Optimizing,
            rounds: 0,
            applied: 0,
            round_cap_hit: false,
            rejected: 0,
            rejection_log: Vec::new(),
        })
    }

    /// Advance the state machine by one phase and return the new phase.
    pub fn step<P>(&mut self, rng: &mut P) -> Result<Phase>
    where
        P: PermutationSource + ?Sized,
    {
        match self.phase {
            Phase::Optimizing => self.optimize(rng)?,
            Phase::Repairing => self.repair_next()?,
            Phase::Done => {}
        }
        Ok(self.phase)
    }

    /// Step until DONE.
    pub fn run<P>(&mut self, rng: &mut P) -> Result<RunSummary>
    where
        P: PermutationSource + ?Sized,
    {
        while self.step(rng)? != Phase::Done {}
        Ok(self.summary())
    }

    /// Queue another event.
    ///
    /// A finished engine is reopened: labels are re-anchored onto member
    /// ids, the coarse graph rebuilt, and the next step repairs.
    pub fn enqueue(&mut self, event: EdgeEvent) -> Result<()> {
        self.stream.push(event);
        if self.phase == Phase::Done {
            anchor_labels(&mut self.fine);
            self.coarse = partition_to_graph(&self.fine)?;
            self.round_cap_hit = false;
            self.phase = Phase::Repairing;
        }
        Ok(())
    }

    fn optimize<P>(&mut self, rng: &mut P) -> Result<()>
    where
        P: PermutationSource + ?Sized,
    {
        let mut working = self.coarse.snapshot();
        let moves = self.optimizer.to_fixed_point(&mut working, rng)?;

        // Coarse ids are the fine labels they were built from; the last move
        // of each coarse node holds its final label.
        let lifted: HashMap<Label, Label> = moves.iter().map(|mv| (mv.node, mv.to)).collect();
        if !lifted.is_empty() {
            self.fine
                .relabel_with(|n| lifted.get(&n.label()).copied().unwrap_or(n.label()));
            anchor_labels(&mut self.fine);
        }

        let previous = self.modularity;
        self.modularity = self.optimizer.modularity().score(&self.fine)?;
        self.coarse = partition_to_graph(&self.fine)?;
        self.rounds += 1;

        let improved = self.modularity - previous > self.config.min_modularity_improvement;
        tracing::debug!(
            round = self.rounds,
            moves = moves.len(),
            modularity = self.modularity,
            communities = self.coarse.len(),
            improved,
            "optimization round"
        );

        if !improved && self.stream.is_empty() {
            return self.finish();
        }
        if self.config.max_rounds.is_some_and(|cap| self.rounds >= cap) {
            tracing::warn!(
                rounds = self.rounds,
                pending = self.stream.pending(),
                "round cap reached before convergence"
            );
            self.round_cap_hit = true;
            return self.finish();
        }
        self.phase = Phase::Repairing;
        Ok(())
    }

    fn repair_next(&mut self) -> Result<()> {
        self.phase = Phase::Optimizing;
        let Some(event) = self.stream.pop() else {
            return Ok(());
        };

        match repair(&mut self.fine, &mut self.coarse, &event) {
            Ok(report) => {
                self.applied += 1;
                // The next round is judged against the repaired partition.
                self.modularity = self.optimizer.modularity().score(&self.fine)?;
                tracing::debug!(
                    ?event,
                    region = report.region.len(),
                    coarse = self.coarse.len(),
                    "edge event applied"
                );
            }
            Err(err) if err.is_event_rejection() => {
                tracing::warn!(?event, error = %err, "edge event rejected");
                self.rejected += 1;
                self.rejection_log.push((event, err));
            }
            Err(err) => return Err(err),
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        canonicalize_labels(&mut self.fine);
        self.coarse = partition_to_graph(&self.fine)?;
        self.phase = Phase::Done;
        tracing::info!(
            communities = self.coarse.len(),
            hint = self.community_count_hint,
            modularity = self.modularity,
            rounds = self.rounds,
            rejected = self.rejected,
            "communities converged"
        );
        Ok(())
    }

    /// Node id → community label.
    pub fn labels(&self) -> HashMap<NodeId, Label> {
        self.fine.labels()
    }

    /// Community label → member ids.
    pub fn communities(&self) -> HashMap<Label, HashSet<NodeId>> {
        self.fine.communities()
    }

    /// Modularity of the fine graph as of the last round or repair.
    pub fn modularity(&self) -> f64 {
        self.modularity
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The authoritative graph.
    pub fn fine_graph(&self) -> &WeightedGraph {
        &self.fine
    }

    /// The community graph derived from the fine graph.
    pub fn coarse_graph(&self) -> &WeightedGraph {
        &self.coarse
    }

    /// The community count given at construction.
    pub fn community_count_hint(&self) -> usize {
        self.community_count_hint
    }

    /// Settings in use.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Rejected events not yet drained, with the reason.
    pub fn rejected_events(&self) -> &[(EdgeEvent, Error)] {
        &self.rejection_log
    }

    /// Drain the rejection log.
    ///
    /// Long-lived engines fed through [`DynamicLouvain::enqueue`] should call
    /// this periodically; [`RunSummary::rejected`] keeps counting regardless.
    pub fn take_rejected_events(&mut self) -> Vec<(EdgeEvent, Error)> {
        std::mem::take(&mut self.rejection_log)
    }

    /// Counters for the run so far.
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            rounds: self.rounds,
            applied: self.applied,
            rejected: self.rejected,
            pending: self.stream.pending(),
            round_cap_hit: self.round_cap_hit,
            modularity: self.modularity,
            communities: CommunityIndex::from_graph(&self.fine).len(),
        }
    }
}

/// Relabel every community onto its smallest member id.
///
/// Afterwards no label names a node outside its own community, so a
/// disbanded node's singleton label cannot collide with a surviving one.
fn anchor_labels(fine: &mut WeightedGraph) {
    let index = CommunityIndex::from_graph(fine);
    let anchors: HashMap<Label, NodeId> = index
        .iter()
        .filter_map(|(label, members)| members.iter().copied().min().map(|id| (label, id)))
        .collect();
    fine.relabel_with(|n| anchors.get(&n.label()).copied().unwrap_or(n.label()));
}

/// Renumber labels densely from 0 in order of first appearance.
fn canonicalize_labels(fine: &mut WeightedGraph) {
    let index = CommunityIndex::from_graph(fine);
    let dense: HashMap<Label, Label> = index
        .iter()
        .enumerate()
        .map(|(i, (label, _))| (label, i))
        .collect();
    fine.relabel_with(|n| dense.get(&n.label()).copied().unwrap_or(n.label()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn two_triangles() -> WeightedGraph {
        let mut g = WeightedGraph::with_nodes(6);
        for &(u, v) in &[(0, 1), (1, 2), (0, 2), (3, 4), (4, 5), (3, 5), (2, 3)] {
            g.add_edge(u, v, 1.0).unwrap();
        }
        g
    }

    #[test]
    fn test_config_defaults_and_partial_json() {
        let config: EngineConfig = serde_json::from_str(r#"{"min_gain": 0.001}"#).unwrap();
        assert_eq!(config.min_gain, 0.001);
        assert_eq!(config.resolution, 1.0);
        assert_eq!(config.max_rounds, Some(1000));

        let uncapped: EngineConfig = serde_json::from_str(r#"{"max_rounds": null}"#).unwrap();
        assert_eq!(uncapped.max_rounds, None);
    }

    #[test]
    fn test_config_validation() {
        assert!(EngineConfig::default().validate().is_ok());
        assert!(EngineConfig::default().with_min_gain(0.0).validate().is_err());
        assert!(EngineConfig::default().with_resolution(-1.0).validate().is_err());
        assert!(EngineConfig::default().with_max_passes(0).validate().is_err());
        assert!(EngineConfig::default()
            .with_max_rounds(Some(0))
            .validate()
            .is_err());
        assert!(EngineConfig::default()
            .with_min_modularity_improvement(f64::NAN)
            .validate()
            .is_err());

        let err = DynamicLouvain::with_config(
            two_triangles(),
            2,
            EdgeStream::empty(),
            EngineConfig::default().with_max_passes(0),
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { name: "max_passes", .. }));
    }

    #[test]
    fn test_construction_resets_labels() {
        let mut g = two_triangles();
        g.set_label(4, 0).unwrap();
        let engine = DynamicLouvain::new(g, 2, EdgeStream::empty()).unwrap();

        for id in 0..6 {
            assert_eq!(engine.fine_graph().label(id).unwrap(), id);
        }
        assert_eq!(engine.coarse_graph().len(), 6);
        assert_eq!(engine.phase(), Phase::Optimizing);
        assert_eq!(engine.community_count_hint(), 2);
    }

    #[test]
    fn test_phase_transitions() {
        let stream = EdgeStream::new([(0, 3)], Vec::<(NodeId, NodeId)>::new());
        let mut engine = DynamicLouvain::new(two_triangles(), 2, stream).unwrap();
        let mut rng = StdRng::seed_from_u64(9);

        assert_eq!(engine.step(&mut rng).unwrap(), Phase::Repairing);
        assert_eq!(engine.step(&mut rng).unwrap(), Phase::Optimizing);
        assert_eq!(engine.summary().applied, 1);

        let summary = engine.run(&mut rng).unwrap();
        assert_eq!(engine.phase(), Phase::Done);
        assert_eq!(summary.pending, 0);
        assert!(!summary.round_cap_hit);

        // Stepping a finished engine is a no-op.
        let labels = engine.labels();
        assert_eq!(engine.step(&mut rng).unwrap(), Phase::Done);
        assert_eq!(engine.labels(), labels);
    }

    #[test]
    fn test_rejected_events_do_not_stop_the_run() {
        let stream: EdgeStream = [
            EdgeEvent::insert(1, 1),
            EdgeEvent::insert(0, 99),
            EdgeEvent::insert_weighted(0, 4, f64::INFINITY),
            EdgeEvent::insert(0, 4),
            EdgeEvent::remove(42, 0),
        ]
        .into_iter()
        .collect();
        let mut engine = DynamicLouvain::new(two_triangles(), 2, stream).unwrap();

        let summary = engine.run(&mut StdRng::seed_from_u64(3)).unwrap();

        assert_eq!(summary.applied, 1);
        assert_eq!(summary.rejected, 4);
        assert_eq!(summary.pending, 0);
        let reasons: Vec<&Error> = engine.rejected_events().iter().map(|(_, e)| e).collect();
        assert_eq!(reasons[0], &Error::SelfLoop { id: 1 });
        assert_eq!(reasons[1], &Error::NodeNotFound { id: 99 });
        assert!(matches!(reasons[2], Error::InvalidWeight { .. }));
        assert_eq!(reasons[3], &Error::NodeNotFound { id: 42 });
        assert_eq!(engine.fine_graph().edge_weight(0, 4).unwrap(), 1.0);
    }

    #[test]
    fn test_draining_rejections_keeps_the_count() {
        let stream: EdgeStream = [EdgeEvent::insert(2, 2), EdgeEvent::remove(0, 50)]
            .into_iter()
            .collect();
        let mut engine = DynamicLouvain::new(two_triangles(), 2, stream).unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        let _ = engine.run(&mut rng).unwrap();

        let drained = engine.take_rejected_events();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].0, EdgeEvent::insert(2, 2));
        assert!(engine.rejected_events().is_empty());
        assert_eq!(engine.summary().rejected, 2);

        engine.enqueue(EdgeEvent::insert(7, 0)).unwrap();
        let summary = engine.run(&mut rng).unwrap();
        assert_eq!(summary.rejected, 3);
        assert_eq!(engine.take_rejected_events().len(), 1);
        assert!(engine.take_rejected_events().is_empty());
    }

    #[test]
    fn test_round_cap() {
        let stream = EdgeStream::new([(0, 3), (1, 4), (2, 5)], Vec::<(NodeId, NodeId)>::new());
        let config = EngineConfig::default().with_max_rounds(Some(1));
        let mut engine = DynamicLouvain::with_config(two_triangles(), 2, stream, config).unwrap();

        let summary = engine.run(&mut StdRng::seed_from_u64(0)).unwrap();
        assert!(summary.round_cap_hit);
        assert_eq!(summary.rounds, 1);
        assert_eq!(summary.pending, 3);
        assert_eq!(engine.phase(), Phase::Done);
    }

    #[test]
    fn test_enqueue_reopens_finished_engine() {
        let mut engine = DynamicLouvain::new(two_triangles(), 2, EdgeStream::empty()).unwrap();
        let mut rng = StdRng::seed_from_u64(11);
        let _ = engine.run(&mut rng).unwrap();
        assert_eq!(engine.communities().len(), 2);

        engine.enqueue(EdgeEvent::remove(2, 3)).unwrap();
        assert_eq!(engine.phase(), Phase::Repairing);
        let summary = engine.run(&mut rng).unwrap();

        assert_eq!(summary.applied, 1);
        assert_eq!(engine.fine_graph().edge_weight(2, 3).unwrap(), 0.0);
        assert_eq!(engine.communities().len(), 2);
        engine.fine_graph().validate().unwrap();
    }

    #[test]
    fn test_empty_graph() {
        let stream = EdgeStream::new([(0, 1)], Vec::<(NodeId, NodeId)>::new());
        let mut engine = DynamicLouvain::new(WeightedGraph::new(), 0, stream).unwrap();
        let summary = engine.run(&mut StdRng::seed_from_u64(0)).unwrap();

        assert_eq!(summary.rejected, 1);
        assert_eq!(summary.communities, 0);
        assert_eq!(summary.modularity, 0.0);
        assert!(engine.labels().is_empty());
    }

    #[test]
    fn test_anchor_and_canonicalize() {
        let mut g = WeightedGraph::with_nodes(5);
        for (id, label) in [4, 4, 0, 0, 3].into_iter().enumerate() {
            g.set_label(id, label).unwrap();
        }

        anchor_labels(&mut g);
        let anchored: Vec<Label> = (0..5).map(|i| g.label(i).unwrap()).collect();
        assert_eq!(anchored, vec![0, 0, 2, 2, 4]);

        canonicalize_labels(&mut g);
        let dense: Vec<Label> = (0..5).map(|i| g.label(i).unwrap()).collect();
        assert_eq!(dense, vec![0, 0, 1, 1, 2]);
    }
}
