//! Event types and sinks for observing mesh generation runs.
//!
//! This module defines [`MeshEvent`] and a set of sinks to emit, collect, or forward events
//! while executing [`crate::generator::MeshGenerator::run_with_events`].
use glam::DVec2;

use crate::geometry::Domain;
use crate::placement::PlacementStats;

/// Pipeline stage that produced a [`MeshEvent::Snapshot`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    Placement,
    Relaxation,
    Redistribution,
}

impl Stage {
    /// Short lowercase label, suitable for file names.
    pub fn label(&self) -> &'static str {
        match self {
            Stage::Placement => "place",
            Stage::Relaxation => "relax",
            Stage::Redistribution => "redistribute",
        }
    }
}

/// Discriminant of [`MeshEvent`], used by [`EventSink::wants`] to skip building events nobody
/// listens to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MeshEventKind {
    RunStarted,
    PlacementFinished,
    RelaxationStep,
    RedistributionPass,
    Snapshot,
    RdfComputed,
    RunFinished,
    Warning,
}

/// Describes events emitted by a generation run.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub enum MeshEvent {
    /// Emitted once the domain, grid and worker pool are set up.
    RunStarted {
        /// Target particle count.
        n_particles: usize,
        /// Resolved domain.
        domain: Domain,
        /// Grid cells along `(x, y)`.
        grid_dims: (usize, usize),
        /// Worker threads in the pool.
        threads: usize,
    },

    /// Emitted after the initial placement reached the target count.
    PlacementFinished {
        /// Candidate and acceptance counters.
        stats: PlacementStats,
    },

    /// Emitted after each centroidal relaxation iteration.
    RelaxationStep {
        /// Zero-based iteration index.
        iteration: usize,
        /// Samples that were attributed to a particle.
        samples_used: usize,
        /// Mean displacement of the particles that moved.
        mean_shift: f64,
    },

    /// Emitted after each redistribution pass.
    RedistributionPass {
        /// Zero-based pass index.
        pass: usize,
        /// Particles resampled in this pass.
        replaced: usize,
        /// Highest crowding score before resampling.
        max_crowding: usize,
        /// Mean crowding score before resampling.
        mean_crowding: f64,
    },

    /// Intermediate particle positions, emitted every `snapshot_interval` steps.
    Snapshot {
        stage: Stage,
        /// Step index within the stage.
        step: usize,
        positions: Vec<DVec2>,
    },

    /// Emitted after the radial distribution function was computed.
    RdfComputed {
        /// Bin center of the highest bin.
        peak_r: f64,
        /// Value of the highest bin.
        peak_g: f64,
    },

    /// Emitted when the run completed.
    RunFinished {
        /// Final particle count.
        n_particles: usize,
    },

    /// Non-fatal warning generated during the run.
    Warning {
        /// Context string (e.g. stage name).
        context: String,
        /// Human-readable message.
        message: String,
    },
}

impl MeshEvent {
    pub fn kind(&self) -> MeshEventKind {
        match self {
            MeshEvent::RunStarted { .. } => MeshEventKind::RunStarted,
            MeshEvent::PlacementFinished { .. } => MeshEventKind::PlacementFinished,
            MeshEvent::RelaxationStep { .. } => MeshEventKind::RelaxationStep,
            MeshEvent::RedistributionPass { .. } => MeshEventKind::RedistributionPass,
            MeshEvent::Snapshot { .. } => MeshEventKind::Snapshot,
            MeshEvent::RdfComputed { .. } => MeshEventKind::RdfComputed,
            MeshEvent::RunFinished { .. } => MeshEventKind::RunFinished,
            MeshEvent::Warning { .. } => MeshEventKind::Warning,
        }
    }
}

/// A generic event sink that accepts [`MeshEvent`]s.
///
/// Sinks are `Send` so a run can drive them from inside its worker pool.
pub trait EventSink: Send {
    fn send(&mut self, event: MeshEvent);

    /// Whether events of `kind` should be built and sent at all.
    #[inline]
    fn wants(&self, _kind: MeshEventKind) -> bool {
        true
    }
}

/// A no-op event sink.
impl EventSink for () {
    #[inline]
    fn send(&mut self, _event: MeshEvent) {}

    #[inline]
    fn wants(&self, _kind: MeshEventKind) -> bool {
        false
    }
}

/// An event sink that forwards to a user-provided closure.
pub struct FnSink<F>
where
    F: FnMut(MeshEvent) + Send,
{
    f: F,
}

impl<F> FnSink<F>
where
    F: FnMut(MeshEvent) + Send,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> EventSink for FnSink<F>
where
    F: FnMut(MeshEvent) + Send,
{
    #[inline]
    fn send(&mut self, event: MeshEvent) {
        (self.f)(event);
    }
}

/// An event sink that collects all events in a `Vec`.
#[derive(Default)]
pub struct VecSink {
    events: Vec<MeshEvent>,
}

impl VecSink {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn into_inner(self) -> Vec<MeshEvent> {
        self.events
    }

    pub fn as_slice(&self) -> &[MeshEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl EventSink for VecSink {
    #[inline]
    fn send(&mut self, event: MeshEvent) {
        self.events.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn warning() -> MeshEvent {
        MeshEvent::Warning {
            context: "ctx".into(),
            message: "msg".into(),
        }
    }

    #[test]
    fn unit_sink_wants_nothing() {
        assert!(!().wants(MeshEventKind::Snapshot));
        assert!(VecSink::new().wants(MeshEventKind::Snapshot));
    }

    #[test]
    fn vec_sink_collects_events() {
        let mut sink = VecSink::new();
        assert!(sink.is_empty());
        sink.send(warning());
        sink.send(MeshEvent::RunFinished { n_particles: 3 });
        assert_eq!(sink.len(), 2);
        let kinds: Vec<_> = sink.as_slice().iter().map(MeshEvent::kind).collect();
        assert_eq!(kinds, vec![MeshEventKind::Warning, MeshEventKind::RunFinished]);
    }

    #[test]
    fn fn_sink_invokes_callback() {
        let mut count = 0;
        let mut sink = FnSink::new(|_event| {
            count += 1;
        });
        sink.send(warning());
        assert_eq!(count, 1);
    }

    #[test]
    fn stage_labels_are_distinct() {
        assert_eq!(Stage::Relaxation.label(), "relax");
        assert_ne!(Stage::Placement.label(), Stage::Redistribution.label());
    }
}
