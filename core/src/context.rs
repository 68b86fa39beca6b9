//! Per-thread trace scratch (spec §5).
//!
//! Design Notes §9: "Global scratch arrays → explicit per-thread context
//! passed as the first parameter of every hot function." `TraceContext`
//! bundles the intersection-stack pool, a `bumpalo` arena for transient
//! per-ray scratch (BCyl candidate buffers, polynomial-solver workspace),
//! a seeded RNG for the media integrator's stratified sampling, and
//! aggregate `Stats`. One is created per tile in [`crate::render::render_tiles`]
//! and never shared across threads.

use crate::intersection::IntersectionStack;
use bumpalo::Bump;
use rand::rngs::SmallRng;
use rand::SeedableRng;

/// Counters surfaced at tile boundaries (spec §4.B: overflow "must be
/// surfaced as a statistic").
#[derive(Default, Debug, Clone, Copy)]
pub struct Stats {
    pub intersection_overflow: u64,
    pub rays_traced: u64,
    pub media_samples_taken: u64,
}

pub struct TraceContext {
    pub intersections: IntersectionStack,
    /// Scratch arena for transient per-ray allocations (BCyl/poly working
    /// buffers); reset at the start of every ray via [`TraceContext::reset_arena`].
    pub arena: Bump,
    pub rng: SmallRng,
    pub stats: Stats,
}

impl TraceContext {
    pub fn new(seed: u64) -> Self {
        Self {
            intersections: IntersectionStack::new(),
            arena: Bump::new(),
            rng: SmallRng::seed_from_u64(seed),
            stats: Stats::default(),
        }
    }

    /// Called once per ray: rewinds (but doesn't deallocate) the scratch
    /// arena and the intersection pool.
    pub fn begin_ray(&mut self) {
        self.arena.reset();
        self.intersections.open();
        self.stats.rays_traced += 1;
    }

    pub fn record_overflow(&mut self) {
        self.stats.intersection_overflow = self.intersections.overflow_count();
    }
}
