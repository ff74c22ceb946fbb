use std::time::Duration;

/// Frame timing and workload counters gathered by [`World::step`].
///
/// [`World::step`]: crate::world::World::step
#[derive(Debug, Default, Clone, Copy)]
pub struct StepProfile {
    pub broad_phase_time: Duration,
    pub narrow_phase_time: Duration,
    pub solver_time: Duration,
    pub total_step_time: Duration,

    pub body_count: usize,
    pub contact_count: usize,
    pub island_count: usize,
    pub pair_count: usize,
    pub gjk_calls: u32,
    pub gjk_cache_hits: u32,
    pub sat_cache_hits: u32,
}

impl StepProfile {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn report(&self) {
        let total_us = self.total_step_time.as_micros() as f32;
        if total_us < 1.0 {
            return;
        }

        log::debug!(
            "step: bodies={} contacts={} islands={} pairs={}",
            self.body_count,
            self.contact_count,
            self.island_count,
            self.pair_count
        );
        log::debug!(
            "  broad {:.2} ms | narrow {:.2} ms | solver {:.2} ms | total {:.2} ms",
            self.broad_phase_time.as_secs_f32() * 1000.0,
            self.narrow_phase_time.as_secs_f32() * 1000.0,
            self.solver_time.as_secs_f32() * 1000.0,
            self.total_step_time.as_secs_f32() * 1000.0
        );
        log::debug!(
            "  gjk calls={} cache hits={} | sat cache hits={}",
            self.gjk_calls,
            self.gjk_cache_hits,
            self.sat_cache_hits
        );
    }
}
