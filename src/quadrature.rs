//! Quadrature decoding for incremental encoders.
//!
//! The two channels form a 2-bit Gray code `(A << 1) | B`. Every valid transition moves the
//! position by one count in either direction, anything else (no change, or a skipped state)
//! counts as zero.

use core::f32::consts::PI;
use portable_atomic::{AtomicI8, AtomicI32, AtomicU8, Ordering};

/// Indexed by `(previous << 2) | next`.
const TRANSITIONS: [i8; 16] = [
    0, 1, -1, 0, //
    -1, 0, 0, 1, //
    1, 0, 0, -1, //
    0, -1, 1, 0, //
];

/// Channel levels packed into a 2-bit state.
#[inline(always)]
pub const fn state(a: bool, b: bool) -> u8 {
    ((a as u8) << 1) | b as u8
}

/// Position change for the transition `previous -> next`. Only the low two bits of each state
/// are used.
#[inline(always)]
pub const fn step(previous: u8, next: u8) -> i8 {
    TRANSITIONS[(((previous & 0b11) << 2) | (next & 0b11)) as usize]
}

/// Encoder position shared between the edge interrupt and the sampling code.
///
/// [`on_edge`](Self::on_edge) is meant to be registered for both edges of both channels.
/// Everything else only performs atomic loads and can run from any context.
#[derive(Debug)]
pub struct QuadratureCounter {
    position: AtomicI32,
    previous: AtomicU8,
    direction: AtomicI8,
}

impl QuadratureCounter {
    /// `a` and `b` are the channel levels at the time the interrupt gets attached.
    pub const fn new(a: bool, b: bool) -> Self {
        Self {
            position: AtomicI32::new(0),
            previous: AtomicU8::new(state(a, b)),
            direction: AtomicI8::new(0),
        }
    }

    /// Feeds the current channel levels, returns the applied step.
    pub fn on_edge(&self, a: bool, b: bool) -> i8 {
        let next = state(a, b);
        let previous = self.previous.swap(next, Ordering::AcqRel);
        let step = step(previous, next);

        self.position.fetch_add(step as i32, Ordering::Relaxed);
        self.direction.store(step.signum(), Ordering::Relaxed);
        step
    }

    pub fn count(&self) -> i32 {
        self.position.load(Ordering::Relaxed)
    }

    /// `1` forward, `-1` backward, `0` if the last edge was not a valid transition.
    pub fn direction(&self) -> i8 {
        self.direction.load(Ordering::Relaxed)
    }

    /// Clears position and direction. The channel state is kept so the next edge still decodes.
    pub fn reset(&self) {
        self.position.store(0, Ordering::Relaxed);
        self.direction.store(0, Ordering::Relaxed);
    }

    /// Full turns for an encoder with `pulses_per_rev` counts per revolution.
    pub fn revolutions(&self, pulses_per_rev: u32) -> f32 {
        if pulses_per_rev == 0 {
            return 0.0;
        }
        self.count() as f32 / pulses_per_rev as f32
    }

    pub fn degrees(&self, pulses_per_rev: u32) -> f32 {
        self.revolutions(pulses_per_rev) * 360.0
    }

    pub fn radians(&self, pulses_per_rev: u32) -> f32 {
        self.revolutions(pulses_per_rev) * 2.0 * PI
    }
}

impl Default for QuadratureCounter {
    fn default() -> Self {
        Self::new(false, false)
    }
}
