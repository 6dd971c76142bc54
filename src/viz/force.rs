//! Velocity-Verlet force layout for the bubble chart.
//!
//! The simulation is a plain value: [`step`] consumes a [`SimState`] and
//! returns the next one, so a caller can advance it tick by tick or run it to
//! rest with [`Simulation::run_until_settled`]. Jitter comes from a seeded
//! [`StdRng`] so a layout is reproducible.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

pub const ALPHA_MIN: f64 = 0.001;
pub const VELOCITY_DECAY: f64 = 0.4;

/// `1 - alpha_min^(1/300)`: alpha reaches `alpha_min` after 300 ticks.
pub fn default_alpha_decay() -> f64 {
    1.0 - ALPHA_MIN.powf(1.0 / 300.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Body {
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
    pub radius: f64,
    /// Point the drift forces pull toward.
    pub target: (f64, f64),
}

/// Force parameters; the defaults match the bubble layout.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Forces {
    /// Many-body strength; negative repels.
    pub charge: f64,
    pub center: (f64, f64),
    /// Extra spacing added to each radius for collisions.
    pub collide_padding: f64,
    /// Strength of the pull toward each body's target.
    pub drift: f64,
}

impl Default for Forces {
    fn default() -> Self {
        Self {
            charge: -10.0,
            center: (0.0, 0.0),
            collide_padding: 3.0,
            drift: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimState {
    pub bodies: Vec<Body>,
    pub alpha: f64,
    pub alpha_decay: f64,
    pub ticks: usize,
}

impl SimState {
    pub fn new(bodies: Vec<Body>) -> Self {
        Self {
            bodies,
            alpha: 1.0,
            alpha_decay: default_alpha_decay(),
            ticks: 0,
        }
    }

    pub fn is_settled(&self) -> bool {
        self.alpha < ALPHA_MIN
    }
}

fn jiggle(rng: &mut StdRng) -> f64 {
    (rng.r#gen::<f64>() - 0.5) * 1e-6
}

fn apply_charge(bodies: &mut [Body], strength: f64, alpha: f64, rng: &mut StdRng) {
    let n = bodies.len();
    for i in 0..n {
        let (mut ax, mut ay) = (0.0, 0.0);
        for j in 0..n {
            if i == j {
                continue;
            }
            let mut dx = bodies[j].x - bodies[i].x;
            let mut dy = bodies[j].y - bodies[i].y;
            if dx == 0.0 {
                dx = jiggle(rng);
            }
            if dy == 0.0 {
                dy = jiggle(rng);
            }
            let mut l = dx * dx + dy * dy;
            if l < 1.0 {
                l = l.sqrt();
            }
            ax += dx * strength * alpha / l;
            ay += dy * strength * alpha / l;
        }
        bodies[i].vx += ax;
        bodies[i].vy += ay;
    }
}

fn apply_center(bodies: &mut [Body], center: (f64, f64)) {
    if bodies.is_empty() {
        return;
    }
    let n = bodies.len() as f64;
    let sx = bodies.iter().map(|b| b.x).sum::<f64>() / n - center.0;
    let sy = bodies.iter().map(|b| b.y).sum::<f64>() / n - center.1;
    for b in bodies.iter_mut() {
        b.x -= sx;
        b.y -= sy;
    }
}

fn apply_collide(bodies: &mut [Body], padding: f64, rng: &mut StdRng) {
    let n = bodies.len();
    for i in 0..n {
        let ri = bodies[i].radius + padding;
        let xi = bodies[i].x + bodies[i].vx;
        let yi = bodies[i].y + bodies[i].vy;
        for j in (i + 1)..n {
            let rj = bodies[j].radius + padding;
            let r = ri + rj;
            let mut x = xi - bodies[j].x - bodies[j].vx;
            let mut y = yi - bodies[j].y - bodies[j].vy;
            let mut l = x * x + y * y;
            if l >= r * r {
                continue;
            }
            if x == 0.0 {
                x = jiggle(rng);
                l += x * x;
            }
            if y == 0.0 {
                y = jiggle(rng);
                l += y * y;
            }
            let d = l.sqrt();
            let k = (r - d) / d;
            x *= k;
            y *= k;
            let share = (rj * rj) / (ri * ri + rj * rj);
            bodies[i].vx += x * share;
            bodies[i].vy += y * share;
            bodies[j].vx -= x * (1.0 - share);
            bodies[j].vy -= y * (1.0 - share);
        }
    }
}

fn apply_drift(bodies: &mut [Body], strength: f64, alpha: f64) {
    for b in bodies.iter_mut() {
        b.vx += (b.target.0 - b.x) * strength * alpha;
        b.vy += (b.target.1 - b.y) * strength * alpha;
    }
}

/// Advance the simulation by one tick.
pub fn step(mut state: SimState, forces: &Forces, rng: &mut StdRng) -> SimState {
    state.alpha += (0.0 - state.alpha) * state.alpha_decay;
    let alpha = state.alpha;
    let bodies = &mut state.bodies;
    apply_charge(bodies, forces.charge, alpha, rng);
    apply_center(bodies, forces.center);
    apply_collide(bodies, forces.collide_padding, rng);
    apply_drift(bodies, forces.drift, alpha);
    for b in bodies.iter_mut() {
        b.vx *= 1.0 - VELOCITY_DECAY;
        b.vy *= 1.0 - VELOCITY_DECAY;
        b.x += b.vx;
        b.y += b.vy;
    }
    state.ticks += 1;
    state
}

/// A simulation plus the random source its forces draw from.
pub struct Simulation {
    state: SimState,
    forces: Forces,
    rng: StdRng,
}

impl Simulation {
    pub fn new(bodies: Vec<Body>, forces: Forces, seed: u64) -> Self {
        Self {
            state: SimState::new(bodies),
            forces,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn state(&self) -> &SimState {
        &self.state
    }

    pub fn tick(&mut self) {
        let state = std::mem::replace(&mut self.state, SimState::new(Vec::new()));
        self.state = step(state, &self.forces, &mut self.rng);
    }

    /// Tick until alpha drops below [`ALPHA_MIN`] or `max_ticks` is reached.
    pub fn run_until_settled(&mut self, max_ticks: usize) -> &SimState {
        while !self.state.is_settled() && self.state.ticks < max_ticks {
            self.tick();
        }
        log::debug!("force layout settled after {} ticks", self.state.ticks);
        &self.state
    }

    pub fn into_bodies(self) -> Vec<Body> {
        self.state.bodies
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(x: f64, y: f64, r: f64) -> Body {
        Body {
            x,
            y,
            vx: 0.0,
            vy: 0.0,
            radius: r,
            target: (x, y),
        }
    }

    #[test]
    fn alpha_settles_near_300_ticks() {
        let mut sim = Simulation::new(vec![body(0.0, 0.0, 5.0)], Forces::default(), 1);
        let s = sim.run_until_settled(1000);
        assert!(s.is_settled());
        assert!((299..=301).contains(&s.ticks));
    }

    #[test]
    fn collision_separates_overlapping_bodies() {
        let bodies = vec![body(100.0, 100.0, 10.0), body(101.0, 100.0, 10.0)];
        let forces = Forces {
            center: (100.0, 100.0),
            ..Forces::default()
        };
        let mut sim = Simulation::new(bodies, forces, 7);
        sim.run_until_settled(300);
        let b = &sim.state().bodies;
        let d = ((b[0].x - b[1].x).powi(2) + (b[0].y - b[1].y).powi(2)).sqrt();
        assert!(d > 20.0, "distance {d}");
    }

    #[test]
    fn same_seed_same_layout() {
        let make = || {
            let mut sim = Simulation::new(vec![body(0.0, 0.0, 4.0); 3], Forces::default(), 42);
            sim.run_until_settled(50);
            sim.into_bodies()
        };
        assert_eq!(make(), make());
    }
}
