//! Ornstein-Uhlenbeck exploration noise.
//!
//! Temporally correlated noise added to the policy output during rollouts.
//! The process mean-reverts to zero, so exploration stays centered on the
//! policy while consecutive actions remain smooth enough for physical
//! actuation.

const THETA: f32 = 0.15;
const DT: f32 = 1e-2;

pub struct OuNoise {
    sigma: f32,
    state: Vec<f32>,
}

impl OuNoise {
    #[must_use]
    pub fn new(len: usize, sigma: f32) -> Self {
        Self {
            sigma,
            state: vec![0.0; len],
        }
    }

    /// Forgets the accumulated drift. Called on episode restarts.
    pub fn reset(&mut self) {
        self.state.fill(0.0);
    }

    /// Advances the process one step and returns the current noise vector.
    pub fn next(&mut self, rng: &mut fastrand::Rng) -> &[f32] {
        let scale = self.sigma * DT.sqrt();
        for value in &mut self.state {
            *value += -THETA * *value * DT + scale * gaussian(rng);
        }
        &self.state
    }
}

/// Standard normal deviate via the Box-Muller transform.
fn gaussian(rng: &mut fastrand::Rng) -> f32 {
    let u1 = rng.f32().max(f32::MIN_POSITIVE);
    let u2 = rng.f32();
    (-2.0 * u1.ln()).sqrt() * (std::f32::consts::TAU * u2).cos()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_clears_the_state() {
        let mut noise = OuNoise::new(4, 0.2);
        let mut rng = fastrand::Rng::with_seed(3);
        noise.next(&mut rng);
        assert!(noise.state.iter().any(|v| *v != 0.0));
        noise.reset();
        assert!(noise.state.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn process_mean_reverts_toward_zero() {
        let mut noise = OuNoise::new(1, 0.2);
        let mut rng = fastrand::Rng::with_seed(3);
        let mut sum = 0.0;
        let mut count = 0.0;
        for _ in 0..20_000 {
            sum += noise.next(&mut rng)[0];
            count += 1.0;
        }
        assert!((sum / count).abs() < 0.05);
    }

    #[test]
    fn zero_sigma_never_moves() {
        let mut noise = OuNoise::new(2, 0.0);
        let mut rng = fastrand::Rng::with_seed(3);
        for _ in 0..10 {
            assert!(noise.next(&mut rng).iter().all(|v| *v == 0.0));
        }
    }
}
