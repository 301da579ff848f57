//! Confidence arithmetic. All results are clamped to [0, 1].

/// One reinforcement step: `c + rate * (1 - c)`.
pub fn reinforce(confidence: f64, rate: f64) -> f64 {
    clamp(confidence + rate * (1.0 - confidence))
}

/// `n` reinforcement steps in closed form.
pub fn reinforce_n(confidence: f64, rate: f64, n: u64) -> f64 {
    let remaining = (1.0 - clamp(rate)).powf(n as f64);
    clamp(1.0 - (1.0 - clamp(confidence)) * remaining)
}

/// Exponential decay over `elapsed_hours` with the given half-life.
pub fn decay(confidence: f64, elapsed_hours: f64, half_life_hours: f64) -> f64 {
    if elapsed_hours <= 0.0 || half_life_hours <= 0.0 {
        return clamp(confidence);
    }
    clamp(confidence * 0.5f64.powf(elapsed_hours / half_life_hours))
}

fn clamp(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reinforce_moves_toward_one() {
        let c1 = reinforce(0.0, 0.2);
        let c2 = reinforce(c1, 0.2);
        assert!((c1 - 0.2).abs() < 1e-12);
        assert!((c2 - 0.36).abs() < 1e-12);
        assert!(c2 < 1.0);
    }

    #[test]
    fn reinforce_n_matches_repeated_steps() {
        let mut c = 0.1;
        for _ in 0..5 {
            c = reinforce(c, 0.3);
        }
        assert!((reinforce_n(0.1, 0.3, 5) - c).abs() < 1e-12);
        assert!((reinforce_n(0.4, 0.3, 0) - 0.4).abs() < 1e-12);
    }

    #[test]
    fn decay_halves_per_half_life() {
        assert!((decay(0.8, 72.0, 72.0) - 0.4).abs() < 1e-12);
        assert_eq!(decay(0.8, 0.0, 72.0), 0.8);
    }

    #[test]
    fn results_stay_in_bounds() {
        assert_eq!(reinforce(1.0, 1.0), 1.0);
        assert_eq!(reinforce(f64::NAN, 0.5), 0.0);
        assert_eq!(decay(2.0, 0.0, 1.0), 1.0);
    }
}
