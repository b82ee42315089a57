use osseo_common::{OsseoError, RemodelingParams, RemodelingSample, SimResult};
use log::debug;

/// Bone-remodeling model: the effective modulus grows toward `max_modulus`
/// at a rate scaled by the mechanical stimulus of each step.
///
/// Explicit-Euler step of a saturating growth law:
/// `E[i] = min(E[i-1] + rate * S[i] * (E_max - E[i-1]), E_max)`.
#[derive(Debug, Clone)]
pub struct RemodelingModel {
    params: RemodelingParams,
    stimulus_curve: Vec<f64>,
    modulus_series: Vec<f64>,
}

/// Linear ramp from 0 to 1 over `step_count` points. A single point is `[0]`.
pub fn linear_stimulus(step_count: usize) -> Vec<f64> {
    match step_count {
        0 => Vec::new(),
        1 => vec![0.0],
        n => {
            let last = (n - 1) as f64;
            (0..n).map(|i| i as f64 / last).collect()
        }
    }
}

impl RemodelingModel {
    /// Creates a model driven by a linearly increasing stimulus.
    pub fn new(params: RemodelingParams) -> SimResult<Self> {
        let curve = linear_stimulus(params.step_count);
        Self::with_stimulus(params, curve)
    }

    /// Creates a model with a caller-provided stimulus curve.
    ///
    /// The curve must have one value per step, lie in [0, 1] and never decrease.
    pub fn with_stimulus(params: RemodelingParams, stimulus_curve: Vec<f64>) -> SimResult<Self> {
        params.validate()?;
        if stimulus_curve.len() != params.step_count {
            return Err(OsseoError::invalid(
                "stimulus_curve",
                format!("has {} values for {} steps", stimulus_curve.len(), params.step_count),
            ));
        }
        if stimulus_curve.iter().any(|s| !(0.0..=1.0).contains(s)) {
            return Err(OsseoError::invalid("stimulus_curve", "values must lie in [0, 1]"));
        }
        if stimulus_curve.windows(2).any(|w| w[1] < w[0]) {
            return Err(OsseoError::invalid("stimulus_curve", "must be non-decreasing"));
        }

        debug!("Remodeling model: {:?}", params);
        let mut modulus_series = Vec::with_capacity(params.step_count);
        modulus_series.push(params.initial_modulus);
        Ok(Self { params, stimulus_curve, modulus_series })
    }

    /// Computes the series up to and including `step_index` and returns that value.
    /// Entries that are already computed are returned unchanged.
    /// Returns `None` past the last step.
    pub fn advance(&mut self, step_index: usize) -> Option<f64> {
        if step_index >= self.params.step_count {
            return None;
        }
        while self.modulus_series.len() <= step_index {
            let next = self.next_value(self.modulus_series.len());
            self.modulus_series.push(next);
        }
        Some(self.modulus_series[step_index])
    }

    /// Computes the next uncomputed step, if any.
    pub fn step(&mut self) -> Option<RemodelingSample> {
        let index = self.modulus_series.len();
        self.advance(index)?;
        self.sample(index)
    }

    /// Computes every remaining step and returns the full series.
    pub fn run(&mut self) -> &[f64] {
        if let Some(last) = self.params.step_count.checked_sub(1) {
            self.advance(last);
        }
        &self.modulus_series
    }

    fn next_value(&self, index: usize) -> f64 {
        let prev = self.modulus_series[index - 1];
        let stimulus = self.stimulus_curve[index];
        let delta = self.params.remodeling_rate * stimulus * (self.params.max_modulus - prev);
        // Never below the previous value, never above the ceiling.
        (prev + delta).min(self.params.max_modulus).max(prev)
    }

    pub fn params(&self) -> &RemodelingParams {
        &self.params
    }

    pub fn stimulus_curve(&self) -> &[f64] {
        &self.stimulus_curve
    }

    /// Values computed so far.
    pub fn modulus_series(&self) -> &[f64] {
        &self.modulus_series
    }

    pub fn is_complete(&self) -> bool {
        self.modulus_series.len() == self.params.step_count
    }

    pub fn sample(&self, step: usize) -> Option<RemodelingSample> {
        let modulus = *self.modulus_series.get(step)?;
        Some(RemodelingSample { step, stimulus: self.stimulus_curve[step], modulus })
    }

    /// `(step, stimulus, modulus)` for every computed step.
    pub fn samples(&self) -> Vec<RemodelingSample> {
        (0..self.modulus_series.len()).filter_map(|i| self.sample(i)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn params(step_count: usize, initial: f64, max: f64, rate: f64) -> RemodelingParams {
        RemodelingParams { step_count, initial_modulus: initial, max_modulus: max, remodeling_rate: rate }
    }

    #[test]
    fn test_four_step_reference_series() {
        let mut model = RemodelingModel::new(params(4, 1.0, 20.0, 0.05)).unwrap();
        assert_abs_diff_eq!(model.stimulus_curve()[1], 1.0 / 3.0, epsilon = 1e-12);
        let series = model.run().to_vec();
        let expected = [1.0, 1.316_666_666_7, 1.939_444_444_4, 2.842_472_222_2];
        assert_eq!(series.len(), 4);
        for (value, want) in series.iter().zip(expected) {
            assert_abs_diff_eq!(*value, want, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_series_is_monotone_and_bounded() {
        for &rate in &[0.01, 0.05, 0.3, 1.0, 2.5] {
            let mut model = RemodelingModel::new(params(50, 0.5, 20.0, rate)).unwrap();
            let series = model.run();
            assert_eq!(series[0], 0.5);
            for w in series.windows(2) {
                assert!(w[1] >= w[0], "rate {} decreased: {:?}", rate, w);
            }
            assert!(series.iter().all(|&m| (0.5..=20.0).contains(&m)));
        }
    }

    #[test]
    fn test_zero_rate_is_constant() {
        let mut model = RemodelingModel::new(params(10, 3.0, 20.0, 0.0)).unwrap();
        assert!(model.run().iter().all(|&m| m == 3.0));
    }

    #[test]
    fn test_initial_at_max_is_constant() {
        let mut model = RemodelingModel::new(params(10, 20.0, 20.0, 0.1)).unwrap();
        assert!(model.run().iter().all(|&m| m == 20.0));
    }

    #[test]
    fn test_single_step_series() {
        let mut model = RemodelingModel::new(params(1, 1.5, 20.0, 0.1)).unwrap();
        assert_eq!(model.run(), &[1.5]);
        assert!(model.is_complete());
        assert_eq!(model.step(), None);
    }

    #[test]
    fn test_incremental_matches_eager() {
        let mut eager = RemodelingModel::new(params(30, 1.0, 20.0, 0.08)).unwrap();
        let mut incremental = eager.clone();
        let full = eager.run().to_vec();

        let mut stepped = vec![incremental.modulus_series()[0]];
        while let Some(sample) = incremental.step() {
            assert_eq!(sample.step, stepped.len());
            stepped.push(sample.modulus);
        }
        assert_eq!(stepped, full);
        // Already computed entries are left as they are.
        assert_eq!(incremental.advance(5), Some(full[5]));
        assert_eq!(incremental.advance(30), None);
    }

    #[test]
    fn test_advance_fills_gaps() {
        let mut model = RemodelingModel::new(params(10, 1.0, 20.0, 0.05)).unwrap();
        assert!(model.advance(6).is_some());
        assert_eq!(model.modulus_series().len(), 7);
    }

    #[test]
    fn test_custom_stimulus_curve() {
        let curve = vec![0.0, 1.0, 1.0];
        let mut model = RemodelingModel::with_stimulus(params(3, 0.0, 10.0, 0.5), curve).unwrap();
        assert_eq!(model.run(), &[0.0, 5.0, 7.5]);
    }

    #[test]
    fn test_rejects_bad_stimulus_curves() {
        let p = params(3, 1.0, 20.0, 0.1);
        assert!(RemodelingModel::with_stimulus(p.clone(), vec![0.0, 0.5]).is_err());
        assert!(RemodelingModel::with_stimulus(p.clone(), vec![0.0, 0.8, 0.5]).is_err());
        assert!(RemodelingModel::with_stimulus(p, vec![0.0, 0.5, 1.5]).is_err());
    }

    #[test]
    fn test_rejects_invalid_parameters() {
        assert!(matches!(
            RemodelingModel::new(params(10, 5.0, 1.0, 0.1)),
            Err(OsseoError::InvalidParameter { name: "max_modulus", .. })
        ));
        assert!(RemodelingModel::new(params(0, 1.0, 20.0, 0.1)).is_err());
    }
}
