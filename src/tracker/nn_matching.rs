//! Appearance descriptors and nearest-neighbour cosine distance.

use std::collections::VecDeque;

use ndarray::Array1;

/// L2-normalise a descriptor. Zero or non-finite vectors come back unchanged.
pub fn normalize(feature: &Array1<f32>) -> Array1<f32> {
    let norm = feature.dot(feature).sqrt();
    if norm > 0.0 && norm.is_finite() {
        feature / norm
    } else {
        feature.clone()
    }
}

/// Cosine distance `1 - cos(a, b)`, in `[0, 2]`.
///
/// Mismatched lengths or zero vectors are maximally distant.
pub fn cosine_distance(a: &Array1<f32>, b: &Array1<f32>) -> f32 {
    if a.len() != b.len() {
        return 2.0;
    }
    let denom = a.dot(a).sqrt() * b.dot(b).sqrt();
    if denom <= 0.0 || !denom.is_finite() {
        return 2.0;
    }
    (1.0 - a.dot(b) / denom).clamp(0.0, 2.0)
}

/// Bounded history of the appearance descriptors observed for one track.
///
/// The distance to a query is the smallest cosine distance over the stored
/// samples, so the track is re-identified by its closest past appearance.
#[derive(Debug, Clone, Default)]
pub struct FeatureGallery {
    samples: VecDeque<Array1<f32>>,
    budget: Option<usize>,
}

impl FeatureGallery {
    /// `budget` caps the number of stored samples; `None` keeps everything.
    pub fn new(budget: Option<usize>) -> Self {
        Self {
            samples: VecDeque::new(),
            budget,
        }
    }

    pub fn push(&mut self, feature: &Array1<f32>) {
        self.samples.push_back(normalize(feature));
        if let Some(budget) = self.budget {
            while self.samples.len() > budget.max(1) {
                self.samples.pop_front();
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Most recently stored descriptor.
    pub fn latest(&self) -> Option<&Array1<f32>> {
        self.samples.back()
    }

    /// Nearest-neighbour cosine distance to `query`; `None` when the gallery is empty.
    pub fn distance(&self, query: &Array1<f32>) -> Option<f32> {
        self.samples
            .iter()
            .map(|sample| cosine_distance(sample, query))
            .min_by(|a, b| a.total_cmp(b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_cosine_distance() {
        let a = array![1.0_f32, 0.0];
        let b = array![0.0_f32, 1.0];
        assert_abs_diff_eq!(cosine_distance(&a, &a), 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(cosine_distance(&a, &b), 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(cosine_distance(&a, &-a.clone()), 2.0, epsilon = 1e-6);
    }

    #[test]
    fn test_cosine_distance_degenerate_inputs() {
        let a = array![1.0_f32, 0.0];
        assert_eq!(cosine_distance(&a, &array![0.0_f32, 0.0]), 2.0);
        assert_eq!(cosine_distance(&a, &array![1.0_f32, 0.0, 0.0]), 2.0);
    }

    #[test]
    fn test_gallery_budget_and_nearest_neighbour() {
        let mut gallery = FeatureGallery::new(Some(2));
        assert!(gallery.distance(&array![1.0_f32, 0.0]).is_none());

        gallery.push(&array![1.0_f32, 0.0]);
        gallery.push(&array![0.0_f32, 2.0]);
        gallery.push(&array![0.0_f32, 1.0]);
        assert_eq!(gallery.len(), 2);

        // The oldest sample ([1, 0]) was evicted.
        let d = gallery.distance(&array![1.0_f32, 0.0]).unwrap();
        assert_abs_diff_eq!(d, 1.0, epsilon = 1e-6);
        let latest = gallery.latest().unwrap();
        assert_abs_diff_eq!(latest[1], 1.0, epsilon = 1e-6);
    }
}
