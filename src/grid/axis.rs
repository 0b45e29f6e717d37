use crate::display;
use crate::errors::{PricingError, PricingResult};

/// Ordered sample points along one heatmap axis.
///
/// Values are finite and non-decreasing; the axis is never empty.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(transparent)]
pub struct SampleAxis {
    values: Vec<f64>,
}

impl SampleAxis {
    pub fn new(values: Vec<f64>) -> PricingResult<Self> {
        if values.is_empty() {
            return Err(PricingError::Axis("axis has no samples".into()));
        }
        if let Some(i) = values.iter().position(|v| !v.is_finite()) {
            return Err(PricingError::Axis(format!("sample {i} is not finite")));
        }
        if let Some(i) = values.windows(2).position(|w| w[1] < w[0]) {
            return Err(PricingError::Axis(format!(
                "samples out of order at index {}: {} < {}",
                i + 1,
                values[i + 1],
                values[i]
            )));
        }
        Ok(Self { values })
    }

    /// `count` evenly spaced samples from `min` to `max`, both ends included.
    pub fn linspace(min: f64, max: f64, count: usize) -> PricingResult<Self> {
        if count == 0 {
            return Err(PricingError::Axis("sample count must be at least 1".into()));
        }
        if !min.is_finite() || !max.is_finite() {
            return Err(PricingError::Axis(format!("non-finite bounds [{min}, {max}]")));
        }
        if min > max {
            return Err(PricingError::Axis(format!("min {min} exceeds max {max}")));
        }
        if count == 1 {
            return Self::new(vec![min]);
        }

        let step = (max - min) / (count - 1) as f64;
        let mut values: Vec<f64> = (0..count).map(|i| min + step * i as f64).collect();
        // Pin the endpoint so accumulated rounding never overshoots max
        values[count - 1] = max;
        Self::new(values)
    }

    #[inline]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[inline]
    pub fn first(&self) -> f64 {
        self.values[0]
    }

    /// Display labels rounded to two decimals. The samples themselves are untouched.
    pub fn labels(&self) -> Vec<String> {
        self.values.iter().map(|&v| display::label(v)).collect()
    }
}
