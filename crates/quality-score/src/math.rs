//! Derived-metric helpers shared by the category scorers.
//!
//! Missing data is `None` everywhere; these functions never substitute a
//! default value and never divide by zero.

/// Convert a fractional ratio (0.42) to a percentage (42.0)
pub fn percentage(fraction: Option<f64>) -> Option<f64> {
    fraction.map(|f| f * 100.0)
}

/// Year-over-year growth in percent: `(current - previous) / |previous| * 100`.
///
/// Dividing by the absolute prior value keeps the sign of the growth
/// meaningful when the prior period was a loss. Returns None when either
/// operand is missing or the prior period is zero.
pub fn year_over_year_growth(current: Option<f64>, previous: Option<f64>) -> Option<f64> {
    match (current, previous) {
        (Some(c), Some(p)) if p != 0.0 => Some((c - p) / p.abs() * 100.0),
        _ => None,
    }
}

/// Mean of the present values, or None when none are present
pub fn average(values: &[Option<f64>]) -> Option<f64> {
    let present: Vec<f64> = values.iter().filter_map(|v| *v).collect();
    if present.is_empty() {
        None
    } else {
        Some(present.iter().sum::<f64>() / present.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage() {
        assert_eq!(percentage(Some(0.42)), Some(42.0));
        assert_eq!(percentage(None), None);
    }

    #[test]
    fn test_growth_basic() {
        assert_eq!(year_over_year_growth(Some(110.0), Some(100.0)), Some(10.0));
        assert_eq!(year_over_year_growth(Some(90.0), Some(100.0)), Some(-10.0));
    }

    #[test]
    fn test_growth_sign_with_prior_loss() {
        // Loss shrinking from -100 to -50 is improvement: +50%
        assert_eq!(year_over_year_growth(Some(-50.0), Some(-100.0)), Some(50.0));
    }

    #[test]
    fn test_growth_guards() {
        assert_eq!(year_over_year_growth(Some(10.0), Some(0.0)), None);
        assert_eq!(year_over_year_growth(Some(10.0), None), None);
        assert_eq!(year_over_year_growth(None, Some(10.0)), None);
    }

    #[test]
    fn test_average() {
        assert_eq!(average(&[]), None);
        assert_eq!(average(&[None, None]), None);
        assert_eq!(average(&[Some(2.0), Some(4.0), None]), Some(3.0));
    }
}
