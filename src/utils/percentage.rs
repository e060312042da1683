use std::{fmt::Display, ops::Deref};

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct Percentage(f64);

impl Display for Percentage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match f.precision() {
            Some(precision) => write!(f, "{:.*}%", precision, self.0),
            None => write!(f, "{}%", self.0),
        }
    }
}

impl Deref for Percentage {
    type Target = f64;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Share of `whole` that `value` represents. A zero `whole` counts as no progress.
pub fn ratio_percentage(value: u64, whole: u64) -> Percentage {
    if whole == 0 {
        return Percentage(0.);
    }
    Percentage(value as f64 / whole as f64 * 100.)
}

#[cfg(test)]
mod tests {
    use super::{ratio_percentage, Percentage};

    #[test]
    fn test_ratio_percentage() {
        assert_eq!(*ratio_percentage(9000, 18000), 50.);
        assert_eq!(*ratio_percentage(0, 18000), 0.);
        assert_eq!(*ratio_percentage(5, 0), 0.);
    }

    #[test]
    fn test_display_precision() {
        let value = Percentage(12.3456);
        assert_eq!(format!("{value:.1}"), "12.3%");
        assert_eq!(format!("{value}"), "12.3456%");
    }
}
