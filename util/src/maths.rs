//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Map a value from one range into another.
///
/// The target range may be reversed (`target_range.0 > target_range.1`), in which case the
/// mapping is reversed too.
pub fn lin_map<T>(source_range: (T, T), target_range: (T, T), value: T) -> T
where 
    T: Float 
{
    target_range.0 
        + ((value - source_range.0) 
        * (target_range.1 - target_range.0) 
        / (source_range.1 - source_range.0))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_lin_map() {
        assert_eq!(lin_map((0f64, 255f64), (205f64, 410f64), 0f64), 205f64);
        assert_eq!(lin_map((0f64, 255f64), (205f64, 410f64), 255f64), 410f64);
        assert_eq!(lin_map((0f64, 10f64), (0f64, 100f64), 5f64), 50f64);
        assert_eq!(lin_map((0f64, 10f64), (100f64, 0f64), 2f64), 80f64);
    }
}
