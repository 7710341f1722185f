pub mod convolve;
pub mod dist;
pub mod stats;

pub use convolve::Convolver;

/// Smallest seat count that constitutes a majority of `total` when ties
/// break toward the counted side (e.g. 269 EVs plus the tiebreaker).
pub fn tiebreaker_majority(total: i32) -> i32 {
    total / 2 + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tiebreaker_majority() {
        assert_eq!(tiebreaker_majority(538), 270);
        assert_eq!(tiebreaker_majority(100), 51);
        assert_eq!(tiebreaker_majority(435), 218);
        assert_eq!(tiebreaker_majority(20), 11);
    }
}
