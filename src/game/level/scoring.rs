/// Highest score band, awarded only for full coverage.
pub const MAX_SCORE: u8 = 4;

/// Five-tier score for a drill's `touched / total` ratio.
///
/// | ratio          | score |
/// |----------------|-------|
/// | 0              | 0     |
/// | (0, 0.5]       | 1     |
/// | (0.5, 0.8]     | 2     |
/// | (0.8, 1.0)     | 3     |
/// | 1.0            | 4     |
pub fn score_for_ratio(ratio: f32) -> u8 {
    if ratio <= 0.0 {
        0
    } else if ratio <= 0.5 {
        1
    } else if ratio <= 0.8 {
        2
    } else if ratio < 1.0 {
        3
    } else {
        MAX_SCORE
    }
}
