//! Distance-based scoring of a guess against the hidden target.

/// Points awarded for a perfect read of the target.
pub const MAX_SCORE: u8 = 4;

/// Score a guess by its distance to the target.
///
/// Only the absolute distance matters: 0 scores 4, 1 scores 3, 2 scores 2,
/// 3 scores 1 and anything further scores nothing.
pub fn score(guess: i32, target: i32) -> u8 {
    match guess.abs_diff(target) {
        0 => MAX_SCORE,
        1 => 3,
        2 => 2,
        3 => 1,
        _ => 0,
    }
}
