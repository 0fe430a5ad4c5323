//! Conversion of ranks into points.
//!
//! Every point value stored in the ledger comes from [`points_for_priority`].
//! Points sent by a client are never trusted.

/// The number of ranked choices a voter makes in each class.
pub const SELECTIONS_PER_CLASS: usize = 3;

/// The valid priorities, best first.
pub const PRIORITIES: [u8; SELECTIONS_PER_CLASS] = [1, 2, 3];

/// Points awarded to a candidate ranked at `priority`.
///
/// A priority outside 1..=3 is worth nothing. Such a priority never makes it
/// into a ballot: the ballot checks reject it before scoring.
///
/// ```
/// use party_voting::scoring::points_for_priority;
///
/// assert_eq!(points_for_priority(1), 5);
/// assert_eq!(points_for_priority(4), 0);
/// ```
pub fn points_for_priority(priority: i64) -> u32 {
    match priority {
        1 => 5,
        2 => 3,
        3 => 1,
        _ => 0,
    }
}
