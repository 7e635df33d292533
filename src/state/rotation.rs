//! Describer rotation over the roster, in join order.

/// Return the first roster member who has not described yet this round.
///
/// `None` means every player has had a turn and the round can be closed.
pub fn next_describer<'a>(roster: &[&'a str], already_described: &[String]) -> Option<&'a str> {
    roster
        .iter()
        .copied()
        .find(|candidate| !already_described.iter().any(|done| done == candidate))
}

/// Pick the player opening a round.
///
/// Every round is anchored on the first player to have joined, whatever the
/// round number.
pub fn first_describer_for_round<'a>(roster: &[&'a str], _round: u32) -> Option<&'a str> {
    roster.first().copied()
}
