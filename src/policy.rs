use crate::{
    algo::tabular::q_table::QTable,
    game::{Action, State},
};

/// Greedy action for `state` under `table`
///
/// Terminal states, and in-progress states where no action in `actions` fits
/// in the bag, get [`Action::NoAction`]. Otherwise legal actions are scanned in
/// the order given and a later action replaces the current best when its value
/// is greater *or equal*, so with ascending `actions` ties go to the
/// highest-numbered legal action.
pub fn greedy(table: &QTable, state: &State, actions: &[u32]) -> Action {
    if state.is_terminal() {
        return Action::NoAction;
    }

    state
        .legal_actions(actions)
        .map(|a| (a, table.get(state, a)))
        .fold(None, |best, (a, q)| match best {
            Some((_, best_q)) if q < best_q => best,
            _ => Some((a, q)),
        })
        .map_or(Action::NoAction, |(a, _)| a)
}
