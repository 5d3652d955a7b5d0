/// Per-connector turn state.
///
/// ```text
/// Idle → InFlight → Idle
/// ```
///
/// A turn may only start from `Idle`; completion or error returns to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TurnState {
    #[default]
    Idle,
    InFlight,
}

impl TurnState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::InFlight)
    }
}
