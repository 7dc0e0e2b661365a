use std::fmt;

/// Where a session is in its listen / think / speak cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TurnState {
    /// No recognition running, no response in flight
    #[default]
    Idle,
    /// Exactly one recognition stream active; audio is accepted
    Listening,
    /// Recognition torn down, response pipeline running; audio is ignored
    Responding,
}

impl TurnState {
    pub fn accepts_audio(self) -> bool {
        self == TurnState::Listening
    }
}

impl fmt::Display for TurnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TurnState::Idle => "idle",
            TurnState::Listening => "listening",
            TurnState::Responding => "responding",
        };
        f.write_str(name)
    }
}
