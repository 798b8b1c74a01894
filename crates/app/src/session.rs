use serde::Serialize;

/// In-memory view of the active model: its stored total and the tally of
/// the most recent pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionState {
    pub current_model: String,
    pub total: u64,
    pub last_turn: u64,
}

impl SessionState {
    pub fn new(model: &str) -> Self {
        Self {
            current_model: model.to_string(),
            total: 0,
            last_turn: 0,
        }
    }

    pub fn switch_to(&mut self, model: &str, total: u64) {
        self.current_model = model.to_string();
        self.total = total;
        self.last_turn = 0;
    }
}
