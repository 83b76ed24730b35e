use crate::use_cases::ArenaHandle;

#[derive(Clone)]
pub struct AppState {
    // Channels into the single running arena.
    pub arena: ArenaHandle,
}
