pub mod state;

pub use state::{MuteCommand, MuteEngine, MuteInputs, MuteState};
