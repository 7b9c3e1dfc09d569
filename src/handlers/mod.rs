pub mod events;
pub mod simulate;
pub mod status;

use serde::Serialize;

/// Acknowledgement for recording endpoints. Recording is best-effort
/// and infallible, so there is nothing else to say.
#[derive(Debug, Clone, Serialize)]
pub struct Ack {
    pub recorded: bool,
}

impl Ack {
    pub fn recorded() -> Self {
        Self { recorded: true }
    }
}
