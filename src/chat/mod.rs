//! Chat domain types shared by the relay server and the client.

pub mod chunk;
pub mod message;
pub mod settings;

pub use chunk::StreamChunk;
pub use message::{Feedback, Message, Sender, next_message_id};
pub use settings::{
    AgeGroup, AudioSettings, FinancialGoal, FinancialProfile, PrebuiltVoice, RiskTolerance, Theme,
    UserSettings,
};
