//! Chat platform adapters.

mod in_memory;

pub use in_memory::{InMemoryChatPlatform, PlatformOp, PostedMessage};
