pub mod actions;
pub mod bindings;

pub use actions::{InputKind, KeyInput};
pub use bindings::KeyBindings;
