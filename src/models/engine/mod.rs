pub mod hit_window;
pub mod hold;
pub mod note;

pub use hit_window::HitWindow;
pub use hold::HoldNoteLogic;
pub use note::{BreakReason, GameplayNote, HoldState, NoteId, NoteState, TapState};
