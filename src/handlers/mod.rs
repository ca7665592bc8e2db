// src/handlers/mod.rs

//! Screen-level action handlers: the state behind each screen and the
//! rules for when an action may run and when its result may land.

pub mod busy;
pub mod editor;
pub mod exam;
pub mod my_assignments;

pub use busy::{BusyFlag, BusyGuard, Generation, Ticket};
pub use editor::{AssignmentEditor, EditorMode};
pub use exam::ExamSession;
pub use my_assignments::MyAssignments;
