//! Region selection and the history of extracted regions.

mod history;
mod machine;

pub use history::{Selection, SelectionHistory, SelectionId};
pub use machine::{
    RegionRequest, SelectionError, SelectionState, SelectionStateMachine, MIN_SELECTION_SIDE,
};
