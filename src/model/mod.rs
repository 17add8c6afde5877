/***************************************/
/*            Public API               */
/***************************************/
pub mod button;
pub mod direction;
pub mod floor_set;
pub mod state;

pub use button::{Button, ButtonType};
pub use direction::Direction;
pub use floor_set::{FloorBounds, FloorSet};
pub use state::{ChangeType, Command, CommandType, ElevatorState, StateChange, TypeSignature, ANY_ELEVATOR_ID};
