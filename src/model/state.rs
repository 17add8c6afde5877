/**
 * The data snapshot of a single cab, the typed events it emits, and the
 * commands it accepts from the (external) session/coordinator layer.
 *
 * `ElevatorState` and `StateChange` are the wire format peers exchange,
 * see the module-level `TypeSignature` tag, mirrored on the teacher's
 * `network.rs`, which already serializes its own `ElevatorData` with
 * `serde_json` for exactly this purpose.
 */

/***************************************/
/*        3rd party libraries          */
/***************************************/
use serde::{Deserialize, Serialize};

/***************************************/
/*           Local modules             */
/***************************************/
use super::direction::Direction;
use super::floor_set::{FloorBounds, FloorSet};

/***************************************/
/*       Public data structures        */
/***************************************/

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeType {
    None,
    KeepAlive,

    InsideButtonPresed,
    ButtonDownPressed,
    ButtonUpPressed,

    Served,
    ServedUp,
    ServedDown,

    OtherChange,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ElevatorState {
    pub id: i32,
    pub timestamp: u128,
    pub last_floor: i32,
    pub direction: Direction,
    pub stopped: bool,
    pub door_open: bool,
    pub inside_buttons: FloorSet,
    pub up_buttons: FloorSet,
    pub down_buttons: FloorSet,
}

impl ElevatorState {
    pub fn new(id: i32, bounds: &dyn FloorBounds) -> ElevatorState {
        ElevatorState {
            id,
            timestamp: 0,
            last_floor: bounds.min_floor(),
            direction: Direction::None,
            stopped: false,
            door_open: false,
            inside_buttons: FloorSet::new(bounds),
            up_buttons: FloorSet::new(bounds),
            down_buttons: FloorSet::new(bounds),
        }
    }

    /// Checked at the top of every tick. Panicking here (rather than
    /// returning `Result`) is deliberate: an invariant violation must
    /// unwind to the restart supervisor, not be handled inline.
    pub fn assert_consistency(&self, bounds: &dyn FloorBounds) {
        assert!(self.id >= 0, "invalid elevator id");
        assert!(
            self.inside_buttons.consistent(bounds),
            "invalid floor set: insideButtons"
        );
        assert!(
            self.up_buttons.consistent(bounds),
            "invalid floor set: upButtons"
        );
        assert!(
            self.down_buttons.consistent(bounds),
            "invalid floor set: downButtons"
        );
        assert!(
            bounds.min_floor() <= self.last_floor && self.last_floor <= bounds.max_floor(),
            "last floor out of bounds"
        );
        assert!(
            matches!(self.direction, Direction::Up | Direction::Down | Direction::None),
            "invalid direction"
        );
    }
}

/// `changeFloor` may be unknown when the cab is between floor sensors.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StateChange {
    pub change_type: ChangeType,
    pub change_floor: Option<i32>,
    pub state: ElevatorState,
}

/// Precedes a `StateChange` payload so the (external) session layer can
/// dispatch mixed message types on one socket. Only `ElevatorState` is
/// defined here; additional variants belong to the session layer, not
/// to this core.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeSignature {
    ElevatorState,
}

/// Sentinel `targetElevatorId` meaning "any cab may act on this command".
pub const ANY_ELEVATOR_ID: i32 = -1;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandType {
    Empty,
    CallToFloorAndGoUp,
    CallToFloorAndGoDown,
    TurnOnLightUp,
    TurnOffLightUp,
    TurnOnLightDown,
    TurnOffLightDown,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command {
    pub target_elevator_id: i32,
    pub command_type: CommandType,
    pub target_floor: i32,
}

impl Command {
    /// Whether this cab (`id`) should act on the command: it is addressed
    /// to `ANY_ELEVATOR_ID` or to `id` specifically.
    pub fn targets(&self, id: i32) -> bool {
        self.target_elevator_id == ANY_ELEVATOR_ID || self.target_elevator_id == id
    }
}

/***************************************/
/*             Unit tests              */
/***************************************/
#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::floor_set::Bounds;

    fn bounds() -> Bounds {
        Bounds {
            min_floor: 0,
            max_floor: 3,
        }
    }

    #[test]
    fn new_state_starts_at_min_floor_with_no_direction() {
        let b = bounds();
        let state = ElevatorState::new(7, &b);
        assert_eq!(state.last_floor, 0);
        assert_eq!(state.direction, Direction::None);
        assert!(!state.stopped);
        assert!(!state.door_open);
    }

    #[test]
    fn command_targets_any_or_matching_id() {
        let any = Command {
            target_elevator_id: ANY_ELEVATOR_ID,
            command_type: CommandType::Empty,
            target_floor: 0,
        };
        let mine = Command {
            target_elevator_id: 3,
            ..any
        };
        let other = Command {
            target_elevator_id: 4,
            ..any
        };

        assert!(any.targets(3));
        assert!(mine.targets(3));
        assert!(!other.targets(3));
    }

    #[test]
    fn state_change_round_trips_through_json() {
        let b = bounds();
        let mut state = ElevatorState::new(1, &b);
        state.up_buttons.set(true, 2, &b);
        let change = StateChange {
            change_type: ChangeType::Served,
            change_floor: Some(2),
            state,
        };

        let encoded = serde_json::to_string(&change).expect("serialize");
        let decoded: StateChange = serde_json::from_str(&encoded).expect("deserialize");
        assert_eq!(decoded, change);
    }

    #[test]
    fn state_change_round_trips_unknown_floor() {
        let b = bounds();
        let change = StateChange {
            change_type: ChangeType::OtherChange,
            change_floor: None,
            state: ElevatorState::new(1, &b),
        };

        let encoded = serde_json::to_string(&change).expect("serialize");
        let decoded: StateChange = serde_json::from_str(&encoded).expect("deserialize");
        assert_eq!(decoded, change);
    }
}
