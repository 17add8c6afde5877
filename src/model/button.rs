/***************************************/
/*        3rd party libraries          */
/***************************************/
use serde::{Deserialize, Serialize};

/***************************************/
/*           Local modules             */
/***************************************/
use super::floor_set::FloorBounds;

/***************************************/
/*       Public data structures        */
/***************************************/

/// `CallUp`/`CallDown` are hall buttons (one landing, outside the cab);
/// `TargetFloor` is an in-cab button.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ButtonType {
    CallUp,
    CallDown,
    TargetFloor,
}

/// A physical button. `CallUp` never exists at the top floor and
/// `CallDown` never exists at the bottom floor; `TargetFloor` exists at
/// every floor.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Button {
    pub button_type: ButtonType,
    pub floor: i32,
}

impl Button {
    pub fn new(button_type: ButtonType, floor: i32) -> Button {
        Button { button_type, floor }
    }
}

/// Enumerates every button that physically exists on a cab with the
/// given floor bounds: a `TargetFloor` at every floor, a `CallUp` at
/// every floor but the top, a `CallDown` at every floor but the bottom.
pub fn floor_buttons(bounds: &dyn FloorBounds) -> Vec<Button> {
    let mut buttons = Vec::new();
    for floor in bounds.min_floor()..=bounds.max_floor() {
        buttons.push(Button::new(ButtonType::TargetFloor, floor));
        if floor < bounds.max_floor() {
            buttons.push(Button::new(ButtonType::CallUp, floor));
        }
        if floor > bounds.min_floor() {
            buttons.push(Button::new(ButtonType::CallDown, floor));
        }
    }
    buttons
}
