/**
 * The narrow I/O capability set the control engine consumes, and the one
 * concrete adapter that speaks to real hardware via `driver-rust`.
 *
 * Everything hardware-specific, socket connections, bit layouts, polarity,
 * lives behind the `Driver` trait so `engine.rs` never imports
 * `driver_rust` directly. This mirrors the teacher's own separation (its
 * `ElevatorDriver` in `elevator/hardware.rs` is the only module that touches
 * `driver_rust::elevio`), just collapsed from a channel-forwarding thread
 * into a trait the engine calls synchronously, per the control loop's
 * tick-driven design.
 */

/***************************************/
/*        3rd party libraries          */
/***************************************/
use driver_rust::elevio::elev::{self as elevio, CAB, HALL_DOWN, HALL_UP};
use log::error;

/***************************************/
/*           Local modules             */
/***************************************/
use crate::model::{Button, ButtonType, Direction, FloorBounds};

/***************************************/
/*             Public API              */
/***************************************/

/// Capability set the control engine consumes. `&mut self` throughout:
/// the driver is owned exclusively by the control thread (see the
/// concurrency model), so there is never a reason for interior mutability
/// here.
pub trait Driver: FloorBounds {
    fn set_motor_speed(&mut self, direction: Direction, speed: u32);
    fn stop_elevator(&mut self);
    fn set_button_lamp(&mut self, button: Button, on: bool);
    fn set_stop_lamp(&mut self, on: bool);
    fn set_door_open_lamp(&mut self, on: bool);
    fn set_floor_indicator(&mut self, floor: i32);
    /// Put the hardware into a safe state in response to an obstruction.
    /// Unlike the reference implementation (which re-homes the cab to the
    /// bottom floor), this just stops the motor: re-homing unattended
    /// while an obstruction persists is not safe, and the watchdog is
    /// about to kill this process regardless (see DESIGN.md).
    fn shutdown(&mut self);

    /// `None` means "between floor sensors", never a real floor number.
    fn get_floor(&mut self) -> Option<i32>;
    fn get_button_signal(&mut self, button: Button) -> bool;
    fn get_button_lamp(&mut self, button: Button) -> bool;
    fn get_stop(&mut self) -> bool;
    fn get_obstruction(&mut self) -> bool;
    fn get_stop_lamp(&mut self) -> bool;
}

fn call_constant(button_type: ButtonType) -> u8 {
    match button_type {
        ButtonType::CallUp => HALL_UP,
        ButtonType::CallDown => HALL_DOWN,
        ButtonType::TargetFloor => CAB,
    }
}

fn motor_direction_constant(direction: Direction) -> u8 {
    match direction {
        Direction::Up => elevio::DIRN_UP,
        Direction::Down => elevio::DIRN_DOWN,
        Direction::None => elevio::DIRN_STOP,
    }
}

/// Local shadow of every lamp this adapter has set. The `driver-rust` wire
/// protocol exposes only lamp *writes*, no read-back command, so
/// `get_button_lamp`/`get_stop_lamp` are served from here instead of from
/// hardware (see SPEC_FULL.md §4.6).
#[derive(Debug, Default)]
struct LampShadow {
    button_lamps: std::collections::HashMap<Button, bool>,
    stop_lamp: bool,
}

pub struct HardwareDriver {
    elevator: driver_rust::elevio::elev::Elevator,
    min_floor: i32,
    max_floor: i32,
    lamps: LampShadow,
}

impl HardwareDriver {
    pub fn connect(address: &str, n_floors: u8) -> std::io::Result<HardwareDriver> {
        let elevator = driver_rust::elevio::elev::Elevator::init(address, n_floors).map_err(|e| {
            error!("failed to connect to elevator hardware at {}: {}", address, e);
            e
        })?;
        Ok(HardwareDriver {
            elevator,
            min_floor: 0,
            max_floor: n_floors as i32 - 1,
            lamps: LampShadow::default(),
        })
    }
}

impl FloorBounds for HardwareDriver {
    fn min_floor(&self) -> i32 {
        self.min_floor
    }
    fn max_floor(&self) -> i32 {
        self.max_floor
    }
}

impl Driver for HardwareDriver {
    fn set_motor_speed(&mut self, direction: Direction, speed: u32) {
        if direction == Direction::None {
            self.elevator.motor_direction(elevio::DIRN_STOP);
        } else {
            self.elevator.motor_direction(motor_direction_constant(direction));
            let _ = speed; // driver-rust drives a fixed analog level per direction bit
        }
    }

    fn stop_elevator(&mut self) {
        self.elevator.motor_direction(elevio::DIRN_STOP);
    }

    fn set_button_lamp(&mut self, button: Button, on: bool) {
        self.elevator
            .call_button_light(button.floor as u8, call_constant(button.button_type), on);
        self.lamps.button_lamps.insert(button, on);
    }

    fn set_stop_lamp(&mut self, on: bool) {
        self.elevator.stop_button_light(on);
        self.lamps.stop_lamp = on;
    }

    fn set_door_open_lamp(&mut self, on: bool) {
        self.elevator.door_light(on);
    }

    fn set_floor_indicator(&mut self, floor: i32) {
        self.elevator.floor_indicator(floor as u8);
    }

    fn shutdown(&mut self) {
        self.stop_elevator();
    }

    fn get_floor(&mut self) -> Option<i32> {
        self.elevator.floor_sensor().map(|f| f as i32)
    }

    fn get_button_signal(&mut self, button: Button) -> bool {
        self.elevator
            .call_button(button.floor as u8, call_constant(button.button_type))
    }

    fn get_button_lamp(&mut self, button: Button) -> bool {
        *self.lamps.button_lamps.get(&button).unwrap_or(&false)
    }

    fn get_stop(&mut self) -> bool {
        self.elevator.stop_button()
    }

    fn get_obstruction(&mut self) -> bool {
        self.elevator.obstruction()
    }

    fn get_stop_lamp(&mut self) -> bool {
        self.lamps.stop_lamp
    }
}

/***************************************/
/*             Test API                */
/***************************************/
#[cfg(test)]
pub mod mock {
    use super::*;
    use crate::model::floor_set::Bounds;
    use std::collections::HashMap;

    /// In-memory stand-in for hardware, used by the control engine's own
    /// unit tests. Button signals, the floor sensor, the stop switch, and
    /// the obstruction switch are all driven directly by the test.
    pub struct MockDriver {
        pub bounds: Bounds,
        pub floor: Option<i32>,
        pub direction: Direction,
        pub speed: u32,
        pub door_open: bool,
        pub stopped: bool,
        pub obstructed: bool,
        pub stop_pressed: bool,
        pub floor_indicator: Option<i32>,
        pub shutdown_called: u32,
        button_signals: HashMap<Button, bool>,
        button_lamps: HashMap<Button, bool>,
        stop_lamp: bool,
    }

    impl MockDriver {
        pub fn new(min_floor: i32, max_floor: i32) -> MockDriver {
            MockDriver {
                bounds: Bounds { min_floor, max_floor },
                floor: Some(min_floor),
                direction: Direction::None,
                speed: 0,
                door_open: false,
                stopped: false,
                obstructed: false,
                stop_pressed: false,
                floor_indicator: None,
                shutdown_called: 0,
                button_signals: HashMap::new(),
                button_lamps: HashMap::new(),
                stop_lamp: false,
            }
        }

        pub fn press(&mut self, button: Button) {
            self.button_signals.insert(button, true);
        }

        pub fn release(&mut self, button: Button) {
            self.button_signals.insert(button, false);
        }

        pub fn lamp_is_lit(&self, button: Button) -> bool {
            *self.button_lamps.get(&button).unwrap_or(&false)
        }

        pub fn light_lamp_for_restart_recovery(&mut self, button: Button) {
            self.button_lamps.insert(button, true);
        }
    }

    impl FloorBounds for MockDriver {
        fn min_floor(&self) -> i32 {
            self.bounds.min_floor
        }
        fn max_floor(&self) -> i32 {
            self.bounds.max_floor
        }
    }

    impl Driver for MockDriver {
        fn set_motor_speed(&mut self, direction: Direction, speed: u32) {
            self.direction = direction;
            self.speed = speed;
        }

        fn stop_elevator(&mut self) {
            self.direction = Direction::None;
            self.speed = 0;
        }

        fn set_button_lamp(&mut self, button: Button, on: bool) {
            self.button_lamps.insert(button, on);
        }

        fn set_stop_lamp(&mut self, on: bool) {
            self.stop_lamp = on;
        }

        fn set_door_open_lamp(&mut self, on: bool) {
            self.door_open = on;
        }

        fn set_floor_indicator(&mut self, floor: i32) {
            self.floor_indicator = Some(floor);
        }

        fn shutdown(&mut self) {
            self.shutdown_called += 1;
            self.stop_elevator();
        }

        fn get_floor(&mut self) -> Option<i32> {
            self.floor
        }

        fn get_button_signal(&mut self, button: Button) -> bool {
            *self.button_signals.get(&button).unwrap_or(&false)
        }

        fn get_button_lamp(&mut self, button: Button) -> bool {
            self.lamp_is_lit(button)
        }

        fn get_stop(&mut self) -> bool {
            self.stop_pressed
        }

        fn get_obstruction(&mut self) -> bool {
            self.obstructed
        }

        fn get_stop_lamp(&mut self) -> bool {
            self.stop_lamp
        }
    }
}
