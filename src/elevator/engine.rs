/**
 * The control loop itself: one `ControlEngine` per cab, running on its own
 * OS thread, ticking forever until told to stop.
 *
 * The structure mirrors the teacher's `fsm.rs` tick-by-tick approach, but
 * the logic inside each tick is ground in the reference elevator's
 * `_loop()` one step at a time (see SPEC_FULL.md §4.3) rather than the
 * teacher's own scheduling rules.
 */

/***************************************/
/*        3rd party libraries          */
/***************************************/
use crossbeam_channel::{Receiver, Sender};
use log::warn;
use scopeguard::guard;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/***************************************/
/*           Local modules             */
/***************************************/
use super::driver::Driver;
use super::heartbeat::Heartbeat;
use crate::model::{
    button::floor_buttons, Button, ButtonType, ChangeType, Command, CommandType, Direction,
    ElevatorState, FloorBounds, FloorSet, StateChange,
};
use crate::restart;
use crate::util::now_millis;

/***************************************/
/*       Public data structures        */
/***************************************/

/// Tuning knobs the reference implementation hard-codes as member
/// constants (`_waitThreshold`, `_keepAlive`, `_speed`); see
/// SPEC_FULL.md §4.7 for why these now live in configuration instead.
#[derive(Debug, Clone, Copy)]
pub struct EngineParams {
    pub tick_interval: Duration,
    pub wait_threshold: Duration,
    pub keep_alive: Duration,
    pub speed: u32,
}

/// Loop-local run state, not part of `ElevatorState`: it describes what
/// the control loop is doing right now, not a fact about the cab that
/// survives a restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    Normal,
    WaitingForInButton,
    Stopped,
}

/// Everything about a control cycle that must NOT survive a restart:
/// re-created fresh at the top of `run_until_terminated` every time the
/// restart supervisor re-enters it.
struct Cycle {
    in_floor_buttons: FloorSet,
    in_floor_buttons_last: FloorSet,
    stop_last: bool,
    prev_floor: Option<i32>,
    door_waiting_started: u128,
    run_state: RunState,
}

impl Cycle {
    fn new<B: FloorBounds>(bounds: &B) -> Cycle {
        Cycle {
            in_floor_buttons: FloorSet::new(bounds),
            in_floor_buttons_last: FloorSet::new(bounds),
            stop_last: false,
            prev_floor: None,
            door_waiting_started: 0,
            run_state: RunState::Normal,
        }
    }
}

/// One cab's control loop. Owns the hardware adapter exclusively; the
/// only way in or out is the command/state-change channel pair.
pub struct ControlEngine<D: Driver, H: Heartbeat> {
    driver: D,
    heartbeat: H,
    in_commands: Receiver<Command>,
    out_state: Sender<StateChange>,
    params: EngineParams,

    floor_buttons: Vec<Button>,
    state: ElevatorState,
    previous_direction: Direction,
    last_state_update: u128,
}

/// Returned by `ControlEngine::start`; the only way to ask the control
/// thread to stop. Rust's ownership rules don't let the engine keep a
/// handle to its own thread the way the original C++ object does (the
/// thread closure takes the engine by value), so termination instead
/// goes through a flag shared before the move.
pub struct ControlHandle {
    terminate: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl ControlHandle {
    /// Signals the control thread to stop at the top of its next tick
    /// and blocks until it has actually exited.
    pub fn terminate(mut self) {
        self.terminate.store(true, Ordering::Relaxed);
        if let Some(t) = self.thread.take() {
            let _ = t.join();
        }
    }
}

impl Drop for ControlHandle {
    fn drop(&mut self) {
        if let Some(t) = self.thread.take() {
            self.terminate.store(true, Ordering::Relaxed);
            let _ = t.join();
        }
    }
}

/***************************************/
/*             Public API              */
/***************************************/
impl<D: Driver + Send + 'static, H: Heartbeat + 'static> ControlEngine<D, H> {
    pub fn new(
        id: i32,
        driver: D,
        heartbeat: H,
        in_commands: Receiver<Command>,
        out_state: Sender<StateChange>,
        params: EngineParams,
    ) -> ControlEngine<D, H> {
        let mut state = ElevatorState::new(id, &driver);
        state.last_floor = driver.min_floor();
        let floor_buttons = floor_buttons(&driver);
        ControlEngine {
            driver,
            heartbeat,
            in_commands,
            out_state,
            params,
            floor_buttons,
            state,
            previous_direction: Direction::None,
            last_state_update: 0,
        }
    }

    /// Consumes the engine and hands its thread off to a
    /// restart-supervised loop: a panic anywhere in `tick()` unwinds
    /// back to the supervisor, which logs it and re-enters the loop
    /// rather than letting the thread die (see SPEC_FULL.md §4.7).
    pub fn start(mut self) -> ControlHandle {
        let terminate = Arc::new(AtomicBool::new(false));
        let terminate_flag = terminate.clone();

        let thread = thread::Builder::new()
            .name(format!("elevator-{}", self.state.id))
            .spawn(move || {
                restart::supervise(|| self.run_until_terminated(&terminate_flag));
            })
            .expect("failed to spawn control thread");

        ControlHandle {
            terminate,
            thread: Some(thread),
        }
    }

    /***************************************/
    /*           Loop body                 */
    /***************************************/

    /// One full pass of the control loop, from `initialize_elevator`
    /// through to the first observed termination request. Re-entered by
    /// the restart supervisor after a panic, which is why every variable
    /// the original keeps as a loop-local lives in `Cycle` and is
    /// constructed fresh here rather than stored on `self`: only
    /// `self.state` (the cab's actual floor/button/direction state) is
    /// meant to survive a restart.
    fn run_until_terminated(&mut self, terminate: &AtomicBool) {
        let mut this = guard(self, |engine| engine.driver.stop_elevator());

        let mut cycle = Cycle::new(&this.driver);
        this.initialize_elevator();
        cycle.run_state = if this.driver.get_stop_lamp() {
            RunState::Stopped
        } else {
            RunState::Normal
        };

        while !terminate.load(Ordering::Relaxed) {
            this.tick(&mut cycle, terminate);
            thread::sleep(this.params.tick_interval);
        }
    }

    /// The eleven steps of a single control cycle (see SPEC_FULL.md
    /// §4.3): button/lamp scan, stop button edge, obstruction handling,
    /// command intake, floor-sensor safety checks, state-machine update,
    /// keep-alive, and heartbeat. Split out from `run_until_terminated`
    /// so it can be driven directly, tick by tick, from tests.
    fn tick(&mut self, cycle: &mut Cycle, terminate: &AtomicBool) {
        cycle.in_floor_buttons_last = cycle.in_floor_buttons.clone();
        cycle.in_floor_buttons.reset();
        self.state.assert_consistency(&self.driver);

        for i in 0..self.floor_buttons.len() {
            let button = self.floor_buttons[i];
            if self.driver.get_button_signal(button) {
                if !self.driver.get_button_lamp(button) {
                    self.set_button_lamp_and_flag(button, true);
                    if button.button_type == ButtonType::TargetFloor {
                        self.add_target_floor(button.floor);
                    }
                    self.emit_state_change(change_type_by_button(button.button_type), Some(button.floor));
                }
                if button.button_type == ButtonType::TargetFloor {
                    let bounds_copy = Bounds::from(&self.driver);
                    cycle.in_floor_buttons.set(true, button.floor, &bounds_copy);
                }
            }
        }

        let stop_now = self.driver.get_stop();
        if stop_now && stop_now != cycle.stop_last {
            let was_lit = self.driver.get_stop_lamp();
            self.state.stopped = !was_lit;
            self.driver.set_stop_lamp(self.state.stopped);

            if self.state.stopped {
                self.stop_elevator();
                cycle.run_state = RunState::Stopped;
                let floor = self.update_and_get_floor();
                self.emit_state_change(ChangeType::OtherChange, floor);
            } else {
                let previous = self.previous_direction;
                self.start_elevator(previous);
                cycle.run_state = RunState::Normal;
                let floor = self.update_and_get_floor();
                self.emit_state_change(ChangeType::OtherChange, floor);
            }
        }
        cycle.stop_last = stop_now;

        if self.driver.get_obstruction() {
            self.driver.shutdown();
            while self.driver.get_obstruction() && !terminate.load(Ordering::Relaxed) {
                // an obstruction that never clears is a hang by design:
                // the watchdog's missed heartbeat is what ends this.
            }
        }

        if let Ok(command) = self.in_commands.try_recv() {
            self.apply_command(command);
        }

        let current_floor = self.update_and_get_floor();
        if current_floor == Some(self.driver.max_floor()) && self.state.direction == Direction::Up {
            self.stop_elevator();
        }
        if current_floor == Some(self.driver.min_floor()) && self.state.direction == Direction::Down {
            self.stop_elevator();
        }

        if let Some(floor) = current_floor {
            self.driver.set_floor_indicator(floor);
        }

        if current_floor != cycle.prev_floor {
            self.emit_state_change(ChangeType::OtherChange, current_floor);
        }

        match cycle.run_state {
            RunState::Normal => {
                if current_floor.is_some() && self.should_stop(current_floor.unwrap()) {
                    let floor = current_floor.unwrap();
                    self.set_button_lamp_and_flag(Button::new(ButtonType::TargetFloor, floor), false);
                    self.driver.set_door_open_lamp(true);
                    cycle.run_state = RunState::WaitingForInButton;
                    cycle.door_waiting_started = now_millis();
                    self.stop_elevator();
                    self.remove_target_floor(floor);
                    self.emit_state_change(ChangeType::Served, Some(floor));
                } else if self.state.direction == Direction::None {
                    if self.all_buttons().has_any() {
                        let previous = self.previous_direction;
                        if self.priority_floors_in_direction(previous) {
                            self.start_elevator(previous);
                        } else {
                            let direction = self.optimal_direction();
                            self.start_elevator(direction);
                        }
                        self.emit_state_change(ChangeType::OtherChange, current_floor);
                    }
                    self.clear_direction_button_lamp();
                }
            }
            RunState::WaitingForInButton => {
                let timeout = now_millis().saturating_sub(cycle.door_waiting_started)
                    > self.params.wait_threshold.as_millis();
                if FloorSet::has_additional(&cycle.in_floor_buttons_last, &cycle.in_floor_buttons) || timeout {
                    self.driver.set_door_open_lamp(false);
                    cycle.run_state = RunState::Normal;
                    if timeout {
                        if let Some(floor) = current_floor {
                            let bounds_copy = Bounds::from(&self.driver);
                            self.state.down_buttons.set(false, floor, &bounds_copy);
                            self.state.up_buttons.set(false, floor, &bounds_copy);
                            self.driver.set_button_lamp(Button::new(ButtonType::CallUp, floor), false);
                            self.driver.set_button_lamp(Button::new(ButtonType::CallDown, floor), false);
                            self.emit_state_change(ChangeType::ServedUp, Some(floor));
                            self.emit_state_change(ChangeType::ServedDown, Some(floor));
                        }
                    }
                }
            }
            RunState::Stopped => {}
        }

        if self.last_state_update + self.params.keep_alive.as_millis() <= now_millis() {
            self.emit_state_change(ChangeType::KeepAlive, current_floor);
        }

        // Done last: repeated restarts must still eventually miss a
        // heartbeat rather than being kept alive by the restart itself.
        self.heartbeat.beat();
        cycle.prev_floor = current_floor;
    }

    /***************************************/
    /*           Helper methods            */
    /***************************************/

    fn update_and_get_floor(&mut self) -> Option<i32> {
        let floor = self.driver.get_floor();
        if let Some(f) = floor {
            self.state.last_floor = f;
        }
        floor
    }

    fn stop_elevator(&mut self) {
        if self.state.direction != Direction::None {
            self.previous_direction = self.state.direction;
        }
        self.state.direction = Direction::None;
        self.driver.stop_elevator();
    }

    fn start_elevator(&mut self, direction: Direction) {
        self.state.direction = direction;
        self.update_and_get_floor();
        if self.state.last_floor == self.driver.min_floor() {
            self.state.direction = Direction::Up;
        } else if self.state.last_floor == self.driver.max_floor() {
            self.state.direction = Direction::Down;
        }
        if self.state.direction == Direction::None {
            self.state.direction = self.optimal_direction();
        }
        self.driver.set_motor_speed(self.state.direction, self.params.speed);
        self.driver.set_door_open_lamp(false);
    }

    fn optimal_direction(&self) -> Direction {
        let mut lower_than = 0;
        let mut higher_than = 0;
        let bounds = Bounds::from(&self.driver);
        let mut floors_to_serve = self.state.inside_buttons.clone();
        if !floors_to_serve.has_any() {
            floors_to_serve |= self.state.up_buttons.clone();
            floors_to_serve |= self.state.down_buttons.clone();
        }
        for floor in bounds.min_floor..=bounds.max_floor {
            if floors_to_serve.get(floor, &bounds) {
                if floor > self.state.last_floor {
                    higher_than += 1;
                }
                if floor < self.state.last_floor {
                    lower_than += 1;
                }
            }
        }
        if higher_than >= lower_than {
            Direction::Up
        } else {
            Direction::Down
        }
    }

    /// Inside buttons are prioritized over hall calls: an elevator
    /// continuing in its last direction should not be diverted by a hall
    /// call from a different floor, but it should honor a passenger who
    /// already pressed a button further along that direction.
    fn priority_floors_in_direction(&self, direction: Direction) -> bool {
        let bounds = Bounds::from(&self.driver);
        match direction {
            Direction::Down => self.state.inside_buttons.any_lower(self.state.last_floor, &bounds),
            Direction::Up => self.state.inside_buttons.any_higher(self.state.last_floor, &bounds),
            Direction::None => false,
        }
    }

    fn emit_state_change(&mut self, change_type: ChangeType, floor: Option<i32>) {
        let timestamp = now_millis();
        self.state.timestamp = timestamp;
        self.last_state_update = timestamp;
        let _ = self.out_state.send(StateChange {
            change_type,
            change_floor: floor,
            state: self.state.clone(),
        });
    }

    fn set_button_lamp_and_flag(&mut self, button: Button, on: bool) {
        self.driver.set_button_lamp(button, on);
        if button.button_type == ButtonType::TargetFloor {
            let bounds = Bounds::from(&self.driver);
            self.state.inside_buttons.set(on, button.floor, &bounds);
        }
    }

    fn all_buttons(&self) -> FloorSet {
        self.state.inside_buttons.clone() | self.state.up_buttons.clone() | self.state.down_buttons.clone()
    }

    /// Stop if this floor was requested from inside, or if we're moving
    /// toward a pressed hall button in our direction of travel, or if
    /// this is the only floor anyone has requested (so there is no
    /// reason to keep going). The last clause also covers the case where
    /// every outstanding request happens to be hall calls in a single
    /// direction, since those are indistinguishable here from a lone
    /// target floor.
    fn should_stop(&self, current_floor: i32) -> bool {
        let bounds = Bounds::from(&self.driver);
        let all = self.all_buttons();
        self.state.inside_buttons.get(current_floor, &bounds)
            || (self.state.direction == Direction::Up && self.state.up_buttons.get(current_floor, &bounds))
            || (self.state.direction == Direction::Down && self.state.down_buttons.get(current_floor, &bounds))
            || (all.get(current_floor, &bounds)
                && (!all.any_other(current_floor, &bounds)
                    || all == self.state.up_buttons
                    || all == self.state.down_buttons))
    }

    fn clear_direction_button_lamp(&mut self) {
        let button = if self.state.last_floor == self.driver.max_floor() {
            Button::new(ButtonType::CallDown, self.driver.max_floor())
        } else if self.state.last_floor == self.driver.min_floor() {
            Button::new(ButtonType::CallUp, self.driver.min_floor())
        } else if self.state.direction != Direction::None {
            button_by_direction(self.state.direction, self.state.last_floor)
        } else {
            return;
        };

        let bounds = Bounds::from(&self.driver);
        let cleared = match button.button_type {
            ButtonType::CallUp => self.state.up_buttons.set(false, button.floor, &bounds),
            _ => self.state.down_buttons.set(false, button.floor, &bounds),
        };
        if cleared {
            let change_type = match button.button_type {
                ButtonType::CallUp => ChangeType::ServedUp,
                _ => ChangeType::ServedDown,
            };
            self.emit_state_change(change_type, Some(button.floor));
        }
        self.driver.set_button_lamp(button, false);
    }

    fn add_target_floor(&mut self, floor: i32) {
        let bounds = Bounds::from(&self.driver);
        self.state.inside_buttons.set(true, floor, &bounds);
    }

    fn remove_target_floor(&mut self, floor: i32) {
        let bounds = Bounds::from(&self.driver);
        self.state.inside_buttons.set(false, floor, &bounds);
    }

    /// Reconstructs which hall/target buttons should be considered
    /// pressed from lamp state alone. Run once at the start of every
    /// invocation of `run_until_terminated`, including after a restart,
    /// so a restart mid-trip does not forget a passenger's request.
    fn initialize_elevator(&mut self) {
        let bounds = Bounds::from(&self.driver);
        for i in 0..self.floor_buttons.len() {
            let button = self.floor_buttons[i];
            if self.driver.get_button_lamp(button) {
                match button.button_type {
                    ButtonType::TargetFloor => self.add_target_floor(button.floor),
                    ButtonType::CallDown => {
                        self.state.down_buttons.set(true, button.floor, &bounds);
                    }
                    ButtonType::CallUp => {
                        self.state.up_buttons.set(true, button.floor, &bounds);
                    }
                }
            }
        }
    }

    fn apply_command(&mut self, command: Command) {
        if !command.targets(self.state.id) {
            warn!(
                "dropping command addressed to elevator {} (this is {})",
                command.target_elevator_id, self.state.id
            );
            return;
        }
        let bounds = Bounds::from(&self.driver);
        match command.command_type {
            CommandType::Empty => {}
            CommandType::CallToFloorAndGoUp => {
                self.state.up_buttons.set(true, command.target_floor, &bounds);
                self.driver.set_button_lamp(Button::new(ButtonType::CallUp, command.target_floor), true);
            }
            CommandType::CallToFloorAndGoDown => {
                self.state.down_buttons.set(true, command.target_floor, &bounds);
                self.driver.set_button_lamp(Button::new(ButtonType::CallDown, command.target_floor), true);
            }
            CommandType::TurnOnLightUp => {
                self.driver.set_button_lamp(Button::new(ButtonType::CallUp, command.target_floor), true);
            }
            CommandType::TurnOffLightUp => {
                self.driver.set_button_lamp(Button::new(ButtonType::CallUp, command.target_floor), false);
            }
            CommandType::TurnOnLightDown => {
                self.driver.set_button_lamp(Button::new(ButtonType::CallDown, command.target_floor), true);
            }
            CommandType::TurnOffLightDown => {
                self.driver.set_button_lamp(Button::new(ButtonType::CallDown, command.target_floor), false);
            }
        }
    }
}

fn change_type_by_button(button_type: ButtonType) -> ChangeType {
    match button_type {
        ButtonType::CallUp => ChangeType::ButtonUpPressed,
        ButtonType::CallDown => ChangeType::ButtonDownPressed,
        ButtonType::TargetFloor => ChangeType::InsideButtonPresed,
    }
}

fn button_by_direction(direction: Direction, floor: i32) -> Button {
    debug_assert!(direction != Direction::None, "need a direction");
    if direction == Direction::Down {
        Button::new(ButtonType::CallDown, floor)
    } else {
        Button::new(ButtonType::CallUp, floor)
    }
}

/// A `FloorBounds` snapshot borrowed from any `Driver`, needed wherever a
/// `FloorSet` method wants `&dyn FloorBounds` but the only thing in scope
/// is `&D` or `&mut D`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Bounds {
    min_floor: i32,
    max_floor: i32,
}

impl Bounds {
    fn from<B: FloorBounds + ?Sized>(bounds: &B) -> Bounds {
        Bounds {
            min_floor: bounds.min_floor(),
            max_floor: bounds.max_floor(),
        }
    }
}

impl FloorBounds for Bounds {
    fn min_floor(&self) -> i32 {
        self.min_floor
    }
    fn max_floor(&self) -> i32 {
        self.max_floor
    }
}

/***************************************/
/*             Unit tests              */
/***************************************/
