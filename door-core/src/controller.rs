use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

use crate::actuator::{ActuatorError, CameraTrigger, DoorLock};
use crate::command::{DoorCommand, DoorState, PendingCommand};
use crate::visitor::{Visitor, VisitorLog};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerError {
    Actuator(ActuatorError),
}

impl From<ActuatorError> for ControllerError {
    fn from(e: ActuatorError) -> Self {
        ControllerError::Actuator(e)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Door released; `logged` is false when the visitor log was full
    Unlocked { logged: bool },
    Locked,
    Captured,
}

/// Owns the door and camera lines and the visitor log.
pub struct DoorController<L, C, const N: usize> {
    door: DoorLock<L>,
    camera: CameraTrigger<C>,
    visitors: VisitorLog<N>,
}

impl<L, C, const N: usize> DoorController<L, C, N>
where
    L: OutputPin,
    C: OutputPin,
{
    pub fn new(door: DoorLock<L>, camera: CameraTrigger<C>, max_visitors: usize) -> Self {
        Self {
            door,
            camera,
            visitors: VisitorLog::new(max_visitors),
        }
    }

    /// Run one backend command. `now` is the current time in seconds since
    /// boot and is stored with visitor records.
    pub fn execute<D: DelayNs>(
        &mut self,
        cmd: &PendingCommand,
        now: u64,
        delay: &mut D,
    ) -> Result<Outcome, ControllerError> {
        log::info!("Executing {}", cmd.command);
        match cmd.command {
            DoorCommand::OpenDoor => {
                // A failed capture must not keep someone locked out.
                let captured = match self.camera.fire(delay) {
                    Ok(()) => true,
                    Err(e) => {
                        log::warn!("Camera trigger failed: {:?}", e);
                        false
                    }
                };
                self.door.unlock()?;

                let visitor = Visitor::new(cmd.recognized_name.as_deref(), now, captured);
                log::info!("Visitor {} at {}s", visitor.name, now);
                let logged = self.visitors.record(visitor).is_ok();
                Ok(Outcome::Unlocked { logged })
            }
            DoorCommand::LockDoor => {
                self.door.lock()?;
                Ok(Outcome::Locked)
            }
            DoorCommand::Capture => {
                self.camera.fire(delay)?;
                Ok(Outcome::Captured)
            }
        }
    }

    /// Close the unlock window. Does nothing if already locked.
    pub fn relock(&mut self) -> Result<bool, ControllerError> {
        if self.door.state() == DoorState::Locked {
            return Ok(false);
        }
        self.door.lock()?;
        Ok(true)
    }

    pub fn state(&self) -> DoorState {
        self.door.state()
    }

    pub fn visitors(&self) -> &VisitorLog<N> {
        &self.visitors
    }

    pub fn release(self) -> (L, C) {
        (self.door.release(), self.camera.release())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuator::tests::StuckLow;
    use crate::visitor::truncate;
    use embedded_hal_mock::eh1::delay::NoopDelay;
    use embedded_hal_mock::eh1::digital::{Mock as PinMock, State, Transaction};

    fn open(name: Option<&str>) -> PendingCommand {
        PendingCommand {
            command: DoorCommand::OpenDoor,
            recognized_name: name.map(truncate),
            issued_at: None,
        }
    }

    fn pulse() -> [Transaction; 2] {
        [Transaction::set(State::High), Transaction::set(State::Low)]
    }

    #[test]
    fn open_fires_camera_unlocks_and_logs() {
        let door = PinMock::new(&[Transaction::set(State::Low), Transaction::set(State::High)]);
        let mut camera_tx = vec![Transaction::set(State::Low)];
        camera_tx.extend(pulse());
        let camera = PinMock::new(&camera_tx);

        let mut ctl: DoorController<_, _, 4> = DoorController::new(
            DoorLock::new(door).unwrap(),
            CameraTrigger::new(camera).unwrap(),
            4,
        );
        let outcome = ctl.execute(&open(Some("Minh")), 42, &mut NoopDelay::new());
        assert_eq!(outcome, Ok(Outcome::Unlocked { logged: true }));
        assert_eq!(ctl.state(), DoorState::Unlocked);

        let v = ctl.visitors().last().unwrap();
        assert_eq!(v.name, "Minh");
        assert_eq!(v.timestamp, 42);
        assert!(v.captured);

        let (mut door, mut camera) = ctl.release();
        door.done();
        camera.done();
    }

    #[test]
    fn camera_failure_still_opens_door() {
        let door = PinMock::new(&[Transaction::set(State::Low), Transaction::set(State::High)]);
        let mut ctl: DoorController<_, _, 4> = DoorController::new(
            DoorLock::new(door).unwrap(),
            CameraTrigger::new(StuckLow).unwrap(),
            4,
        );
        let outcome = ctl.execute(&open(None), 1, &mut NoopDelay::new());
        assert_eq!(outcome, Ok(Outcome::Unlocked { logged: true }));
        let v = ctl.visitors().last().unwrap();
        assert_eq!(v.name, "Unknown");
        assert!(!v.captured);

        let (mut door, _) = ctl.release();
        door.done();
    }

    #[test]
    fn full_log_does_not_block_entry() {
        let door = PinMock::new(&[
            Transaction::set(State::Low),
            Transaction::set(State::High),
            Transaction::set(State::Low),
            Transaction::set(State::High),
        ]);
        let mut camera_tx = vec![Transaction::set(State::Low)];
        camera_tx.extend(pulse());
        camera_tx.extend(pulse());
        let camera = PinMock::new(&camera_tx);

        let mut ctl: DoorController<_, _, 4> = DoorController::new(
            DoorLock::new(door).unwrap(),
            CameraTrigger::new(camera).unwrap(),
            1,
        );
        let mut delay = NoopDelay::new();
        assert_eq!(
            ctl.execute(&open(Some("a")), 1, &mut delay),
            Ok(Outcome::Unlocked { logged: true })
        );
        assert_eq!(ctl.relock(), Ok(true));
        assert_eq!(
            ctl.execute(&open(Some("b")), 2, &mut delay),
            Ok(Outcome::Unlocked { logged: false })
        );
        assert_eq!(ctl.visitors().len(), 1);
        assert_eq!(ctl.visitors().dropped(), 1);

        let (mut door, mut camera) = ctl.release();
        door.done();
        camera.done();
    }

    #[test]
    fn relock_when_locked_is_a_noop() {
        let door = PinMock::new(&[Transaction::set(State::Low)]);
        let camera = PinMock::new(&[Transaction::set(State::Low)]);
        let mut ctl: DoorController<_, _, 4> = DoorController::new(
            DoorLock::new(door).unwrap(),
            CameraTrigger::new(camera).unwrap(),
            4,
        );
        assert_eq!(ctl.relock(), Ok(false));
        let (mut door, mut camera) = ctl.release();
        door.done();
        camera.done();
    }

    #[test]
    fn capture_only_pulses_camera() {
        let door = PinMock::new(&[Transaction::set(State::Low)]);
        let mut camera_tx = vec![Transaction::set(State::Low)];
        camera_tx.extend(pulse());
        let camera = PinMock::new(&camera_tx);
        let mut ctl: DoorController<_, _, 4> = DoorController::new(
            DoorLock::new(door).unwrap(),
            CameraTrigger::new(camera).unwrap(),
            4,
        );
        let cmd = PendingCommand {
            command: DoorCommand::Capture,
            recognized_name: None,
            issued_at: None,
        };
        assert_eq!(
            ctl.execute(&cmd, 0, &mut NoopDelay::new()),
            Ok(Outcome::Captured)
        );
        assert_eq!(ctl.state(), DoorState::Locked);
        assert!(ctl.visitors().is_empty());
        let (mut door, mut camera) = ctl.release();
        door.done();
        camera.done();
    }
}
