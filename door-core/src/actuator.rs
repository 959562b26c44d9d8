use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

use crate::command::DoorState;

/// Length of the high pulse on the camera trigger line
pub const CAMERA_PULSE_MS: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorError {
    DoorLine,
    CameraLine,
}

/// Lock actuator on a digital output. High releases the lock.
pub struct DoorLock<P> {
    pin: P,
    state: DoorState,
}

impl<P: OutputPin> DoorLock<P> {
    /// Takes the line and drives it to the locked level.
    pub fn new(mut pin: P) -> Result<Self, ActuatorError> {
        pin.set_low().map_err(|_| ActuatorError::DoorLine)?;
        Ok(Self {
            pin,
            state: DoorState::Locked,
        })
    }

    pub fn unlock(&mut self) -> Result<(), ActuatorError> {
        self.pin.set_high().map_err(|_| ActuatorError::DoorLine)?;
        self.state = DoorState::Unlocked;
        log::info!("Door unlocked");
        Ok(())
    }

    pub fn lock(&mut self) -> Result<(), ActuatorError> {
        self.pin.set_low().map_err(|_| ActuatorError::DoorLine)?;
        self.state = DoorState::Locked;
        log::info!("Door locked");
        Ok(())
    }

    pub fn state(&self) -> DoorState {
        self.state
    }

    pub fn release(self) -> P {
        self.pin
    }
}

/// Camera shutter trigger on a digital output, active high.
pub struct CameraTrigger<P> {
    pin: P,
    shots: u32,
}

impl<P: OutputPin> CameraTrigger<P> {
    pub fn new(mut pin: P) -> Result<Self, ActuatorError> {
        pin.set_low().map_err(|_| ActuatorError::CameraLine)?;
        Ok(Self { pin, shots: 0 })
    }

    pub fn fire<D: DelayNs>(&mut self, delay: &mut D) -> Result<(), ActuatorError> {
        self.pin.set_high().map_err(|_| ActuatorError::CameraLine)?;
        delay.delay_ms(CAMERA_PULSE_MS);
        // always try to bring the line back down
        self.pin.set_low().map_err(|_| ActuatorError::CameraLine)?;
        self.shots = self.shots.wrapping_add(1);
        log::debug!("Camera triggered ({} shots)", self.shots);
        Ok(())
    }

    pub fn shots(&self) -> u32 {
        self.shots
    }

    pub fn release(self) -> P {
        self.pin
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use embedded_hal::digital::{ErrorKind, ErrorType};
    use embedded_hal_mock::eh1::delay::NoopDelay;
    use embedded_hal_mock::eh1::digital::{Mock as PinMock, State, Transaction};

    /// Output that accepts low and refuses high.
    pub(crate) struct StuckLow;

    impl ErrorType for StuckLow {
        type Error = ErrorKind;
    }

    impl OutputPin for StuckLow {
        fn set_low(&mut self) -> Result<(), ErrorKind> {
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), ErrorKind> {
            Err(ErrorKind::Other)
        }
    }

    #[test]
    fn door_starts_locked_and_toggles() {
        let expectations = [
            Transaction::set(State::Low),
            Transaction::set(State::High),
            Transaction::set(State::Low),
        ];
        let mut door = DoorLock::new(PinMock::new(&expectations)).unwrap();
        assert_eq!(door.state(), DoorState::Locked);
        door.unlock().unwrap();
        assert_eq!(door.state(), DoorState::Unlocked);
        door.lock().unwrap();
        assert_eq!(door.state(), DoorState::Locked);
        door.release().done();
    }

    #[test]
    fn failed_unlock_keeps_state() {
        let mut door = DoorLock::new(StuckLow).unwrap();
        assert_eq!(door.unlock(), Err(ActuatorError::DoorLine));
        assert_eq!(door.state(), DoorState::Locked);
    }

    #[test]
    fn camera_pulse_goes_high_then_low() {
        let expectations = [
            Transaction::set(State::Low),
            Transaction::set(State::High),
            Transaction::set(State::Low),
        ];
        let mut camera = CameraTrigger::new(PinMock::new(&expectations)).unwrap();
        camera.fire(&mut NoopDelay::new()).unwrap();
        assert_eq!(camera.shots(), 1);
        camera.release().done();
    }
}
