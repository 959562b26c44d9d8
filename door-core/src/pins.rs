use core::fmt;

/// GPIO driving the door lock actuator on the reference board.
pub const DEFAULT_DOOR_PIN: u8 = 5;
/// GPIO driving the camera trigger on the reference board.
pub const DEFAULT_CAMERA_PIN: u8 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinError {
    /// The board has no GPIO with this index
    Unknown(u8),
    /// The GPIO exists but cannot drive an output (input-only or reserved)
    NotOutput(u8),
    /// Door and camera were assigned the same line
    Conflict(u8),
}

impl fmt::Display for PinError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PinError::Unknown(n) => write!(f, "GPIO{} does not exist on this board", n),
            PinError::NotOutput(n) => write!(f, "GPIO{} cannot be used as a digital output", n),
            PinError::Conflict(n) => write!(f, "GPIO{} is assigned to both door and camera", n),
        }
    }
}

/// GPIO capability table of a target board.
///
/// Each bit of `present` marks a pin the package exposes, each bit of
/// `output` marks a pin that can drive a digital output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Board {
    pub name: &'static str,
    present: u64,
    output: u64,
}

const fn mask(pins: &[u8]) -> u64 {
    let mut m = 0u64;
    let mut i = 0;
    while i < pins.len() {
        m |= 1 << pins[i];
        i += 1;
    }
    m
}

const ESP32_PRESENT: &[u8] = &[
    0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 21, 22, 23, 25, 26, 27,
    32, 33, 34, 35, 36, 37, 38, 39,
];

// 6..=11 belong to the SPI flash, 34..=39 are input-only.
const ESP32_OUTPUT: &[u8] = &[
    0, 1, 2, 3, 4, 5, 12, 13, 14, 15, 16, 17, 18, 19, 21, 22, 23, 25, 26, 27, 32, 33,
];

impl Board {
    pub const ESP32: Board = Board {
        name: "esp32",
        present: mask(ESP32_PRESENT),
        output: mask(ESP32_OUTPUT),
    };

    pub const fn has(&self, pin: u8) -> bool {
        pin < 64 && self.present & (1 << pin) != 0
    }

    pub const fn can_output(&self, pin: u8) -> bool {
        pin < 64 && self.output & (1 << pin) != 0
    }

    /// Iterate over every output-capable line, lowest first.
    pub fn output_pins(&self) -> impl Iterator<Item = u8> + '_ {
        (0u8..64).filter(move |&p| self.can_output(p))
    }
}

/// A GPIO index known to be a digital output on `board`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct GpioPin(u8);

impl GpioPin {
    pub fn new(board: &Board, index: u8) -> Result<Self, PinError> {
        if !board.has(index) {
            return Err(PinError::Unknown(index));
        }
        if !board.can_output(index) {
            return Err(PinError::NotOutput(index));
        }
        Ok(Self(index))
    }

    pub const fn index(self) -> u8 {
        self.0
    }
}

impl fmt::Display for GpioPin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GPIO{}", self.0)
    }
}

/// Raw pin indices as they come out of configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinAssignment {
    pub door: u8,
    pub camera: u8,
}

impl Default for PinAssignment {
    fn default() -> Self {
        Self {
            door: DEFAULT_DOOR_PIN,
            camera: DEFAULT_CAMERA_PIN,
        }
    }
}

/// Pin assignment after validation against a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatedPins {
    pub door: GpioPin,
    pub camera: GpioPin,
}

impl PinAssignment {
    pub fn validate(&self, board: &Board) -> Result<ValidatedPins, PinError> {
        let door = GpioPin::new(board, self.door)?;
        let camera = GpioPin::new(board, self.camera)?;
        if door == camera {
            return Err(PinError::Conflict(self.door));
        }
        Ok(ValidatedPins { door, camera })
    }
}
