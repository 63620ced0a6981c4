use std::fmt;

/// Stable, session-scoped identifier of a human-controlled participant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ActorId(pub u32);

impl ActorId {
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Discrete, monotonically increasing simulation time supplied by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Tick(pub u64);

impl Tick {
    pub const ZERO: Self = Self(0);

    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Ticks elapsed since `earlier`, saturating at zero.
    pub fn since(self, earlier: Tick) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl std::ops::Add<u64> for Tick {
    type Output = Tick;
    fn add(self, rhs: u64) -> Tick {
        Tick(self.0.saturating_add(rhs))
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Continuous map position in tiles. `y` grows southwards.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub const ORIGIN: Self = Self { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Position) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Axis-aligned rectangle selected by an area tool.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Area {
    pub left_top: Position,
    pub right_bottom: Position,
}

impl Area {
    pub fn new(left_top: Position, right_bottom: Position) -> Self {
        Self {
            left_top,
            right_bottom,
        }
    }
}

/// Eight-way orientation, numbered clockwise from north.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
    strum::EnumIter,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Direction {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

impl Direction {
    /// Numeric value as reported by the host (0 = north, clockwise).
    pub const fn value(self) -> u8 {
        match self {
            Direction::North => 0,
            Direction::NorthEast => 1,
            Direction::East => 2,
            Direction::SouthEast => 3,
            Direction::South => 4,
            Direction::SouthWest => 5,
            Direction::West => 6,
            Direction::NorthWest => 7,
        }
    }

    /// Direction of travel for a displacement, or `None` for a standstill.
    ///
    /// Components smaller than `1/100` tile are treated as zero so that
    /// sub-pixel drift does not flip a straight walk into a diagonal one.
    pub fn from_delta(dx: f64, dy: f64) -> Option<Self> {
        const EPSILON: f64 = 0.01;
        let sx = if dx > EPSILON {
            1
        } else if dx < -EPSILON {
            -1
        } else {
            0
        };
        let sy = if dy > EPSILON {
            1
        } else if dy < -EPSILON {
            -1
        } else {
            0
        };
        match (sx, sy) {
            (0, -1) => Some(Direction::North),
            (1, -1) => Some(Direction::NorthEast),
            (1, 0) => Some(Direction::East),
            (1, 1) => Some(Direction::SouthEast),
            (0, 1) => Some(Direction::South),
            (-1, 1) => Some(Direction::SouthWest),
            (-1, 0) => Some(Direction::West),
            (-1, -1) => Some(Direction::NorthWest),
            _ => None,
        }
    }
}

/// A named quantity of items.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ItemStack {
    pub name: String,
    pub count: u32,
}

impl ItemStack {
    pub fn new(name: impl Into<String>, count: u32) -> Self {
        Self {
            name: name.into(),
            count,
        }
    }
}

/// Reference to a world entity as carried in an event payload.
///
/// Every field except the prototype name may be missing: the host omits
/// them when the entity was destroyed before the notification was built.
#[derive(Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EntityRef {
    pub name: String,
    pub unit_number: Option<u64>,
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub entity_type: Option<String>,
    pub position: Option<Position>,
    pub direction: Option<Direction>,
}

impl EntityRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn at(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }

    pub fn facing(mut self, direction: Direction) -> Self {
        self.direction = Some(direction);
        self
    }

    pub fn with_unit_number(mut self, unit_number: u64) -> Self {
        self.unit_number = Some(unit_number);
        self
    }

    /// True when both references point at the same live entity.
    ///
    /// Unit numbers are authoritative when both sides carry one; otherwise
    /// name and position must agree.
    pub fn same_entity(&self, other: &EntityRef) -> bool {
        match (self.unit_number, other.unit_number) {
            (Some(a), Some(b)) => a == b,
            _ => self.name == other.name && self.position == other.position,
        }
    }
}

/// Kind of GUI an actor opened or closed.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
    strum::EnumIter,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum GuiType {
    #[default]
    None,
    Controller,
    Entity,
    Item,
    Equipment,
    BlueprintLibrary,
    BlueprintBook,
    Research,
    Production,
    Logistic,
    Trains,
    Achievement,
    OtherPlayer,
    Custom,
}

impl GuiType {
    /// True for GUIs that browse or edit blueprints.
    pub fn is_blueprint(self) -> bool {
        matches!(self, GuiType::BlueprintLibrary | GuiType::BlueprintBook)
    }
}
