//! Cell semantics shared by the grid, the fog-of-war map and the sight window.
use bitflags::bitflags;

/// One of the four collectible scrap item types.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ScrapKind {
    Bulb,
    Foil,
    Gear,
    Pipe,
}

impl ScrapKind {
    pub const ALL: [ScrapKind; 4] = [Self::Bulb, Self::Foil, Self::Gear, Self::Pipe];

    pub const fn flag(self) -> ScrapSet {
        match self {
            Self::Bulb => ScrapSet::BULB,
            Self::Foil => ScrapSet::FOIL,
            Self::Gear => ScrapSet::GEAR,
            Self::Pipe => ScrapSet::PIPE,
        }
    }
}

bitflags! {
    /// Set of scrap kinds, used for the player's held items and factory deposits.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct ScrapSet: u8 {
        const BULB = 1 << 0;
        const FOIL = 1 << 1;
        const GEAR = 1 << 2;
        const PIPE = 1 << 3;
    }
}

impl ScrapSet {
    pub fn has(self, kind: ScrapKind) -> bool {
        self.contains(kind.flag())
    }

    /// Iterates the kinds contained in this set, in canonical order.
    pub fn kinds(self) -> impl Iterator<Item = ScrapKind> {
        ScrapKind::ALL.into_iter().filter(move |kind| self.has(*kind))
    }
}

impl From<ScrapKind> for ScrapSet {
    fn from(kind: ScrapKind) -> Self {
        kind.flag()
    }
}

/// Identity shared by a key and the exit gate it opens.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum KeyId {
    One,
    Two,
    Three,
    Four,
}

impl KeyId {
    pub const ALL: [KeyId; 4] = [Self::One, Self::Two, Self::Three, Self::Four];

    pub const fn number(self) -> u8 {
        match self {
            Self::One => 1,
            Self::Two => 2,
            Self::Three => 3,
            Self::Four => 4,
        }
    }
}

impl core::fmt::Display for KeyId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// Semantic value of a grid cell.
///
/// Terrain variants are stable `base` values; the player/enemy variants are
/// transient overlays that only ever appear as a `current` value (or in the
/// adversary's fog map).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, strum::AsRefStr)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum Field {
    #[default]
    FreeTile,
    Wall,
    Box,
    Bush,
    Puddle,
    BearTrap,
    Heal,
    Scrap(ScrapKind),
    Key(KeyId),
    ExitGate(KeyId),
    OpenFactory,
    ClosedFactory,
    Player,
    HiddenPlayer,
    PlayerInPuddle,
    TrappedPlayer,
    Enemy,
    HiddenEnemy,
    EnemyInPuddle,
    TrappedEnemy,
    Unexplored,
}

impl Field {
    pub const fn is_scrap(self) -> bool {
        matches!(self, Self::Scrap(_))
    }

    pub const fn scrap_kind(self) -> Option<ScrapKind> {
        match self {
            Self::Scrap(kind) => Some(kind),
            _ => None,
        }
    }

    pub const fn is_key(self) -> bool {
        matches!(self, Self::Key(_))
    }

    pub const fn key(self) -> Option<KeyId> {
        match self {
            Self::Key(key) => Some(key),
            _ => None,
        }
    }

    pub const fn is_exit_gate(self) -> bool {
        matches!(self, Self::ExitGate(_))
    }

    pub const fn gate(self) -> Option<KeyId> {
        match self {
            Self::ExitGate(key) => Some(key),
            _ => None,
        }
    }

    /// Any of the player overlays, including the hidden one.
    pub const fn is_player(self) -> bool {
        matches!(
            self,
            Self::Player | Self::HiddenPlayer | Self::PlayerInPuddle | Self::TrappedPlayer
        )
    }

    /// Player overlays the adversary can see from an adjacent cell.
    pub const fn is_visible_player(self) -> bool {
        matches!(
            self,
            Self::Player | Self::PlayerInPuddle | Self::TrappedPlayer
        )
    }

    pub const fn is_enemy(self) -> bool {
        matches!(
            self,
            Self::Enemy | Self::HiddenEnemy | Self::EnemyInPuddle | Self::TrappedEnemy
        )
    }

    pub const fn is_obstacle(self) -> bool {
        matches!(self, Self::Bush | Self::Puddle | Self::BearTrap)
    }

    /// Items lying on a cell: heals, scrap and keys.
    pub const fn is_pickup(self) -> bool {
        matches!(self, Self::Heal | Self::Scrap(_) | Self::Key(_))
    }

    /// Terrain the pathfinder may route through.
    pub const fn is_walkable(self) -> bool {
        matches!(
            self,
            Self::FreeTile | Self::Bush | Self::Puddle | Self::BearTrap
        )
    }

    pub const fn is_factory(self) -> bool {
        matches!(self, Self::OpenFactory | Self::ClosedFactory)
    }
}
