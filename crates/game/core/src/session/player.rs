use crate::config::GameConfig;
use crate::field::{Field, KeyId, ScrapKind, ScrapSet};
use crate::grid::Coord;

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlayerState {
    pub position: Coord,
    /// Standing in a bush; the adversary cannot see or chase.
    pub hidden: bool,
    pub hp: u8,
    pub scraps: ScrapSet,
    pub key: Option<KeyId>,
    /// False while the step cooldown is armed.
    pub can_step: bool,
}

impl PlayerState {
    pub fn new(position: Coord) -> Self {
        Self {
            position,
            hidden: false,
            hp: GameConfig::MAX_HP,
            scraps: ScrapSet::empty(),
            key: None,
            can_step: true,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }

    pub fn is_wounded(&self) -> bool {
        self.hp < GameConfig::MAX_HP
    }

    pub fn heal(&mut self) {
        self.hp = (self.hp + 1).min(GameConfig::MAX_HP);
    }

    pub fn wound(&mut self) {
        self.hp = self.hp.saturating_sub(1);
    }

    pub fn holds(&self, kind: ScrapKind) -> bool {
        self.scraps.has(kind)
    }

    /// Overlay shown while standing on `terrain`, and whether it hides.
    pub fn overlay_on(terrain: Field) -> (Field, bool) {
        match terrain {
            Field::Bush => (Field::HiddenPlayer, true),
            Field::Puddle => (Field::PlayerInPuddle, false),
            Field::BearTrap => (Field::TrappedPlayer, false),
            _ => (Field::Player, false),
        }
    }
}
