use std::time::Duration;

use wizard_maze_core::{GameConfig, PlayerSlot};
use wizard_maze_system_ai::AiVariant;

/// Minimum interval between two accepted grid moves of one player.
pub const MOVE_COOLDOWN: Duration = Duration::from_millis(80);

/// Who controls a player slot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PlayerType {
    /// Buttons come from the input device.
    #[default]
    Human,
    /// Buttons come from an AI of the given variant.
    Ai(AiVariant),
}

impl PlayerType {
    /// Whether the slot is computer controlled.
    #[must_use]
    pub const fn is_ai(self) -> bool {
        matches!(self, PlayerType::Ai(_))
    }
}

/// Line-ups offered by the start menu.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GameMode {
    /// One human player.
    Solo,
    /// Two human players.
    HumanVsHuman,
    /// A human against an AI in slot two.
    HumanVsAi(AiVariant),
    /// Two AI players.
    AiVsAi(AiVariant, AiVariant),
}

/// Player line-up and rules of the running game.
#[derive(Clone, Debug, PartialEq)]
pub struct Session {
    /// Controller of each slot.
    pub players: [PlayerType; 2],
    /// Variant an AI takes over a slot with when toggled at runtime.
    pub fallback_variants: [AiVariant; 2],
    /// Whether AI players coordinate with their teammate.
    pub cooperative: bool,
    /// Whether slot two takes part.
    pub multiplayer: bool,
    /// Minimum interval between accepted grid moves.
    pub move_cooldown: Duration,
}

impl Default for Session {
    fn default() -> Self {
        Self::for_mode(GameMode::Solo)
    }
}

impl Session {
    /// Builds the session a menu choice stands for.
    #[must_use]
    pub fn for_mode(mode: GameMode) -> Self {
        let (players, multiplayer) = match mode {
            GameMode::Solo => ([PlayerType::Human; 2], false),
            GameMode::HumanVsHuman => ([PlayerType::Human; 2], true),
            GameMode::HumanVsAi(variant) => ([PlayerType::Human, PlayerType::Ai(variant)], true),
            GameMode::AiVsAi(first, second) => {
                ([PlayerType::Ai(first), PlayerType::Ai(second)], true)
            }
        };
        let fallback_variants = players.map(|player| match player {
            PlayerType::Ai(variant) => variant,
            PlayerType::Human => AiVariant::default(),
        });
        Self {
            players,
            fallback_variants,
            cooperative: false,
            multiplayer,
            move_cooldown: MOVE_COOLDOWN,
        }
    }

    /// Applies the session overrides found in the configuration.
    #[must_use]
    pub fn configured(mut self, config: &GameConfig) -> Self {
        self.cooperative = config.get("AI_COOPERATIVE", self.cooperative);
        let cooldown = config.get("PLAYER_MOVE_COOLDOWN", self.move_cooldown.as_secs_f32());
        self.move_cooldown = Duration::try_from_secs_f32(cooldown).unwrap_or(MOVE_COOLDOWN);
        self
    }

    /// Controller of the slot.
    #[must_use]
    pub const fn player(&self, slot: PlayerSlot) -> PlayerType {
        self.players[slot.index()]
    }

    /// Whether the slot takes part in the game.
    #[must_use]
    pub const fn is_playing(&self, slot: PlayerSlot) -> bool {
        match slot {
            PlayerSlot::One => true,
            PlayerSlot::Two => self.multiplayer,
        }
    }

    /// Swaps the slot between human and AI control, returning the new type.
    pub fn toggle(&mut self, slot: PlayerSlot) -> PlayerType {
        let next = match self.players[slot.index()] {
            PlayerType::Human => PlayerType::Ai(self.fallback_variants[slot.index()]),
            PlayerType::Ai(variant) => {
                self.fallback_variants[slot.index()] = variant;
                PlayerType::Human
            }
        };
        self.players[slot.index()] = next;
        next
    }
}

/// Spaces out accepted grid moves per player on the simulation clock.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct MoveGate {
    last_move: [Option<Duration>; 2],
}

impl MoveGate {
    /// Whether a move requested at `now` is accepted; accepting arms the gate.
    ///
    /// Caged players are never held back.
    pub(crate) fn admit(
        &mut self,
        slot: PlayerSlot,
        now: Duration,
        cooldown: Duration,
        caged: bool,
    ) -> bool {
        let last = &mut self.last_move[slot.index()];
        let ready = caged || last.map_or(true, |at| now.saturating_sub(at) >= cooldown);
        if ready {
            *last = Some(now);
        }
        ready
    }

    pub(crate) fn reset(&mut self) {
        self.last_move = [None; 2];
    }
}

#[cfg(test)]
mod tests {
    use super::{GameMode, MoveGate, PlayerType, Session, MOVE_COOLDOWN};
    use std::time::Duration;
    use wizard_maze_core::{GameConfig, PlayerSlot};
    use wizard_maze_system_ai::AiVariant;

    #[test]
    fn modes_assign_controllers_per_slot() {
        let session = Session::for_mode(GameMode::HumanVsAi(AiVariant::FixedPost));
        assert!(session.multiplayer);
        assert_eq!(session.player(PlayerSlot::One), PlayerType::Human);
        assert_eq!(
            session.player(PlayerSlot::Two),
            PlayerType::Ai(AiVariant::FixedPost)
        );

        let solo = Session::for_mode(GameMode::Solo);
        assert!(!solo.is_playing(PlayerSlot::Two));
        assert!(solo.is_playing(PlayerSlot::One));
    }

    #[test]
    fn toggling_remembers_the_ai_variant() {
        let mut session = Session::for_mode(GameMode::AiVsAi(
            AiVariant::Aggressive,
            AiVariant::FixedPost,
        ));
        assert_eq!(session.toggle(PlayerSlot::Two), PlayerType::Human);
        assert_eq!(
            session.toggle(PlayerSlot::Two),
            PlayerType::Ai(AiVariant::FixedPost)
        );
    }

    #[test]
    fn configuration_overrides_cooldown_and_cooperation() {
        let config = GameConfig::parse("AI_COOPERATIVE = true\nPLAYER_MOVE_COOLDOWN = 0.2\n");
        let session = Session::default().configured(&config);
        assert!(session.cooperative);
        assert_eq!(session.move_cooldown.as_millis(), 200);

        let broken = GameConfig::parse("PLAYER_MOVE_COOLDOWN = -1\n");
        assert_eq!(Session::default().configured(&broken).move_cooldown, MOVE_COOLDOWN);
    }

    #[test]
    fn gate_spaces_moves_unless_caged() {
        let mut gate = MoveGate::default();
        let at = Duration::from_millis;
        assert!(gate.admit(PlayerSlot::One, at(0), MOVE_COOLDOWN, false));
        assert!(!gate.admit(PlayerSlot::One, at(50), MOVE_COOLDOWN, false));
        assert!(gate.admit(PlayerSlot::Two, at(50), MOVE_COOLDOWN, false));
        assert!(gate.admit(PlayerSlot::One, at(60), MOVE_COOLDOWN, true));
        assert!(!gate.admit(PlayerSlot::One, at(100), MOVE_COOLDOWN, false));
        assert!(gate.admit(PlayerSlot::One, at(140), MOVE_COOLDOWN, false));
        gate.reset();
        assert!(gate.admit(PlayerSlot::One, at(141), MOVE_COOLDOWN, false));
    }
}
