//! Audio cues raised by gameplay events.

use std::time::Duration;

use wizard_maze_core::{AudioCommand, Event, LevelPhase};

/// Sound effect of a player shot.
pub const SHOT: &str = "piou";
/// Jingle played while a stage initialises.
pub const INTRO: &str = "intro";
/// Sound of a player dying.
pub const PLAYER_DEATH: &str = "death";
/// Sound of the Worluk escaping.
pub const WORLUK_ESCAPE: &str = "worluk-escape";
/// Sound of the Worluk dying.
pub const WORLUK_DEATH: &str = "worluk-kill";
/// Sound of the Wizard dying.
pub const WIZARD_DEATH: &str = "wizard-kill";
/// Music of the regular phase.
pub const MAIN_THEME: &str = "C-long";
/// Music while the Worluk roams.
pub const WORLUK_THEME: &str = "worluk-loop";
/// Music while the Wizard roams.
pub const WIZARD_THEME: &str = "G#-long";

const MUSIC_VOLUME: f32 = 0.7;
const SHOT_VOLUME: f32 = 0.6;
const DEATH_VOLUME: f32 = 0.8;
const END_FADE: Duration = Duration::from_millis(500);

/// Appends the audio commands an event calls for.
pub fn audio_cues(event: &Event, out: &mut Vec<AudioCommand>) {
    match event {
        Event::GameStarted { .. } => out.push(AudioCommand::Preload {
            names: [SHOT, INTRO, PLAYER_DEATH, WORLUK_ESCAPE, WORLUK_DEATH, WIZARD_DEATH]
                .map(str::to_owned)
                .to_vec(),
        }),
        Event::LevelInitialized { .. } => {
            out.push(AudioCommand::StopMusic { fade: None });
            out.push(AudioCommand::sound(INTRO));
        }
        Event::LevelStarted { .. } => out.push(music(MAIN_THEME)),
        Event::PlayerFired { .. } => out.push(sound(SHOT, SHOT_VOLUME)),
        Event::PlayerKilled { .. } => out.push(sound(PLAYER_DEATH, DEATH_VOLUME)),
        Event::PhaseChanged { to, .. } => match to {
            LevelPhase::Worluk => out.push(music(WORLUK_THEME)),
            LevelPhase::Wizard => out.push(music(WIZARD_THEME)),
            LevelPhase::WorlukDeath => stinger(WORLUK_DEATH, out),
            LevelPhase::WizardDeath => stinger(WIZARD_DEATH, out),
            LevelPhase::WorlukEscape => stinger(WORLUK_ESCAPE, out),
            LevelPhase::KillEnemies => {}
        },
        Event::GameOver { .. } | Event::GameCompleted { .. } => {
            out.push(AudioCommand::StopMusic {
                fade: Some(END_FADE),
            });
        }
        _ => {}
    }
}

fn stinger(name: &str, out: &mut Vec<AudioCommand>) {
    out.push(AudioCommand::StopMusic { fade: None });
    out.push(AudioCommand::sound(name));
}

fn sound(name: &str, volume: f32) -> AudioCommand {
    AudioCommand::PlaySound {
        name: name.to_owned(),
        volume,
    }
}

fn music(name: &str) -> AudioCommand {
    AudioCommand::PlayMusic {
        name: name.to_owned(),
        looped: true,
        volume: MUSIC_VOLUME,
    }
}

#[cfg(test)]
mod tests {
    use super::{audio_cues, MAIN_THEME, SHOT, WORLUK_DEATH};
    use wizard_maze_core::{AudioCommand, EntityId, EnemyKind, Event, LevelPhase, PlayerSlot};

    fn cues(event: Event) -> Vec<AudioCommand> {
        let mut out = Vec::new();
        audio_cues(&event, &mut out);
        out
    }

    #[test]
    fn shots_and_level_start_have_sounds() {
        assert!(matches!(
            cues(Event::PlayerFired { slot: PlayerSlot::One }).as_slice(),
            [AudioCommand::PlaySound { name, .. }] if name == SHOT
        ));
        assert!(matches!(
            cues(Event::LevelStarted { stage: 0 }).as_slice(),
            [AudioCommand::PlayMusic { name, looped: true, .. }] if name == MAIN_THEME
        ));
    }

    #[test]
    fn boss_death_stops_music_before_the_stinger() {
        let commands = cues(Event::PhaseChanged {
            from: LevelPhase::Worluk,
            to: LevelPhase::WorlukDeath,
        });
        assert_eq!(commands.len(), 2);
        assert_eq!(commands[0], AudioCommand::StopMusic { fade: None });
        assert_eq!(commands[1], AudioCommand::sound(WORLUK_DEATH));
    }

    #[test]
    fn silent_events_produce_nothing() {
        assert!(cues(Event::EnemySpawned {
            enemy: EntityId::new(1),
            kind: EnemyKind::Burwor,
        })
        .is_empty());
        assert!(cues(Event::PhaseChanged {
            from: LevelPhase::WorlukDeath,
            to: LevelPhase::KillEnemies,
        })
        .is_empty());
    }
}
