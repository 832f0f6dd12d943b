use std::{
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use parking_lot::Mutex;
use wizard_maze_core::{AudioCommand, JoinOutcome};
use wizard_maze_system_audio::{AudioBackend, AudioError, AudioWorker, SilentBackend};

#[derive(Clone, Default)]
struct SharedLog(Arc<Mutex<Vec<String>>>);

impl AudioBackend for SharedLog {
    fn load_sound(&mut self, name: &str) -> Result<(), AudioError> {
        self.0.lock().push(format!("load {name}"));
        Ok(())
    }

    fn play_sound(&mut self, name: &str, _volume: f32) -> Result<(), AudioError> {
        self.0.lock().push(format!("play {name}"));
        Ok(())
    }

    fn play_music(&mut self, name: &str, _looped: bool, _volume: f32) -> Result<(), AudioError> {
        self.0.lock().push(format!("music {name}"));
        Ok(())
    }

    fn stop_music(&mut self, _fade: Option<Duration>) {}

    fn set_music_volume(&mut self, _volume: f32) {}

    fn is_music_playing(&self) -> bool {
        false
    }
}

#[test]
fn commands_are_executed_in_order_off_thread() {
    let log = SharedLog::default();
    let mut worker = AudioWorker::spawn(log.clone()).expect("audio worker starts");
    assert!(worker.send(AudioCommand::sound("shoot")));
    assert!(worker.send(AudioCommand::sound("shoot")));
    assert!(worker.send(AudioCommand::sound("death")));

    let deadline = Instant::now() + Duration::from_secs(2);
    while worker.processed() < 3 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(2));
    }
    assert_eq!(
        *log.0.lock(),
        vec![
            "load shoot".to_owned(),
            "play shoot".to_owned(),
            "play shoot".to_owned(),
            "load death".to_owned(),
            "play death".to_owned(),
        ]
    );
    assert_eq!(worker.shutdown(Duration::from_secs(1)), JoinOutcome::Joined);
}

#[test]
fn shutdown_stops_the_thread_within_the_timeout() {
    let mut worker = AudioWorker::spawn(SilentBackend::default()).expect("audio worker starts");
    assert!(worker.is_alive());
    assert_eq!(worker.shutdown(Duration::from_secs(1)), JoinOutcome::Joined);
    assert!(!worker.is_alive());
    assert!(!worker.send(AudioCommand::sound("late")), "the queue closes with the thread");
}
