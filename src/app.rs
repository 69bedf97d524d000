use crate::audio::{AudioEngine, NullAudioEngine, RodioAudioEngine, gain_for};
use crate::backend::control::ControlListener;
use crate::backend::{Backend, BackendConfig};
use crate::core::{PauseToggle, PlayRequest, PlaybackController};
use crate::model::{JobId, Settings};
use crate::protocol::{BackendEvent, TransportCommand, UiRequest};
use anyhow::Result;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::collections::BTreeMap;
use std::io::stdout;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const VOLUME_STEP: i16 = 5;
const SEEK_STEP: Duration = Duration::from_secs(5);

pub struct AppConfig {
    pub backend: BackendConfig,
    pub control_addr: Option<String>,
}

/// Destination for requests bound to the backend worker.
pub trait Requests {
    fn send(&self, request: UiRequest);
}

impl Requests for Backend {
    fn send(&self, request: UiRequest) {
        Backend::send(self, request);
    }
}

/// Terminal-side state that is not playback state.
pub struct App {
    pub library_dir: PathBuf,
    pub selected: usize,
    pub command_mode: bool,
    pub command_buffer: String,
    pub downloads: BTreeMap<JobId, String>,
    /// Set once the user changes the setting, so a late startup reply cannot
    /// revert it.
    volume_changed: bool,
    shuffle_changed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

impl App {
    pub fn new(library_dir: PathBuf) -> Self {
        Self {
            library_dir,
            selected: 0,
            command_mode: false,
            command_buffer: String::new(),
            downloads: BTreeMap::new(),
            volume_changed: false,
            shuffle_changed: false,
        }
    }

    fn select_next(&mut self, core: &PlaybackController) {
        if self.selected + 1 < core.len() {
            self.selected += 1;
        }
    }

    fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    fn clamp_selection(&mut self, core: &PlaybackController) {
        self.selected = self.selected.min(core.len().saturating_sub(1));
    }
}

pub fn run(config: AppConfig) -> Result<()> {
    let library_dir = config.backend.library_dir.clone();
    let backend = Backend::spawn(config.backend)?;
    let _control = match config.control_addr.as_deref() {
        Some(addr) => Some(ControlListener::bind(addr, backend.event_sender())?),
        None => None,
    };

    let mut core = PlaybackController::new(Settings::default());
    let mut app = App::new(library_dir);
    request_startup_state(&backend);

    let mut audio: Box<dyn AudioEngine> = match RodioAudioEngine::new() {
        Ok(engine) => Box::new(engine),
        Err(err) => {
            warn!(error = %format!("{err:#}"), "falling back to null audio engine");
            core.status = String::from("No audio output; running silent");
            Box::new(NullAudioEngine::new())
        }
    };
    info!(output = ?audio.output_name(), "audio ready");

    enable_raw_mode()?;
    let mut out = stdout();
    execute!(out, EnterAlternateScreen, EnableMouseCapture)?;
    let terminal_backend = CrosstermBackend::new(out);
    let mut terminal = Terminal::new(terminal_backend)?;
    terminal.clear()?;

    let mut last_tick = Instant::now();
    let mut library_rect = ratatui::prelude::Rect::default();

    let result: Result<()> = loop {
        while let Some(event) = backend.try_recv_event() {
            apply_backend_event(&mut app, &mut core, &mut *audio, &backend, event);
        }
        maybe_auto_advance_track(&app, &mut core, &mut *audio);

        if core.dirty || last_tick.elapsed() > Duration::from_millis(250) {
            terminal.draw(|frame| {
                library_rect = crate::ui::library_rect(frame.area());
                crate::ui::draw(frame, &core, &*audio, &app)
            })?;
            core.dirty = false;
            last_tick = Instant::now();
        }

        if !event::poll(Duration::from_millis(33))? {
            continue;
        }

        let event = event::read()?;
        if let Event::Mouse(mouse) = event {
            handle_mouse(&mut app, &core, mouse, library_rect);
            core.dirty = true;
            continue;
        }

        let Event::Key(key) = event else {
            continue;
        };

        if key.kind != KeyEventKind::Press {
            continue;
        }

        if handle_key(&mut app, &mut core, &mut *audio, &backend, key) == Flow::Quit {
            break Ok(());
        }
    };

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    audio.stop();
    backend.shutdown();
    info!("playdeck exiting");
    result
}

fn request_startup_state(requests: &dyn Requests) {
    requests.send(UiRequest::GetVolume);
    requests.send(UiRequest::GetShuffle);
    requests.send(UiRequest::GetPlaylistPath);
    requests.send(UiRequest::ScanLibrary);
}

fn apply_backend_event(
    app: &mut App,
    core: &mut PlaybackController,
    audio: &mut dyn AudioEngine,
    requests: &dyn Requests,
    event: BackendEvent,
) {
    match event {
        BackendEvent::LoadPlaylist(names) => {
            core.replace_library(names);
            app.clamp_selection(core);
            sync_stopped_track(core, audio);
        }
        BackendEvent::Volume(_) if app.volume_changed => {
            debug!("ignoring stored volume, changed locally");
        }
        BackendEvent::Volume(volume) => {
            core.apply_settings(Settings {
                volume,
                is_shuffling: core.is_shuffling(),
            });
            audio.set_volume(gain_for(core.volume()));
        }
        BackendEvent::Shuffle(_) if app.shuffle_changed => {
            debug!("ignoring stored shuffle mode, changed locally");
        }
        BackendEvent::Shuffle(shuffle) => {
            core.apply_settings(Settings {
                volume: core.volume(),
                is_shuffling: shuffle,
            });
        }
        BackendEvent::PlaylistPath(path) => {
            app.library_dir = path;
        }
        BackendEvent::DownloadStarted { job, link } => {
            core.status = format!("Downloading {link} ({job})");
            core.dirty = true;
            app.downloads.insert(job, link);
        }
        BackendEvent::DownloadComplete { job, path } => {
            app.downloads.remove(&job);
            core.append_downloaded(&path);
        }
        BackendEvent::DownloadFailed { job, reason } => {
            let link = app.downloads.remove(&job).unwrap_or_default();
            warn!(%job, %link, %reason, "download failed");
            core.status = format!("Download failed: {reason}");
            core.dirty = true;
        }
        BackendEvent::FileDeleted(name) => {
            core.confirm_removal(&name);
            app.clamp_selection(core);
            sync_stopped_track(core, audio);
        }
        BackendEvent::DeleteFailed { name, reason } => {
            core.reject_removal(&name, &reason);
            requests.send(UiRequest::ScanLibrary);
        }
        BackendEvent::Transport(command) => {
            info!(?command, "remote transport command");
            apply_transport(app, core, audio, command);
        }
    }
}

fn apply_transport(
    app: &App,
    core: &mut PlaybackController,
    audio: &mut dyn AudioEngine,
    command: TransportCommand,
) {
    match command {
        TransportCommand::PlayPauseAudio => toggle_pause(app, core, audio),
        TransportCommand::NextSong => {
            let next = core.play_next();
            start_playback(app, core, audio, next);
        }
        TransportCommand::PrevSong => {
            let previous = core.play_previous();
            start_playback(app, core, audio, previous);
        }
    }
}

fn toggle_pause(app: &App, core: &mut PlaybackController, audio: &mut dyn AudioEngine) {
    match core.toggle_pause() {
        PauseToggle::Paused => audio.pause(),
        PauseToggle::Resumed => audio.resume(),
        PauseToggle::Start(request) => start_playback(app, core, audio, Some(request)),
        PauseToggle::Ignored => {}
    }
}

/// Hands a controller decision to the engine and reports the result back.
fn start_playback(
    app: &App,
    core: &mut PlaybackController,
    audio: &mut dyn AudioEngine,
    request: Option<PlayRequest>,
) {
    let Some(request) = request else {
        return;
    };
    let path = app.library_dir.join(&request.name);
    match audio.play(&path) {
        Ok(()) => core.playback_started(),
        Err(err) => {
            warn!(track = %request.name, error = %format!("{err:#}"), "playback failed");
            audio.stop();
            core.playback_failed(&format!("{err:#}"));
        }
    }
}

fn sync_stopped_track(core: &PlaybackController, audio: &mut dyn AudioEngine) {
    if core.current_id().is_none() && audio.current_track().is_some() {
        audio.stop();
    }
}

fn maybe_auto_advance_track(
    app: &App,
    core: &mut PlaybackController,
    audio: &mut dyn AudioEngine,
) {
    if audio.current_track().is_none() || audio.is_paused() || !audio.is_finished() {
        return;
    }

    match core.on_track_ended() {
        Some(request) => start_playback(app, core, audio, Some(request)),
        None => {
            audio.stop();
            core.status = String::from("Reached end of library");
            core.dirty = true;
        }
    }
}

fn handle_key(
    app: &mut App,
    core: &mut PlaybackController,
    audio: &mut dyn AudioEngine,
    requests: &dyn Requests,
    key: KeyEvent,
) -> Flow {
    if app.command_mode {
        match key.code {
            KeyCode::Esc => {
                app.command_mode = false;
                app.command_buffer.clear();
            }
            KeyCode::Enter => {
                let command = std::mem::take(&mut app.command_buffer);
                app.command_mode = false;
                run_command(core, requests, &command);
            }
            KeyCode::Backspace => {
                app.command_buffer.pop();
            }
            KeyCode::Char(ch) => app.command_buffer.push(ch),
            _ => {}
        }
        core.dirty = true;
        return Flow::Continue;
    }

    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return Flow::Quit,
        KeyCode::Down => app.select_next(core),
        KeyCode::Up => app.select_prev(),
        KeyCode::Enter => match core.select_track(app.selected) {
            Ok(request) => start_playback(app, core, audio, Some(request)),
            Err(err) => core.status = err.to_string(),
        },
        KeyCode::Char(' ') => toggle_pause(app, core, audio),
        KeyCode::Char('n') => apply_transport(app, core, audio, TransportCommand::NextSong),
        KeyCode::Char('b') => apply_transport(app, core, audio, TransportCommand::PrevSong),
        KeyCode::Char('s') => {
            let shuffling = core.toggle_shuffle();
            app.shuffle_changed = true;
            requests.send(UiRequest::SetShuffle(shuffling));
        }
        KeyCode::Char('q') => {
            if let Err(err) = core.enqueue_next(app.selected) {
                core.status = err.to_string();
            }
        }
        KeyCode::Char('d') | KeyCode::Delete => match core.request_removal(app.selected) {
            Ok(pending) => requests.send(UiRequest::DeleteFile(pending.name)),
            Err(err) => core.status = err.to_string(),
        },
        KeyCode::Char('+') | KeyCode::Char('=') => {
            change_volume(app, core, audio, requests, VOLUME_STEP)
        }
        KeyCode::Char('-') => change_volume(app, core, audio, requests, -VOLUME_STEP),
        KeyCode::Left => seek_by(core, audio, SEEK_STEP, false),
        KeyCode::Right => seek_by(core, audio, SEEK_STEP, true),
        KeyCode::Char('r') => {
            core.status = String::from("Rescanning library...");
            requests.send(UiRequest::ScanLibrary);
        }
        KeyCode::Char(':') => app.command_mode = true,
        _ => return Flow::Continue,
    }
    core.dirty = true;
    Flow::Continue
}

fn change_volume(
    app: &mut App,
    core: &mut PlaybackController,
    audio: &mut dyn AudioEngine,
    requests: &dyn Requests,
    delta: i16,
) {
    let volume = core.adjust_volume(delta);
    app.volume_changed = true;
    audio.set_volume(gain_for(volume));
    requests.send(UiRequest::SetVolume(volume));
}

fn seek_by(
    core: &mut PlaybackController,
    audio: &mut dyn AudioEngine,
    step: Duration,
    forward: bool,
) {
    let Some(position) = audio.position() else {
        return;
    };
    let target = if forward {
        position.saturating_add(step)
    } else {
        position.saturating_sub(step)
    };
    if let Err(err) = audio.seek_to(target) {
        core.status = format!("seek error: {err:#}");
    }
}

fn handle_mouse(
    app: &mut App,
    core: &PlaybackController,
    mouse: MouseEvent,
    library_rect: ratatui::prelude::Rect,
) {
    let inside_library = point_in_rect(mouse.column, mouse.row, library_rect);
    match mouse.kind {
        MouseEventKind::ScrollDown if inside_library => app.select_next(core),
        MouseEventKind::ScrollUp if inside_library => app.select_prev(),
        _ => {}
    }
}

fn point_in_rect(x: u16, y: u16, rect: ratatui::prelude::Rect) -> bool {
    if rect.width == 0 || rect.height == 0 {
        return false;
    }
    x >= rect.x
        && x < rect.x.saturating_add(rect.width)
        && y >= rect.y
        && y < rect.y.saturating_add(rect.height)
}

fn run_command(core: &mut PlaybackController, requests: &dyn Requests, raw: &str) {
    let input = raw.trim();
    if input.is_empty() {
        core.status = String::from("No command");
        core.dirty = true;
        return;
    }

    let mut command_split = input.splitn(2, char::is_whitespace);
    let command = command_split.next().unwrap_or_default();
    let rest = command_split.next().unwrap_or("").trim();

    match command {
        "help" => {
            core.status = String::from("Commands: add <link> | rescan | help");
        }
        "add" => {
            if rest.is_empty() {
                core.status = String::from("Usage: add <link>");
            } else {
                requests.send(UiRequest::DownloadAudio(rest.to_string()));
                core.status = format!("Requested download of {rest}");
            }
        }
        "rescan" => {
            requests.send(UiRequest::ScanLibrary);
            core.status = String::from("Rescanning library...");
        }
        _ => {
            core.status = String::from("Unknown command. Use :help");
        }
    }
    core.dirty = true;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::path::Path;

    #[derive(Default)]
    struct RecordedRequests(RefCell<Vec<UiRequest>>);

    impl Requests for RecordedRequests {
        fn send(&self, request: UiRequest) {
            self.0.borrow_mut().push(request);
        }
    }

    impl RecordedRequests {
        fn taken(&self) -> Vec<UiRequest> {
            self.0.borrow_mut().drain(..).collect()
        }
    }

    struct TestAudioEngine {
        paused: bool,
        current: Option<PathBuf>,
        finished: bool,
        played: Vec<PathBuf>,
        stopped: bool,
        volume: f32,
        fail_play: bool,
    }

    impl TestAudioEngine {
        fn new() -> Self {
            Self {
                paused: false,
                current: None,
                finished: false,
                played: Vec::new(),
                stopped: false,
                volume: 1.0,
                fail_play: false,
            }
        }
    }

    impl AudioEngine for TestAudioEngine {
        fn play(&mut self, path: &Path) -> Result<()> {
            if self.fail_play {
                anyhow::bail!("cannot decode {}", path.display());
            }
            self.current = Some(path.to_path_buf());
            self.finished = false;
            self.paused = false;
            self.played.push(path.to_path_buf());
            Ok(())
        }

        fn pause(&mut self) {
            self.paused = true;
        }

        fn resume(&mut self) {
            self.paused = false;
        }

        fn stop(&mut self) {
            self.stopped = true;
            self.current = None;
            self.finished = false;
        }

        fn is_paused(&self) -> bool {
            self.paused
        }

        fn current_track(&self) -> Option<&Path> {
            self.current.as_deref()
        }

        fn position(&self) -> Option<Duration> {
            None
        }

        fn duration(&self) -> Option<Duration> {
            None
        }

        fn seek_to(&mut self, _position: Duration) -> Result<()> {
            Ok(())
        }

        fn volume(&self) -> f32 {
            self.volume
        }

        fn set_volume(&mut self, volume: f32) {
            self.volume = volume;
        }

        fn output_name(&self) -> Option<String> {
            Some(String::from("test"))
        }

        fn is_finished(&self) -> bool {
            self.finished
        }
    }

    fn fixture(names: &[&str]) -> (App, PlaybackController, TestAudioEngine, RecordedRequests) {
        let mut app = App::new(PathBuf::from("lib"));
        let mut core = PlaybackController::with_shuffle_seed(Settings::default(), 11);
        let mut audio = TestAudioEngine::new();
        let requests = RecordedRequests::default();
        apply_backend_event(
            &mut app,
            &mut core,
            &mut audio,
            &requests,
            BackendEvent::LoadPlaylist(names.iter().map(|name| name.to_string()).collect()),
        );
        (app, core, audio, requests)
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn startup_requests_state_in_order() {
        let requests = RecordedRequests::default();
        request_startup_state(&requests);
        assert_eq!(
            requests.taken(),
            vec![
                UiRequest::GetVolume,
                UiRequest::GetShuffle,
                UiRequest::GetPlaylistPath,
                UiRequest::ScanLibrary,
            ]
        );
    }

    #[test]
    fn enter_plays_selected_track_from_library_dir() {
        let (mut app, mut core, mut audio, requests) = fixture(&["a.mp3", "b.mp3"]);
        handle_key(&mut app, &mut core, &mut audio, &requests, press(KeyCode::Down));
        handle_key(&mut app, &mut core, &mut audio, &requests, press(KeyCode::Enter));

        assert_eq!(audio.played, vec![PathBuf::from("lib/b.mp3")]);
        assert!(core.is_playing());
    }

    #[test]
    fn playback_failure_is_reported_on_status() {
        let (mut app, mut core, mut audio, requests) = fixture(&["a.mp3"]);
        audio.fail_play = true;
        handle_key(&mut app, &mut core, &mut audio, &requests, press(KeyCode::Enter));

        assert!(!core.is_playing());
        assert!(core.status.starts_with("playback error"));
    }

    #[test]
    fn auto_advance_plays_next_track_when_finished() {
        let (app, mut core, mut audio, _requests) = fixture(&["a.mp3", "b.mp3"]);
        let request = core.select_track(0).expect("select");
        start_playback(&app, &mut core, &mut audio, Some(request));
        audio.finished = true;

        maybe_auto_advance_track(&app, &mut core, &mut audio);

        assert_eq!(
            audio.played,
            vec![PathBuf::from("lib/a.mp3"), PathBuf::from("lib/b.mp3")]
        );
        assert_eq!(core.current_index(), Some(1));
    }

    #[test]
    fn paused_track_does_not_auto_advance() {
        let (app, mut core, mut audio, _requests) = fixture(&["a.mp3", "b.mp3"]);
        let request = core.select_track(0).expect("select");
        start_playback(&app, &mut core, &mut audio, Some(request));
        audio.paused = true;
        audio.finished = true;

        maybe_auto_advance_track(&app, &mut core, &mut audio);
        assert_eq!(audio.played.len(), 1);
    }

    #[test]
    fn volume_keys_persist_through_backend() {
        let (mut app, mut core, mut audio, requests) = fixture(&["a.mp3"]);
        handle_key(&mut app, &mut core, &mut audio, &requests, press(KeyCode::Char('-')));

        assert_eq!(core.volume(), 95);
        assert!((audio.volume - 0.95).abs() < f32::EPSILON);
        assert_eq!(requests.taken(), vec![UiRequest::SetVolume(95)]);
    }

    #[test]
    fn shuffle_key_persists_through_backend() {
        let (mut app, mut core, mut audio, requests) = fixture(&["a.mp3"]);
        handle_key(&mut app, &mut core, &mut audio, &requests, press(KeyCode::Char('s')));
        assert!(core.is_shuffling());
        assert_eq!(requests.taken(), vec![UiRequest::SetShuffle(true)]);
    }

    #[test]
    fn stored_settings_apply_quietly_at_startup() {
        let (mut app, mut core, mut audio, requests) = fixture(&["a.mp3", "b.mp3"]);
        let status = core.status.clone();
        apply_backend_event(&mut app, &mut core, &mut audio, &requests, BackendEvent::Volume(40));
        apply_backend_event(&mut app, &mut core, &mut audio, &requests, BackendEvent::Shuffle(true));

        assert_eq!(core.volume(), 40);
        assert!((audio.volume - 0.4).abs() < f32::EPSILON);
        assert!(core.is_shuffling());
        assert_eq!(core.status, status);
    }

    #[test]
    fn late_stored_settings_do_not_revert_local_changes() {
        let (mut app, mut core, mut audio, requests) = fixture(&["a.mp3"]);
        handle_key(&mut app, &mut core, &mut audio, &requests, press(KeyCode::Char('-')));
        handle_key(&mut app, &mut core, &mut audio, &requests, press(KeyCode::Char('s')));

        apply_backend_event(&mut app, &mut core, &mut audio, &requests, BackendEvent::Volume(20));
        apply_backend_event(&mut app, &mut core, &mut audio, &requests, BackendEvent::Shuffle(false));

        assert_eq!(core.volume(), 95);
        assert!((audio.volume - 0.95).abs() < f32::EPSILON);
        assert!(core.is_shuffling());
        assert_eq!(
            requests.taken(),
            vec![UiRequest::SetVolume(95), UiRequest::SetShuffle(true)]
        );
    }

    #[test]
    fn delete_waits_for_backend_confirmation() {
        let (mut app, mut core, mut audio, requests) = fixture(&["a.mp3", "b.mp3", "c.mp3"]);
        app.selected = 1;
        let request = core.select_track(1).expect("select");
        start_playback(&app, &mut core, &mut audio, Some(request));

        handle_key(&mut app, &mut core, &mut audio, &requests, press(KeyCode::Char('d')));
        assert_eq!(
            requests.taken(),
            vec![UiRequest::DeleteFile(String::from("b.mp3"))]
        );
        assert_eq!(core.len(), 3);

        apply_backend_event(
            &mut app,
            &mut core,
            &mut audio,
            &requests,
            BackendEvent::FileDeleted(String::from("b.mp3")),
        );
        assert_eq!(core.len(), 2);
        assert_eq!(core.current_id(), None);
        assert!(audio.stopped, "removed current track must stop the engine");
    }

    #[test]
    fn failed_delete_triggers_rescan() {
        let (mut app, mut core, mut audio, requests) = fixture(&["a.mp3"]);
        handle_key(&mut app, &mut core, &mut audio, &requests, press(KeyCode::Delete));
        requests.taken();

        apply_backend_event(
            &mut app,
            &mut core,
            &mut audio,
            &requests,
            BackendEvent::DeleteFailed {
                name: String::from("a.mp3"),
                reason: String::from("permission denied"),
            },
        );
        assert_eq!(core.len(), 1);
        assert!(core.status.contains("permission denied"));
        assert_eq!(requests.taken(), vec![UiRequest::ScanLibrary]);
    }

    #[test]
    fn download_lifecycle_tracks_active_jobs() {
        let (mut app, mut core, mut audio, requests) = fixture(&["a.mp3"]);
        apply_backend_event(
            &mut app,
            &mut core,
            &mut audio,
            &requests,
            BackendEvent::DownloadStarted {
                job: JobId(1),
                link: String::from("https://example.com/v"),
            },
        );
        assert_eq!(app.downloads.len(), 1);

        apply_backend_event(
            &mut app,
            &mut core,
            &mut audio,
            &requests,
            BackendEvent::DownloadComplete {
                job: JobId(1),
                path: PathBuf::from("lib/new.webm"),
            },
        );
        assert!(app.downloads.is_empty());
        assert_eq!(core.len(), 2);
        assert_eq!(core.tracks()[1].name, "new.webm");
    }

    #[test]
    fn remote_next_and_prev_drive_the_controller() {
        let (app, mut core, mut audio, _requests) = fixture(&["a.mp3", "b.mp3"]);
        apply_transport(&app, &mut core, &mut audio, TransportCommand::NextSong);
        apply_transport(&app, &mut core, &mut audio, TransportCommand::NextSong);
        apply_transport(&app, &mut core, &mut audio, TransportCommand::PrevSong);

        assert_eq!(
            audio.played,
            vec![
                PathBuf::from("lib/a.mp3"),
                PathBuf::from("lib/b.mp3"),
                PathBuf::from("lib/a.mp3"),
            ]
        );
    }

    #[test]
    fn play_pause_toggles_engine() {
        let (app, mut core, mut audio, _requests) = fixture(&["a.mp3"]);
        apply_transport(&app, &mut core, &mut audio, TransportCommand::PlayPauseAudio);
        assert!(core.is_playing());
        apply_transport(&app, &mut core, &mut audio, TransportCommand::PlayPauseAudio);
        assert!(audio.paused);
        apply_transport(&app, &mut core, &mut audio, TransportCommand::PlayPauseAudio);
        assert!(!audio.paused);
    }

    #[test]
    fn add_command_requests_download() {
        let (_app, mut core, _audio, requests) = fixture(&[]);
        run_command(&mut core, &requests, "add https://example.com/watch?v=1");
        run_command(&mut core, &requests, "add");
        assert_eq!(core.status, "Usage: add <link>");
        run_command(&mut core, &requests, "rescan");
        assert_eq!(
            requests.taken(),
            vec![
                UiRequest::DownloadAudio(String::from("https://example.com/watch?v=1")),
                UiRequest::ScanLibrary,
            ]
        );
    }

    #[test]
    fn unknown_command_is_reported() {
        let (_app, mut core, _audio, requests) = fixture(&[]);
        run_command(&mut core, &requests, "wat");
        assert!(core.status.contains("Unknown command"));
    }

    #[test]
    fn selection_clamps_when_library_shrinks() {
        let (mut app, mut core, mut audio, requests) = fixture(&["a.mp3", "b.mp3", "c.mp3"]);
        app.selected = 2;
        apply_backend_event(
            &mut app,
            &mut core,
            &mut audio,
            &requests,
            BackendEvent::LoadPlaylist(vec![String::from("a.mp3")]),
        );
        assert_eq!(app.selected, 0);
    }
}
