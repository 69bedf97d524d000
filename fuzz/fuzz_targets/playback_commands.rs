#![no_main]

use libfuzzer_sys::fuzz_target;
use playdeck::core::PlaybackController;
use playdeck::history::HISTORY_CAP;
use playdeck::model::Settings;

fuzz_target!(|data: &[u8]| {
    let Some((seed, ops)) = data.split_first() else {
        return;
    };
    let mut core = PlaybackController::with_shuffle_seed(Settings::default(), u64::from(*seed));
    let len = usize::from(*seed % 16) + 1;
    core.replace_library((0..len).map(|idx| format!("track_{idx}.mp3")).collect());

    for pair in ops.chunks(2) {
        let op = pair[0];
        let arg = usize::from(pair.get(1).copied().unwrap_or(0));
        match op % 10 {
            0 => {
                let _ = core.select_track(arg % (core.len() + 1));
            }
            1 => {
                let _ = core.play_next();
            }
            2 => {
                let _ = core.play_previous();
            }
            3 => {
                let _ = core.on_track_ended();
            }
            4 => {
                let _ = core.enqueue_next(arg % (core.len() + 1));
            }
            5 => {
                core.toggle_shuffle();
            }
            6 => {
                let _ = core.toggle_pause();
            }
            7 => core.playback_started(),
            8 => {
                if let Ok(pending) = core.request_removal(arg % (core.len() + 1)) {
                    if arg % 2 == 0 {
                        core.confirm_removal(&pending.name);
                    } else {
                        core.reject_removal(&pending.name, "fuzz");
                    }
                }
            }
            _ => {
                let keep = arg % (len + 1);
                core.replace_library((0..keep).map(|idx| format!("track_{idx}.mp3")).collect());
            }
        }

        assert!(core.history_len() <= HISTORY_CAP);
        if let Some(id) = core.current_id() {
            assert!(core.index_of(id).is_some());
        }
        assert!(core.queued().all(|id| core.index_of(id).is_some()));
    }
});
