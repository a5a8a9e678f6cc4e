mod common;

use std::time::Duration;

use cadence_core::{PipelineError, PipelineState};
use common::{wait, wait_until, Harness, Media};

const TIMEOUT: Duration = Duration::from_secs(5);

#[test]
fn test_audio_video_happy_path() {
    let h = Harness::new(Media::audio_video(100));

    assert_eq!(h.start_blocking(), Ok(()));
    assert!(h.pipeline.is_running());
    assert!(h.pipeline.is_initialized());
    assert!(h.pipeline.has_audio());
    assert!(h.pipeline.has_video());
    assert_eq!(h.pipeline.duration(), Duration::from_secs(100));

    // Stages initialize strictly in dependency order.
    let entries = h.log.entries();
    assert_eq!(
        entries[..5],
        [
            "demuxer.initialize",
            "audio_decoder.initialize",
            "audio_renderer.initialize",
            "video_decoder.initialize",
            "video_renderer.initialize",
        ]
    );

    // Preroll is a bare seek followed by play.
    assert!(h.log.position("demuxer.seek").unwrap() < h.log.position("demuxer.play").unwrap());
    assert!(!h.log.contains("demuxer.pause"));
    assert!(!h.log.contains("demuxer.flush"));

    assert_eq!(h.pipeline.stop_blocking(), Ok(()));
    assert!(!h.pipeline.is_running());
    assert_eq!(h.log.count("video_renderer.stop"), 1);
    assert!(h.errors().is_empty());
}

#[test]
fn test_video_only_media_skips_audio_stages() {
    let h = Harness::new(Media::video_only(100));

    assert_eq!(h.start_blocking(), Ok(()));
    assert!(!h.pipeline.has_audio());
    assert!(h.pipeline.has_video());
    assert!(!h.log.contains("audio_decoder.initialize"));
    assert!(!h.log.contains("audio_renderer.initialize"));
    assert!(h.log.contains("video_renderer.initialize"));
    assert!(!h.log.contains("audio_renderer.play"));

    assert_eq!(h.pipeline.stop_blocking(), Ok(()));
}

#[test]
fn test_seek_mid_playback() {
    let h = Harness::new(Media::audio_video(100));
    h.start_blocking().unwrap();
    h.log.clear();
    h.events.clear();

    assert_eq!(h.pipeline.seek_blocking(Duration::from_secs(50)), Ok(()));
    assert_eq!(h.pipeline.current_time(), Duration::from_secs(50));

    assert_eq!(
        h.events.states(),
        vec![
            PipelineState::Pausing,
            PipelineState::Flushing,
            PipelineState::Seeking,
            PipelineState::Starting,
            PipelineState::Started,
        ]
    );
    for stage in ["demuxer", "audio_renderer", "video_renderer"] {
        let pause = h.log.position(&format!("{stage}.pause")).unwrap();
        let flush = h.log.position(&format!("{stage}.flush")).unwrap();
        let seek = h.log.position(&format!("{stage}.seek")).unwrap();
        let play = h.log.position(&format!("{stage}.play")).unwrap();
        assert!(pause < flush && flush < seek && seek < play, "{stage}");
    }

    assert_eq!(h.pipeline.stop_blocking(), Ok(()));
}

#[test]
fn test_missing_video_decoder_reports_could_not_render() {
    let h = Harness::new(Media::video_only(100));
    h.video_decoder
        .fail("initialize", PipelineError::RequiredStageMissing);

    assert_eq!(h.start_blocking(), Err(PipelineError::CouldNotRender));
    assert_eq!(h.pipeline.status(), Err(PipelineError::CouldNotRender));
    assert!(!h.log.contains("video_renderer.initialize"));

    wait_until(TIMEOUT, "error teardown", || {
        h.events.states().last() == Some(&PipelineState::Error)
    });
    // Reported through the start callback only.
    assert!(h.errors().is_empty());
    assert!(h.pipeline.is_running());

    assert_eq!(h.pipeline.stop_blocking(), Ok(()));
    assert!(!h.pipeline.is_running());
    assert!(h.errors().is_empty());
}

#[test]
fn test_stop_while_seeking() {
    let h = Harness::new(Media::audio_video(100));
    h.start_blocking().unwrap();
    h.log.clear();

    h.demuxer.hold("flush");
    let seek = h.seek(Duration::from_secs(50));
    wait_until(TIMEOUT, "flush to be issued", || h.demuxer.has_pending("flush"));

    let stop = h.stop();
    assert!(!seek.is_notified());
    assert!(!stop.is_notified());

    h.demuxer.release("flush");
    assert_eq!(wait(&seek), Err(PipelineError::Abort));
    assert_eq!(wait(&stop), Ok(()));

    // The seek step is skipped; the group goes straight to stop.
    assert!(!h.log.contains("demuxer.seek"));
    assert_eq!(h.log.count("demuxer.stop"), 1);
    assert!(!h.pipeline.is_running());
    assert!(h.errors().is_empty());
}
