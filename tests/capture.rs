//! Capture pipeline integration tests
//!
//! Scripted providers and paused time; no microphone or recognition
//! engine involved.

mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use common::{FakeLocal, RecordingSink, ScriptedCapture};
use voiceloop::playback::PlaybackOrchestrator;
use voiceloop::{
    CaptureConfig, CaptureError, CaptureEvent, CaptureFault, CaptureReport, CaptureSession,
    CoreConfig, Error, SessionOutcome, VoiceCore, VoiceQuality,
};

fn core(confirm: bool) -> VoiceCore {
    let sink = Arc::new(RecordingSink::new(Duration::from_millis(10)));
    let local = Arc::new(FakeLocal::with_voice("en", VoiceQuality::Standard));
    let config = CoreConfig::default();
    let playback = PlaybackOrchestrator::new(None, sink, local, config.playback.clone());
    VoiceCore::new(config, playback, confirm)
}

#[tokio::test(start_paused = true)]
async fn cumulative_chunks_normalize_to_final_text() {
    let provider = ScriptedCapture::new()
        .after_ms(10, CaptureEvent::Started)
        .after_ms(100, ScriptedCapture::interim("I"))
        .after_ms(100, ScriptedCapture::interim("I want"))
        .after_ms(100, ScriptedCapture::interim("I want want"))
        .after_ms(100, ScriptedCapture::final_("I want pizza"));
    let aborted = Arc::clone(&provider.aborted);

    let (session, _stop) = CaptureSession::new(provider, CaptureConfig::single_utterance());
    let outcome = session.run().await;

    assert_eq!(outcome, SessionOutcome::Completed("I want pizza".to_string()));
    // Terminal transition must release the capability.
    assert!(aborted.load(Ordering::SeqCst));
}

#[tokio::test(start_paused = true)]
async fn interim_duplicates_are_repaired() {
    let provider = ScriptedCapture::new()
        .after_ms(10, CaptureEvent::Started)
        .after_ms(50, ScriptedCapture::interim("go go to the"))
        .after_ms(50, ScriptedCapture::final_("go go to the the store"));

    let (session, _stop) = CaptureSession::new(provider, CaptureConfig::single_utterance());
    assert_eq!(
        session.run().await,
        SessionOutcome::Completed("go to the store".to_string())
    );
}

#[tokio::test(start_paused = true)]
async fn double_final_reports_exactly_one_completion() {
    // The capability misbehaves and emits two final events; the stream
    // then closes. run() must return one Completed and consume nothing
    // else.
    let provider = ScriptedCapture::new()
        .after_ms(10, CaptureEvent::Started)
        .after_ms(50, ScriptedCapture::final_("I want pizza"))
        .after_ms(10, ScriptedCapture::final_("I want pizza"))
        .then_close();

    let (session, _stop) = CaptureSession::new(provider, CaptureConfig::single_utterance());
    assert_eq!(
        session.run().await,
        SessionOutcome::Completed("I want pizza".to_string())
    );
}

#[tokio::test(start_paused = true)]
async fn silence_timeout_fires_without_chunks() {
    let provider = ScriptedCapture::new().after_ms(10, CaptureEvent::Started);

    let (session, _stop) = CaptureSession::new(provider, CaptureConfig::single_utterance());
    assert_eq!(
        session.run().await,
        SessionOutcome::Failed(CaptureError::Timeout)
    );
}

#[tokio::test(start_paused = true)]
async fn hard_ceiling_beats_a_fed_silence_timer() {
    // Interim chunks keep feeding the silence timer; only the ceiling can
    // end the attempt, and it must do so exactly once.
    let mut provider = ScriptedCapture::new().after_ms(10, CaptureEvent::Started);
    for _ in 0..20 {
        provider = provider.after_ms(1000, ScriptedCapture::interim("still talking"));
    }

    let config = CaptureConfig {
        silence_ms: 3000,
        hard_ceiling_ms: 5000,
        ..CaptureConfig::single_utterance()
    };

    let (session, _stop) = CaptureSession::new(provider, config);
    assert_eq!(
        session.run().await,
        SessionOutcome::Failed(CaptureError::Timeout)
    );
}

#[tokio::test(start_paused = true)]
async fn manual_stop_keeps_accumulated_text() {
    let provider = ScriptedCapture::new()
        .after_ms(10, CaptureEvent::Started)
        .after_ms(50, ScriptedCapture::interim("I want pizza"));
    let stopped = Arc::clone(&provider.stopped);

    let (session, stop) = CaptureSession::new(provider, CaptureConfig::single_utterance());
    let task = tokio::spawn(session.run());

    tokio::time::sleep(Duration::from_millis(200)).await;
    stop.stop();

    assert_eq!(
        task.await.unwrap(),
        SessionOutcome::Completed("I want pizza".to_string())
    );
    assert!(stopped.load(Ordering::SeqCst));
}

#[tokio::test(start_paused = true)]
async fn manual_stop_with_no_text_is_a_timeout() {
    let provider = ScriptedCapture::new().after_ms(10, CaptureEvent::Started);

    let (session, stop) = CaptureSession::new(provider, CaptureConfig::continuous());
    let task = tokio::spawn(session.run());

    tokio::time::sleep(Duration::from_millis(100)).await;
    stop.stop();

    assert_eq!(
        task.await.unwrap(),
        SessionOutcome::Failed(CaptureError::Timeout)
    );
}

#[tokio::test(start_paused = true)]
async fn continuous_mode_accumulates_finals_until_silence() {
    let provider = ScriptedCapture::new()
        .after_ms(10, CaptureEvent::Started)
        .after_ms(100, ScriptedCapture::final_("first sentence"))
        .after_ms(100, ScriptedCapture::final_("second sentence"));

    let (session, _stop) = CaptureSession::new(provider, CaptureConfig::continuous());
    // Silence expires after the last final; accumulated finals win over
    // the timeout.
    assert_eq!(
        session.run().await,
        SessionOutcome::Completed("first sentence second sentence".to_string())
    );
}

#[tokio::test(start_paused = true)]
async fn speech_ended_finalizes() {
    let provider = ScriptedCapture::new()
        .after_ms(10, CaptureEvent::Started)
        .after_ms(50, ScriptedCapture::interim("short answer"))
        .after_ms(50, CaptureEvent::SpeechEnded);

    let (session, _stop) = CaptureSession::new(provider, CaptureConfig::continuous());
    assert_eq!(
        session.run().await,
        SessionOutcome::Completed("short answer".to_string())
    );
}

#[tokio::test(start_paused = true)]
async fn not_allowed_fault_maps_to_permission_denied_and_activates_fallback() {
    let mut core = core(false);

    let provider = ScriptedCapture::new()
        .after_ms(10, CaptureEvent::Started)
        .after_ms(50, CaptureEvent::Fault(CaptureFault::NotAllowed));

    let report = core.capture(provider).await.unwrap();
    assert_eq!(
        report,
        CaptureReport::Failed {
            error: CaptureError::PermissionDenied,
            suggest_typing: true,
        }
    );
    // Immediate, independent of any prior counter value.
    assert!(core.fallback_active());
}

#[tokio::test(start_paused = true)]
async fn two_no_speech_results_activate_fallback() {
    let mut core = core(false);

    for expect_advisory in [false, true] {
        let provider = ScriptedCapture::new()
            .after_ms(10, CaptureEvent::Started)
            .after_ms(50, CaptureEvent::Fault(CaptureFault::NoSpeech));
        let report = core.capture(provider).await.unwrap();
        assert_eq!(
            report,
            CaptureReport::Failed {
                error: CaptureError::NoSpeechDetected,
                suggest_typing: expect_advisory,
            }
        );
    }
    assert!(core.fallback_active());

    // An explicit retry clears the streak; a success then keeps the
    // counter at zero, so one later failure must not re-activate.
    core.retry();
    assert!(!core.fallback_active());

    let provider = ScriptedCapture::new()
        .after_ms(10, CaptureEvent::Started)
        .after_ms(50, ScriptedCapture::final_("hello"));
    assert_eq!(
        core.capture(provider).await.unwrap(),
        CaptureReport::Accepted("hello".to_string())
    );

    let provider = ScriptedCapture::new()
        .after_ms(10, CaptureEvent::Started)
        .after_ms(50, CaptureEvent::Fault(CaptureFault::NoSpeech));
    let report = core.capture(provider).await.unwrap();
    assert_eq!(
        report,
        CaptureReport::Failed {
            error: CaptureError::NoSpeechDetected,
            suggest_typing: false,
        }
    );
    assert!(!core.fallback_active());
}

#[tokio::test(start_paused = true)]
async fn confirmation_gate_holds_text_until_accept() {
    let mut core = core(true);

    let provider = ScriptedCapture::new()
        .after_ms(10, CaptureEvent::Started)
        .after_ms(50, ScriptedCapture::final_("I want pizza"));

    let report = core.capture(provider).await.unwrap();
    assert_eq!(
        report,
        CaptureReport::AwaitingConfirmation("I want pizza".to_string())
    );

    assert_eq!(core.accept().as_deref(), Some("I want pizza"));
    assert_eq!(core.accept(), None);
}

#[tokio::test(start_paused = true)]
async fn discard_clears_pending_confirmation() {
    let mut core = core(true);

    let provider = ScriptedCapture::new()
        .after_ms(10, CaptureEvent::Started)
        .after_ms(50, ScriptedCapture::final_("wrong words"));
    core.capture(provider).await.unwrap();

    core.discard();
    assert_eq!(core.accept(), None);
}

#[tokio::test(start_paused = true)]
async fn second_start_while_active_is_rejected() {
    let mut core = core(false);

    let first = ScriptedCapture::new().after_ms(10, CaptureEvent::Started);
    let (_session, _stop) = core.start_capture(first).unwrap();

    let second = ScriptedCapture::new().after_ms(10, CaptureEvent::Started);
    assert!(matches!(
        core.start_capture(second),
        Err(Error::CaptureBusy)
    ));
}

#[tokio::test(start_paused = true)]
async fn abandoned_capture_future_frees_the_slot() {
    let mut core = core(false);

    // The capability never acknowledges; the caller gives up and drops the
    // in-flight future. The busy slot must go with it.
    let stalled = ScriptedCapture::new();
    let gave_up = tokio::time::timeout(Duration::from_millis(5), core.capture(stalled)).await;
    assert!(gave_up.is_err());

    let provider = ScriptedCapture::new()
        .after_ms(10, CaptureEvent::Started)
        .after_ms(50, ScriptedCapture::final_("still works"));
    assert_eq!(
        core.capture(provider).await.unwrap(),
        CaptureReport::Accepted("still works".to_string())
    );
}

#[tokio::test(start_paused = true)]
async fn dropped_session_frees_the_slot() {
    let mut core = core(false);

    let first = ScriptedCapture::new().after_ms(10, CaptureEvent::Started);
    drop(core.start_capture(first).unwrap());

    let second = ScriptedCapture::new().after_ms(10, CaptureEvent::Started);
    assert!(core.start_capture(second).is_ok());
}

#[tokio::test(start_paused = true)]
async fn closed_stream_without_result_is_a_fault() {
    let provider = ScriptedCapture::new()
        .after_ms(10, CaptureEvent::Started)
        .then_close();

    let (session, _stop) = CaptureSession::new(provider, CaptureConfig::single_utterance());
    assert!(matches!(
        session.run().await,
        SessionOutcome::Failed(CaptureError::Other(_))
    ));
}
