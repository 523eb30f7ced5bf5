// Integration tests for response playback
//
// A transport task pulls the outbound track while the player sends one
// utterance; the tests check completion time, frame sizes and pacing.

mod common;

use anyhow::Result;
use common::{test_config, FORMAT};
use moshi_call::audio::{AudioFormat, AudioFrame};
use moshi_call::call::ResponsePlayer;
use moshi_call::error::PlayerError;
use std::time::{Duration, Instant};

fn player() -> ResponsePlayer {
    ResponsePlayer::new(test_config().player, FORMAT)
}

fn response(ms: u64) -> AudioFrame {
    let per_channel = (FORMAT.sample_rate as u64 * ms / 1000) as usize;
    AudioFrame::silence(per_channel, FORMAT, 0)
}

#[tokio::test]
async fn test_send_completes_within_duration_plus_timeout() -> Result<()> {
    let player = player();
    let track = player.track();
    let transport = tokio::spawn(async move {
        let started = Instant::now();
        let mut arrivals = Vec::new();
        while let Ok(frame) = track.recv().await {
            arrivals.push((started.elapsed(), frame));
        }
        arrivals
    });

    let started = Instant::now();
    player.send_utterance(&response(600)).await?;
    let elapsed = started.elapsed();

    // Paced to wall clock: no more than buffer_ahead (100 ms) early
    assert!(elapsed >= Duration::from_millis(450), "finished too early: {:?}", elapsed);
    assert!(elapsed <= Duration::from_millis(900), "finished too late: {:?}", elapsed);

    player.close();
    let arrivals = transport.await?;
    assert_eq!(arrivals.len(), 30);

    let mut sent = 0.0;
    for (at, frame) in &arrivals {
        assert_eq!(frame.samples_per_channel(), 960);
        sent += frame.seconds();
        // 20 ms of slack for scheduling
        assert!(
            sent <= at.as_secs_f64() + 0.1 + 0.02,
            "{:.3}s sent after {:?}",
            sent,
            at
        );
    }
    Ok(())
}

#[tokio::test]
async fn test_partial_tail_is_padded_with_silence() -> Result<()> {
    let player = player();
    let track = player.track();
    let transport = tokio::spawn(async move {
        let mut frames = Vec::new();
        while let Ok(frame) = track.recv().await {
            frames.push(frame);
        }
        frames
    });

    // 2.5 frames of signal
    let audio = AudioFrame::new(vec![1000; 2400 * 2], FORMAT, 0);
    player.send_utterance(&audio).await?;
    player.close();

    let frames = transport.await?;
    assert_eq!(frames.len(), 3);
    assert!(frames.iter().all(|f| f.samples_per_channel() == 960));
    let tail = &frames[2].samples;
    assert!(tail[..480 * 2].iter().all(|&s| s == 1000));
    assert!(tail[480 * 2..].iter().all(|&s| s == 0));
    Ok(())
}

#[tokio::test]
async fn test_send_times_out_without_transport() -> Result<()> {
    let player = player();

    let started = Instant::now();
    let result = player.send_utterance(&response(100)).await;
    let elapsed = started.elapsed();

    assert!(matches!(result, Err(PlayerError::Timeout { .. })));
    // utterance duration + frame_send_timeout
    assert!(elapsed >= Duration::from_millis(400));
    assert!(elapsed < Duration::from_millis(1_000));

    // The aborted utterance is not played later
    let track = player.track();
    let next = tokio::time::timeout(Duration::from_millis(50), track.recv()).await;
    assert!(next.is_err());
    Ok(())
}

#[tokio::test]
async fn test_send_fails_on_closed_track() -> Result<()> {
    let player = player();
    player.close();

    let result = player.send_utterance(&response(100)).await;
    assert!(matches!(result, Err(PlayerError::Stream(_))));
    assert!(player.track().recv().await.is_err());
    Ok(())
}

#[tokio::test]
async fn test_hang_up_mid_send() -> Result<()> {
    let player = player();
    let track = player.track();
    let transport = tokio::spawn(async move {
        // Pull a few frames, then hang up
        for _ in 0..3 {
            track.recv().await.ok();
        }
        track.close();
    });

    let result = player.send_utterance(&response(600)).await;
    assert!(matches!(result, Err(PlayerError::Stream(_))));
    transport.await?;
    Ok(())
}

#[tokio::test]
async fn test_send_rejects_wrong_format() {
    let player = player();
    let mono = AudioFormat {
        sample_rate: 16000,
        channels: 1,
    };
    let result = player.send_utterance(&AudioFrame::silence(160, mono, 0)).await;
    assert!(matches!(result, Err(PlayerError::Format { .. })));
}

#[tokio::test]
async fn test_back_to_back_sends() -> Result<()> {
    let player = player();
    let track = player.track();
    let transport = tokio::spawn(async move {
        let mut count = 0;
        while track.recv().await.is_ok() {
            count += 1;
        }
        count
    });

    player.send_utterance(&response(100)).await?;
    player.send_utterance(&response(200)).await?;
    player.close();

    assert_eq!(transport.await?, 15);
    Ok(())
}
