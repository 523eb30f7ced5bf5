// Integration tests for transcript persistence
//
// These tests verify that transcripts are saved as JSON, utterance audio as
// WAV files next to them, and that the outbox keeps only the newest snapshot.

use anyhow::Result;
use moshi_call::audio::{AudioFile, AudioFormat, AudioFrame};
use moshi_call::conversation::{ActivityType, AudioRef, Message, Role, Transcript};
use moshi_call::storage::{audio_ref, JsonFileStore, Outbox, TranscriptStore};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn conversation() -> Result<Transcript> {
    let mut transcript = Transcript::new(ActivityType::Unstructured, "es-ES");
    let usr = Message::user("hola").with_audio(audio_ref(&transcript.id, 0, Role::Usr));
    transcript.push(usr)?;
    transcript.push(Message::assistant("¡hola! ¿qué tal?"))?;
    Ok(transcript)
}

#[tokio::test]
async fn test_save_and_load_transcript() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let store = JsonFileStore::new(temp_dir.path().join("transcripts"))?;
    let transcript = conversation()?;

    store.save(&transcript).await?;

    let path = store.root().join(format!("{}.json", transcript.id));
    assert!(path.exists(), "Transcript file should exist");
    let loaded = store.load(&transcript.id).await?;
    assert_eq!(loaded.id, transcript.id);
    assert_eq!(loaded.language, "es-ES");
    assert_eq!(loaded.messages(), transcript.messages());
    Ok(())
}

#[tokio::test]
async fn test_save_replaces_previous_version() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let store = JsonFileStore::new(temp_dir.path())?;
    let mut transcript = Transcript::new(ActivityType::Unstructured, "en-US");

    store.save(&transcript).await?;
    transcript.push(Message::user("hello"))?;
    store.save(&transcript).await?;

    assert_eq!(store.load(&transcript.id).await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_audio_saved_as_wav() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let store = JsonFileStore::new(temp_dir.path())?;
    let reference = audio_ref("tid-1", 0, Role::Usr);
    assert_eq!(reference.path, "tid-1/000-usr.wav");

    let frame = AudioFrame::new(vec![7; 960 * 2], AudioFormat::default(), 4800);
    store.save_audio(&reference, &frame).await?;

    let audio = AudioFile::open(temp_dir.path().join("tid-1").join("000-usr.wav"))?;
    assert_eq!(audio.frame.samples, frame.samples);
    assert_eq!(audio.frame.format(), frame.format());
    Ok(())
}

#[tokio::test]
async fn test_paths_cannot_escape_root() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let store = JsonFileStore::new(temp_dir.path().join("store"))?;
    let frame = AudioFrame::silence(10, AudioFormat::default(), 0);

    let escape = AudioRef {
        path: "../outside.wav".to_string(),
    };
    assert!(store.save_audio(&escape, &frame).await.is_err());
    assert!(store.load("../../etc/passwd").await.is_err());
    assert!(!temp_dir.path().join("outside.wav").exists());
    Ok(())
}

#[tokio::test]
async fn test_load_missing_transcript() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let store = JsonFileStore::new(temp_dir.path())?;
    assert!(store.load("no-such-transcript").await.is_err());
    Ok(())
}

#[tokio::test]
async fn test_outbox_writes_latest_snapshot_and_audio() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let store = Arc::new(JsonFileStore::new(temp_dir.path())?);
    let outbox = Outbox::new(store.clone());

    let mut transcript = Transcript::new(ActivityType::Unstructured, "en-US");
    let reference = audio_ref(&transcript.id, 0, Role::Usr);
    transcript.push(Message::user("one").with_audio(reference.clone()))?;
    outbox.submit(transcript.clone()).await;
    outbox
        .store_audio(reference, AudioFrame::silence(960, AudioFormat::default(), 0))
        .await;
    transcript.push(Message::assistant("two"))?;
    outbox.submit(transcript.clone()).await;

    assert!(outbox.flush(Duration::from_secs(2)).await);

    let saved = store.load(&transcript.id).await?;
    assert_eq!(saved.len(), 2);
    assert!(temp_dir
        .path()
        .join(&transcript.id)
        .join("000-usr.wav")
        .exists());
    Ok(())
}
