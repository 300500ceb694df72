mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{audio_response, clients, text_response, RecordingSink, ScriptedTransport};
use stepsim::audio::playback::resample;
use stepsim::audio::{decode_base64, encode_base64, PcmClip, WavSink};
use stepsim::services::SpeechOutcome;
use stepsim::{ErrorKind, ServiceError};

#[test]
fn test_one_second_of_samples_decodes_to_one_second() {
    // Sawtooth across the whole i16 range
    let samples: Vec<i16> = (0..24_000).map(|i| (i as i32 * 3 - 36_000).clamp(-32768, 32767) as i16).collect();

    let clip = decode_base64(&encode_base64(&samples)).unwrap();

    assert_eq!(clip.sample_rate, 24_000);
    assert_eq!(clip.channels, 1);
    assert_eq!(clip.frames(), 24_000);
    assert_eq!(clip.duration(), Duration::from_secs(1));
    assert!(clip.samples.iter().all(|&s| (-1.0..1.0).contains(&s)));
}

#[test]
fn test_round_trip_within_one_lsb() {
    let known: [i16; 7] = [0, 1, -1, 12_345, -12_345, i16::MAX, i16::MIN];

    let clip = decode_base64(&encode_base64(&known)).unwrap();

    for (decoded, original) in clip.samples.iter().zip(known.iter()) {
        let expected = *original as f32 / 32768.0;
        assert!((decoded - expected).abs() < 1.0 / 32768.0);
    }
    assert_eq!(clip.samples[6], -1.0);
    assert!(clip.samples[5] < 1.0);
    assert_eq!(clip.to_i16(), known.to_vec());
}

#[test]
fn test_little_endian_byte_order() {
    // 0x0100 = 256, 0xFF7F = 32767
    let clip = PcmClip::from_s16le(&[0x00, 0x01, 0xFF, 0x7F], 24_000, 1).unwrap();
    assert_eq!(clip.samples, vec![256.0 / 32768.0, 32767.0 / 32768.0]);
}

#[test]
fn test_bad_payloads_are_malformed() {
    assert_eq!(PcmClip::from_s16le(&[1, 2, 3], 24_000, 1).unwrap_err().kind, ErrorKind::Malformed);
    assert_eq!(decode_base64("not base64 at all!").unwrap_err().kind, ErrorKind::Malformed);
}

#[tokio::test]
async fn test_speak_plays_decoded_audio() {
    let transport = ScriptedTransport::new();
    let sink = Arc::new(RecordingSink::default());
    transport.push(Ok(audio_response(&encode_base64(&vec![1000i16; 12_000]))));
    let (_, speech) = clients(transport.clone(), sink.clone(), 3);

    let outcome = speech.speak("שלום! מה תרצה להזמין?").await;

    assert_eq!(outcome, SpeechOutcome::Played { duration: Duration::from_millis(500) });
    assert_eq!(sink.played(), 1);
    assert_eq!(sink.clips.lock().unwrap()[0].frames(), 12_000);

    // Fixed voice profile, audio modality, no system instruction
    let body = serde_json::to_value(transport.last_request()).unwrap();
    assert_eq!(transport.last_request().model, "gemini-2.5-flash-preview-tts");
    assert_eq!(body["generationConfig"]["responseModalities"][0], "AUDIO");
    assert_eq!(
        body["generationConfig"]["speechConfig"]["voiceConfig"]["prebuiltVoiceConfig"]["voiceName"],
        "Kore"
    );
    assert!(body.get("systemInstruction").is_none());
    assert_eq!(body["contents"][0]["parts"][0]["text"], "שלום! מה תרצה להזמין?");
}

#[tokio::test]
async fn test_speak_blank_text_is_skipped() {
    let transport = ScriptedTransport::new();
    let sink = Arc::new(RecordingSink::default());
    let (_, speech) = clients(transport.clone(), sink.clone(), 3);

    assert_eq!(speech.speak("  ").await, SpeechOutcome::Skipped);
    assert_eq!(transport.calls(), 0);
    assert_eq!(sink.played(), 0);
}

#[tokio::test]
async fn test_speak_swallows_quota_errors_without_retry() {
    let transport = ScriptedTransport::new();
    let sink = Arc::new(RecordingSink::default());
    transport.push(Err(ServiceError::rate_limited("HTTP 429: quota")));
    let (_, speech) = clients(transport.clone(), sink.clone(), 3);

    let outcome = speech.speak("שלום").await;

    assert_eq!(outcome, SpeechOutcome::Failed { kind: ErrorKind::RateLimited });
    assert_eq!(transport.calls(), 1, "Synthesis is never retried");
    assert_eq!(sink.played(), 0);
}

#[tokio::test]
async fn test_speak_without_audio_part_fails_softly() {
    let transport = ScriptedTransport::new();
    let sink = Arc::new(RecordingSink::default());
    transport.push(Ok(text_response("I can only talk, sorry")));
    let (_, speech) = clients(transport.clone(), sink.clone(), 3);

    assert_eq!(speech.speak("שלום").await, SpeechOutcome::Failed { kind: ErrorKind::Malformed });
    assert_eq!(sink.played(), 0);
}

#[tokio::test]
async fn test_every_call_synthesizes_afresh() {
    let transport = ScriptedTransport::new();
    let sink = Arc::new(RecordingSink::default());
    let b64 = encode_base64(&[0i16; 2400]);
    transport.push(Ok(audio_response(&b64)));
    transport.push(Ok(audio_response(&b64)));
    let (_, speech) = clients(transport.clone(), sink.clone(), 3);

    speech.speak("שלום").await;
    speech.speak("שלום").await;

    assert_eq!(transport.calls(), 2, "No text-to-audio cache");
    assert_eq!(sink.played(), 2);
}

#[test]
fn test_wav_sink_writes_readable_file() {
    let dir = std::env::temp_dir().join(format!("stepsim-wav-{}", uuid::Uuid::new_v4()));
    let sink = WavSink::new(&dir);
    let clip = decode_base64(&encode_base64(&[0, 16_384, -16_384, i16::MAX])).unwrap();

    let path = sink.write(&clip).unwrap();

    let reader = hound::WavReader::open(&path).unwrap();
    let spec = reader.spec();
    assert_eq!(spec.sample_rate, 24_000);
    assert_eq!(spec.channels, 1);
    assert_eq!(spec.bits_per_sample, 16);
    let samples: Vec<i16> = reader.into_samples::<i16>().map(|s| s.unwrap()).collect();
    assert_eq!(samples, vec![0, 16_384, -16_384, i16::MAX]);
    assert!(path.ends_with("line-0001.wav"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_resample_to_device_rate() {
    let input = vec![0.25f32; 24_000];

    let out = resample(&input, 24_000, 48_000).unwrap();

    // Whole input chunks plus zero padding of the last one
    assert!(out.len() >= 48_000 && out.len() <= 48_000 + 4096, "got {}", out.len());
    assert_eq!(resample(&input, 24_000, 24_000).unwrap(), input);
}
