//! End-to-end session scenarios over scripted services.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, broadcast, oneshot};

use glowguide::acquire::FileCandidate;
use glowguide::analysis::{Advice, AnalysisResult, SkinType};
use glowguide::chat::{DEFAULT_GREETING, Origin};
use glowguide::config::SessionConfig;
use glowguide::directory::Provider;
use glowguide::error::{AnalysisError, ChatError, DirectoryError, LocationError};
use glowguide::location::Coordinate;
use glowguide::services::{
    AnalysisService, CameraDevice, ConversationalService, DirectoryService, GeolocationProvider,
    NoCamera, StaticPosition,
};
use glowguide::session::{GlowSession, Services, SessionEvent};
use glowguide::stage::StageStatus;

/// Scripted analysis service: each call resolves from the next oneshot.
struct ScriptedAnalysis {
    calls: Mutex<Vec<oneshot::Receiver<Result<AnalysisResult, AnalysisError>>>>,
}

#[async_trait]
impl AnalysisService for ScriptedAnalysis {
    async fn analyze(
        &self,
        _image: &[u8],
        _media_type: &str,
    ) -> Result<AnalysisResult, AnalysisError> {
        let rx = self.calls.lock().await.pop().expect("unexpected analyze call");
        rx.await.expect("script dropped")
    }
}

/// Directory service that counts calls and answers with a fixed roster.
struct FixedDirectory {
    providers: Vec<Provider>,
    calls: AtomicUsize,
}

#[async_trait]
impl DirectoryService for FixedDirectory {
    async fn search(&self, _at: Coordinate) -> Result<Vec<Provider>, DirectoryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.providers.clone())
    }
}

struct ScriptedChat {
    calls: Mutex<Vec<oneshot::Receiver<Result<String, ChatError>>>>,
}

#[async_trait]
impl ConversationalService for ScriptedChat {
    async fn respond(&self, _message: &str) -> Result<String, ChatError> {
        let rx = self.calls.lock().await.pop().expect("unexpected respond call");
        rx.await.expect("script dropped")
    }
}

struct TestHarness {
    session: GlowSession,
    events: broadcast::Receiver<SessionEvent>,
    analysis_script: Vec<oneshot::Sender<Result<AnalysisResult, AnalysisError>>>,
    chat_script: Vec<oneshot::Sender<Result<String, ChatError>>>,
    directory: Arc<FixedDirectory>,
}

fn scripted<T>(count: usize) -> (Mutex<Vec<oneshot::Receiver<T>>>, Vec<oneshot::Sender<T>>) {
    let mut senders = Vec::new();
    let mut receivers = Vec::new();
    for _ in 0..count {
        let (tx, rx) = oneshot::channel();
        senders.push(tx);
        receivers.push(rx);
    }
    receivers.reverse();
    (Mutex::new(receivers), senders)
}

fn mock_providers() -> Vec<Provider> {
    vec![
        Provider {
            id: "1".into(),
            name: "Dr. Priya Sharma".into(),
            clinic_name: "Metro Dermatology Center".into(),
            address: "123 Main Road, Central District".into(),
            distance_km: 2.3,
            phone: "+91-11-2851-2345".into(),
            rating: Some(4.8),
            specialization: Some("Clinical Dermatology".into()),
        },
        Provider {
            id: "2".into(),
            name: "Dr. Rajesh Kumar".into(),
            clinic_name: "Skin Care Specialists".into(),
            address: "456 Medical Complex, City Center".into(),
            distance_km: 3.7,
            phone: "+91-11-2852-6789".into(),
            rating: Some(4.6),
            specialization: Some("Cosmetic Dermatology".into()),
        },
        Provider {
            id: "3".into(),
            name: "Dr. Meera Nair".into(),
            clinic_name: "Advanced Skin Clinic".into(),
            address: "789 Health Plaza, Downtown".into(),
            distance_km: 5.1,
            phone: "+91-11-2853-9012".into(),
            rating: Some(4.7),
            specialization: Some("Pediatric Dermatology".into()),
        },
    ]
}

fn build_harness(
    geolocation: Arc<dyn GeolocationProvider>,
    camera: Arc<dyn CameraDevice>,
    analysis_calls: usize,
    chat_calls: usize,
) -> TestHarness {
    let (analysis_rx, analysis_script) = scripted(analysis_calls);
    let (chat_rx, chat_script) = scripted(chat_calls);
    let directory = Arc::new(FixedDirectory {
        providers: mock_providers(),
        calls: AtomicUsize::new(0),
    });

    let session = GlowSession::new(
        Services {
            analysis: Arc::new(ScriptedAnalysis { calls: analysis_rx }),
            geolocation,
            directory: directory.clone(),
            conversation: Arc::new(ScriptedChat { calls: chat_rx }),
            camera,
        },
        SessionConfig::default(),
    );
    let events = session.subscribe();
    TestHarness {
        session,
        events,
        analysis_script,
        chat_script,
        directory,
    }
}

async fn next_event(rx: &mut broadcast::Receiver<SessionEvent>) -> SessionEvent {
    tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("no event within deadline")
        .expect("event channel closed")
}

fn png_candidate() -> FileCandidate {
    FileCandidate {
        name: "face.png".into(),
        media_type: "image/png".into(),
        bytes: vec![0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a],
    }
}

#[tokio::test]
async fn acquire_analyze_and_present_results() {
    let mut h = build_harness(
        Arc::new(StaticPosition::unavailable()),
        Arc::new(NoCamera),
        1,
        0,
    );

    h.session.acquire.select_file(png_candidate()).await.unwrap();
    h.session.analyze().await.unwrap();
    assert!(h.session.analysis.status().await.is_pending());

    h.analysis_script
        .remove(0)
        .send(Ok(AnalysisResult {
            skin_type: SkinType::Combination,
            confidence: 0.85,
            issues: vec!["mild acne".into(), "dry patches".into()],
            advice: Advice {
                home_remedies: vec![
                    "Gentle honey mask twice weekly for natural antibacterial benefits".into(),
                ],
                chemicals: vec![
                    "Salicylic acid (BHA) - Gentle exfoliant for acne-prone areas.".into(),
                ],
            },
        }))
        .unwrap();

    loop {
        if let SessionEvent::AnalysisChanged(status) = next_event(&mut h.events).await {
            if status.is_succeeded() {
                break;
            }
        }
    }

    let report = h.session.report().await.expect("report should be present");
    assert_eq!(report.skin_type, "Combination");
    assert_eq!(report.confidence_percent, 85);
    assert_eq!(report.issues, vec!["mild acne", "dry patches"]);
    assert_eq!(report.home_remedies.len(), 1);
    assert_eq!(report.chemicals.len(), 1);
}

#[tokio::test]
async fn rejected_file_does_not_reach_analysis() {
    let h = build_harness(
        Arc::new(StaticPosition::unavailable()),
        Arc::new(NoCamera),
        0,
        0,
    );

    let err = h
        .session
        .acquire
        .select_file(FileCandidate {
            name: "document.pdf".into(),
            media_type: "application/pdf".into(),
            bytes: vec![0x25, 0x50, 0x44, 0x46],
        })
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Not an image: declared media type \"application/pdf\""
    );

    // With nothing acquired, analysis is refused synchronously.
    assert_eq!(
        h.session.analyze().await.unwrap_err(),
        AnalysisError::MissingAsset
    );
    assert!(h.session.analysis.status().await.is_idle());
}

#[tokio::test]
async fn device_denial_then_city_fallback_queries_directory() {
    let mut h = build_harness(
        Arc::new(StaticPosition::unavailable()),
        Arc::new(NoCamera),
        0,
        0,
    );

    // Device strategy fails; no directory query is issued.
    assert_eq!(
        h.session.location.from_device().await.unwrap_err(),
        LocationError::PositionUnavailable
    );
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(h.directory.calls.load(Ordering::SeqCst), 0);
    assert!(h.session.directory.status().await.is_idle());

    // The user falls back to the city strategy by hand.
    let coordinate = h.session.location.from_city("chennai").await.unwrap();
    assert_eq!(coordinate.lat, 13.0827);
    assert_eq!(coordinate.lng, 80.2707);

    loop {
        if let SessionEvent::DirectoryChanged(status) = next_event(&mut h.events).await {
            match status {
                StageStatus::Succeeded(providers) => {
                    assert_eq!(providers.len(), 3);
                    assert_eq!(providers[0].name, "Dr. Priya Sharma");
                    break;
                }
                StageStatus::Pending => continue,
                other => panic!("unexpected directory status {other}"),
            }
        }
    }
    assert_eq!(h.directory.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn device_position_triggers_directory_immediately() {
    let mut h = build_harness(
        Arc::new(StaticPosition::new(Coordinate {
            lat: 19.0760,
            lng: 72.8777,
        })),
        Arc::new(NoCamera),
        0,
        0,
    );

    h.session.location.from_device().await.unwrap();
    loop {
        if let SessionEvent::DirectoryChanged(StageStatus::Succeeded(providers)) =
            next_event(&mut h.events).await
        {
            assert_eq!(providers.len(), 3);
            break;
        }
    }
}

#[tokio::test]
async fn chat_transcript_grows_one_two_three() {
    let mut h = build_harness(
        Arc::new(StaticPosition::unavailable()),
        Arc::new(NoCamera),
        0,
        1,
    );

    assert_eq!(h.session.chat.transcript().await.len(), 1);
    assert_eq!(h.session.chat.transcript().await[0].text, DEFAULT_GREETING);

    h.session.chat.send("hello").await.unwrap();
    assert_eq!(h.session.chat.transcript().await.len(), 2);

    h.chat_script
        .remove(0)
        .send(Ok("That's a great question!".into()))
        .unwrap();
    loop {
        if let SessionEvent::TranscriptAppended(message) = next_event(&mut h.events).await {
            if message.origin == Origin::Assistant && message.text == "That's a great question!" {
                break;
            }
        }
    }
    assert_eq!(h.session.chat.transcript().await.len(), 3);
}

#[tokio::test]
async fn chat_is_independent_of_other_stage_failures() {
    let mut h = build_harness(
        Arc::new(StaticPosition::unavailable()),
        Arc::new(NoCamera),
        0,
        1,
    );

    // Other stages fail around the chat session.
    h.session.location.from_device().await.unwrap_err();
    h.session.location.from_city("gotham").await.unwrap_err();
    h.session.analyze().await.unwrap_err();

    h.session.chat.send("still here?").await.unwrap();
    h.chat_script.remove(0).send(Ok("Still here.".into())).unwrap();
    loop {
        if let SessionEvent::TranscriptAppended(message) = next_event(&mut h.events).await {
            if message.origin == Origin::Assistant {
                assert_eq!(message.text, "Still here.");
                break;
            }
        }
    }
}
