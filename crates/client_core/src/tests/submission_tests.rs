use super::*;
use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};
use shared::protocol::{FACIAL_EMOTION_PATH, SPEECH_EMOTION_PATH, TEXT_EMOTION_PATH};
use tokio::{net::TcpListener, sync::Mutex};

use crate::artifact::{ArtifactOrigin, TextArtifact};

#[derive(Debug, Clone, PartialEq)]
struct ReceivedPart {
    endpoint: &'static str,
    field: String,
    file_name: Option<String>,
    content_type: Option<String>,
    bytes: Vec<u8>,
}

#[derive(Clone, Default)]
struct MockState {
    text_requests: Arc<Mutex<Vec<Value>>>,
    parts: Arc<Mutex<Vec<ReceivedPart>>>,
}

async fn handle_text(State(state): State<MockState>, Json(payload): Json<Value>) -> Json<Value> {
    state.text_requests.lock().await.push(payload);
    Json(json!({ "emotion": "joy", "recommendations": ["Song A", "Song B"] }))
}

async fn handle_facial(State(state): State<MockState>, multipart: Multipart) -> Json<Value> {
    record_parts(&state, FACIAL_EMOTION_PATH, multipart).await;
    Json(json!({ "emotion": "happy", "confidence": 0.91 }))
}

async fn handle_speech(State(state): State<MockState>, multipart: Multipart) -> Json<Value> {
    record_parts(&state, SPEECH_EMOTION_PATH, multipart).await;
    Json(json!({ "emotion": "calm" }))
}

async fn record_parts(state: &MockState, endpoint: &'static str, mut multipart: Multipart) {
    while let Ok(Some(field)) = multipart.next_field().await {
        let field_name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map(|b| b.to_vec()).unwrap_or_default();
        state.parts.lock().await.push(ReceivedPart {
            endpoint,
            field: field_name,
            file_name,
            content_type,
            bytes,
        });
    }
}

async fn handle_not_json() -> impl IntoResponse {
    (StatusCode::OK, "definitely not json")
}

async fn handle_unprocessable() -> impl IntoResponse {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(json!({ "error": "audio too short" })),
    )
}

async fn handle_server_error() -> impl IntoResponse {
    (StatusCode::INTERNAL_SERVER_ERROR, "boom")
}

async fn serve(app: Router) -> anyhow::Result<String> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(format!("http://{addr}"))
}

async fn spawn_analysis_server() -> anyhow::Result<(String, MockState)> {
    let state = MockState::default();
    let app = Router::new()
        .route(TEXT_EMOTION_PATH, post(handle_text))
        .route(FACIAL_EMOTION_PATH, post(handle_facial))
        .route(SPEECH_EMOTION_PATH, post(handle_speech))
        .with_state(state.clone());
    Ok((serve(app).await?, state))
}

async fn spawn_failing_server() -> anyhow::Result<String> {
    let app = Router::new()
        .route(TEXT_EMOTION_PATH, post(handle_not_json))
        .route(FACIAL_EMOTION_PATH, post(handle_server_error))
        .route(SPEECH_EMOTION_PATH, post(handle_unprocessable));
    serve(app).await
}

fn captured_image(bytes: Vec<u8>) -> BinaryArtifact {
    BinaryArtifact {
        filename: "captured_image.jpg".into(),
        mime_type: "image/jpeg".into(),
        bytes,
        origin: ArtifactOrigin::Captured,
    }
}

fn recorded_audio(bytes: Vec<u8>) -> BinaryArtifact {
    BinaryArtifact {
        filename: "recorded_audio.wav".into(),
        mime_type: "audio/wav".into(),
        bytes,
        origin: ArtifactOrigin::Captured,
    }
}

#[tokio::test]
async fn text_is_posted_as_json_body() {
    let (base_url, state) = spawn_analysis_server().await.expect("spawn server");
    let service = SubmissionService::new(Arc::new(HttpEmotionBackend::new(format!("{base_url}/"))));

    let report = service
        .submit(&InputArtifact::Text(TextArtifact::Typed(
            "I feel great today".into(),
        )))
        .await
        .expect("submit");

    assert_eq!(
        report,
        EmotionReport::Text(TextEmotionResponse {
            emotion: "joy".into(),
            recommendations: vec![json!("Song A"), json!("Song B")],
        })
    );
    assert_eq!(
        *state.text_requests.lock().await,
        vec![json!({ "text": "I feel great today" })]
    );
}

#[tokio::test]
async fn image_is_posted_as_multipart_file_field() {
    let (base_url, state) = spawn_analysis_server().await.expect("spawn server");
    let service = SubmissionService::new(Arc::new(HttpEmotionBackend::new(base_url)));

    let report = service
        .submit(&InputArtifact::Face(captured_image(vec![0xFF, 0xD8, 0xFF, 0xE0])))
        .await
        .expect("submit");

    assert_eq!(report.mode(), Mode::Face);
    assert_eq!(report.emotion(), Some("happy"));
    assert_eq!(
        *state.parts.lock().await,
        vec![ReceivedPart {
            endpoint: FACIAL_EMOTION_PATH,
            field: "file".into(),
            file_name: Some("captured_image.jpg".into()),
            content_type: Some("image/jpeg".into()),
            bytes: vec![0xFF, 0xD8, 0xFF, 0xE0],
        }]
    );
    assert!(state.text_requests.lock().await.is_empty());
}

#[tokio::test]
async fn audio_goes_to_speech_endpoint() {
    let (base_url, state) = spawn_analysis_server().await.expect("spawn server");
    let service = SubmissionService::new(Arc::new(HttpEmotionBackend::new(base_url)));

    let report = service
        .submit(&InputArtifact::Speech(recorded_audio(b"RIFF0000WAVE".to_vec())))
        .await
        .expect("submit");

    assert_eq!(report.emotion(), Some("calm"));
    let parts = state.parts.lock().await;
    assert_eq!(parts.len(), 1);
    assert_eq!(parts[0].endpoint, SPEECH_EMOTION_PATH);
    assert_eq!(parts[0].field, UPLOAD_FIELD);
    assert_eq!(parts[0].file_name.as_deref(), Some("recorded_audio.wav"));
}

#[tokio::test]
async fn empty_binary_payload_is_not_sent() {
    let (base_url, state) = spawn_analysis_server().await.expect("spawn server");
    let service = SubmissionService::new(Arc::new(HttpEmotionBackend::new(base_url)));

    let err = service
        .submit(&InputArtifact::Face(captured_image(Vec::new())))
        .await
        .expect_err("empty image");

    assert!(matches!(err, SubmissionError::EmptyPayload(Mode::Face)));
    assert!(state.parts.lock().await.is_empty());
}

#[tokio::test]
async fn error_status_maps_to_rejected_with_body() {
    let base_url = spawn_failing_server().await.expect("spawn server");
    let backend = HttpEmotionBackend::new(base_url);

    let err = backend
        .speech_emotion(&recorded_audio(b"RIFF".to_vec()))
        .await
        .expect_err("422");
    match err {
        SubmissionError::Rejected(exception) => {
            assert_eq!(exception.status, 422);
            assert_eq!(exception.body.message(), Some("audio too short"));
        }
        other => panic!("expected rejection, got {other:?}"),
    }

    let err = backend
        .facial_emotion(&captured_image(vec![1]))
        .await
        .expect_err("500");
    match err {
        SubmissionError::Rejected(exception) => {
            assert_eq!(exception.status, 500);
            assert_eq!(exception.body, ApiErrorBody::default());
        }
        other => panic!("expected rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn unparseable_success_body_is_malformed() {
    let base_url = spawn_failing_server().await.expect("spawn server");
    let backend = HttpEmotionBackend::new(base_url);

    let err = backend
        .text_emotion(TextEmotionRequest {
            text: "hello".into(),
        })
        .await
        .expect_err("not json");
    assert!(matches!(err, SubmissionError::Malformed(_)));
}

#[tokio::test]
async fn unreachable_backend_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let backend = HttpEmotionBackend::new(format!("http://{addr}"));
    let err = backend
        .text_emotion(TextEmotionRequest {
            text: "hello".into(),
        })
        .await
        .expect_err("connection refused");
    assert!(matches!(err, SubmissionError::Transport(_)));
}

#[test]
fn endpoint_joins_base_without_double_slash() {
    let backend = HttpEmotionBackend::new("http://localhost:8000///");
    assert_eq!(
        backend.endpoint(Mode::Text),
        "http://localhost:8000/api/text_emotion/"
    );
    assert_eq!(
        backend.endpoint(Mode::Speech),
        "http://localhost:8000/api/speech_emotion/"
    );
}
