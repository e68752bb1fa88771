//! ResendMailer against a fake provider running on an ephemeral port.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use payup::{
    send_batched_emails, BatchEntry, DispatchConfig, Mailer, MailerError, OutgoingEmail,
    ResendMailer,
};

/// Scripted provider reply.
#[derive(Clone)]
struct Reply {
    status: StatusCode,
    body: String,
    delay: Duration,
}

impl Reply {
    fn new(status: StatusCode, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }
}

#[derive(Default)]
struct FakeProvider {
    replies: Mutex<VecDeque<Reply>>,
    received: Mutex<Vec<(Option<String>, Value)>>,
}

async fn send_email(
    State(provider): State<Arc<FakeProvider>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let auth = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    provider.received.lock().unwrap().push((auth, body));

    let reply = provider
        .replies
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_else(|| Reply::new(StatusCode::OK, r#"{"id":"default"}"#));

    if !reply.delay.is_zero() {
        tokio::time::sleep(reply.delay).await;
    }

    (
        reply.status,
        [(header::CONTENT_TYPE, "application/json")],
        reply.body,
    )
}

async fn spawn_provider(replies: Vec<Reply>) -> (String, Arc<FakeProvider>) {
    let provider = Arc::new(FakeProvider {
        replies: Mutex::new(replies.into()),
        received: Mutex::new(Vec::new()),
    });

    let app = Router::new()
        .route("/emails", post(send_email))
        .with_state(provider.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), provider)
}

fn mailer(base_url: &str, timeout: Duration) -> ResendMailer {
    ResendMailer::new(base_url, "test-key", "PayUp <notifications@payup.app>", timeout).unwrap()
}

fn email(to: &str) -> OutgoingEmail {
    OutgoingEmail {
        to: to.to_string(),
        subject: "Thesis Group: new expense".to_string(),
        html: "<p>You owe 10.00 EUR</p>".to_string(),
        text: Some("You owe 10.00 EUR".to_string()),
    }
}

#[tokio::test]
async fn test_accepted_email_sends_expected_request() {
    let (base, provider) =
        spawn_provider(vec![Reply::new(StatusCode::OK, r#"{"id":"em_123"}"#)]).await;

    mailer(&base, Duration::from_secs(5))
        .send(&email("bob@example.com"))
        .await
        .unwrap();

    let received = provider.received.lock().unwrap();
    assert_eq!(received.len(), 1);

    let (auth, body) = &received[0];
    assert_eq!(auth.as_deref(), Some("Bearer test-key"));
    assert_eq!(body["from"], "PayUp <notifications@payup.app>");
    assert_eq!(body["to"], json!(["bob@example.com"]));
    assert_eq!(body["text"], "You owe 10.00 EUR");
}

#[tokio::test]
async fn test_throttled_response_is_api_error() {
    let (base, _provider) = spawn_provider(vec![Reply::new(
        StatusCode::TOO_MANY_REQUESTS,
        r#"{"statusCode":429,"message":"Too many requests","name":"rate_limit_exceeded"}"#,
    )])
    .await;

    let err = mailer(&base, Duration::from_secs(5))
        .send(&email("bob@example.com"))
        .await
        .unwrap_err();

    assert!(err.is_rate_limited());
    match err {
        MailerError::Api { status, body } => {
            assert_eq!(status, 429);
            assert_eq!(body["message"], "Too many requests");
        }
        other => panic!("Expected Api error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_non_json_error_body_is_wrapped() {
    let (base, _provider) = spawn_provider(vec![Reply::new(
        StatusCode::INTERNAL_SERVER_ERROR,
        "upstream exploded",
    )])
    .await;

    let err = mailer(&base, Duration::from_secs(5))
        .send(&email("bob@example.com"))
        .await
        .unwrap_err();

    match err {
        MailerError::Api { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(
                body,
                json!({"statusCode": 500, "message": "upstream exploded"})
            );
        }
        other => panic!("Expected Api error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_slow_provider_hits_request_timeout() {
    let (base, _provider) = spawn_provider(vec![Reply {
        status: StatusCode::OK,
        body: r#"{"id":"late"}"#.to_string(),
        delay: Duration::from_secs(5),
    }])
    .await;

    let err = mailer(&base, Duration::from_millis(100))
        .send(&email("bob@example.com"))
        .await
        .unwrap_err();

    assert!(matches!(err, MailerError::Transport(_)));
}

#[tokio::test]
async fn test_batch_recovers_from_throttling() {
    let (base, provider) = spawn_provider(vec![
        Reply::new(
            StatusCode::TOO_MANY_REQUESTS,
            r#"{"statusCode":429,"message":"Too many requests"}"#,
        ),
        Reply::new(StatusCode::OK, r#"{"id":"em_1"}"#),
        Reply::new(StatusCode::UNPROCESSABLE_ENTITY, r#"{"message":"Invalid `to` field"}"#),
        Reply::new(StatusCode::UNPROCESSABLE_ENTITY, r#"{"message":"Invalid `to` field"}"#),
    ])
    .await;

    let config = DispatchConfig {
        delay_between_emails: Duration::from_millis(10),
        max_retries: 2,
        retry_delay: Duration::from_millis(20),
    };

    let notifications = vec![
        BatchEntry::Custom(email("bob@example.com")).into_notification(),
        BatchEntry::Custom(email("not-an-address")).into_notification(),
    ];

    let result = send_batched_emails(
        Arc::new(mailer(&base, Duration::from_secs(5))),
        notifications,
        config,
    )
    .await;

    assert_eq!(result.total, 2);
    assert_eq!(result.successful, 1);
    assert_eq!(result.failed, 1);
    assert_eq!(result.errors[0].email, "not-an-address");
    assert_eq!(result.errors[0].error, "Invalid `to` field");
    assert_eq!(provider.received.lock().unwrap().len(), 4);
}
