use std::time::Duration;
use wa_relay::config::ResponderConfig;
use wa_relay::error::ResponderError;
use wa_relay::responder::{
    build_request_url, decode_query_value, encode_query_value, HttpResponder, Responder,
    NO_REPLY_SENTINEL,
};
use wa_relay::types::{ConversationId, RelayRequest, Reply};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn request(text: &str, chat: &str) -> RelayRequest {
    RelayRequest {
        text: text.to_string(),
        chat: ConversationId::new(chat),
    }
}

fn responder_for(server: &MockServer) -> HttpResponder {
    HttpResponder::new(&ResponderConfig {
        url: format!("{}/chat", server.uri()),
        timeout_secs: 5,
    })
    .unwrap()
}

#[tokio::test]
async fn test_ask_returns_reply_text() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/chat"))
        .and(query_param("q", "Alice: hi"))
        .and(query_param("chat_id", "123@g.us"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Hello"))
        .expect(1)
        .mount(&server)
        .await;

    let reply = responder_for(&server)
        .ask(&request("Alice: hi", "123@g.us"))
        .await
        .unwrap();
    assert_eq!(reply, Reply::Text("Hello".to_string()));
}

#[tokio::test]
async fn test_ask_sentinel_is_no_reply() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_string(NO_REPLY_SENTINEL))
        .mount(&server)
        .await;

    let reply = responder_for(&server)
        .ask(&request("Bob: anyone?", "447700900000@s.whatsapp.net"))
        .await
        .unwrap();
    assert_eq!(reply, Reply::NoReply);
}

#[tokio::test]
async fn test_ask_empty_body_is_not_the_sentinel() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/chat"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let reply = responder_for(&server)
        .ask(&request("Bob: hi", "1@s.whatsapp.net"))
        .await
        .unwrap();
    assert_eq!(reply, Reply::Text(String::new()));
}

#[tokio::test]
async fn test_ask_special_characters_reach_responder_intact() {
    let server = MockServer::start().await;
    let text = "Zoë: fish & chips? 50% off + more ☕";
    Mock::given(method("GET"))
        .and(path("/chat"))
        .and(query_param("q", text))
        .and(query_param("chat_id", "120363@g.us"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&server)
        .await;

    let reply = responder_for(&server)
        .ask(&request(text, "120363@g.us"))
        .await
        .unwrap();
    assert_eq!(reply, Reply::Text("ok".to_string()));
}

#[tokio::test]
async fn test_ask_error_status_is_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/chat"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let err = responder_for(&server)
        .ask(&request("Alice: hi", "123@g.us"))
        .await
        .unwrap_err();
    match err {
        ResponderError::Status { status, body } => {
            assert_eq!(status.as_u16(), 500);
            assert_eq!(body, "boom");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_ask_connection_refused() {
    let server = MockServer::start().await;
    let endpoint = format!("{}/chat", server.uri());
    drop(server);

    let responder = HttpResponder::new(&ResponderConfig {
        url: endpoint,
        timeout_secs: 5,
    })
    .unwrap();
    let err = responder
        .ask(&request("Alice: hi", "123@g.us"))
        .await
        .unwrap_err();
    assert!(matches!(err, ResponderError::Request(_)));
}

#[tokio::test]
async fn test_ask_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/chat"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("late")
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_millis(200))
        .build()
        .unwrap();
    let responder = HttpResponder::with_client(client, format!("{}/chat", server.uri()));
    let err = responder
        .ask(&request("Alice: hi", "123@g.us"))
        .await
        .unwrap_err();
    assert!(matches!(err, ResponderError::Timeout));
}

#[test]
fn test_percent_encoding_round_trip() {
    let inputs = [
        "Alice: hello world",
        "a&b=c",
        "Zoë: ¿qué tal? 👋",
        "120363025246125486@g.us",
        "100% + 1",
        "",
    ];
    for input in inputs {
        let encoded = encode_query_value(input);
        assert!(!encoded.contains(' '));
        assert!(!encoded.contains('&'));
        assert_eq!(decode_query_value(&encoded).unwrap(), input);
    }
}

#[test]
fn test_request_url_shape() {
    let url = build_request_url(
        "http://localhost:5001/chat",
        &request("Alice: a & b", "123@g.us"),
    );
    assert_eq!(
        url,
        "http://localhost:5001/chat?q=Alice%3A%20a%20%26%20b&chat_id=123%40g.us"
    );
}
