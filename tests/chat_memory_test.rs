// ABOUTME: Integration tests for AI chat with persistent conversation memory
// ABOUTME: Fallback replies without a model, summaries, ordering, and a local mock completion endpoint
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Lifelog Contributors

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;
use lifelog_server::config::LlmConfig;
use lifelog_server::errors::ErrorCode;
use lifelog_server::llm::{LlmClient, ReplySource, FALLBACK_LABEL};
use lifelog_server::persistence::{EntityKind, Filter, Operation};
use lifelog_server::services::ChatMemoryService;
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use common::test_user;

async fn offline_service() -> Result<(ChatMemoryService, Arc<lifelog_server::persistence::DualStore>)>
{
    let (store, _secondary) = common::fallback_only().await?;
    let store = Arc::new(store);
    Ok((ChatMemoryService::new(store.clone(), LlmClient::disabled()), store))
}

#[tokio::test]
async fn offline_replies_are_labeled_and_stored() -> Result<()> {
    let (chat, store) = offline_service().await?;
    let auth = test_user("offline");
    let conversation = chat.start_conversation(&auth, "Evening check-in").await?;
    let id = conversation.id().unwrap().to_owned();

    let turn = chat.send_message(&auth, &id, "I walked 5km today").await?;
    assert_eq!(turn.source, ReplySource::Fallback);
    let reply = turn.reply.get_str("content").unwrap();
    assert!(reply.starts_with(FALLBACK_LABEL), "reply was {reply}");
    assert_eq!(turn.user_message.get_i64("position"), Some(0));
    assert_eq!(turn.reply.get_i64("position"), Some(1));

    let stored = store
        .execute(
            EntityKind::AiConversation,
            Operation::Read,
            Filter::for_owner(&auth).with_id(&id),
        )
        .await?
        .into_record()?;
    let summary = stored.get_str("summary").unwrap();
    assert!(summary.contains("I walked 5km today"));
    Ok(())
}

#[tokio::test]
async fn history_keeps_turn_order() -> Result<()> {
    let (chat, _store) = offline_service().await?;
    let auth = test_user("order");
    let id = chat
        .start_conversation(&auth, "Daily")
        .await?
        .id()
        .unwrap()
        .to_owned();

    for text in ["first", "second", "third"] {
        chat.send_message(&auth, &id, text).await?;
    }

    let history = chat.history(&auth, &id).await?;
    let roles: Vec<&str> = history.iter().filter_map(|m| m.get_str("role")).collect();
    assert_eq!(
        roles,
        vec!["user", "assistant", "user", "assistant", "user", "assistant"]
    );
    let positions: Vec<i64> = history.iter().filter_map(|m| m.get_i64("position")).collect();
    assert_eq!(positions, vec![0, 1, 2, 3, 4, 5]);
    assert_eq!(history[4].get_str("content"), Some("third"));
    Ok(())
}

#[tokio::test]
async fn other_users_cannot_post_or_read() -> Result<()> {
    let (chat, _store) = offline_service().await?;
    let owner = test_user("owner");
    let stranger = test_user("stranger");
    let id = chat
        .start_conversation(&owner, "Private")
        .await?
        .id()
        .unwrap()
        .to_owned();

    let err = chat.send_message(&stranger, &id, "hello?").await.unwrap_err();
    assert_eq!(err.code, ErrorCode::ResourceNotFound);
    let err = chat.history(&stranger, &id).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::ResourceNotFound);
    assert!(chat.history(&owner, &id).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn blank_messages_and_titles_are_rejected() -> Result<()> {
    let (chat, _store) = offline_service().await?;
    let auth = test_user("blank");

    let err = chat.start_conversation(&auth, "   ").await.unwrap_err();
    assert_eq!(err.code, ErrorCode::MissingRequiredField);

    let id = chat
        .start_conversation(&auth, "Notes")
        .await?
        .id()
        .unwrap()
        .to_owned();
    let err = chat.send_message(&auth, &id, " \n ").await.unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidInput);
    Ok(())
}

/// One-route HTTP server answering every request with the same completion
async fn mock_completion_endpoint(content: &str) -> Result<(String, Arc<AtomicUsize>)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let url = format!("http://{}/v1/chat/completions", listener.local_addr()?);
    let hits = Arc::new(AtomicUsize::new(0));

    let body = json!({
        "choices": [{ "message": { "role": "assistant", "content": content } }]
    })
    .to_string();
    let counter = hits.clone();
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            let body = body.clone();
            tokio::spawn(async move {
                let _ = answer(socket, &body).await;
            });
        }
    });
    Ok((url, hits))
}

async fn answer(mut socket: TcpStream, body: &str) -> Result<()> {
    let mut request = Vec::new();
    let mut chunk = [0_u8; 4096];
    loop {
        let read = socket.read(&mut chunk).await?;
        if read == 0 {
            break;
        }
        request.extend_from_slice(&chunk[..read]);
        let text = String::from_utf8_lossy(&request);
        if let Some(end) = text.find("\r\n\r\n") {
            let length = text[..end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if request.len() >= end + 4 + length {
                break;
            }
        }
    }

    let response = format!(
        "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
        body.len()
    );
    socket.write_all(response.as_bytes()).await?;
    socket.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn model_replies_refresh_the_summary() -> Result<()> {
    let (url, hits) = mock_completion_endpoint("{\"summary\": \"Enjoys long walks.\"}").await?;
    let llm = LlmClient::from_config(&LlmConfig {
        url: Some(url),
        api_key: "test-key".to_owned(),
        model: "mock-model".to_owned(),
        timeout_secs: 5,
    })?;
    let (store, _secondary) = common::fallback_only().await?;
    let store = Arc::new(store);
    let chat = ChatMemoryService::new(store.clone(), llm);
    let auth = test_user("model");

    let conversation = chat.start_conversation(&auth, "Walks").await?;
    assert_eq!(conversation.get_str("model"), Some("mock-model"));
    let id = conversation.id().unwrap().to_owned();

    let turn = chat.send_message(&auth, &id, "I love walking").await?;
    assert_eq!(turn.source, ReplySource::Model);
    assert!(!turn.reply.get_str("content").unwrap().starts_with(FALLBACK_LABEL));
    // one completion for the reply, one for the summary
    assert_eq!(hits.load(Ordering::SeqCst), 2);

    let stored = store
        .execute(
            EntityKind::AiConversation,
            Operation::Read,
            Filter::for_owner(&auth).with_id(&id),
        )
        .await?
        .into_record()?;
    assert_eq!(stored.get_str("summary"), Some("Enjoys long walks."));
    Ok(())
}

#[tokio::test]
async fn unreachable_model_falls_back() -> Result<()> {
    // bind then drop: nothing listens on this port any more
    let port = TcpListener::bind("127.0.0.1:0").await?.local_addr()?.port();
    let llm = LlmClient::from_config(&LlmConfig {
        url: Some(format!("http://127.0.0.1:{port}/v1/chat/completions")),
        timeout_secs: 2,
        ..LlmConfig::default()
    })?;
    let (store, _secondary) = common::fallback_only().await?;
    let chat = ChatMemoryService::new(Arc::new(store), llm);
    let auth = test_user("unreachable");
    let id = chat
        .start_conversation(&auth, "Down")
        .await?
        .id()
        .unwrap()
        .to_owned();

    let turn = chat.send_message(&auth, &id, "anyone there?").await?;
    assert_eq!(turn.source, ReplySource::Fallback);
    assert!(turn.reply.get_str("content").unwrap().starts_with(FALLBACK_LABEL));
    Ok(())
}
