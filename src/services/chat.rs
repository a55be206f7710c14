// ABOUTME: AI chat with persistent conversation memory
// ABOUTME: Stores every message, answers through the LLM, and keeps a rolling summary per conversation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Lifelog Contributors

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::{AppError, AppResult};
use crate::llm::{extract_json, ChatMessage, CompletionRequest, LlmClient, ReplySource};
use crate::models::{AuthContext, Record};
use crate::persistence::{DualStore, EntityKind, Filter, Operation};

/// Messages replayed to the model besides the summary
pub const RECENT_MESSAGES: usize = 10;

/// Longest summary kept, in characters
pub const MAX_SUMMARY_CHARS: usize = 2000;

const SYSTEM_PROMPT: &str = "You are a supportive personal life coach. \
    Answer briefly and warmly, and refer back to what the user told you before when relevant.";

const SUMMARY_PROMPT: &str = "Update the running summary of this conversation. \
    Reply with JSON only: {\"summary\": \"...\"}. Keep it under 150 words.";

const FALLBACK_REPLY: &str =
    "I can't reach my assistant right now, but your message has been saved.";

/// One exchange: the stored user message and the stored reply
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatTurn {
    /// User message as stored
    pub user_message: Record,
    /// Assistant message as stored
    pub reply: Record,
    /// Whether the reply came from the model
    pub source: ReplySource,
}

#[derive(Deserialize)]
struct SummaryReply {
    summary: String,
}

/// Conversations of the authenticated user
#[derive(Clone)]
pub struct ChatMemoryService {
    store: Arc<DualStore>,
    llm: LlmClient,
}

impl ChatMemoryService {
    /// Service over the given accessor and model client
    #[must_use]
    pub const fn new(store: Arc<DualStore>, llm: LlmClient) -> Self {
        Self { store, llm }
    }

    /// Start an empty conversation
    ///
    /// # Errors
    ///
    /// Returns an error if the title is blank or storage is unavailable
    pub async fn start_conversation(&self, auth: &AuthContext, title: &str) -> AppResult<Record> {
        let payload = Record::new()
            .with("title", title.trim())
            .with("model", self.llm.model());
        self.store
            .execute(
                EntityKind::AiConversation,
                Operation::Create(payload),
                Filter::for_owner(auth),
            )
            .await?
            .into_record()
    }

    /// Messages of a conversation, oldest first
    ///
    /// # Errors
    ///
    /// Returns `resource_not_found` if the caller does not own the
    /// conversation, or an error if storage is unavailable
    pub async fn history(&self, auth: &AuthContext, conversation_id: &str) -> AppResult<Vec<Record>> {
        self.conversation(auth, conversation_id).await?;
        self.messages(auth, conversation_id).await
    }

    /// Store a user message, answer it, and refresh the conversation summary
    ///
    /// The reply is fallback text when the model is unavailable. Summary
    /// refresh failures are logged and do not fail the turn.
    ///
    /// # Errors
    ///
    /// Returns `resource_not_found` if the caller does not own the
    /// conversation, `invalid_input` for a blank message, or an error if the
    /// messages cannot be stored
    pub async fn send_message(
        &self,
        auth: &AuthContext,
        conversation_id: &str,
        content: &str,
    ) -> AppResult<ChatTurn> {
        let content = content.trim();
        if content.is_empty() {
            return Err(AppError::invalid_input("Message content cannot be empty"));
        }

        let conversation = self.conversation(auth, conversation_id).await?;
        let summary = conversation.get_str("summary").unwrap_or_default().to_owned();
        let earlier = self.messages(auth, conversation_id).await?;
        let next_position = earlier
            .iter()
            .filter_map(|m| m.get_i64("position"))
            .max()
            .map_or(0, |p| p + 1);

        let user_message = self
            .append(auth, conversation_id, "user", content, next_position)
            .await?;

        let request = build_request(&summary, &earlier, content);
        let reply = self.llm.complete_or_fallback(&request, FALLBACK_REPLY).await;
        let stored_reply = self
            .append(auth, conversation_id, "assistant", &reply.text, next_position + 1)
            .await?;

        self.refresh_summary(auth, conversation_id, &summary, content, &reply.text, reply.source)
            .await;

        Ok(ChatTurn {
            user_message,
            reply: stored_reply,
            source: reply.source,
        })
    }

    async fn conversation(&self, auth: &AuthContext, conversation_id: &str) -> AppResult<Record> {
        self.store
            .execute(
                EntityKind::AiConversation,
                Operation::Read,
                Filter::for_owner(auth).with_id(conversation_id),
            )
            .await?
            .into_record()
    }

    async fn messages(&self, auth: &AuthContext, conversation_id: &str) -> AppResult<Vec<Record>> {
        self.store
            .execute(
                EntityKind::AiMessage,
                Operation::List,
                Filter::for_owner(auth).where_eq("conversation_id", conversation_id),
            )
            .await?
            .into_records()
    }

    async fn append(
        &self,
        auth: &AuthContext,
        conversation_id: &str,
        role: &str,
        content: &str,
        position: i64,
    ) -> AppResult<Record> {
        let payload = Record::new()
            .with("conversation_id", conversation_id)
            .with("role", role)
            .with("content", content)
            .with("position", position);
        self.store
            .execute(
                EntityKind::AiMessage,
                Operation::Create(payload),
                Filter::for_owner(auth),
            )
            .await?
            .into_record()
    }

    async fn refresh_summary(
        &self,
        auth: &AuthContext,
        conversation_id: &str,
        previous: &str,
        user_text: &str,
        reply_text: &str,
        source: ReplySource,
    ) {
        let summarized = if source == ReplySource::Model {
            self.summarize(previous, user_text, reply_text).await
        } else {
            None
        };
        let summary = summarized.unwrap_or_else(|| append_to_summary(previous, user_text));

        let result = self
            .store
            .execute(
                EntityKind::AiConversation,
                Operation::Update(Record::new().with("summary", summary)),
                Filter::for_owner(auth).with_id(conversation_id),
            )
            .await;
        match result {
            Ok(_) => debug!(conversation_id, "Conversation summary refreshed"),
            Err(e) => warn!(conversation_id, "Conversation summary not saved: {e}"),
        }
    }

    async fn summarize(&self, previous: &str, user_text: &str, reply_text: &str) -> Option<String> {
        let request = CompletionRequest::new()
            .system(SUMMARY_PROMPT)
            .user(format!(
                "Summary so far:\n{previous}\n\nUser: {user_text}\nAssistant: {reply_text}"
            ))
            .temperature(0.2)
            .max_tokens(300);
        match self.llm.complete(&request).await {
            Ok(text) => extract_json::<SummaryReply>(&text)
                .map(|reply| truncate_front(reply.summary.trim(), MAX_SUMMARY_CHARS)),
            Err(e) => {
                warn!("Summary generation failed: {e}");
                None
            }
        }
    }
}

fn build_request(summary: &str, earlier: &[Record], content: &str) -> CompletionRequest {
    let mut request = CompletionRequest::new().system(SYSTEM_PROMPT);
    if !summary.trim().is_empty() {
        request = request.system(format!("What you remember about this conversation:\n{summary}"));
    }
    let skip = earlier.len().saturating_sub(RECENT_MESSAGES);
    for message in &earlier[skip..] {
        if let (Some(role), Some(text)) = (message.get_str("role"), message.get_str("content")) {
            request = request.message(ChatMessage::new(role, text));
        }
    }
    request.user(content)
}

/// Summary kept without a model: earlier summary plus the latest user message
fn append_to_summary(previous: &str, user_text: &str) -> String {
    let line = format!("- {}", truncate_back(user_text, 200));
    let combined = if previous.trim().is_empty() {
        line
    } else {
        format!("{}\n{line}", previous.trim_end())
    };
    truncate_front(&combined, MAX_SUMMARY_CHARS)
}

/// Last `max` characters
fn truncate_front(text: &str, max: usize) -> String {
    let skip = text.chars().count().saturating_sub(max);
    text.chars().skip(skip).collect()
}

/// First `max` characters
fn truncate_back(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn summary_accumulates_user_messages() {
        let first = append_to_summary("", "I adopted a dog named Pixel");
        assert_eq!(first, "- I adopted a dog named Pixel");
        let second = append_to_summary(&first, "Pixel chewed my shoes");
        assert!(second.starts_with("- I adopted a dog named Pixel\n- Pixel chewed"));
    }

    #[test]
    fn summary_is_bounded() {
        let long = "x".repeat(MAX_SUMMARY_CHARS);
        let summary = append_to_summary(&long, "latest");
        assert_eq!(summary.chars().count(), MAX_SUMMARY_CHARS);
        assert!(summary.ends_with("- latest"));
    }

    #[test]
    fn request_replays_recent_messages_only() {
        let earlier: Vec<Record> = (0..15)
            .map(|i| {
                Record::new()
                    .with("role", if i % 2 == 0 { "user" } else { "assistant" })
                    .with("content", format!("message {i}"))
            })
            .collect();
        let request = build_request("likes hiking", &earlier, "hello again");
        // two system prompts, the recent window, the new message
        assert_eq!(request.messages.len(), 2 + RECENT_MESSAGES + 1);
        assert_eq!(request.messages[2].content, "message 5");
        assert_eq!(request.messages.last().unwrap().content, "hello again");
    }
}
