// ABOUTME: LLM collaborator: chat-completions client and helpers for structured replies
// ABOUTME: Failures never propagate to callers of the fallback API
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Lifelog Contributors

//! # LLM collaborator
//!
//! Models are asked for free text or for a JSON object embedded in free text.
//! Requests are single attempts; callers that must not fail use
//! [`LlmClient::complete_or_fallback`].

use serde::de::DeserializeOwned;

/// Chat-completions HTTP client
pub mod client;

pub use client::{ChatMessage, CompletionRequest, LlmClient, LlmReply, ReplySource, FALLBACK_LABEL};

/// Parse a JSON value out of model output
///
/// Accepts bare JSON, JSON wrapped in a Markdown code fence, and JSON
/// surrounded by prose (the outermost `{...}` or `[...]` span is tried).
/// Returns `None` when nothing parses as `T`.
#[must_use]
pub fn extract_json<T: DeserializeOwned>(text: &str) -> Option<T> {
    let unfenced = strip_code_fence(text);
    if let Ok(value) = serde_json::from_str(unfenced) {
        return Some(value);
    }
    [('{', '}'), ('[', ']')].iter().find_map(|&(open, close)| {
        let start = unfenced.find(open)?;
        let end = unfenced.rfind(close)?;
        (start < end)
            .then(|| serde_json::from_str(&unfenced[start..=end]).ok())
            .flatten()
    })
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // drop the info string (```json)
    let body = rest.split_once('\n').map_or(rest, |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}
