// ABOUTME: Integration tests for per-user isolation across upserts and parent references
// ABOUTME: One user can neither overwrite nor link to another user's rows
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Lifelog Contributors

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use anyhow::Result;
use lifelog_server::errors::ErrorCode;
use lifelog_server::models::{AuthContext, Record};
use lifelog_server::persistence::{DualStore, EntityKind, Filter, Operation, StoreRole};

use common::{register_user, test_user};

async fn create(
    store: &DualStore,
    auth: &AuthContext,
    kind: EntityKind,
    payload: Record,
) -> Result<String> {
    let record = store
        .execute(kind, Operation::Create(payload), Filter::for_owner(auth))
        .await?
        .into_record()?;
    Ok(record.id().unwrap().to_owned())
}

#[tokio::test]
async fn upsert_cannot_take_over_another_users_email() -> Result<()> {
    let (store, _secondary) = common::fallback_only().await?;
    let alice = test_user("alice");
    let bob = test_user("bob");
    store
        .execute(
            EntityKind::User,
            Operation::Create(
                Record::new()
                    .with("email", bob.email.as_str())
                    .with("display_name", "Bob"),
            ),
            Filter::for_owner(&bob),
        )
        .await?;

    let err = store
        .execute(
            EntityKind::User,
            Operation::Upsert(
                Record::new()
                    .with("email", bob.email.as_str())
                    .with("display_name", "pwned"),
            ),
            Filter::for_owner(&alice),
        )
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::ResourceNotFound);

    let bob_row = store
        .execute(
            EntityKind::User,
            Operation::Read,
            Filter::for_owner(&bob).with_id(bob.user_key()),
        )
        .await?
        .into_record()?;
    assert_eq!(bob_row.get_str("display_name"), Some("Bob"));

    // upserting your own row still inserts, then updates
    for name in ["Alice", "Al"] {
        let row = store
            .execute(
                EntityKind::User,
                Operation::Upsert(
                    Record::new()
                        .with("email", alice.email.as_str())
                        .with("display_name", name),
                ),
                Filter::for_owner(&alice),
            )
            .await?
            .into_record()?;
        assert_eq!(row.get_str("display_name"), Some(name));
        assert_eq!(row.id(), Some(alice.user_key().as_str()));
    }
    Ok(())
}

#[tokio::test]
async fn upsert_cannot_overwrite_messages_in_another_users_conversation() -> Result<()> {
    let (store, _primary, _secondary) = common::with_sqlite_primary().await?;
    let alice = test_user("alice");
    let bob = test_user("bob");
    register_user(&store, &alice).await?;
    register_user(&store, &bob).await?;

    let conversation = create(
        &store,
        &bob,
        EntityKind::AiConversation,
        Record::new().with("title", "private"),
    )
    .await?;
    let message = || {
        Record::new()
            .with("conversation_id", conversation.as_str())
            .with("role", "user")
            .with("position", 0)
    };
    create(&store, &bob, EntityKind::AiMessage, message().with("content", "secret")).await?;

    let err = store
        .execute(
            EntityKind::AiMessage,
            Operation::Upsert(message().with("content", "overwritten")),
            Filter::for_owner(&alice),
        )
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::ResourceNotFound);
    assert_eq!(store.provisioner(StoreRole::Secondary).runs(), 0);

    let messages = store
        .execute(
            EntityKind::AiMessage,
            Operation::List,
            Filter::for_owner(&bob).where_eq("conversation_id", conversation.as_str()),
        )
        .await?
        .into_records()?;
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].get_str("content"), Some("secret"));
    Ok(())
}

#[tokio::test]
async fn foreign_parent_looks_like_a_missing_one() -> Result<()> {
    let (store, _primary, _secondary) = common::with_sqlite_primary().await?;
    let alice = test_user("alice");
    let bob = test_user("bob");
    register_user(&store, &alice).await?;
    register_user(&store, &bob).await?;

    let bobs_friend = create(&store, &bob, EntityKind::Person, Record::new().with("name", "Sam")).await?;
    let topic = |person_id: &str| {
        Record::new()
            .with("person_id", person_id)
            .with("topic", "weekend plans")
    };

    let foreign = store
        .execute(
            EntityKind::ConversationTopic,
            Operation::Create(topic(bobs_friend.as_str())),
            Filter::for_owner(&alice),
        )
        .await
        .unwrap_err();
    let missing = store
        .execute(
            EntityKind::ConversationTopic,
            Operation::Create(topic("no-such-person")),
            Filter::for_owner(&alice),
        )
        .await
        .unwrap_err();
    assert_eq!(foreign.code, ErrorCode::ResourceNotFound);
    assert_eq!(foreign, missing);
    assert_eq!(store.provisioner(StoreRole::Secondary).runs(), 0);

    // relinking an owned row to a foreign parent is refused the same way
    let alices_friend =
        create(&store, &alice, EntityKind::Person, Record::new().with("name", "Kim")).await?;
    let alices_topic = create(&store, &alice, EntityKind::ConversationTopic, topic(alices_friend.as_str())).await?;
    let err = store
        .execute(
            EntityKind::ConversationTopic,
            Operation::Update(Record::new().with("person_id", bobs_friend.as_str())),
            Filter::for_owner(&alice).with_id(&alices_topic),
        )
        .await
        .unwrap_err();
    assert_eq!(err, missing);

    // bob removing his contact cannot cascade into alice's rows
    store
        .execute(
            EntityKind::Person,
            Operation::Delete,
            Filter::for_owner(&bob).with_id(&bobs_friend),
        )
        .await?;
    let topics = store
        .execute(
            EntityKind::ConversationTopic,
            Operation::List,
            Filter::for_owner(&alice),
        )
        .await?
        .into_records()?;
    assert_eq!(topics.len(), 1);
    assert_eq!(topics[0].get_str("person_id"), Some(alices_friend.as_str()));
    Ok(())
}

#[tokio::test]
async fn parent_check_applies_on_the_fallback_store() -> Result<()> {
    let (store, _primary, _secondary) = common::with_failing_primary().await?;
    let alice = test_user("alice");
    let bob = test_user("bob");

    let bobs_friend = create(&store, &bob, EntityKind::Person, Record::new().with("name", "Sam")).await?;
    let err = store
        .execute(
            EntityKind::InsideJoke,
            Operation::Create(
                Record::new()
                    .with("person_id", bobs_friend.as_str())
                    .with("content", "the llama incident"),
            ),
            Filter::for_owner(&alice),
        )
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::ResourceNotFound);
    assert_eq!(err.message, "person not found");
    Ok(())
}
