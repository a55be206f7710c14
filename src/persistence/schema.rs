// ABOUTME: Static entity catalog describing every table both stores must carry
// ABOUTME: Column types, required fields, foreign keys, and unique keys per entity
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Lifelog Contributors

//! Entity catalog
//!
//! Each logical entity has exactly one [`EntitySchema`]. Column names here are
//! canonical (snake_case); the translator maps them to each store's naming
//! convention. System columns (`id`, `user_id`, `created_at`, `updated_at`)
//! are implied and appended by [`EntitySchema::all_columns`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// Logical value type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// Free text
    Text,
    /// 64-bit integer
    Integer,
    /// Floating point
    Real,
    /// Boolean flag
    Boolean,
    /// Calendar date, `YYYY-MM-DD`
    Date,
    /// Instant in time
    Timestamp,
    /// List of strings stored as JSON text
    JsonList,
}

/// Behaviour of a foreign key when the parent row is deleted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnDelete {
    /// Delete the child row
    Cascade,
    /// Clear the reference
    SetNull,
}

/// Reference from a column to another entity's `id`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForeignKey {
    /// Referenced entity
    pub entity: EntityKind,
    /// Delete behaviour
    pub on_delete: OnDelete,
}

/// Column definition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    /// Canonical column name
    pub name: &'static str,
    /// Logical type
    pub ty: ColumnType,
    /// Must be supplied on create
    pub required: bool,
    /// SQL literal used as column default
    pub default: Option<&'static str>,
    /// Foreign key, if any
    pub references: Option<ForeignKey>,
    /// Managed by the persistence layer; callers cannot write it
    pub system: bool,
}

impl ColumnDef {
    const fn new(name: &'static str, ty: ColumnType) -> Self {
        Self {
            name,
            ty,
            required: false,
            default: None,
            references: None,
            system: false,
        }
    }

    /// Text column
    #[must_use]
    pub const fn text(name: &'static str) -> Self {
        Self::new(name, ColumnType::Text)
    }

    /// Integer column
    #[must_use]
    pub const fn integer(name: &'static str) -> Self {
        Self::new(name, ColumnType::Integer)
    }

    /// Floating point column
    #[must_use]
    pub const fn real(name: &'static str) -> Self {
        Self::new(name, ColumnType::Real)
    }

    /// Boolean column
    #[must_use]
    pub const fn boolean(name: &'static str) -> Self {
        Self::new(name, ColumnType::Boolean)
    }

    /// Date column
    #[must_use]
    pub const fn date(name: &'static str) -> Self {
        Self::new(name, ColumnType::Date)
    }

    /// Timestamp column
    #[must_use]
    pub const fn timestamp(name: &'static str) -> Self {
        Self::new(name, ColumnType::Timestamp)
    }

    /// JSON list column, defaults to an empty list
    #[must_use]
    pub const fn list(name: &'static str) -> Self {
        Self::new(name, ColumnType::JsonList).default_sql("'[]'")
    }

    /// Mark as required on create
    #[must_use]
    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Set the SQL default literal
    #[must_use]
    pub const fn default_sql(mut self, literal: &'static str) -> Self {
        self.default = Some(literal);
        self
    }

    /// Reference another entity
    #[must_use]
    pub const fn references(mut self, entity: EntityKind, on_delete: OnDelete) -> Self {
        self.references = Some(ForeignKey { entity, on_delete });
        self
    }

    const fn managed(mut self) -> Self {
        self.system = true;
        self
    }

    /// Whether the column may hold NULL
    #[must_use]
    pub const fn nullable(&self) -> bool {
        !self.required && self.default.is_none()
    }
}

/// Sort direction for list operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Ascending
    Asc,
    /// Descending
    Desc,
}

impl SortDirection {
    /// SQL keyword
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// How rows of an entity are tied to a user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// The row is the user (`id` is the owner key)
    SelfOwned,
    /// The row carries a `user_id` foreign key
    UserOwned,
}

/// Static description of one entity's table
#[derive(Debug)]
pub struct EntitySchema {
    /// Entity this schema describes
    pub kind: EntityKind,
    /// Table name in the embedded store (snake_case plural)
    pub table: &'static str,
    /// Model name used as table name by the primary store's ORM convention
    pub model: &'static str,
    /// Ownership model
    pub ownership: Ownership,
    /// Domain columns (system columns are implied)
    pub columns: &'static [ColumnDef],
    /// Additional unique key over canonical column names
    pub unique: &'static [&'static str],
    /// Default ordering for list operations
    pub default_order: (&'static str, SortDirection),
}

const ID: ColumnDef = ColumnDef::text("id").managed();
const USER_ID: ColumnDef = ColumnDef::text("user_id")
    .references(EntityKind::User, OnDelete::Cascade)
    .managed();
const CREATED_AT: ColumnDef = ColumnDef::timestamp("created_at").managed();
const UPDATED_AT: ColumnDef = ColumnDef::timestamp("updated_at").managed();

impl EntitySchema {
    /// All columns in storage order: `id`, `user_id` (if owned), domain, timestamps
    #[must_use]
    pub fn all_columns(&self) -> Vec<ColumnDef> {
        let mut columns = Vec::with_capacity(self.columns.len() + 4);
        columns.push(ID);
        if self.ownership == Ownership::UserOwned {
            columns.push(USER_ID);
        }
        columns.extend_from_slice(self.columns);
        columns.push(CREATED_AT);
        columns.push(UPDATED_AT);
        columns
    }

    /// Look up a column (system or domain) by canonical name
    #[must_use]
    pub fn column(&self, name: &str) -> Option<ColumnDef> {
        self.all_columns().into_iter().find(|c| c.name == name)
    }

    /// Canonical name of the column holding the owner's id
    #[must_use]
    pub const fn owner_field(&self) -> &'static str {
        match self.ownership {
            Ownership::SelfOwned => "id",
            Ownership::UserOwned => "user_id",
        }
    }

    /// Entities whose tables must exist before this one
    #[must_use]
    pub fn parents(&self) -> Vec<EntityKind> {
        let mut parents: Vec<EntityKind> = Vec::new();
        for column in self.all_columns() {
            if let Some(fk) = column.references {
                if fk.entity != self.kind && !parents.contains(&fk.entity) {
                    parents.push(fk.entity);
                }
            }
        }
        parents
    }
}

macro_rules! entity_kinds {
    ($($variant:ident => $name:literal),+ $(,)?) => {
        /// Logical entity kinds known to the persistence layer
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum EntityKind {
            $(
                #[allow(missing_docs)]
                $variant,
            )+
        }

        impl EntityKind {
            /// Every entity, parents before children
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Canonical (snake_case) entity name
            #[must_use]
            pub const fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)+
                }
            }
        }
    };
}

entity_kinds! {
    User => "user",
    JournalEntry => "journal_entry",
    Story => "story",
    Person => "person",
    PersonMessageUpload => "person_message_upload",
    ConversationTopic => "conversation_topic",
    InsideJoke => "inside_joke",
    Joke => "joke",
    JokePerson => "joke_person",
    PracticeSession => "practice_session",
    ConversationStarter => "conversation_starter",
    WellnessEntry => "wellness_entry",
    AiConversation => "ai_conversation",
    AiMessage => "ai_message",
    Goal => "goal",
    Belief => "belief",
    AnxietyTrigger => "anxiety_trigger",
    Protocol => "protocol",
    IdentityVision => "identity_vision",
    DatingProfile => "dating_profile",
    GenomeUpload => "genome_upload",
    HealthIntakeEvent => "health_intake_event",
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EntityKind {
    type Err = AppError;

    /// Accepts snake_case, camelCase, PascalCase, and kebab-case names
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .flat_map(char::to_lowercase)
            .collect();
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.name().replace('_', "") == wanted)
            .ok_or_else(|| AppError::invalid_input(format!("Unknown entity: {s}")))
    }
}

impl EntityKind {
    /// Static schema for this entity
    #[must_use]
    pub fn schema(self) -> &'static EntitySchema {
        match self {
            Self::User => &USER,
            Self::JournalEntry => &JOURNAL_ENTRY,
            Self::Story => &STORY,
            Self::Person => &PERSON,
            Self::PersonMessageUpload => &PERSON_MESSAGE_UPLOAD,
            Self::ConversationTopic => &CONVERSATION_TOPIC,
            Self::InsideJoke => &INSIDE_JOKE,
            Self::Joke => &JOKE,
            Self::JokePerson => &JOKE_PERSON,
            Self::PracticeSession => &PRACTICE_SESSION,
            Self::ConversationStarter => &CONVERSATION_STARTER,
            Self::WellnessEntry => &WELLNESS_ENTRY,
            Self::AiConversation => &AI_CONVERSATION,
            Self::AiMessage => &AI_MESSAGE,
            Self::Goal => &GOAL,
            Self::Belief => &BELIEF,
            Self::AnxietyTrigger => &ANXIETY_TRIGGER,
            Self::Protocol => &PROTOCOL,
            Self::IdentityVision => &IDENTITY_VISION,
            Self::DatingProfile => &DATING_PROFILE,
            Self::GenomeUpload => &GENOME_UPLOAD,
            Self::HealthIntakeEvent => &HEALTH_INTAKE_EVENT,
        }
    }
}

const NEWEST_FIRST: (&str, SortDirection) = ("created_at", SortDirection::Desc);

// ================================
// Catalog
// ================================

static USER: EntitySchema = EntitySchema {
    kind: EntityKind::User,
    table: "users",
    model: "User",
    ownership: Ownership::SelfOwned,
    columns: &[
        ColumnDef::text("email").required(),
        ColumnDef::text("display_name"),
        ColumnDef::text("password_hash").default_sql("''"),
    ],
    unique: &["email"],
    default_order: NEWEST_FIRST,
};

static JOURNAL_ENTRY: EntitySchema = EntitySchema {
    kind: EntityKind::JournalEntry,
    table: "journal_entries",
    model: "JournalEntry",
    ownership: Ownership::UserOwned,
    columns: &[
        ColumnDef::text("content").required(),
        ColumnDef::text("mood"),
        ColumnDef::list("tags"),
    ],
    unique: &[],
    default_order: NEWEST_FIRST,
};

static STORY: EntitySchema = EntitySchema {
    kind: EntityKind::Story,
    table: "stories",
    model: "Story",
    ownership: Ownership::UserOwned,
    columns: &[
        ColumnDef::text("title").required(),
        ColumnDef::text("content").required(),
        ColumnDef::text("tone"),
        ColumnDef::integer("duration_seconds"),
        ColumnDef::integer("times_told").default_sql("0"),
        ColumnDef::real("success_rating"),
        ColumnDef::text("journal_entry_id").references(EntityKind::JournalEntry, OnDelete::SetNull),
    ],
    unique: &[],
    default_order: NEWEST_FIRST,
};

static PERSON: EntitySchema = EntitySchema {
    kind: EntityKind::Person,
    table: "people",
    model: "Person",
    ownership: Ownership::UserOwned,
    columns: &[
        ColumnDef::text("name").required(),
        ColumnDef::text("relationship"),
        ColumnDef::text("how_met"),
        ColumnDef::list("interests"),
        ColumnDef::list("personality_traits"),
        ColumnDef::text("conversation_style"),
        ColumnDef::list("shared_experiences"),
        ColumnDef::list("story_preferences"),
        ColumnDef::text("notes"),
    ],
    unique: &[],
    default_order: ("name", SortDirection::Asc),
};

static PERSON_MESSAGE_UPLOAD: EntitySchema = EntitySchema {
    kind: EntityKind::PersonMessageUpload,
    table: "person_message_uploads",
    model: "PersonMessageUpload",
    ownership: Ownership::UserOwned,
    columns: &[
        ColumnDef::text("person_id")
            .required()
            .references(EntityKind::Person, OnDelete::Cascade),
        ColumnDef::text("original_name").required(),
        ColumnDef::text("stored_name").required(),
        ColumnDef::text("mime_type"),
        ColumnDef::integer("size_bytes"),
        ColumnDef::integer("message_count"),
    ],
    unique: &[],
    default_order: NEWEST_FIRST,
};

static CONVERSATION_TOPIC: EntitySchema = EntitySchema {
    kind: EntityKind::ConversationTopic,
    table: "conversation_topics",
    model: "ConversationTopic",
    ownership: Ownership::UserOwned,
    columns: &[
        ColumnDef::text("person_id")
            .required()
            .references(EntityKind::Person, OnDelete::Cascade),
        ColumnDef::text("topic").required(),
        ColumnDef::boolean("used").default_sql("FALSE"),
    ],
    unique: &[],
    default_order: NEWEST_FIRST,
};

static INSIDE_JOKE: EntitySchema = EntitySchema {
    kind: EntityKind::InsideJoke,
    table: "inside_jokes",
    model: "InsideJoke",
    ownership: Ownership::UserOwned,
    columns: &[
        ColumnDef::text("person_id")
            .required()
            .references(EntityKind::Person, OnDelete::Cascade),
        ColumnDef::text("content").required(),
        ColumnDef::text("context"),
    ],
    unique: &[],
    default_order: NEWEST_FIRST,
};

static JOKE: EntitySchema = EntitySchema {
    kind: EntityKind::Joke,
    table: "jokes",
    model: "Joke",
    ownership: Ownership::UserOwned,
    columns: &[
        ColumnDef::text("title").required(),
        ColumnDef::text("content").required(),
        ColumnDef::text("category"),
        ColumnDef::text("difficulty"),
        ColumnDef::integer("times_told").default_sql("0"),
        ColumnDef::real("success_rating"),
    ],
    unique: &[],
    default_order: NEWEST_FIRST,
};

static JOKE_PERSON: EntitySchema = EntitySchema {
    kind: EntityKind::JokePerson,
    table: "joke_people",
    model: "JokePerson",
    ownership: Ownership::UserOwned,
    columns: &[
        ColumnDef::text("joke_id")
            .required()
            .references(EntityKind::Joke, OnDelete::Cascade),
        ColumnDef::text("person_id")
            .required()
            .references(EntityKind::Person, OnDelete::Cascade),
    ],
    unique: &["joke_id", "person_id"],
    default_order: NEWEST_FIRST,
};

static PRACTICE_SESSION: EntitySchema = EntitySchema {
    kind: EntityKind::PracticeSession,
    table: "practice_sessions",
    model: "PracticeSession",
    ownership: Ownership::UserOwned,
    columns: &[
        ColumnDef::text("story_id").references(EntityKind::Story, OnDelete::SetNull),
        ColumnDef::text("feedback"),
        ColumnDef::real("rating"),
    ],
    unique: &[],
    default_order: NEWEST_FIRST,
};

static CONVERSATION_STARTER: EntitySchema = EntitySchema {
    kind: EntityKind::ConversationStarter,
    table: "conversation_starters",
    model: "ConversationStarter",
    ownership: Ownership::UserOwned,
    columns: &[
        ColumnDef::text("question").required(),
        ColumnDef::text("story_id").references(EntityKind::Story, OnDelete::SetNull),
        ColumnDef::text("context"),
    ],
    unique: &[],
    default_order: NEWEST_FIRST,
};

static WELLNESS_ENTRY: EntitySchema = EntitySchema {
    kind: EntityKind::WellnessEntry,
    table: "wellness_entries",
    model: "WellnessEntry",
    ownership: Ownership::UserOwned,
    columns: &[
        ColumnDef::date("date").required(),
        ColumnDef::list("supplements"),
        ColumnDef::list("medications"),
        ColumnDef::integer("diet_quality"),
        ColumnDef::integer("exercise_minutes"),
        ColumnDef::integer("exercise_intensity"),
        ColumnDef::integer("sleep_quality"),
        ColumnDef::integer("sleep_score"),
        ColumnDef::text("notes"),
    ],
    unique: &["user_id", "date"],
    default_order: ("date", SortDirection::Desc),
};

static AI_CONVERSATION: EntitySchema = EntitySchema {
    kind: EntityKind::AiConversation,
    table: "ai_conversations",
    model: "AIConversation",
    ownership: Ownership::UserOwned,
    columns: &[
        ColumnDef::text("title").required(),
        ColumnDef::text("summary"),
        ColumnDef::text("model"),
    ],
    unique: &[],
    default_order: ("updated_at", SortDirection::Desc),
};

static AI_MESSAGE: EntitySchema = EntitySchema {
    kind: EntityKind::AiMessage,
    table: "ai_messages",
    model: "AIMessage",
    ownership: Ownership::UserOwned,
    columns: &[
        ColumnDef::text("conversation_id")
            .required()
            .references(EntityKind::AiConversation, OnDelete::Cascade),
        ColumnDef::text("role").required(),
        ColumnDef::text("content").required(),
        ColumnDef::integer("position").required(),
    ],
    unique: &["conversation_id", "position"],
    default_order: ("position", SortDirection::Asc),
};

static GOAL: EntitySchema = EntitySchema {
    kind: EntityKind::Goal,
    table: "goals",
    model: "Goal",
    ownership: Ownership::UserOwned,
    columns: &[
        ColumnDef::text("title").required(),
        ColumnDef::text("description"),
        ColumnDef::text("category"),
        ColumnDef::date("target_date"),
        ColumnDef::text("status").default_sql("'active'"),
        ColumnDef::list("steps"),
        ColumnDef::integer("progress").default_sql("0"),
    ],
    unique: &[],
    default_order: NEWEST_FIRST,
};

static BELIEF: EntitySchema = EntitySchema {
    kind: EntityKind::Belief,
    table: "beliefs",
    model: "Belief",
    ownership: Ownership::UserOwned,
    columns: &[
        ColumnDef::text("statement").required(),
        ColumnDef::text("category"),
        ColumnDef::integer("strength"),
        ColumnDef::list("evidence"),
        ColumnDef::text("reframe"),
    ],
    unique: &[],
    default_order: NEWEST_FIRST,
};

static ANXIETY_TRIGGER: EntitySchema = EntitySchema {
    kind: EntityKind::AnxietyTrigger,
    table: "anxiety_triggers",
    model: "AnxietyTrigger",
    ownership: Ownership::UserOwned,
    columns: &[
        ColumnDef::text("description").required(),
        ColumnDef::text("category"),
        ColumnDef::integer("intensity"),
        ColumnDef::list("coping_strategies"),
        ColumnDef::text("notes"),
    ],
    unique: &[],
    default_order: NEWEST_FIRST,
};

static PROTOCOL: EntitySchema = EntitySchema {
    kind: EntityKind::Protocol,
    table: "protocols",
    model: "Protocol",
    ownership: Ownership::UserOwned,
    columns: &[
        ColumnDef::text("name").required(),
        ColumnDef::text("description"),
        ColumnDef::list("steps"),
        ColumnDef::text("frequency"),
        ColumnDef::boolean("active").default_sql("TRUE"),
    ],
    unique: &[],
    default_order: NEWEST_FIRST,
};

static IDENTITY_VISION: EntitySchema = EntitySchema {
    kind: EntityKind::IdentityVision,
    table: "identity_visions",
    model: "IdentityVision",
    ownership: Ownership::UserOwned,
    columns: &[
        ColumnDef::text("title").required(),
        ColumnDef::text("description"),
        ColumnDef::list("core_values"),
        ColumnDef::list("affirmations"),
        ColumnDef::text("timeframe"),
    ],
    unique: &[],
    default_order: NEWEST_FIRST,
};

static DATING_PROFILE: EntitySchema = EntitySchema {
    kind: EntityKind::DatingProfile,
    table: "dating_profiles",
    model: "DatingProfile",
    ownership: Ownership::UserOwned,
    columns: &[
        ColumnDef::text("bio").required(),
        ColumnDef::text("platform"),
        ColumnDef::list("prompts"),
        ColumnDef::list("photos"),
        ColumnDef::text("feedback"),
    ],
    unique: &[],
    default_order: NEWEST_FIRST,
};

static GENOME_UPLOAD: EntitySchema = EntitySchema {
    kind: EntityKind::GenomeUpload,
    table: "genome_uploads",
    model: "GenomeUpload",
    ownership: Ownership::UserOwned,
    columns: &[
        ColumnDef::text("original_name").required(),
        ColumnDef::text("stored_name").required(),
        ColumnDef::text("mime_type"),
        ColumnDef::integer("size_bytes"),
        ColumnDef::text("status").default_sql("'uploaded'"),
    ],
    unique: &[],
    default_order: NEWEST_FIRST,
};

static HEALTH_INTAKE_EVENT: EntitySchema = EntitySchema {
    kind: EntityKind::HealthIntakeEvent,
    table: "health_intake_events",
    model: "HealthIntakeEvent",
    ownership: Ownership::UserOwned,
    columns: &[
        ColumnDef::text("event_type").required(),
        ColumnDef::timestamp("occurred_at").required(),
        ColumnDef::text("details"),
        ColumnDef::list("symptoms"),
        ColumnDef::integer("severity"),
    ],
    unique: &[],
    default_order: ("occurred_at", SortDirection::Desc),
};
