#![forbid(unsafe_code)]

pub mod naming;

pub mod entity {
    /// Tag naming the kind of an application entity ("article", "comment", ...).
    /// Plays the role a content-type registry would play in a larger framework.
    #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct EntityKind(String);

    impl EntityKind {
        pub fn as_str(&self) -> &str {
            &self.0
        }

        pub fn into_string(self) -> String {
            self.0
        }

        pub fn try_new(value: impl Into<String>) -> Result<Self, EntityKindError> {
            let value = value.into();
            validate_entity_kind(&value)?;
            Ok(Self(value))
        }
    }

    #[derive(Clone, Debug, PartialEq, Eq)]
    pub enum EntityKindError {
        Empty,
        TooLong,
        InvalidFirstChar,
        InvalidChar { ch: char, index: usize },
    }

    impl EntityKindError {
        pub fn message(&self) -> &'static str {
            match self {
                Self::Empty => "entity kind must not be empty",
                Self::TooLong => "entity kind is too long",
                Self::InvalidFirstChar => "entity kind must start with an ascii letter or digit",
                Self::InvalidChar { .. } => "entity kind contains an unsupported character",
            }
        }
    }

    fn validate_entity_kind(value: &str) -> Result<(), EntityKindError> {
        if value.is_empty() {
            return Err(EntityKindError::Empty);
        }
        if value.len() > 64 {
            return Err(EntityKindError::TooLong);
        }
        let mut chars = value.chars();
        let Some(first) = chars.next() else {
            return Err(EntityKindError::Empty);
        };
        if !first.is_ascii_alphanumeric() {
            return Err(EntityKindError::InvalidFirstChar);
        }
        for (index, ch) in value.chars().enumerate() {
            if index == 0 {
                continue;
            }
            if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '-') {
                continue;
            }
            return Err(EntityKindError::InvalidChar { ch, index });
        }
        Ok(())
    }

    /// A concrete entity instance: kind tag plus the instance id.
    #[derive(Clone, Debug, PartialEq, Eq, Hash)]
    pub struct EntityRef {
        pub kind: EntityKind,
        pub id: i64,
    }

    impl EntityRef {
        pub fn new(kind: EntityKind, id: i64) -> Self {
            Self { kind, id }
        }
    }
}

pub mod model {
    use crate::entity::{EntityKind, EntityRef};

    #[derive(Clone, Debug, PartialEq, Eq)]
    pub struct Category {
        pub id: i64,
        pub title: String,
        pub alias: Option<String>,
        pub parent_id: Option<i64>,
        pub is_locked: bool,
        pub sort_order: i64,
        pub status: Option<i64>,
        pub note: String,
        pub creator: String,
        pub created_at_ms: i64,
        pub updated_at_ms: i64,
    }

    impl Category {
        /// Alias when present, otherwise the numeric id. Used in error messages.
        pub fn ident(&self) -> String {
            match &self.alias {
                Some(alias) => alias.clone(),
                None => self.id.to_string(),
            }
        }
    }

    #[derive(Clone, Debug, PartialEq, Eq)]
    pub struct Tie {
        pub id: i64,
        pub category_id: i64,
        pub entity_kind: String,
        pub entity_id: i64,
        pub creator: String,
        pub status: Option<i64>,
        pub note: String,
        pub created_at_ms: i64,
    }

    /// Parent bucket key. `Root` is an explicit sentinel so that "no parent"
    /// is never confused with an absent argument.
    #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub enum Parent {
        Root,
        Alias(String),
    }

    impl Parent {
        pub fn alias(value: impl Into<String>) -> Self {
            Self::Alias(value.into())
        }

        pub fn from_alias(value: Option<&str>) -> Self {
            match value {
                Some(alias) => Self::Alias(alias.to_string()),
                None => Self::Root,
            }
        }

        pub fn as_alias(&self) -> Option<&str> {
            match self {
                Self::Root => None,
                Self::Alias(alias) => Some(alias.as_str()),
            }
        }

        pub fn is_root(&self) -> bool {
            matches!(self, Self::Root)
        }
    }

    /// Scope for tie aggregation: every tie, every tie of one entity kind,
    /// or the ties of one concrete entity instance.
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub enum TieScope {
        Any,
        Kind(EntityKind),
        Entity(EntityRef),
    }

    impl TieScope {
        pub fn kind(&self) -> Option<&EntityKind> {
            match self {
                Self::Any => None,
                Self::Kind(kind) => Some(kind),
                Self::Entity(entity) => Some(&entity.kind),
            }
        }

        pub fn entity_id(&self) -> Option<i64> {
            match self {
                Self::Entity(entity) => Some(entity.id),
                _ => None,
            }
        }
    }
}
