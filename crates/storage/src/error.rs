#![forbid(unsafe_code)]

#[derive(Debug)]
pub enum StoreError {
    Io(std::io::Error),
    Sql(rusqlite::Error),
    InvalidInput(&'static str),
    UnknownId,
    UnknownParent,
    AliasTaken,
    TitleTaken,
    LockedCategoryDelete { title: String },
    LockedAliasChange { title: String },
    ParentCycle,
    TreeDepthExceeded,
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "io: {err}"),
            Self::Sql(err) => write!(f, "sqlite: {err}"),
            Self::InvalidInput(message) => write!(f, "invalid input: {message}"),
            Self::UnknownId => write!(f, "unknown category id"),
            Self::UnknownParent => write!(f, "unknown parent category"),
            Self::AliasTaken => write!(f, "category alias already taken"),
            Self::TitleTaken => write!(f, "category title already taken under this parent"),
            Self::LockedCategoryDelete { title } => {
                write!(f, "unable to delete locked category `{title}`")
            }
            Self::LockedAliasChange { title } => {
                write!(f, "unable to change alias of locked category `{title}`")
            }
            Self::ParentCycle => write!(f, "category parent cycle"),
            Self::TreeDepthExceeded => write!(f, "category tree depth exceeded"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<std::io::Error> for StoreError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sql(value)
    }
}
