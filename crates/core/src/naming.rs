#![forbid(unsafe_code)]

pub const MAX_TITLE_LEN: usize = 250;
pub const MAX_ALIAS_LEN: usize = 80;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TitleError {
    Empty,
    TooLong,
}

impl TitleError {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Empty => "category title must not be empty",
            Self::TooLong => "category title is too long",
        }
    }
}

/// Trims the title and rejects empty or oversized values.
pub fn normalize_title(value: &str) -> Result<String, TitleError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(TitleError::Empty);
    }
    if trimmed.len() > MAX_TITLE_LEN {
        return Err(TitleError::TooLong);
    }
    Ok(trimmed.to_string())
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AliasError {
    TooLong,
    ContainsWhitespace,
    ContainsControl,
}

impl AliasError {
    pub fn message(&self) -> &'static str {
        match self {
            Self::TooLong => "category alias is too long",
            Self::ContainsWhitespace => "category alias must not contain whitespace",
            Self::ContainsControl => "category alias contains control characters",
        }
    }
}

/// Aliases are optional; a blank alias collapses to `None` so that the
/// storage uniqueness constraint never sees an empty string.
pub fn normalize_alias(value: Option<&str>) -> Result<Option<String>, AliasError> {
    let Some(raw) = value else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if trimmed.len() > MAX_ALIAS_LEN {
        return Err(AliasError::TooLong);
    }
    if trimmed.chars().any(|c| c.is_whitespace()) {
        return Err(AliasError::ContainsWhitespace);
    }
    if trimmed.chars().any(|c| c.is_control()) {
        return Err(AliasError::ContainsControl);
    }
    Ok(Some(trimmed.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_is_trimmed() {
        assert_eq!(normalize_title(" my title "), Ok("my title".to_string()));
    }

    #[test]
    fn blank_title_is_rejected() {
        assert_eq!(normalize_title("   "), Err(TitleError::Empty));
    }

    #[test]
    fn blank_alias_collapses_to_none() {
        assert_eq!(normalize_alias(None), Ok(None));
        assert_eq!(normalize_alias(Some("")), Ok(None));
        assert_eq!(normalize_alias(Some("   ")), Ok(None));
    }

    #[test]
    fn alias_is_trimmed() {
        assert_eq!(
            normalize_alias(Some(" colors ")),
            Ok(Some("colors".to_string()))
        );
    }

    #[test]
    fn alias_with_inner_whitespace_is_rejected() {
        assert_eq!(
            normalize_alias(Some("two words")),
            Err(AliasError::ContainsWhitespace)
        );
    }
}
