use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Namespace every ackr tag lives under.
pub const TAG_PREFIX: &str = "ackr/";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TagParseError {
    #[error("tag `{0}` is not in the ackr/ namespace")]
    MissingPrefix(String),

    #[error("tag `{tag}` has {found} dot-separated fields, expected 4 (number.sequence.author.slug)")]
    FieldCount { tag: String, found: usize },

    #[error("tag `{tag}`: {field} `{value}` is not an unsigned integer")]
    BadNumber {
        tag: String,
        field: &'static str,
        value: String,
    },

    #[error("tag `{tag}`: {field} `{value}` must be non-empty and use only [A-Za-z0-9_-]")]
    BadIdentifier {
        tag: String,
        field: &'static str,
        value: String,
    },
}

/// Structured form of `ackr/{pr_number}.{sequence}.{author}.{slug}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevisionTag {
    pub pr_number: u64,
    pub sequence: u32,
    pub author: String,
    pub slug: String,
}

impl fmt::Display for RevisionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}.{}.{}.{}",
            TAG_PREFIX, self.pr_number, self.sequence, self.author, self.slug
        )
    }
}

fn is_identifier(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

impl FromStr for RevisionTag {
    type Err = TagParseError;

    /// Grammar: `ackr/<uint>.<uint>.<ident>.<ident>`, `<ident> = [A-Za-z0-9_-]+`.
    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        let body = tag
            .strip_prefix(TAG_PREFIX)
            .ok_or_else(|| TagParseError::MissingPrefix(tag.to_string()))?;

        let fields: Vec<&str> = body.split('.').collect();
        let [number, sequence, author, slug] = fields[..] else {
            return Err(TagParseError::FieldCount {
                tag: tag.to_string(),
                found: fields.len(),
            });
        };

        let number_field = |field: &'static str, value: &str| {
            let bad = || TagParseError::BadNumber {
                tag: tag.to_string(),
                field,
                value: value.to_string(),
            };
            if value.is_empty() || !value.chars().all(|c| c.is_ascii_digit()) {
                return Err(bad());
            }
            value.parse::<u64>().map_err(|_| bad())
        };
        let ident_field = |field: &'static str, value: &str| {
            if is_identifier(value) {
                Ok(value.to_string())
            } else {
                Err(TagParseError::BadIdentifier {
                    tag: tag.to_string(),
                    field,
                    value: value.to_string(),
                })
            }
        };

        let pr_number = number_field("PR number", number)?;
        let sequence = u32::try_from(number_field("sequence", sequence)?).map_err(|_| {
            TagParseError::BadNumber {
                tag: tag.to_string(),
                field: "sequence",
                value: sequence.to_string(),
            }
        })?;

        Ok(RevisionTag {
            pr_number,
            sequence,
            author: ident_field("author", author)?,
            slug: ident_field("slug", slug)?,
        })
    }
}
