use std::fmt;

use crate::expr::Field;

/// All errors produced by cronex.
///
/// Parse-time variants carry the original input so diagnostics can echo it
/// unchanged; `Display` renders them as
/// `Invalid cron expression [<input>]. <reason>`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CronError {
    /// Input was empty or whitespace-only.
    Empty { input: String },

    /// Field count after whitespace splitting was not 4 or 5.
    FieldCount { input: String, found: usize },

    /// An `@`-prefixed input with no entry in the macro table.
    UnknownMacro { input: String, name: String },

    /// A sub-part of a field that does not lex.
    BadToken {
        input: String,
        field: Field,
        token: String,
    },

    /// A numeric literal outside its field's allowed range.
    OutOfRange {
        input: String,
        field: Field,
        value: u32,
    },

    /// `L`, `LW`, `W`, `#`, or `?` used in a field that does not support it.
    MisplacedExtension {
        input: String,
        field: Field,
        token: String,
    },

    /// Timezone resolution or date arithmetic failure during a search.
    Eval { message: String },
}

impl fmt::Display for CronError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty { input } => write_invalid(f, input, "Empty expression"),
            Self::FieldCount { input, found } => write_invalid(
                f,
                input,
                &format!("Expected [4 to 5] fields but found [{found}] fields"),
            ),
            Self::UnknownMacro { input, name } => {
                write_invalid(f, input, &format!("Unknown macro [{name}]"))
            }
            Self::BadToken {
                input,
                field,
                token,
            } => write_invalid(
                f,
                input,
                &format!("Cannot parse token [{token}] in field [{}]", field.name()),
            ),
            Self::OutOfRange {
                input,
                field,
                value,
            } => write_invalid(
                f,
                input,
                &format!("Value [{value}] out of range for field [{}]", field.name()),
            ),
            Self::MisplacedExtension {
                input,
                field,
                token,
            } => write_invalid(
                f,
                input,
                &format!("Token [{token}] is not valid in field [{}]", field.name()),
            ),
            Self::Eval { message } => write!(f, "{message}"),
        }
    }
}

fn write_invalid(f: &mut fmt::Formatter<'_>, input: &str, reason: &str) -> fmt::Result {
    write!(f, "Invalid cron expression [{input}]. {reason}")
}

impl std::error::Error for CronError {}

impl CronError {
    pub fn empty(input: impl Into<String>) -> Self {
        Self::Empty {
            input: input.into(),
        }
    }

    pub fn field_count(input: impl Into<String>, found: usize) -> Self {
        Self::FieldCount {
            input: input.into(),
            found,
        }
    }

    pub fn unknown_macro(input: impl Into<String>, name: impl Into<String>) -> Self {
        Self::UnknownMacro {
            input: input.into(),
            name: name.into(),
        }
    }

    pub fn bad_token(input: impl Into<String>, field: Field, token: impl Into<String>) -> Self {
        Self::BadToken {
            input: input.into(),
            field,
            token: token.into(),
        }
    }

    pub fn out_of_range(input: impl Into<String>, field: Field, value: u32) -> Self {
        Self::OutOfRange {
            input: input.into(),
            field,
            value,
        }
    }

    pub fn misplaced_extension(
        input: impl Into<String>,
        field: Field,
        token: impl Into<String>,
    ) -> Self {
        Self::MisplacedExtension {
            input: input.into(),
            field,
            token: token.into(),
        }
    }

    pub fn eval(message: impl Into<String>) -> Self {
        Self::Eval {
            message: message.into(),
        }
    }

    /// The original expression text, for parse-time errors.
    pub fn input(&self) -> Option<&str> {
        match self {
            Self::Empty { input }
            | Self::FieldCount { input, .. }
            | Self::UnknownMacro { input, .. }
            | Self::BadToken { input, .. }
            | Self::OutOfRange { input, .. }
            | Self::MisplacedExtension { input, .. } => Some(input),
            Self::Eval { .. } => None,
        }
    }
}
