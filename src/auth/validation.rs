//! Input validation for account and board data.
//!
//! Usernames and email addresses are checked by small finite-state
//! machines that walk the input one character at a time. Passwords are
//! checked by a single scan that collects every unmet requirement so the
//! user can fix them all at once.

use std::fmt;

use thiserror::Error;

use crate::FoundationError;

/// Minimum username length.
pub const MIN_USERNAME_LENGTH: usize = 4;

/// Maximum username length.
pub const MAX_USERNAME_LENGTH: usize = 16;

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum password length.
pub const MAX_PASSWORD_LENGTH: usize = 32;

/// Maximum email length.
pub const MAX_EMAIL_LENGTH: usize = 255;

/// Minimum number of ASCII letters/digits in board content.
pub const MIN_CONTENT_ALPHANUMERICS: usize = 3;

/// Special characters accepted in passwords.
pub const PASSWORD_SPECIAL_CHARS: &str = "~`!@#$%^&*()_-+={}[]|\\:;\"'<>,.?/";

// ============================================================================
// Username
// ============================================================================

/// Username validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UsernameError {
    #[error("username is empty")]
    Empty,

    #[error("username must start with a letter or digit")]
    InvalidLeadingCharacter,

    #[error("username must be at least {MIN_USERNAME_LENGTH} characters")]
    TooShort,

    #[error("username must be at most {MAX_USERNAME_LENGTH} characters")]
    TooLong,

    #[error("username must not start with a digit")]
    StartsWithDigit,

    /// A character outside `[A-Za-z0-9._-]` at the given position.
    #[error("username may only contain letters, digits, '.', '-' or '_' (invalid character at position {position})")]
    InvalidCharacter { position: usize },

    #[error("'.', '-' or '_' must be followed by a letter or digit")]
    SeparatorNotFollowed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UsernameState {
    /// Nothing accepted yet.
    Start,
    /// Last accepted character was alphanumeric.
    Word,
    /// Last accepted character was `.`, `-` or `_`.
    Separator,
}

/// Validate a username.
///
/// Requirements:
/// - 4 to 16 characters
/// - starts with a letter
/// - letters and digits, optionally separated by single `.`, `-` or `_`
/// - does not end with a separator
///
/// # Examples
///
/// ```
/// use foundation::auth::validation::validate_username;
///
/// assert!(validate_username("pilot.Jimmy").is_ok());
/// assert!(validate_username("1Flask").is_err()); // starts with a digit
/// assert!(validate_username("Crash12.").is_err()); // dangling separator
/// ```
pub fn validate_username(username: &str) -> Result<(), UsernameError> {
    if username.is_empty() {
        return Err(UsernameError::Empty);
    }

    let chars: Vec<char> = username.chars().collect();
    let mut state = UsernameState::Start;
    let mut size = 0;
    let mut consumed = 0;

    for &c in &chars {
        let next = match (state, c) {
            (UsernameState::Start | UsernameState::Separator, c) if c.is_ascii_alphanumeric() => {
                UsernameState::Word
            }
            (UsernameState::Word, c) if c.is_ascii_alphanumeric() => UsernameState::Word,
            (UsernameState::Word, '.' | '-' | '_') => UsernameState::Separator,
            _ => break,
        };

        size += 1;
        if size > MAX_USERNAME_LENGTH {
            break;
        }
        state = next;
        consumed += 1;
    }

    match state {
        UsernameState::Start => Err(UsernameError::InvalidLeadingCharacter),
        UsernameState::Word => {
            if size < MIN_USERNAME_LENGTH {
                Err(UsernameError::TooShort)
            } else if size > MAX_USERNAME_LENGTH {
                Err(UsernameError::TooLong)
            } else if chars[0].is_ascii_digit() {
                Err(UsernameError::StartsWithDigit)
            } else if consumed < chars.len() {
                Err(UsernameError::InvalidCharacter { position: consumed })
            } else {
                Ok(())
            }
        }
        UsernameState::Separator => {
            if size > MAX_USERNAME_LENGTH {
                Err(UsernameError::TooLong)
            } else {
                Err(UsernameError::SeparatorNotFollowed)
            }
        }
    }
}

// ============================================================================
// Password
// ============================================================================

/// A password requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordRequirement {
    UpperCase,
    LowerCase,
    NumericDigit,
    SpecialCharacter,
    LongEnough,
}

impl fmt::Display for PasswordRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PasswordRequirement::UpperCase => "Upper case",
            PasswordRequirement::LowerCase => "Lower case",
            PasswordRequirement::NumericDigit => "Numeric digit",
            PasswordRequirement::SpecialCharacter => "Special character",
            PasswordRequirement::LongEnough => "Long Enough",
        };
        f.write_str(label)
    }
}

/// Password validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PasswordError {
    #[error("password contains an invalid character '{character}' at position {position}")]
    InvalidCharacter { character: char, position: usize },

    #[error("password must be at most {MAX_PASSWORD_LENGTH} characters")]
    TooLong,

    #[error("{}", describe_unmet(.0))]
    Unsatisfied(Vec<PasswordRequirement>),
}

fn describe_unmet(unmet: &[PasswordRequirement]) -> String {
    let mut message = String::new();
    for requirement in unmet {
        message.push_str(&format!("{requirement}; "));
    }
    message.push_str("conditions were not satisfied");
    message
}

/// Validate a password.
///
/// Requirements:
/// - at least one upper case letter, lower case letter, digit and special
///   character from [`PASSWORD_SPECIAL_CHARS`]
/// - 8 to 32 characters
/// - no other characters
///
/// # Examples
///
/// ```
/// use foundation::auth::validation::{validate_password, PasswordError, PasswordRequirement};
///
/// assert!(validate_password("Aa!15678").is_ok());
/// assert_eq!(
///     validate_password("NoDigits!!"),
///     Err(PasswordError::Unsatisfied(vec![PasswordRequirement::NumericDigit]))
/// );
/// ```
pub fn validate_password(password: &str) -> Result<(), PasswordError> {
    let mut upper = false;
    let mut lower = false;
    let mut digit = false;
    let mut special = false;
    let mut length = 0;

    for (position, c) in password.chars().enumerate() {
        if c.is_ascii_uppercase() {
            upper = true;
        } else if c.is_ascii_lowercase() {
            lower = true;
        } else if c.is_ascii_digit() {
            digit = true;
        } else if PASSWORD_SPECIAL_CHARS.contains(c) {
            special = true;
        } else {
            return Err(PasswordError::InvalidCharacter {
                character: c,
                position,
            });
        }
        length += 1;
    }

    if length > MAX_PASSWORD_LENGTH {
        return Err(PasswordError::TooLong);
    }

    let unmet: Vec<PasswordRequirement> = [
        (upper, PasswordRequirement::UpperCase),
        (lower, PasswordRequirement::LowerCase),
        (digit, PasswordRequirement::NumericDigit),
        (special, PasswordRequirement::SpecialCharacter),
        (length >= MIN_PASSWORD_LENGTH, PasswordRequirement::LongEnough),
    ]
    .into_iter()
    .filter(|(met, _)| !met)
    .map(|(_, requirement)| requirement)
    .collect();

    if unmet.is_empty() {
        Ok(())
    } else {
        Err(PasswordError::Unsatisfied(unmet))
    }
}

// ============================================================================
// Email
// ============================================================================

/// Email validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EmailError {
    #[error("there was no email address found")]
    Empty,

    #[error("a valid email address must be no more than {MAX_EMAIL_LENGTH} characters")]
    TooLong,

    #[error("email address must start with a letter or digit, and '.' must be followed by one (position {position})")]
    AlphanumericRequired { position: usize },

    #[error("email address is missing the '@' sign")]
    MissingAt,

    #[error("the local part may only use letters, digits, '.' or '@' (invalid character at position {position})")]
    InvalidLocalCharacter { position: usize },

    #[error("a letter or digit is required after '@' and after each '.' in the domain")]
    MissingDomain,

    #[error("unexpected character at position {position}; the address must end here")]
    UnexpectedCharacter { position: usize },

    #[error("a letter or digit is required after '-'")]
    DanglingHyphen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EmailState {
    LocalStart,
    Local,
    DomainStart,
    Domain,
    Hyphen,
}

/// Validate an email address.
///
/// The local part is letters and digits separated by single dots; the
/// domain is letters and digits separated by single dots or hyphens.
/// A bare domain without a dot (`test@example`) is accepted.
///
/// # Examples
///
/// ```
/// use foundation::auth::validation::validate_email;
///
/// assert!(validate_email("test@example.com").is_ok());
/// assert!(validate_email("Amazing@Spid3r-Man").is_ok());
/// assert!(validate_email("whatsup@example-").is_err());
/// ```
pub fn validate_email(email: &str) -> Result<(), EmailError> {
    if email.is_empty() {
        return Err(EmailError::Empty);
    }

    let chars: Vec<char> = email.chars().collect();
    if chars.len() > MAX_EMAIL_LENGTH {
        return Err(EmailError::TooLong);
    }

    let mut state = EmailState::LocalStart;
    let mut consumed = 0;

    for &c in &chars {
        let alnum = c.is_ascii_alphanumeric();
        let next = match (state, c) {
            (EmailState::LocalStart, _) if alnum => EmailState::Local,
            (EmailState::Local, _) if alnum => EmailState::Local,
            (EmailState::Local, '.') => EmailState::LocalStart,
            (EmailState::Local, '@') => EmailState::DomainStart,
            (EmailState::DomainStart, _) if alnum => EmailState::Domain,
            (EmailState::Domain, _) if alnum => EmailState::Domain,
            (EmailState::Domain, '.') => EmailState::DomainStart,
            (EmailState::Domain, '-') => EmailState::Hyphen,
            (EmailState::Hyphen, _) if alnum => EmailState::Domain,
            _ => break,
        };
        state = next;
        consumed += 1;
    }

    let exhausted = consumed == chars.len();
    match state {
        EmailState::LocalStart => Err(EmailError::AlphanumericRequired { position: consumed }),
        EmailState::Local if exhausted => Err(EmailError::MissingAt),
        EmailState::Local => Err(EmailError::InvalidLocalCharacter { position: consumed }),
        EmailState::DomainStart => Err(EmailError::MissingDomain),
        EmailState::Domain if exhausted => Ok(()),
        EmailState::Domain => Err(EmailError::UnexpectedCharacter { position: consumed }),
        EmailState::Hyphen => Err(EmailError::DanglingHyphen),
    }
}

// ============================================================================
// Board content
// ============================================================================

/// Board content validation error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{field} must not be empty and must contain at least {MIN_CONTENT_ALPHANUMERICS} letters/digits (spaces don't count)")]
pub struct ContentError {
    /// Name of the rejected field, e.g. "Title" or "Reply".
    pub field: &'static str,
}

/// Validate post titles, post bodies and replies.
///
/// After trimming, the text must be non-empty and contain at least three
/// ASCII letters or digits.
pub fn validate_content(field: &'static str, text: &str) -> Result<(), ContentError> {
    let trimmed = text.trim();
    let alphanumerics = trimmed.chars().filter(|c| c.is_ascii_alphanumeric()).count();
    if trimmed.is_empty() || alphanumerics < MIN_CONTENT_ALPHANUMERICS {
        return Err(ContentError { field });
    }
    Ok(())
}

impl From<UsernameError> for FoundationError {
    fn from(e: UsernameError) -> Self {
        FoundationError::Validation(e.to_string())
    }
}

impl From<PasswordError> for FoundationError {
    fn from(e: PasswordError) -> Self {
        FoundationError::Validation(e.to_string())
    }
}

impl From<EmailError> for FoundationError {
    fn from(e: EmailError) -> Self {
        FoundationError::Validation(e.to_string())
    }
}

impl From<ContentError> for FoundationError {
    fn from(e: ContentError) -> Self {
        FoundationError::Validation(e.to_string())
    }
}
