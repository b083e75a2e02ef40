use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;

use crate::{
    error::{ApiError, ApiResult, ValidationErrors},
    highlight,
    hyperlinks::Hyperlinks,
    password,
};

pub const USERNAME_MAX_LENGTH: usize = 150;
pub const EMAIL_MAX_LENGTH: usize = 254;
pub const TITLE_MAX_LENGTH: usize = 100;
pub const POLL_TEXT_MAX_LENGTH: usize = 200;

const REQUIRED: &str = "This field is required.";
const BLANK: &str = "This field may not be blank.";

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// Public view of an account. The password hash never leaves the repository
/// except through `UserCredentials`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub age: i32,
    #[ts(type = "string")]
    pub date_joined: DateTime<Utc>,
    // Ids of the snippets this user owns, ascending.
    pub snippets: Vec<i64>,
}

/// UserCredentials
///
/// Internal row used by login. Not serializable on purpose.
#[derive(Debug, Clone, FromRow)]
pub struct UserCredentials {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
}

/// NewUser
///
/// A validated account with its password already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub age: i32,
}

/// Snippet
///
/// A code snippet as stored, with the owner's username resolved by a join.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct Snippet {
    pub id: i64,
    #[ts(type = "string")]
    pub created: DateTime<Utc>,
    pub title: String,
    pub code: String,
    pub linenos: bool,
    pub language: String,
    pub style: String,
    // Username of the owner; read-only for clients.
    pub owner: Option<String>,
    #[serde(skip)]
    pub owner_id: Option<i64>,
}

/// Question
///
/// Repository row for a poll question, with the ids of its choices.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Question {
    pub id: i64,
    pub question_text: String,
    pub pub_date: DateTime<Utc>,
    pub choices: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Choice {
    pub id: i64,
    pub question_id: i64,
    pub choice_text: String,
    pub votes: i32,
}

// --- Hyperlinked representations ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct QuestionResponse {
    pub url: String,
    pub id: i64,
    pub question_text: String,
    #[ts(type = "string")]
    pub pub_date: DateTime<Utc>,
    pub choices: Vec<String>,
}

impl QuestionResponse {
    pub fn new(question: Question, links: &Hyperlinks) -> Self {
        Self {
            url: links.question(question.id),
            id: question.id,
            choices: question.choices.into_iter().map(|id| links.choice(id)).collect(),
            question_text: question.question_text,
            pub_date: question.pub_date,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ChoiceResponse {
    pub url: String,
    pub id: i64,
    pub question: String,
    pub choice_text: String,
    pub votes: i32,
}

impl ChoiceResponse {
    pub fn new(choice: Choice, links: &Hyperlinks) -> Self {
        Self {
            url: links.choice(choice.id),
            id: choice.id,
            question: links.question(choice.question_id),
            choice_text: choice.choice_text,
            votes: choice.votes,
        }
    }
}

// --- Request Payloads (Input Schemas) ---

/// CreateUserRequest
///
/// Input payload for `POST /users/`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema)]
#[serde(default)]
#[ts(export)]
pub struct CreateUserRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<i32>,
}

/// SignupRequest
///
/// Input payload for `POST /signup/`. The password is typed twice.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema)]
#[serde(default)]
#[ts(export)]
pub struct SignupRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password1: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password2: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<i32>,
}

/// A validated account whose password still needs hashing.
#[derive(Debug, Clone)]
pub struct AccountDraft {
    pub username: String,
    pub email: String,
    pub password: String,
    pub age: i32,
}

impl AccountDraft {
    pub fn into_new_user(self, password_hash: String) -> NewUser {
        NewUser {
            username: self.username,
            email: self.email,
            password_hash,
            age: self.age,
        }
    }
}

impl CreateUserRequest {
    pub fn validate(self) -> ApiResult<AccountDraft> {
        let mut errors = ValidationErrors::new();
        let username = validate_username(&mut errors, self.username);
        let email = validate_email(&mut errors, self.email);
        let password = required_text(&mut errors, "password", self.password, None);

        if let (Some(username), Some(password)) = (&username, &password) {
            let attributes = [("username", username.as_str()), ("email address", email.as_str())];
            for message in password::policy_violations(password, &attributes) {
                errors.add("password", message);
            }
        }

        match (username, password) {
            (Some(username), Some(password)) if errors.is_empty() => Ok(AccountDraft {
                username,
                email,
                password,
                age: self.age.unwrap_or(0),
            }),
            _ => Err(ApiError::Validation(errors)),
        }
    }
}

impl SignupRequest {
    pub fn validate(self) -> ApiResult<AccountDraft> {
        let mut errors = ValidationErrors::new();
        let username = validate_username(&mut errors, self.username);
        let email = validate_email(&mut errors, self.email);
        let password1 = required_text(&mut errors, "password1", self.password1, None);
        let password2 = required_text(&mut errors, "password2", self.password2, None);

        if let (Some(first), Some(second)) = (&password1, &password2) {
            if first != second {
                errors.add("password2", "The two password fields didn’t match.");
            } else if let Some(username) = &username {
                let attributes = [("username", username.as_str()), ("email address", email.as_str())];
                for message in password::policy_violations(second, &attributes) {
                    errors.add("password2", message);
                }
            }
        }

        match (username, password2) {
            (Some(username), Some(password)) if errors.is_empty() => Ok(AccountDraft {
                username,
                email,
                password,
                age: self.age.unwrap_or(0),
            }),
            _ => Err(ApiError::Validation(errors)),
        }
    }
}

/// LoginRequest
///
/// Credentials exchanged for a bearer token at `POST /login/`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema)]
#[serde(default)]
#[ts(export)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl LoginRequest {
    pub fn validate(&self) -> ApiResult<()> {
        let mut errors = ValidationErrors::new();
        if self.username.trim().is_empty() {
            errors.add("username", BLANK);
        }
        if self.password.is_empty() {
            errors.add("password", BLANK);
        }
        errors.into_result(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
}

/// SnippetPayload
///
/// Body of snippet create/update requests. Every field is optional at the
/// wire level; `validate` decides what is required. Unknown fields, including
/// `owner`, are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema)]
#[serde(default)]
#[ts(export)]
pub struct SnippetPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linenos: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
}

/// Validated snippet fields. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnippetChanges {
    pub title: Option<String>,
    pub code: Option<String>,
    pub linenos: Option<bool>,
    pub language: Option<String>,
    pub style: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewSnippet {
    pub title: String,
    pub code: String,
    pub linenos: bool,
    pub language: String,
    pub style: String,
}

impl SnippetPayload {
    /// `partial` relaxes required fields (PATCH).
    pub fn validate(self, partial: bool) -> ApiResult<SnippetChanges> {
        let mut errors = ValidationErrors::new();

        let title = self.title.map(|title| title.trim().to_string());
        if let Some(title) = &title {
            check_max_length(&mut errors, "title", title, TITLE_MAX_LENGTH);
        }

        let code = match self.code {
            Some(code) => {
                if code.trim().is_empty() {
                    errors.add("code", BLANK);
                }
                Some(code)
            }
            None if !partial => {
                errors.add("code", REQUIRED);
                None
            }
            None => None,
        };

        if let Some(language) = &self.language {
            if !highlight::is_known_language(language) {
                errors.add("language", format!("\"{language}\" is not a valid choice."));
            }
        }
        if let Some(style) = &self.style {
            if !highlight::is_known_style(style) {
                errors.add(
                    "style",
                    format!(
                        "\"{style}\" is not a valid choice. Available styles: {}.",
                        highlight::styles().join(", ")
                    ),
                );
            }
        }

        errors.into_result(SnippetChanges {
            title,
            code,
            linenos: self.linenos,
            language: self.language,
            style: self.style,
        })
    }
}

impl SnippetChanges {
    /// Fills model defaults for a snippet being created.
    pub fn into_new(self) -> NewSnippet {
        NewSnippet {
            title: self.title.unwrap_or_default(),
            code: self.code.unwrap_or_default(),
            linenos: self.linenos.unwrap_or(false),
            language: self
                .language
                .unwrap_or_else(|| highlight::DEFAULT_LANGUAGE.to_string()),
            style: self
                .style
                .unwrap_or_else(|| highlight::DEFAULT_STYLE.to_string()),
        }
    }
}

/// QuestionPayload
///
/// `pub_date` is kept as text so a malformed timestamp is reported against
/// the field instead of failing the whole body.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema)]
#[serde(default)]
#[ts(export)]
pub struct QuestionPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pub_date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuestionChanges {
    pub question_text: Option<String>,
    pub pub_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewQuestion {
    pub question_text: String,
    pub pub_date: DateTime<Utc>,
}

impl QuestionPayload {
    pub fn validate(self, partial: bool) -> ApiResult<QuestionChanges> {
        let mut errors = ValidationErrors::new();
        let question_text = optional_text(
            &mut errors,
            "question_text",
            self.question_text,
            partial,
            POLL_TEXT_MAX_LENGTH,
        );

        let pub_date = match self.pub_date {
            Some(raw) => match DateTime::parse_from_rfc3339(raw.trim()) {
                Ok(parsed) => Some(parsed.with_timezone(&Utc)),
                Err(_) => {
                    errors.add(
                        "pub_date",
                        "Datetime has wrong format. Use one of these formats instead: \
                         YYYY-MM-DDThh:mm[:ss[.uuuuuu]][+HH:MM|-HH:MM|Z].",
                    );
                    None
                }
            },
            None if !partial => {
                errors.add("pub_date", REQUIRED);
                None
            }
            None => None,
        };

        errors.into_result(QuestionChanges {
            question_text,
            pub_date,
        })
    }
}

impl QuestionChanges {
    /// Only valid after a non-partial `validate`, which guarantees both fields.
    pub fn into_new(self) -> ApiResult<NewQuestion> {
        match (self.question_text, self.pub_date) {
            (Some(question_text), Some(pub_date)) => Ok(NewQuestion {
                question_text,
                pub_date,
            }),
            _ => Err(ApiError::Internal("incomplete question".to_string())),
        }
    }
}

/// ChoicePayload
///
/// `question` is the hyperlink of an existing question.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema)]
#[serde(default)]
#[ts(export)]
pub struct ChoicePayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub choice_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub votes: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChoiceChanges {
    pub question_id: Option<i64>,
    pub choice_text: Option<String>,
    pub votes: Option<i32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewChoice {
    pub question_id: i64,
    pub choice_text: String,
    pub votes: i32,
}

impl ChoicePayload {
    pub fn validate(self, partial: bool, links: &Hyperlinks) -> ApiResult<ChoiceChanges> {
        let mut errors = ValidationErrors::new();

        let question_id = match self.question {
            Some(link) => {
                let resolved = links.resolve_question(&link);
                if resolved.is_none() {
                    errors.add("question", "Invalid hyperlink - No URL match.");
                }
                resolved
            }
            None if !partial => {
                errors.add("question", REQUIRED);
                None
            }
            None => None,
        };

        let choice_text = optional_text(
            &mut errors,
            "choice_text",
            self.choice_text,
            partial,
            POLL_TEXT_MAX_LENGTH,
        );

        if let Some(votes) = self.votes {
            if votes < 0 {
                errors.add("votes", "Ensure this value is greater than or equal to 0.");
            }
        }

        errors.into_result(ChoiceChanges {
            question_id,
            choice_text,
            votes: self.votes,
        })
    }
}

impl ChoiceChanges {
    pub fn into_new(self) -> ApiResult<NewChoice> {
        match (self.question_id, self.choice_text) {
            (Some(question_id), Some(choice_text)) => Ok(NewChoice {
                question_id,
                choice_text,
                votes: self.votes.unwrap_or(0),
            }),
            _ => Err(ApiError::Internal("incomplete choice".to_string())),
        }
    }
}

// --- Field validators ---

fn validate_username(errors: &mut ValidationErrors, username: Option<String>) -> Option<String> {
    let username = required_text(errors, "username", username, Some(USERNAME_MAX_LENGTH))?;
    let allowed = username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'));
    if !allowed {
        errors.add(
            "username",
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
        );
        return None;
    }
    Some(username)
}

fn validate_email(errors: &mut ValidationErrors, email: Option<String>) -> String {
    let email = email.map(|e| e.trim().to_string()).unwrap_or_default();
    if email.is_empty() || !check_max_length(errors, "email", &email, EMAIL_MAX_LENGTH) {
        return email;
    }
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    };
    if !valid {
        errors.add("email", "Enter a valid email address.");
    }
    email
}

/// Required, non-blank text. Whitespace is trimmed except for secrets
/// (`max_length == None`).
fn required_text(
    errors: &mut ValidationErrors,
    field: &str,
    value: Option<String>,
    max_length: Option<usize>,
) -> Option<String> {
    let Some(value) = value else {
        errors.add(field, REQUIRED);
        return None;
    };
    let value = match max_length {
        Some(_) => value.trim().to_string(),
        None => value,
    };
    if value.trim().is_empty() {
        errors.add(field, BLANK);
        return None;
    }
    if let Some(max) = max_length {
        if !check_max_length(errors, field, &value, max) {
            return None;
        }
    }
    Some(value)
}

fn optional_text(
    errors: &mut ValidationErrors,
    field: &str,
    value: Option<String>,
    partial: bool,
    max_length: usize,
) -> Option<String> {
    match value {
        None if partial => None,
        value => required_text(errors, field, value, Some(max_length)),
    }
}

fn check_max_length(errors: &mut ValidationErrors, field: &str, value: &str, max: usize) -> bool {
    if value.chars().count() > max {
        errors.add(
            field,
            format!("Ensure this field has no more than {max} characters."),
        );
        return false;
    }
    true
}
