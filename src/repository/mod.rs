use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{
    Choice, ChoiceChanges, NewChoice, NewQuestion, NewSnippet, NewUser, Question, QuestionChanges,
    Snippet, SnippetChanges, User, UserCredentials,
};

mod memory;
mod postgres;

pub use memory::MemoryRepository;
pub use postgres::PostgresRepository;

/// RepositoryError
///
/// Typed persistence failures. Constraint violations are reported against the
/// offending field so handlers can surface them as validation errors.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("duplicate value for {0}")]
    Conflict(&'static str),

    #[error("referenced {0} does not exist")]
    MissingReference(&'static str),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

pub type RepoResult<T> = Result<T, RepositoryError>;

/// Repository Trait
///
/// The abstract contract for all persistence operations. Handlers receive it
/// through `AppState` and never see the concrete backend.
///
/// Every method is a single atomic step: a write either fully applies or
/// leaves the store untouched.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn list_users(&self) -> RepoResult<Vec<User>>;
    async fn get_user(&self, id: i64) -> RepoResult<Option<User>>;
    async fn get_credentials(&self, username: &str) -> RepoResult<Option<UserCredentials>>;
    // Fails with `Conflict("username")` when the username is taken.
    async fn create_user(&self, user: NewUser) -> RepoResult<User>;

    // --- Snippets ---
    async fn list_snippets(&self) -> RepoResult<Vec<Snippet>>;
    async fn get_snippet(&self, id: i64) -> RepoResult<Option<Snippet>>;
    // The owner is fixed here and never changes afterwards.
    async fn create_snippet(&self, snippet: NewSnippet, owner_id: i64) -> RepoResult<Snippet>;
    // Applies only the `Some` fields. `None` when the snippet does not exist.
    async fn update_snippet(&self, id: i64, changes: SnippetChanges) -> RepoResult<Option<Snippet>>;
    async fn delete_snippet(&self, id: i64) -> RepoResult<bool>;

    // --- Questions ---
    async fn list_questions(&self) -> RepoResult<Vec<Question>>;
    async fn get_question(&self, id: i64) -> RepoResult<Option<Question>>;
    async fn create_question(&self, question: NewQuestion) -> RepoResult<Question>;
    async fn update_question(&self, id: i64, changes: QuestionChanges) -> RepoResult<Option<Question>>;
    // Deletes the question's choices with it.
    async fn delete_question(&self, id: i64) -> RepoResult<bool>;

    // --- Choices ---
    async fn list_choices(&self) -> RepoResult<Vec<Choice>>;
    async fn get_choice(&self, id: i64) -> RepoResult<Option<Choice>>;
    // Fails with `MissingReference("question")` when the question does not exist.
    async fn create_choice(&self, choice: NewChoice) -> RepoResult<Choice>;
    async fn update_choice(&self, id: i64, changes: ChoiceChanges) -> RepoResult<Option<Choice>>;
    async fn delete_choice(&self, id: i64) -> RepoResult<bool>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;
