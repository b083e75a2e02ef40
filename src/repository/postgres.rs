use async_trait::async_trait;
use sqlx::PgPool;

use super::{RepoResult, Repository, RepositoryError};
use crate::models::{
    Choice, ChoiceChanges, NewChoice, NewQuestion, NewSnippet, NewUser, Question, QuestionChanges,
    Snippet, SnippetChanges, User, UserCredentials,
};

// Shared projections. Aggregates use ARRAY(subquery) so an empty relation
// yields '{}' rather than NULL.
const USER_COLUMNS: &str = r#"
    u.id, u.username, u.email, u.age, u.date_joined,
    ARRAY(SELECT s.id FROM snippets s WHERE s.owner_id = u.id ORDER BY s.id) AS snippets
"#;

const SNIPPET_COLUMNS: &str = r#"
    s.id, s.created, s.title, s.code, s.linenos, s.language, s.style,
    o.username AS owner, s.owner_id
"#;

const QUESTION_COLUMNS: &str = r#"
    q.id, q.question_text, q.pub_date,
    ARRAY(SELECT c.id FROM choices c WHERE c.question_id = q.id ORDER BY c.id) AS choices
"#;

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by PostgreSQL.
/// Each method is one statement; writes that need to return joined data use a
/// CTE so the write and the read-back stay atomic.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Maps constraint violations onto the field they concern.
fn classify(err: sqlx::Error, field: &'static str) -> RepositoryError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return RepositoryError::Conflict(field);
        }
        if db.is_foreign_key_violation() {
            return RepositoryError::MissingReference(field);
        }
    }
    tracing::error!(error = ?err, "database error");
    RepositoryError::Database(err)
}

fn logged(err: sqlx::Error) -> RepositoryError {
    tracing::error!(error = ?err, "database error");
    RepositoryError::Database(err)
}

#[async_trait]
impl Repository for PostgresRepository {
    // --- USERS ---

    async fn list_users(&self) -> RepoResult<Vec<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users u ORDER BY u.id");
        sqlx::query_as::<_, User>(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(logged)
    }

    async fn get_user(&self, id: i64) -> RepoResult<Option<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users u WHERE u.id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(logged)
    }

    async fn get_credentials(&self, username: &str) -> RepoResult<Option<UserCredentials>> {
        sqlx::query_as::<_, UserCredentials>(
            "SELECT id, username, password_hash FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(logged)
    }

    /// create_user
    ///
    /// The unique index on `username` arbitrates concurrent signups.
    async fn create_user(&self, user: NewUser) -> RepoResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, password_hash, age)
            VALUES ($1, $2, $3, $4)
            RETURNING id, username, email, age, date_joined, '{}'::BIGINT[] AS snippets
            "#,
        )
        .bind(user.username)
        .bind(user.email)
        .bind(user.password_hash)
        .bind(user.age)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| classify(e, "username"))
    }

    // --- SNIPPETS ---

    async fn list_snippets(&self) -> RepoResult<Vec<Snippet>> {
        let query = format!(
            "SELECT {SNIPPET_COLUMNS} FROM snippets s LEFT JOIN users o ON o.id = s.owner_id \
             ORDER BY s.created, s.id"
        );
        sqlx::query_as::<_, Snippet>(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(logged)
    }

    async fn get_snippet(&self, id: i64) -> RepoResult<Option<Snippet>> {
        let query = format!(
            "SELECT {SNIPPET_COLUMNS} FROM snippets s LEFT JOIN users o ON o.id = s.owner_id \
             WHERE s.id = $1"
        );
        sqlx::query_as::<_, Snippet>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(logged)
    }

    /// create_snippet
    ///
    /// Inserts and joins the owner's username in one statement.
    async fn create_snippet(&self, snippet: NewSnippet, owner_id: i64) -> RepoResult<Snippet> {
        let query = format!(
            r#"
            WITH s AS (
                INSERT INTO snippets (title, code, linenos, language, style, owner_id)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING *
            )
            SELECT {SNIPPET_COLUMNS} FROM s LEFT JOIN users o ON o.id = s.owner_id
            "#
        );
        sqlx::query_as::<_, Snippet>(&query)
            .bind(snippet.title)
            .bind(snippet.code)
            .bind(snippet.linenos)
            .bind(snippet.language)
            .bind(snippet.style)
            .bind(owner_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| classify(e, "owner"))
    }

    /// update_snippet
    ///
    /// COALESCE keeps stored values for absent fields. `owner_id` is never
    /// written here.
    async fn update_snippet(&self, id: i64, changes: SnippetChanges) -> RepoResult<Option<Snippet>> {
        let query = format!(
            r#"
            WITH s AS (
                UPDATE snippets
                SET title = COALESCE($2, title),
                    code = COALESCE($3, code),
                    linenos = COALESCE($4, linenos),
                    language = COALESCE($5, language),
                    style = COALESCE($6, style)
                WHERE id = $1
                RETURNING *
            )
            SELECT {SNIPPET_COLUMNS} FROM s LEFT JOIN users o ON o.id = s.owner_id
            "#
        );
        sqlx::query_as::<_, Snippet>(&query)
            .bind(id)
            .bind(changes.title)
            .bind(changes.code)
            .bind(changes.linenos)
            .bind(changes.language)
            .bind(changes.style)
            .fetch_optional(&self.pool)
            .await
            .map_err(logged)
    }

    async fn delete_snippet(&self, id: i64) -> RepoResult<bool> {
        sqlx::query("DELETE FROM snippets WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map(|res| res.rows_affected() > 0)
            .map_err(logged)
    }

    // --- QUESTIONS ---

    async fn list_questions(&self) -> RepoResult<Vec<Question>> {
        let query = format!("SELECT {QUESTION_COLUMNS} FROM questions q ORDER BY q.id");
        sqlx::query_as::<_, Question>(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(logged)
    }

    async fn get_question(&self, id: i64) -> RepoResult<Option<Question>> {
        let query = format!("SELECT {QUESTION_COLUMNS} FROM questions q WHERE q.id = $1");
        sqlx::query_as::<_, Question>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(logged)
    }

    async fn create_question(&self, question: NewQuestion) -> RepoResult<Question> {
        sqlx::query_as::<_, Question>(
            r#"
            INSERT INTO questions (question_text, pub_date)
            VALUES ($1, $2)
            RETURNING id, question_text, pub_date, '{}'::BIGINT[] AS choices
            "#,
        )
        .bind(question.question_text)
        .bind(question.pub_date)
        .fetch_one(&self.pool)
        .await
        .map_err(logged)
    }

    async fn update_question(&self, id: i64, changes: QuestionChanges) -> RepoResult<Option<Question>> {
        let query = format!(
            r#"
            WITH q AS (
                UPDATE questions
                SET question_text = COALESCE($2, question_text),
                    pub_date = COALESCE($3, pub_date)
                WHERE id = $1
                RETURNING *
            )
            SELECT {QUESTION_COLUMNS} FROM q
            "#
        );
        sqlx::query_as::<_, Question>(&query)
            .bind(id)
            .bind(changes.question_text)
            .bind(changes.pub_date)
            .fetch_optional(&self.pool)
            .await
            .map_err(logged)
    }

    /// Choices go with it through `ON DELETE CASCADE`.
    async fn delete_question(&self, id: i64) -> RepoResult<bool> {
        sqlx::query("DELETE FROM questions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map(|res| res.rows_affected() > 0)
            .map_err(logged)
    }

    // --- CHOICES ---

    async fn list_choices(&self) -> RepoResult<Vec<Choice>> {
        sqlx::query_as::<_, Choice>(
            "SELECT id, question_id, choice_text, votes FROM choices ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(logged)
    }

    async fn get_choice(&self, id: i64) -> RepoResult<Option<Choice>> {
        sqlx::query_as::<_, Choice>(
            "SELECT id, question_id, choice_text, votes FROM choices WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(logged)
    }

    /// create_choice
    ///
    /// The foreign key on `question_id` enforces referential integrity; a
    /// violation surfaces as `MissingReference("question")`.
    async fn create_choice(&self, choice: NewChoice) -> RepoResult<Choice> {
        sqlx::query_as::<_, Choice>(
            r#"
            INSERT INTO choices (question_id, choice_text, votes)
            VALUES ($1, $2, $3)
            RETURNING id, question_id, choice_text, votes
            "#,
        )
        .bind(choice.question_id)
        .bind(choice.choice_text)
        .bind(choice.votes)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| classify(e, "question"))
    }

    async fn update_choice(&self, id: i64, changes: ChoiceChanges) -> RepoResult<Option<Choice>> {
        sqlx::query_as::<_, Choice>(
            r#"
            UPDATE choices
            SET question_id = COALESCE($2, question_id),
                choice_text = COALESCE($3, choice_text),
                votes = COALESCE($4, votes)
            WHERE id = $1
            RETURNING id, question_id, choice_text, votes
            "#,
        )
        .bind(id)
        .bind(changes.question_id)
        .bind(changes.choice_text)
        .bind(changes.votes)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| classify(e, "question"))
    }

    async fn delete_choice(&self, id: i64) -> RepoResult<bool> {
        sqlx::query("DELETE FROM choices WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map(|res| res.rows_affected() > 0)
            .map_err(logged)
    }
}
