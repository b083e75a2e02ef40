use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{RepoResult, Repository, RepositoryError};
use crate::models::{
    Choice, ChoiceChanges, NewChoice, NewQuestion, NewSnippet, NewUser, Question, QuestionChanges,
    Snippet, SnippetChanges, User, UserCredentials,
};

#[derive(Debug, Clone)]
struct UserRow {
    user: User,
    password_hash: String,
}

#[derive(Debug, Clone)]
struct QuestionRow {
    id: i64,
    question_text: String,
    pub_date: chrono::DateTime<Utc>,
}

#[derive(Default)]
struct Tables {
    users: BTreeMap<i64, UserRow>,
    snippets: BTreeMap<i64, Snippet>,
    questions: BTreeMap<i64, QuestionRow>,
    choices: BTreeMap<i64, Choice>,
    next_id: BTreeMap<&'static str, i64>,
}

impl Tables {
    fn next_id(&mut self, table: &'static str) -> i64 {
        let id = self.next_id.entry(table).or_insert(0);
        *id += 1;
        *id
    }

    fn user(&self, id: i64) -> Option<User> {
        let mut user = self.users.get(&id)?.user.clone();
        user.snippets = self
            .snippets
            .values()
            .filter(|snippet| snippet.owner_id == Some(id))
            .map(|snippet| snippet.id)
            .collect();
        Some(user)
    }

    // Owner usernames are resolved at read time, like the SQL join.
    fn snippet(&self, id: i64) -> Option<Snippet> {
        let mut snippet = self.snippets.get(&id)?.clone();
        snippet.owner = snippet
            .owner_id
            .and_then(|owner| self.users.get(&owner))
            .map(|row| row.user.username.clone());
        Some(snippet)
    }

    fn question(&self, id: i64) -> Option<Question> {
        let row = self.questions.get(&id)?;
        Some(Question {
            id: row.id,
            question_text: row.question_text.clone(),
            pub_date: row.pub_date,
            choices: self
                .choices
                .values()
                .filter(|choice| choice.question_id == id)
                .map(|choice| choice.id)
                .collect(),
        })
    }
}

/// MemoryRepository
///
/// In-process implementation of `Repository`. Used for local runs without a
/// database and by the test-suite. One lock guards all tables, so every
/// operation is atomic with respect to the others.
#[derive(Default)]
pub struct MemoryRepository {
    tables: RwLock<Tables>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn list_users(&self) -> RepoResult<Vec<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.keys().filter_map(|id| tables.user(*id)).collect())
    }

    async fn get_user(&self, id: i64) -> RepoResult<Option<User>> {
        Ok(self.tables.read().await.user(id))
    }

    async fn get_credentials(&self, username: &str) -> RepoResult<Option<UserCredentials>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|row| row.user.username == username)
            .map(|row| UserCredentials {
                id: row.user.id,
                username: row.user.username.clone(),
                password_hash: row.password_hash.clone(),
            }))
    }

    async fn create_user(&self, user: NewUser) -> RepoResult<User> {
        let mut tables = self.tables.write().await;
        if tables
            .users
            .values()
            .any(|row| row.user.username == user.username)
        {
            return Err(RepositoryError::Conflict("username"));
        }

        let id = tables.next_id("users");
        let created = User {
            id,
            username: user.username,
            email: user.email,
            age: user.age,
            date_joined: Utc::now(),
            snippets: Vec::new(),
        };
        tables.users.insert(
            id,
            UserRow {
                user: created.clone(),
                password_hash: user.password_hash,
            },
        );
        Ok(created)
    }

    async fn list_snippets(&self) -> RepoResult<Vec<Snippet>> {
        let tables = self.tables.read().await;
        let mut snippets: Vec<Snippet> = tables
            .snippets
            .keys()
            .filter_map(|id| tables.snippet(*id))
            .collect();
        snippets.sort_by(|a, b| a.created.cmp(&b.created).then(a.id.cmp(&b.id)));
        Ok(snippets)
    }

    async fn get_snippet(&self, id: i64) -> RepoResult<Option<Snippet>> {
        Ok(self.tables.read().await.snippet(id))
    }

    async fn create_snippet(&self, snippet: NewSnippet, owner_id: i64) -> RepoResult<Snippet> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&owner_id) {
            return Err(RepositoryError::MissingReference("owner"));
        }

        let id = tables.next_id("snippets");
        tables.snippets.insert(
            id,
            Snippet {
                id,
                created: Utc::now(),
                title: snippet.title,
                code: snippet.code,
                linenos: snippet.linenos,
                language: snippet.language,
                style: snippet.style,
                owner: None,
                owner_id: Some(owner_id),
            },
        );
        Ok(tables.snippet(id).ok_or(RepositoryError::MissingReference("snippet"))?)
    }

    async fn update_snippet(&self, id: i64, changes: SnippetChanges) -> RepoResult<Option<Snippet>> {
        let mut tables = self.tables.write().await;
        let Some(stored) = tables.snippets.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(title) = changes.title {
            stored.title = title;
        }
        if let Some(code) = changes.code {
            stored.code = code;
        }
        if let Some(linenos) = changes.linenos {
            stored.linenos = linenos;
        }
        if let Some(language) = changes.language {
            stored.language = language;
        }
        if let Some(style) = changes.style {
            stored.style = style;
        }
        Ok(tables.snippet(id))
    }

    async fn delete_snippet(&self, id: i64) -> RepoResult<bool> {
        Ok(self.tables.write().await.snippets.remove(&id).is_some())
    }

    async fn list_questions(&self) -> RepoResult<Vec<Question>> {
        let tables = self.tables.read().await;
        Ok(tables
            .questions
            .keys()
            .filter_map(|id| tables.question(*id))
            .collect())
    }

    async fn get_question(&self, id: i64) -> RepoResult<Option<Question>> {
        Ok(self.tables.read().await.question(id))
    }

    async fn create_question(&self, question: NewQuestion) -> RepoResult<Question> {
        let mut tables = self.tables.write().await;
        let id = tables.next_id("questions");
        tables.questions.insert(
            id,
            QuestionRow {
                id,
                question_text: question.question_text,
                pub_date: question.pub_date,
            },
        );
        Ok(tables
            .question(id)
            .ok_or(RepositoryError::MissingReference("question"))?)
    }

    async fn update_question(&self, id: i64, changes: QuestionChanges) -> RepoResult<Option<Question>> {
        let mut tables = self.tables.write().await;
        let Some(stored) = tables.questions.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(question_text) = changes.question_text {
            stored.question_text = question_text;
        }
        if let Some(pub_date) = changes.pub_date {
            stored.pub_date = pub_date;
        }
        Ok(tables.question(id))
    }

    async fn delete_question(&self, id: i64) -> RepoResult<bool> {
        let mut tables = self.tables.write().await;
        if tables.questions.remove(&id).is_none() {
            return Ok(false);
        }
        tables.choices.retain(|_, choice| choice.question_id != id);
        Ok(true)
    }

    async fn list_choices(&self) -> RepoResult<Vec<Choice>> {
        Ok(self.tables.read().await.choices.values().cloned().collect())
    }

    async fn get_choice(&self, id: i64) -> RepoResult<Option<Choice>> {
        Ok(self.tables.read().await.choices.get(&id).cloned())
    }

    async fn create_choice(&self, choice: NewChoice) -> RepoResult<Choice> {
        let mut tables = self.tables.write().await;
        if !tables.questions.contains_key(&choice.question_id) {
            return Err(RepositoryError::MissingReference("question"));
        }

        let id = tables.next_id("choices");
        let created = Choice {
            id,
            question_id: choice.question_id,
            choice_text: choice.choice_text,
            votes: choice.votes,
        };
        tables.choices.insert(id, created.clone());
        Ok(created)
    }

    async fn update_choice(&self, id: i64, changes: ChoiceChanges) -> RepoResult<Option<Choice>> {
        let mut tables = self.tables.write().await;
        if let Some(question_id) = changes.question_id {
            if !tables.questions.contains_key(&question_id) {
                return Err(RepositoryError::MissingReference("question"));
            }
        }

        let Some(stored) = tables.choices.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(question_id) = changes.question_id {
            stored.question_id = question_id;
        }
        if let Some(choice_text) = changes.choice_text {
            stored.choice_text = choice_text;
        }
        if let Some(votes) = changes.votes {
            stored.votes = votes;
        }
        Ok(Some(stored.clone()))
    }

    async fn delete_choice(&self, id: i64) -> RepoResult<bool> {
        Ok(self.tables.write().await.choices.remove(&id).is_some())
    }
}
