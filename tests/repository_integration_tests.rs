use chrono::{Duration, Utc};
use sqlx::PgPool;
use tokio::test;
use tutorial_api::{
    models::{ChoiceChanges, NewChoice, NewQuestion, NewSnippet, NewUser, SnippetChanges},
    repository::{MemoryRepository, PostgresRepository, Repository, RepositoryError},
};

// --- Test Data Helpers ---

fn new_user(username: &str) -> NewUser {
    NewUser {
        username: username.to_string(),
        email: format!("{username}@example.com"),
        password_hash: "$argon2id$placeholder".to_string(),
        age: 21,
    }
}

fn new_snippet(code: &str) -> NewSnippet {
    NewSnippet {
        title: String::new(),
        code: code.to_string(),
        linenos: false,
        language: "python".to_string(),
        style: "InspiredGitHub".to_string(),
    }
}

fn new_question(text: &str) -> NewQuestion {
    NewQuestion {
        question_text: text.to_string(),
        pub_date: Utc::now() - Duration::days(1),
    }
}

/// The behaviour every backend must share. Run against the in-memory store
/// always, and against Postgres when one is available.
async fn exercise_repository(repo: &dyn Repository, suffix: &str) {
    let alice_name = format!("alice{suffix}");

    // Users
    let alice = repo.create_user(new_user(&alice_name)).await.unwrap();
    assert_eq!(alice.age, 21);
    assert!(alice.snippets.is_empty());

    let duplicate = repo.create_user(new_user(&alice_name)).await;
    assert!(matches!(duplicate, Err(RepositoryError::Conflict("username"))));

    let credentials = repo.get_credentials(&alice_name).await.unwrap().unwrap();
    assert_eq!(credentials.id, alice.id);
    assert_eq!(credentials.password_hash, "$argon2id$placeholder");
    assert!(repo.get_credentials("nobody-by-that-name").await.unwrap().is_none());

    // Snippets
    let first = repo.create_snippet(new_snippet("a"), alice.id).await.unwrap();
    let second = repo.create_snippet(new_snippet("b"), alice.id).await.unwrap();
    assert_eq!(first.owner.as_deref(), Some(alice_name.as_str()));
    assert_eq!(first.owner_id, Some(alice.id));

    let listed = repo.list_snippets().await.unwrap();
    let first_pos = listed.iter().position(|s| s.id == first.id).unwrap();
    let second_pos = listed.iter().position(|s| s.id == second.id).unwrap();
    assert!(first_pos < second_pos);

    let user = repo.get_user(alice.id).await.unwrap().unwrap();
    assert_eq!(user.snippets, vec![first.id, second.id]);

    let updated = repo
        .update_snippet(
            first.id,
            SnippetChanges {
                title: Some("renamed".to_string()),
                ..SnippetChanges::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.title, "renamed");
    assert_eq!(updated.code, "a");
    assert_eq!(updated.owner_id, Some(alice.id));
    assert_eq!(updated.created, first.created);

    assert!(repo
        .update_snippet(i64::MAX, SnippetChanges::default())
        .await
        .unwrap()
        .is_none());

    assert!(repo.delete_snippet(second.id).await.unwrap());
    assert!(!repo.delete_snippet(second.id).await.unwrap());
    assert!(repo.get_snippet(second.id).await.unwrap().is_none());

    // Questions and choices
    let question = repo.create_question(new_question("Pick one")).await.unwrap();
    assert!(question.choices.is_empty());

    let choice = repo
        .create_choice(NewChoice {
            question_id: question.id,
            choice_text: "this".to_string(),
            votes: 0,
        })
        .await
        .unwrap();

    let orphan = repo
        .create_choice(NewChoice {
            question_id: i64::MAX,
            choice_text: "orphan".to_string(),
            votes: 0,
        })
        .await;
    assert!(matches!(orphan, Err(RepositoryError::MissingReference("question"))));

    let voted = repo
        .update_choice(
            choice.id,
            ChoiceChanges {
                votes: Some(5),
                ..ChoiceChanges::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(voted.votes, 5);
    assert_eq!(voted.question_id, question.id);

    let question = repo.get_question(question.id).await.unwrap().unwrap();
    assert_eq!(question.choices, vec![choice.id]);

    assert!(repo.delete_question(question.id).await.unwrap());
    assert!(repo.get_choice(choice.id).await.unwrap().is_none());
}

#[test]
async fn test_memory_repository_contract() {
    let repo = MemoryRepository::new();
    exercise_repository(&repo, "").await;
}

#[test]
async fn test_memory_repository_ids_are_sequential() {
    let repo = MemoryRepository::new();
    let a = repo.create_user(new_user("a")).await.unwrap();
    let b = repo.create_user(new_user("b")).await.unwrap();
    assert_eq!((a.id, b.id), (1, 2));

    let users = repo.list_users().await.unwrap();
    assert_eq!(users.iter().map(|u| u.id).collect::<Vec<_>>(), vec![1, 2]);
}

#[test]
async fn test_memory_snippet_requires_existing_owner() {
    let repo = MemoryRepository::new();
    let result = repo.create_snippet(new_snippet("x"), 99).await;
    assert!(matches!(result, Err(RepositoryError::MissingReference("owner"))));
}

// --- Postgres ---

/// Needs a reachable database in DATABASE_URL:
/// `cargo test -- --ignored`
#[test]
#[ignore]
async fn test_postgres_repository_contract() {
    dotenv::dotenv().ok();
    let db_url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL must be set to run integration tests");

    let pool = PgPool::connect(&db_url)
        .await
        .expect("Failed to connect to database for integration tests.");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run database migrations.");

    // Unique usernames so reruns against the same database do not collide.
    let suffix = format!("-{}", Utc::now().timestamp_micros());
    let repo = PostgresRepository::new(pool);
    exercise_repository(&repo, &suffix).await;
}
