use serde_json::json;
use tutorial_api::{
    ApiError,
    error::ValidationErrors,
    highlight,
    hyperlinks::{Hyperlinks, resolve, resolve_under},
    models::{ChoicePayload, CreateUserRequest, QuestionPayload, SignupRequest, SnippetPayload},
    password, routes,
};

fn validation_errors<T: std::fmt::Debug>(result: Result<T, ApiError>) -> ValidationErrors {
    match result {
        Err(ApiError::Validation(errors)) => errors,
        other => panic!("expected validation error, got {other:?}"),
    }
}

// --- Snippets ---

#[test]
fn test_snippet_defaults_on_create() {
    let payload: SnippetPayload = serde_json::from_value(json!({ "code": "print(1)" })).unwrap();
    let snippet = payload.validate(false).unwrap().into_new();

    assert_eq!(snippet.title, "");
    assert_eq!(snippet.code, "print(1)");
    assert!(!snippet.linenos);
    assert_eq!(snippet.language, highlight::DEFAULT_LANGUAGE);
    assert_eq!(snippet.style, highlight::DEFAULT_STYLE);
}

#[test]
fn test_snippet_rejects_unknown_language_and_style() {
    let payload: SnippetPayload = serde_json::from_value(json!({
        "code": "x",
        "language": "klingon",
        "style": "neon-nightmare"
    }))
    .unwrap();
    let errors = validation_errors(payload.validate(false));

    assert_eq!(
        errors.messages("language"),
        ["\"klingon\" is not a valid choice.".to_string()]
    );
    let style = errors.messages("style");
    assert_eq!(style.len(), 1);
    assert!(style[0].starts_with("\"neon-nightmare\" is not a valid choice."));
    assert!(style[0].contains(highlight::DEFAULT_STYLE));
}

#[test]
fn test_snippet_title_length_and_blank_code() {
    let payload: SnippetPayload = serde_json::from_value(json!({
        "title": "x".repeat(101),
        "code": "   "
    }))
    .unwrap();
    let errors = validation_errors(payload.validate(true));

    assert!(errors.contains("title"));
    assert_eq!(
        errors.messages("code"),
        ["This field may not be blank.".to_string()]
    );
}

#[test]
fn test_partial_snippet_may_be_empty() {
    let payload = SnippetPayload::default();
    let changes = payload.validate(true).unwrap();
    assert_eq!(changes.code, None);
    assert_eq!(changes.title, None);
}

// --- Users ---

#[test]
fn test_create_user_requires_username_and_password() {
    let errors = validation_errors(CreateUserRequest::default().validate());
    assert!(errors.contains("username"));
    assert!(errors.contains("password"));
}

#[test]
fn test_username_charset_and_email_format() {
    let request: CreateUserRequest = serde_json::from_value(json!({
        "username": "bad name!",
        "email": "not-an-email",
        "password": "long-enough-secret"
    }))
    .unwrap();
    let errors = validation_errors(request.validate());
    assert!(errors.contains("username"));
    assert!(errors.contains("email"));
}

#[test]
fn test_email_longer_than_column_is_rejected() {
    let request: CreateUserRequest = serde_json::from_value(json!({
        "username": "alice",
        "email": format!("{}@example.com", "a".repeat(300)),
        "password": "long-enough-secret"
    }))
    .unwrap();
    let errors = validation_errors(request.validate());
    assert_eq!(
        errors.messages("email"),
        ["Ensure this field has no more than 254 characters.".to_string()]
    );
}

#[test]
fn test_valid_user_defaults_age_to_zero() {
    let request: CreateUserRequest = serde_json::from_value(json!({
        "username": "alice",
        "email": "alice@example.com",
        "password": "long-enough-secret"
    }))
    .unwrap();
    let draft = request.validate().unwrap();
    assert_eq!(draft.username, "alice");
    assert_eq!(draft.age, 0);
}

#[test]
fn test_signup_passwords_must_match() {
    let request: SignupRequest = serde_json::from_value(json!({
        "username": "alice",
        "password1": "long-enough-secret",
        "password2": "long-enough-secreT"
    }))
    .unwrap();
    let errors = validation_errors(request.validate());
    assert_eq!(
        errors.messages("password2"),
        ["The two password fields didn’t match.".to_string()]
    );
}

#[test]
fn test_password_policy() {
    let alice = [("username", "alice")];
    assert!(password::policy_violations("long-enough-secret", &alice).is_empty());

    let short = password::policy_violations("abc", &alice);
    assert!(short.iter().any(|m| m.contains("too short")));

    let common = password::policy_violations("password123", &alice);
    assert!(common.iter().any(|m| m.contains("too common")));

    let numeric = password::policy_violations("9081726354", &alice);
    assert!(numeric.iter().any(|m| m.contains("entirely numeric")));

    let similar = password::policy_violations("alice-the-great", &alice);
    assert_eq!(similar, ["The password is too similar to the username.".to_string()]);
}

#[test]
fn test_password_similar_to_email_is_rejected() {
    let attributes = [("username", "bob"), ("email address", "wonderland@example.com")];
    let similar = password::policy_violations("Wonderland2024", &attributes);
    assert_eq!(
        similar,
        ["The password is too similar to the email address.".to_string()]
    );

    let request: SignupRequest = serde_json::from_value(json!({
        "username": "bob",
        "email": "wonderland@example.com",
        "password1": "wonderland-forever",
        "password2": "wonderland-forever"
    }))
    .unwrap();
    let errors = validation_errors(request.validate());
    assert!(errors.contains("password2"));
    assert!(!errors.contains("email"));
}

#[test]
fn test_password_hash_round_trip() {
    let hash = password::hash_password("long-enough-secret").unwrap();
    assert!(hash.starts_with("$argon2"));
    assert!(password::verify_password("long-enough-secret", &hash));
    assert!(!password::verify_password("wrong", &hash));
    assert!(!password::verify_password("anything", "not-a-phc-string"));
}

// --- Polls ---

#[test]
fn test_question_requires_valid_pub_date() {
    let payload: QuestionPayload = serde_json::from_value(json!({
        "question_text": "Why?",
        "pub_date": "yesterday"
    }))
    .unwrap();
    let errors = validation_errors(payload.validate(false));
    assert!(errors.contains("pub_date"));
    assert!(!errors.contains("question_text"));
}

#[test]
fn test_choice_question_must_be_a_question_link() {
    let links = Hyperlinks::new("http://localhost:3000");

    let wrong_resource: ChoicePayload = serde_json::from_value(json!({
        "question": "http://localhost:3000/choices/1/",
        "choice_text": "a"
    }))
    .unwrap();
    let errors = validation_errors(wrong_resource.validate(false, &links));
    assert_eq!(
        errors.messages("question"),
        ["Invalid hyperlink - No URL match.".to_string()]
    );

    let nested: ChoicePayload = serde_json::from_value(json!({
        "question": "http://localhost:3000/snippets/questions/1/",
        "choice_text": "a"
    }))
    .unwrap();
    let errors = validation_errors(nested.validate(false, &links));
    assert_eq!(
        errors.messages("question"),
        ["Invalid hyperlink - No URL match.".to_string()]
    );

    let ok: ChoicePayload = serde_json::from_value(json!({
        "question": "http://localhost:3000/questions/3/",
        "choice_text": "a"
    }))
    .unwrap();
    let choice = ok.validate(false, &links).unwrap().into_new().unwrap();
    assert_eq!(choice.question_id, 3);
    assert_eq!(choice.votes, 0);
}

#[test]
fn test_hyperlink_building_and_resolution() {
    let links = Hyperlinks::new("https://api.example.com/");
    assert_eq!(links.collection("questions"), "https://api.example.com/questions/");
    assert_eq!(links.question(7), "https://api.example.com/questions/7/");
    assert_eq!(links.choice(2), "https://api.example.com/choices/2/");

    assert_eq!(resolve("https://other-host/questions/7/", "questions"), Some(7));
    assert_eq!(resolve("/questions/7", "questions"), Some(7));
    assert_eq!(resolve("/questions/0/", "questions"), None);
    assert_eq!(resolve("/questions/abc/", "questions"), None);
    assert_eq!(resolve("/choices/7/", "questions"), None);
    assert_eq!(resolve("not a url at all", "questions"), None);

    // The whole path must match, not just the segment before the id.
    assert_eq!(resolve("http://localhost:3000/snippets/questions/1/", "questions"), None);
    assert_eq!(resolve("/questions/1/extra/", "questions"), None);

    // Below a mounted base path, the base must be present and is stripped.
    assert_eq!(resolve_under("https://host/api/questions/4/", "/api", "questions"), Some(4));
    assert_eq!(resolve_under("https://host/questions/4/", "/api", "questions"), None);
    assert_eq!(resolve_under("https://host/apiquestions/4/", "/api", "questions"), None);

    let mounted = Hyperlinks::new("https://api.example.com/v1/");
    assert_eq!(mounted.resolve_question(&mounted.question(9)), Some(9));
    assert_eq!(mounted.resolve_question("https://api.example.com/questions/9/"), None);
}

#[test]
fn test_highlight_catalogs() {
    let styles = highlight::styles();
    assert!(styles.contains(&highlight::DEFAULT_STYLE));
    assert!(styles.windows(2).all(|pair| pair[0] <= pair[1]));
    assert!(highlight::is_known_language(highlight::DEFAULT_LANGUAGE));
    assert!(highlight::is_known_language("rs"));
    assert!(!highlight::is_known_style("no-such-theme"));
}

#[test]
fn test_registered_resources_in_root_order() {
    let router = routes::api_router();
    assert_eq!(router.prefixes(), ["users", "snippets", "questions", "choices"]);
}
