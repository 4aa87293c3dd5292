mod helpers;

use helpers::spawn_app;
use serde_json::{json, Value};

#[tokio::test]
async fn signup_sends_a_code_and_verification_marks_the_email() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/auth/signup", app.address))
        .json(&json!({ "email": "a@x.com" }))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(200, response.status().as_u16());
    assert_eq!(1, app.mailer.sent_count());

    let code = app.last_emailed_code();
    let response = client
        .post(format!("{}/auth/verify", app.address))
        .json(&json!({ "email": "a@x.com", "token": code, "isSignUp": true }))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(200, response.status().as_u16());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["message"], json!("Token verified successfully"));
    // Signup verification issues no tokens; the account is created later
    assert!(body.get("tokens").is_none());

    // The verified marker now blocks a second signup
    let response = client
        .post(format!("{}/auth/signup", app.address))
        .json(&json!({ "email": "a@x.com" }))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(422, response.status().as_u16());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["code"], json!("EMAIL_ALREADY_VERIFIED"));
}

#[tokio::test]
async fn signup_is_rejected_for_an_existing_user() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    app.seed_user("member@x.com", &["author"]);

    let response = client
        .post(format!("{}/auth/signup", app.address))
        .json(&json!({ "email": "member@x.com" }))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(400, response.status().as_u16());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["code"], json!("EMAIL_ALREADY_EXISTS"));
}

#[tokio::test]
async fn second_signup_while_a_code_is_outstanding_is_throttled() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/auth/signup", app.address))
        .json(&json!({ "email": "a@x.com" }))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(200, response.status().as_u16());

    let response = client
        .post(format!("{}/auth/signup", app.address))
        .json(&json!({ "email": "a@x.com" }))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(429, response.status().as_u16());

    // Exactly one email went out
    assert_eq!(1, app.mailer.sent_count());
}

#[tokio::test]
async fn resend_is_throttled_until_the_backoff_window_elapses() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/auth/signin", app.address))
        .json(&json!({ "email": "b@x.com" }))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(200, response.status().as_u16());

    // Immediately asking again hits the 30-second gate
    let response = client
        .post(format!("{}/auth/resend-code", app.address))
        .json(&json!({ "email": "b@x.com" }))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(429, response.status().as_u16());
    assert_eq!(1, app.mailer.sent_count());

    // Simulate the gate's TTL elapsing
    app.kv_store.force_expire("resend-gate:b@x.com");

    let response = client
        .post(format!("{}/auth/resend-code", app.address))
        .json(&json!({ "email": "b@x.com" }))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(200, response.status().as_u16());
    assert_eq!(2, app.mailer.sent_count());

    // A different address is not rate-limited by b@x.com's backoff
    let response = client
        .post(format!("{}/auth/signin", app.address))
        .json(&json!({ "email": "c@x.com" }))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(200, response.status().as_u16());
}

#[tokio::test]
async fn wrong_code_fails_and_the_original_code_still_works() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    client
        .post(format!("{}/auth/signup", app.address))
        .json(&json!({ "email": "a@x.com" }))
        .send()
        .await
        .expect("Failed to execute request.");
    let code = app.last_emailed_code();

    let response = client
        .post(format!("{}/auth/verify", app.address))
        .json(&json!({ "email": "a@x.com", "token": "not-the-code", "isSignUp": true }))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(401, response.status().as_u16());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["message"], json!("Invalid token"));

    // The stored code survived the failed attempt
    let response = client
        .post(format!("{}/auth/verify", app.address))
        .json(&json!({ "email": "a@x.com", "token": code, "isSignUp": true }))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(200, response.status().as_u16());
}

#[tokio::test]
async fn verification_without_an_outstanding_code_fails() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/auth/verify", app.address))
        .json(&json!({ "email": "a@x.com", "token": "anything", "isSignUp": false }))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(401, response.status().as_u16());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["success"], json!(false));
}

#[tokio::test]
async fn sign_in_verification_issues_a_token_pair() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    app.seed_user("member@x.com", &["author"]);

    let tokens = app.sign_in(&client, "member@x.com").await;

    assert!(tokens["accessToken"].as_str().is_some());
    assert!(tokens["refreshToken"].as_str().is_some());
    assert_eq!(tokens["tokenType"], json!("Bearer"));
    assert_eq!(tokens["expiresIn"], json!(900));
}

#[tokio::test]
async fn sign_in_verification_fails_for_unknown_users() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    client
        .post(format!("{}/auth/signin", app.address))
        .json(&json!({ "email": "ghost@x.com" }))
        .send()
        .await
        .expect("Failed to execute request.");
    let code = app.last_emailed_code();

    let response = client
        .post(format!("{}/auth/verify", app.address))
        .json(&json!({ "email": "ghost@x.com", "token": code, "isSignUp": false }))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn malformed_emails_are_rejected() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    for invalid in ["notanemail", "user@", "@example.com", "user@@example.com"] {
        let response = client
            .post(format!("{}/auth/signup", app.address))
            .json(&json!({ "email": invalid }))
            .send()
            .await
            .expect("Failed to execute request.");

        assert_eq!(
            400,
            response.status().as_u16(),
            "Should reject invalid email: {}",
            invalid
        );
    }
}
