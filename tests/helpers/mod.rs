use std::net::TcpListener;
use std::sync::Arc;

use serde_json::{json, Value};
use uuid::Uuid;

use peergate::configuration::{ApplicationSettings, JwtSettings};
use peergate::directory::{InMemoryUserDirectory, UserRecord};
use peergate::email_client::RecordingEmailSender;
use peergate::invites::{InMemoryInviteStore, InMemoryReviewerRegistry, InviteService};
use peergate::startup::{run, Dependencies};
use peergate::store::InMemoryKeyValueStore;

pub struct TestApp {
    pub address: String,
    pub kv_store: Arc<InMemoryKeyValueStore>,
    pub users: Arc<InMemoryUserDirectory>,
    pub mailer: Arc<RecordingEmailSender>,
    pub invites: Arc<InMemoryInviteStore>,
    pub invite_service: InviteService,
}

pub async fn spawn_app() -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    let kv_store = Arc::new(InMemoryKeyValueStore::new());
    let users = Arc::new(InMemoryUserDirectory::new());
    let mailer = Arc::new(RecordingEmailSender::new());
    let invites = Arc::new(InMemoryInviteStore::new());
    let registry = Arc::new(InMemoryReviewerRegistry::new());

    let deps = Dependencies {
        kv_store: kv_store.clone(),
        users: users.clone(),
        mailer: mailer.clone(),
        invites: invites.clone(),
        registry,
    };

    let application = ApplicationSettings {
        port,
        frontend_base_url: "http://localhost:3000".to_string(),
    };
    let jwt = JwtSettings {
        secret: "test-secret-key-at-least-32-characters-long".to_string(),
        access_token_expiry: 900,
        refresh_token_expiry: 1_209_600,
        issuer: "peergate-test".to_string(),
    };

    let server = run(listener, application, jwt, deps).expect("Failed to bind address");
    let _ = tokio::spawn(server);

    let invite_service = InviteService::new(invites.clone());

    TestApp {
        address,
        kv_store,
        users,
        mailer,
        invites,
        // Shares the server's invite store so tests can mint invites
        // without going through the editor endpoint.
        invite_service,
    }
}

impl TestApp {
    pub fn seed_user(&self, email: &str, roles: &[&str]) -> Uuid {
        let id = Uuid::new_v4();
        self.users.insert(UserRecord {
            id,
            email: email.to_string(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
        });
        id
    }

    /// The code embedded in the most recent outbound email.
    pub fn last_emailed_code(&self) -> String {
        let mail = self.mailer.last().expect("no email was sent");
        extract_token(&mail.link)
    }

    /// Full passwordless sign-in over HTTP; returns the token response.
    pub async fn sign_in(&self, client: &reqwest::Client, email: &str) -> Value {
        let response = client
            .post(format!("{}/auth/signin", self.address))
            .json(&json!({ "email": email }))
            .send()
            .await
            .expect("Failed to execute request.");
        assert_eq!(200, response.status().as_u16());

        let code = self.last_emailed_code();
        let response = client
            .post(format!("{}/auth/verify", self.address))
            .json(&json!({ "email": email, "token": code, "isSignUp": false }))
            .send()
            .await
            .expect("Failed to execute request.");
        assert_eq!(200, response.status().as_u16());

        let body: Value = response.json().await.expect("Failed to parse response");
        assert_eq!(body["success"], json!(true));
        body["tokens"].clone()
    }
}

/// Pull the `token` query parameter out of an emailed link.
pub fn extract_token(link: &str) -> String {
    link.split("token=")
        .nth(1)
        .expect("link has no token parameter")
        .split('&')
        .next()
        .unwrap()
        .to_string()
}
