use std::{collections::HashMap, fmt, net::SocketAddr};

use anyhow::Context;
use chrono::{Duration, Utc};
use cucumber::{given, then, when, World as _};
use tempfile::TempDir;
use tripmates::{
    auth::{self, AuthenticatedUser},
    config::AppConfig,
    db::{init_pool, migrate},
    error::AppError,
    models::{
        application::{ApplicationStatus, NewApplication},
        trip::{NewTrip, TripPatch, TripStatus},
        user::NewUser,
    },
    state::AppState,
};

#[derive(Debug, cucumber::World, Default)]
struct AppWorld {
    state: Option<TestState>,
    users: HashMap<String, AuthenticatedUser>,
    trip_id: Option<i64>,
    applications: HashMap<String, i64>,
    last_error: Option<&'static str>,
}

impl AppWorld {
    fn app_state(&self) -> &AppState {
        self.state
            .as_ref()
            .expect("state must be initialised first")
            .app()
    }

    fn user(&self, name: &str) -> AuthenticatedUser {
        self.users
            .get(name)
            .cloned()
            .unwrap_or_else(|| panic!("user {name} must be registered first"))
    }

    fn trip_id(&self) -> i64 {
        self.trip_id.expect("a trip must exist first")
    }

    fn record<T>(&mut self, outcome: Result<T, AppError>) -> Option<T> {
        match outcome {
            Ok(value) => {
                self.last_error = None;
                Some(value)
            }
            Err(err) => {
                self.last_error = Some(error_kind(&err));
                None
            }
        }
    }
}

fn error_kind(err: &AppError) -> &'static str {
    match err {
        AppError::NotFound(_) => "NotFound",
        AppError::Forbidden(_) => "Forbidden",
        AppError::InvalidState(_) => "InvalidState",
        AppError::Conflict(_) => "Conflict",
        AppError::Validation(_) => "Validation",
        AppError::Unauthorized => "Unauthorized",
        _ => "Internal",
    }
}

struct TestState {
    app: AppState,
    _root: TempDir,
}

impl fmt::Debug for TestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestState").finish()
    }
}

impl TestState {
    async fn new() -> anyhow::Result<Self> {
        let root = TempDir::new().context("create temp dir for bdd world")?;
        let db_path = root.path().join("bdd.sqlite");

        let config = AppConfig {
            database_url: format!("sqlite://{}", db_path.to_string_lossy()),
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            cookie_secret: "bdd-cookie-secret".into(),
            session_ttl: Duration::hours(1),
            admin_emails: Vec::new(),
        };

        let db = init_pool(&config.database_url).await?;
        migrate(&db).await?;

        let app = AppState::new(config, db);
        Ok(Self { app, _root: root })
    }

    fn app(&self) -> &AppState {
        &self.app
    }
}

#[given("a fresh application state")]
async fn given_fresh_state(world: &mut AppWorld) {
    world.state = Some(TestState::new().await.expect("state"));
    world.users.clear();
    world.applications.clear();
    world.trip_id = None;
    world.last_error = None;
}

#[given(regex = r#"^a registered user "([^"]+)"$"#)]
async fn given_registered_user(world: &mut AppWorld, username: String) {
    let input = NewUser {
        username: username.clone(),
        email: format!("{username}@example.org"),
        password: "bdd-password-123".into(),
        full_name: None,
        bio: None,
    };
    let profile = auth::register_user(world.app_state(), &input)
        .await
        .expect("register user");
    world.users.insert(
        username,
        AuthenticatedUser {
            id: profile.id,
            username: profile.username,
            role: profile.role,
        },
    );
}

#[when(regex = r#"^"([^"]+)" creates a trip to "([^"]+)" starting in (-?\d+) days? with room for (\d+)$"#)]
async fn when_create_trip(
    world: &mut AppWorld,
    organizer: String,
    destination: String,
    days: i64,
    max: i64,
) {
    let start = Utc::now() + Duration::days(days);
    let input = NewTrip {
        title: format!("Trip to {destination}"),
        description: "Shared flat, shared food, shared adventures.".into(),
        destination,
        start_date: start,
        end_date: start + Duration::days(2),
        max_participants: max,
        cost_per_person: None,
    };
    let user = world.user(&organizer);
    let outcome = world.app_state().trips.create_trip(&user, &input).await;
    if let Some(trip) = world.record(outcome) {
        world.trip_id = Some(trip.id);
    }
}

#[when(regex = r#"^"([^"]+)" applies to the trip$"#)]
async fn when_apply(world: &mut AppWorld, applicant: String) {
    let user = world.user(&applicant);
    let outcome = world
        .app_state()
        .applications
        .apply(world.trip_id(), &user, &NewApplication::default())
        .await;
    if let Some(application) = world.record(outcome) {
        world.applications.insert(applicant, application.id);
    }
}

#[when(regex = r#"^"([^"]+)" (approves|rejects|cancels) the application of "([^"]+)"$"#)]
async fn when_decide(world: &mut AppWorld, actor: String, verb: String, applicant: String) {
    let decision = match verb.as_str() {
        "approves" => ApplicationStatus::Approved,
        "rejects" => ApplicationStatus::Rejected,
        _ => ApplicationStatus::Cancelled,
    };
    let application_id = *world
        .applications
        .get(&applicant)
        .expect("application must exist first");
    let user = world.user(&actor);
    let outcome = world
        .app_state()
        .applications
        .decide(application_id, decision, &user)
        .await;
    world.record(outcome);
}

#[when(regex = r#"^"([^"]+)" sets the trip status to "([^"]+)"$"#)]
async fn when_set_status(world: &mut AppWorld, actor: String, status: String) {
    let status: TripStatus =
        serde_json::from_value(serde_json::Value::String(status)).expect("known status");
    let patch = TripPatch {
        status: Some(status),
        ..TripPatch::default()
    };
    let user = world.user(&actor);
    let outcome = world
        .app_state()
        .trips
        .update_trip(world.trip_id(), &patch, &user)
        .await;
    world.record(outcome);
}

#[when(regex = r#"^"([^"]+)" starts the trip$"#)]
async fn when_start(world: &mut AppWorld, actor: String) {
    let user = world.user(&actor);
    let outcome = world.app_state().trips.start_trip(world.trip_id(), &user).await;
    world.record(outcome);
}

#[then("the operation succeeds")]
async fn then_succeeds(world: &mut AppWorld) {
    assert_eq!(world.last_error, None);
}

#[then(regex = r#"^the operation fails with "([^"]+)"$"#)]
async fn then_fails_with(world: &mut AppWorld, kind: String) {
    assert_eq!(world.last_error, Some(kind.as_str()));
}

#[then(regex = r#"^the trip status is "([^"]+)"$"#)]
async fn then_status_is(world: &mut AppWorld, expected: String) {
    let trip = world
        .app_state()
        .trips
        .get_trip(world.trip_id())
        .await
        .expect("load trip");
    assert_eq!(trip.trip.status.as_str(), expected);
}

#[then(regex = r#"^the trip participants are "([^"]*)"$"#)]
async fn then_participants_are(world: &mut AppWorld, expected: String) {
    let trip = world
        .app_state()
        .trips
        .get_trip(world.trip_id())
        .await
        .expect("load trip");
    let names: Vec<String> = trip
        .participants
        .into_iter()
        .map(|user| user.username)
        .collect();
    let expected: Vec<String> = expected.split(',').map(|name| name.trim().to_string()).collect();
    assert_eq!(names, expected);
    assert!(names.contains(&trip.organizer.username));
}

#[then(regex = r#"^the application of "([^"]+)" is "([^"]+)"$"#)]
async fn then_application_is(world: &mut AppWorld, applicant: String, expected: String) {
    let user = world.user(&applicant);
    let application_id = world.applications[&applicant];
    let mine = world
        .app_state()
        .applications
        .list_for_applicant(&user)
        .await
        .expect("list applications");
    let application = mine
        .into_iter()
        .find(|application| application.id == application_id)
        .expect("application listed");
    assert_eq!(application.status.as_str(), expected);
}

#[then(regex = r#"^"([^"]+)" sees (\d+) system messages in the trip log$"#)]
async fn then_log_has(world: &mut AppWorld, viewer: String, expected: usize) {
    let user = world.user(&viewer);
    let log = world
        .app_state()
        .log
        .list(world.trip_id(), &user)
        .await
        .expect("list log");
    assert_eq!(log.iter().filter(|entry| entry.is_system).count(), expected);
}

#[tokio::main]
async fn main() {
    AppWorld::cucumber()
        .fail_on_skipped()
        .with_default_cli()
        .run("tests/features")
        .await;
}
