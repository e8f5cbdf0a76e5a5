#[cfg(test)]
pub mod test_utils {
    use crate::router::create_router;
    use crate::schemas::AppState;
    use axum::Router;
    use axum_test::TestServer;
    use migration::{Migrator, MigratorTrait};
    use model::entities::{ingredient, tag, user};
    use sea_orm::{ActiveModelTrait, ConnectionTrait, Database, DatabaseConnection, Set};
    use tempfile::TempDir;
    use tracing::Level;
    use tracing_subscriber::FmtSubscriber;

    /// Create an in-memory SQLite database for testing
    pub async fn setup_test_db() -> DatabaseConnection {
        let db = Database::connect("sqlite::memory:")
            .await
            .expect("Failed to connect to in-memory database");

        db.execute_unprepared("PRAGMA foreign_keys = ON;")
            .await
            .expect("Failed to enable foreign keys");

        Migrator::up(&db, None)
            .await
            .expect("Failed to run migrations");

        db
    }

    /// Test fixture: the application plus handles to its database and media directory.
    /// The media directory is removed when the fixture is dropped.
    pub struct TestApp {
        pub server: TestServer,
        pub db: DatabaseConnection,
        pub media: TempDir,
    }

    /// Create AppState for testing, with media written to a temporary directory
    pub async fn setup_test_app_state() -> (AppState, TempDir) {
        let db = setup_test_db().await;
        let media = tempfile::tempdir().expect("Failed to create media directory");

        let state = AppState {
            db,
            media_root: media.path().to_path_buf(),
            default_page_size: 6,
        };
        (state, media)
    }

    /// Initialize tracing for tests with output to STDERR.
    ///
    /// The log level is taken from RUST_LOG, defaulting to WARN.
    fn init_test_tracing() -> tracing::subscriber::DefaultGuard {
        let log_level = std::env::var("RUST_LOG")
            .ok()
            .and_then(|level| level.parse::<Level>().ok())
            .unwrap_or(Level::WARN);

        let subscriber = FmtSubscriber::builder()
            .with_max_level(log_level)
            .with_writer(std::io::stderr)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    /// Create axum app for testing
    pub async fn setup_test_app() -> TestApp {
        let _guard = init_test_tracing();

        let (state, media) = setup_test_app_state().await;
        let db = state.db.clone();
        let router: Router = create_router(state);
        let server = TestServer::new(router).expect("Failed to start test server");

        TestApp { server, db, media }
    }

    pub async fn create_user(db: &DatabaseConnection, username: &str) -> user::Model {
        user::ActiveModel {
            username: Set(username.to_string()),
            email: Set(format!("{username}@example.com")),
            first_name: Set(username.to_string()),
            last_name: Set("Tester".to_string()),
            ..Default::default()
        }
        .insert(db)
        .await
        .expect("Failed to create test user")
    }

    pub async fn create_tag(db: &DatabaseConnection, name: &str) -> tag::Model {
        tag::ActiveModel {
            name: Set(name.to_string()),
            color: Set("#49B64E".to_string()),
            slug: Set(name.to_lowercase()),
            ..Default::default()
        }
        .insert(db)
        .await
        .expect("Failed to create test tag")
    }

    pub async fn create_ingredient(
        db: &DatabaseConnection,
        name: &str,
        unit: &str,
    ) -> ingredient::Model {
        ingredient::ActiveModel {
            name: Set(name.to_string()),
            measurement_unit: Set(unit.to_string()),
            ..Default::default()
        }
        .insert(db)
        .await
        .expect("Failed to create test ingredient")
    }
}
