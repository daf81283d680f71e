//! Axum gateway for the BBC School registration site. Config-driven via CoreConfig.

mod handlers;
mod rate_limit;

use axum::{
    extract::DefaultBodyLimit,
    handler::Handler,
    middleware,
    routing::{get, post, MethodRouter},
    Router,
};
use bbc_core::{CoreConfig, KnowledgeBase, Notifier, RegistrationStore, Responder, SmtpNotifier};
use handlers::{admin, chat, inscription, pages};
use rate_limit::RateLimiter;
use std::path::Path as StdPath;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Pre-flight check: config loads, registrations CSV is readable, port is free.
fn run_verify() -> Result<(), String> {
    let config = CoreConfig::load().map_err(|e| format!("Config load failed: {}", e))?;

    let csv_path = config.inscriptions_path();
    print!("Checking {}... ", csv_path.display());
    let store = RegistrationStore::open_path(&csv_path);
    store
        .init()
        .map_err(|e| format!("registrations CSV not writable: {}", e))?;
    let count = store
        .count()
        .map_err(|e| format!("registrations CSV unreadable: {}", e))?;
    println!("OK ({} registrations)", count);

    print!("Checking templates... ");
    let index = StdPath::new(&config.templates_dir).join("index.html");
    if !index.is_file() {
        return Err(format!("{} missing", index.display()));
    }
    println!("OK");

    print!("Checking mail... ");
    if config.mail_enabled() {
        println!("OK (notifications to {})", config.email_address);
    } else {
        println!("DISABLED (set BBC_EMAIL_PASSWORD to enable)");
    }

    let port = config.port;
    print!("Checking port {}... ", port);
    match std::net::TcpListener::bind((config.host.as_str(), port)) {
        Ok(listener) => {
            drop(listener);
            println!("OK (available)");
        }
        Err(e) => {
            return Err(format!("Port {} BLOCKED: {}", port, e));
        }
    }

    println!("\n✅ SUCCESS: All systems GO. Ready to start gateway.");
    Ok(())
}

/// Stdout plus `logs/app.log`. The returned guard flushes the file writer on drop.
fn init_tracing(logs_dir: &str) -> Option<WorkerGuard> {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
    );
    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer());

    match std::fs::create_dir_all(logs_dir) {
        Ok(()) => {
            let appender = tracing_appender::rolling::never(logs_dir, "app.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(writer)
                        .with_ansi(false),
                )
                .init();
            Some(guard)
        }
        Err(e) => {
            registry.init();
            tracing::warn!("Log directory {} unavailable, logging to stdout only: {}", logs_dir, e);
            None
        }
    }
}

#[tokio::main]
async fn main() {
    // Load .env file if present (before any env::var calls)
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("[bbc-gateway] .env not loaded: {} (using system environment)", e);
    }

    // Handle --verify flag for pre-flight check
    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "--verify") {
        match run_verify() {
            Ok(()) => std::process::exit(0),
            Err(e) => {
                eprintln!("❌ PRE-FLIGHT FAILED: {}", e);
                std::process::exit(1);
            }
        }
    }

    let config = Arc::new(CoreConfig::load().expect("load CoreConfig"));
    let _log_guard = init_tracing(&config.logs_dir);

    for dir in [&config.data_dir, &config.static_dir, &config.templates_dir] {
        if let Err(e) = std::fs::create_dir_all(dir) {
            tracing::warn!("Could not create {}: {}", dir, e);
        }
    }

    let store = Arc::new(RegistrationStore::open_path(config.inscriptions_path()));
    store.init().expect("initialize registrations CSV");
    if !pages::check_images(StdPath::new(&config.static_dir)) {
        tracing::warn!("Some images are missing; the landing page will use its fallbacks");
    }

    let knowledge = match &config.knowledge_path {
        Some(path) => KnowledgeBase::load_json_path(path),
        None => KnowledgeBase::builtin(),
    };
    let responder = Arc::new(Responder::new(knowledge));

    let notifier: Arc<dyn Notifier> = Arc::new(SmtpNotifier::from_config(&config));
    if !config.mail_enabled() {
        tracing::warn!("BBC_EMAIL_PASSWORD not set: registration notifications are disabled");
    }

    let app = build_app(AppState {
        config: Arc::clone(&config),
        responder,
        store,
        notifier,
        limiter: Arc::new(RateLimiter::new()),
    });

    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port))
        .await
        .expect("bind gateway port");
    tracing::info!("{} listening on {}:{}", config.app_name, config.host, config.port);
    tracing::info!("Routes: / · POST /inscription · POST /chatbot · /admin · /export · /health");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await
    .expect("serve gateway");
}

/// `POST` route whose panics become the chatbot's fallback reply.
fn chatbot_route<H, T>(handler: H) -> MethodRouter<AppState>
where
    H: Handler<T, AppState>,
    T: 'static,
{
    post(handler).layer(CatchPanicLayer::custom(chat::chatbot_fault))
}

fn build_app(state: AppState) -> Router {
    let max_body = state.config.max_body_bytes;
    let static_dir = state.config.static_dir.clone();

    Router::new()
        .route("/", get(pages::index))
        .route("/test-image", get(pages::test_image))
        .route("/inscription", post(inscription::inscription))
        .route("/chatbot", chatbot_route(chat::chatbot))
        .route("/admin", get(admin::admin))
        .route("/export", get(admin::export))
        .route("/health", get(admin::health))
        .nest_service("/static", ServeDir::new(static_dir))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::enforce,
        ))
        .layer(DefaultBodyLimit::max(max_body))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) config: Arc<CoreConfig>,
    pub(crate) responder: Arc<Responder>,
    pub(crate) store: Arc<RegistrationStore>,
    pub(crate) notifier: Arc<dyn Notifier>,
    pub(crate) limiter: Arc<RateLimiter>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::extract::connect_info::MockConnectInfo;
    use axum::http::{header, Request, StatusCode};
    use bbc_core::{MailError, Registration, EMPTY_QUERY_PROMPT};
    use std::net::SocketAddr;
    use std::sync::Mutex;
    use tower::ServiceExt;

    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl Notifier for RecordingNotifier {
        fn name(&self) -> &str {
            "recording"
        }

        async fn notify(&self, registration: &Registration) -> Result<(), MailError> {
            self.sent.lock().unwrap().push(registration.email.clone());
            Ok(())
        }
    }

    fn test_config(root: &StdPath) -> CoreConfig {
        CoreConfig {
            app_name: "Test Gateway".to_string(),
            data_dir: root.join("data").display().to_string(),
            logs_dir: root.join("logs").display().to_string(),
            static_dir: root.join("static").display().to_string(),
            templates_dir: root.join("templates").display().to_string(),
            ..CoreConfig::default()
        }
    }

    fn test_state(config: CoreConfig, notifier: Arc<RecordingNotifier>) -> AppState {
        let store = Arc::new(RegistrationStore::open_path(config.inscriptions_path()));
        AppState {
            config: Arc::new(config),
            responder: Arc::new(Responder::default()),
            store,
            notifier,
            limiter: Arc::new(RateLimiter::new()),
        }
    }

    fn test_app(root: &StdPath) -> (Router, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::default());
        let app = build_app(test_state(test_config(root), Arc::clone(&notifier)));
        (app, notifier)
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    fn chat_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/chatbot")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn form_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/inscription")
            .header("content-type", "application/x-www-form-urlencoded")
            .header(header::USER_AGENT, "gateway-test")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    const AMINA: &str = "prenom=amina&nom=kaci&email=Amina.Kaci%40Example.dz&telephone=0661&etablissement=lyc%C3%A9e+ibn+khaldoun&matiere=Maths&niveau=debutant";

    #[tokio::test]
    async fn test_chatbot_keyword_reply() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = test_app(dir.path());
        let (status, json) = send(&app, chat_request(r#"{"msg": "Bonjour"}"#)).await;
        assert_eq!(status, StatusCode::OK);
        let expected = &KnowledgeBase::builtin().entries[0].response;
        assert_eq!(json["reply"], expected.as_str());
    }

    #[tokio::test]
    async fn test_chatbot_empty_message_prompts_for_question() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = test_app(dir.path());
        for body in [r#"{"msg": "   "}"#, r#"{"other": 1}"#, r#"{"msg": 42}"#] {
            let (status, json) = send(&app, chat_request(body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "body {body}");
            assert_eq!(json["reply"], EMPTY_QUERY_PROMPT);
        }
    }

    #[tokio::test]
    async fn test_chatbot_unreadable_body_not_understood() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = test_app(dir.path());
        for body in ["not json", "{}", "null", "[1, 2]"] {
            let (status, json) = send(&app, chat_request(body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "body {body}");
            assert_eq!(json["reply"], chat::NOT_UNDERSTOOD_REPLY);
        }
        let no_content_type = Request::builder()
            .method("POST")
            .uri("/chatbot")
            .body(Body::from(r#"{"msg": "bonjour"}"#))
            .unwrap();
        let (status, _) = send(&app, no_content_type).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    async fn panicking_chatbot() -> &'static str {
        panic!("responder failure")
    }

    #[tokio::test]
    async fn test_chatbot_fault_answers_with_contact_details() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(test_config(dir.path()), Arc::new(RecordingNotifier::default()));
        let app = Router::new()
            .route("/chatbot", chatbot_route(panicking_chatbot))
            .with_state(state);
        let (status, json) = send(&app, chat_request(r#"{"msg": "bonjour"}"#)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["reply"], chat::FAULT_REPLY);
        assert!(json["reply"].as_str().unwrap().contains("contact@bbcschool.dz"));
    }

    #[tokio::test]
    async fn test_inscription_saves_and_notifies() {
        let dir = tempfile::tempdir().unwrap();
        let (app, notifier) = test_app(dir.path());
        let (status, json) = send(&app, form_request(AMINA)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["email"], "amina.kaci@example.dz");
        assert_eq!(json["full_name"], "Amina KACI");
        let id = json["id"].as_str().unwrap();
        assert_eq!(id.len(), 14);
        assert!(json["message"].as_str().unwrap().contains(id));

        assert_eq!(
            notifier.sent.lock().unwrap().as_slice(),
            ["amina.kaci@example.dz".to_string()]
        );

        let store = RegistrationStore::open_path(dir.path().join("data").join("inscriptions.csv"));
        let rows = store.load_all().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].etablissement, "Lycée Ibn Khaldoun");
        assert_eq!(rows[0].format, "presentiel");
        assert_eq!(rows[0].ip_address, "unknown");
        assert_eq!(rows[0].user_agent, "gateway-test");
        assert_eq!(rows[0].status, "confirmé");
    }

    #[tokio::test]
    async fn test_inscription_rejects_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        let (app, notifier) = test_app(dir.path());
        let (status, json) = send(&app, form_request("email=a%40b.dz&matiere=x&niveau=y")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);
        assert_eq!(
            json["error"],
            "Champs obligatoires manquants : Prenom, Nom, Etablissement"
        );
        assert!(notifier.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_inscription_rejects_invalid_email() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = test_app(dir.path());
        let body = AMINA.replace("Amina.Kaci%40Example.dz", "amina");
        let (status, json) = send(&app, form_request(&body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Format d'email invalide");
    }

    #[tokio::test]
    async fn test_inscription_rejects_duplicate_email() {
        let dir = tempfile::tempdir().unwrap();
        let (app, notifier) = test_app(dir.path());
        let (status, _) = send(&app, form_request(AMINA)).await;
        assert_eq!(status, StatusCode::OK);
        let upper = AMINA.replace("Amina.Kaci%40Example.dz", "AMINA.KACI%40EXAMPLE.DZ");
        let (status, json) = send(&app, form_request(&upper)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Cette adresse email est déjà inscrite");
        assert_eq!(notifier.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_admin_stats_after_registration() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = test_app(dir.path());

        let (status, json) = send(&app, get_request("/admin")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["total"], 0);
        assert_eq!(json["message"], "Aucune inscription");

        send(&app, form_request(AMINA)).await;
        let (status, json) = send(&app, get_request("/admin")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["total"], 1);
        assert_eq!(json["aujourd_hui"], 1);
        assert_eq!(json["par_niveau"]["debutant"], 1);
        assert_eq!(json["par_format"]["presentiel"], 1);
        assert_eq!(json["derniers_inscrits"][0]["nom"], "KACI");
        assert_eq!(json["export_url"], "/export");
    }

    #[tokio::test]
    async fn test_export_returns_csv_attachment() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = test_app(dir.path());
        send(&app, form_request(AMINA)).await;

        let res = app.clone().oneshot(get_request("/export")).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert!(res.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/csv"));
        let disposition = res.headers()[header::CONTENT_DISPOSITION].to_str().unwrap().to_string();
        assert!(disposition.starts_with("attachment; filename=\"bbc_school_inscriptions_"));
        assert!(disposition.ends_with(".csv\""));
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.starts_with("id,timestamp,prenom,nom,email"));
        assert!(text.contains("amina.kaci@example.dz"));
    }

    #[tokio::test]
    async fn test_export_zero_size_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("data");
        std::fs::create_dir_all(&data).unwrap();
        std::fs::File::create(data.join("inscriptions.csv")).unwrap();
        let (app, _) = test_app(dir.path());
        let (status, json) = send(&app, get_request("/export")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"], "Aucune donnée à exporter pour le moment");

        let (status, json) = send(&app, get_request("/admin")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "empty");
    }

    #[tokio::test]
    async fn test_health_reports_store_and_images() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = test_app(dir.path());
        let (status, json) = send(&app, get_request("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["csv_exists"], true);
        assert_eq!(json["inscriptions_count"], 0);
        assert_eq!(json["images_ok"], false);
        assert!(json["timestamp"].is_string());

        let static_dir = dir.path().join("static");
        std::fs::create_dir_all(&static_dir).unwrap();
        for (_, file) in pages::REQUIRED_IMAGES {
            std::fs::write(static_dir.join(file), b"jpg").unwrap();
        }
        let (_, json) = send(&app, get_request("/health")).await;
        assert_eq!(json["images_ok"], true);
        assert_eq!(json["debug_images"], true);
    }

    #[tokio::test]
    async fn test_index_serves_template() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = test_app(dir.path());
        let res = app.clone().oneshot(get_request("/")).await.unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);

        let templates = dir.path().join("templates");
        std::fs::create_dir_all(&templates).unwrap();
        std::fs::write(templates.join("index.html"), "<h1>BBC School</h1>").unwrap();
        let res = app.clone().oneshot(get_request("/")).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"<h1>BBC School</h1>");
        // Visiting the landing page initializes the CSV.
        assert!(dir.path().join("data").join("inscriptions.csv").is_file());
    }

    #[tokio::test]
    async fn test_inscription_rate_limited_per_client() {
        let dir = tempfile::tempdir().unwrap();
        let config = CoreConfig {
            inscription_limit_per_hour: 1,
            ..test_config(dir.path())
        };
        let state = test_state(config, Arc::new(RecordingNotifier::default()));
        let first_client = build_app(state.clone())
            .layer(MockConnectInfo(SocketAddr::from(([10, 0, 0, 1], 4000))));
        let second_client = build_app(state)
            .layer(MockConnectInfo(SocketAddr::from(([10, 0, 0, 2], 4000))));

        let (status, _) = send(&first_client, form_request(AMINA)).await;
        assert_eq!(status, StatusCode::OK);
        let other = AMINA.replace("Amina.Kaci", "Other");
        let (status, json) = send(&first_client, form_request(&other)).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(json["error"], rate_limit::TOO_MANY_REQUESTS);

        let (status, _) = send(&second_client, form_request(&other)).await;
        assert_eq!(status, StatusCode::OK);

        let rows = RegistrationStore::open_path(dir.path().join("data").join("inscriptions.csv"))
            .load_all()
            .unwrap();
        assert_eq!(rows[0].ip_address, "10.0.0.1");
        assert_eq!(rows[1].ip_address, "10.0.0.2");
    }

    #[tokio::test]
    async fn test_global_hourly_limit() {
        let dir = tempfile::tempdir().unwrap();
        let config = CoreConfig {
            rate_limit_per_hour: 2,
            ..test_config(dir.path())
        };
        let app = build_app(test_state(config, Arc::new(RecordingNotifier::default())));
        assert_eq!(send(&app, get_request("/health")).await.0, StatusCode::OK);
        assert_eq!(send(&app, chat_request(r#"{"msg": "contact"}"#)).await.0, StatusCode::OK);
        assert_eq!(
            send(&app, get_request("/health")).await.0,
            StatusCode::TOO_MANY_REQUESTS
        );
    }

    #[tokio::test]
    async fn test_cors_allows_any_origin() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = test_app(dir.path());
        let req = Request::builder()
            .uri("/health")
            .header(header::ORIGIN, "https://bbcschool.dz")
            .body(Body::empty())
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }
}
