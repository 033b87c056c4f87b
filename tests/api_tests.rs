use std::fs;
use std::path::Path;

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use ontograph::api::{create_router, AppState};
use ontograph::config::{Config, PaginationConfig};
use ontograph::db::{migrate, Db};
use ontograph::modules::{LoadMode, ModuleLoader, PluginCatalog};

struct TestApp {
    router: Router,
    _temp: TempDir,
}

const CONFIG: &str = r#"
[server]
allowed_origins = []

[database]
db_path = "unused.db"

[pagination]
default_page_size = 50
max_page_size = 100
"#;

impl TestApp {
    async fn new() -> Self {
        Self::with_customer(None).await
    }

    /// Router over a fresh database, with a fraud-detection module on disk.
    /// `customer` selects customer mode with an `acme-bank` override file.
    async fn with_customer(customer: Option<&str>) -> Self {
        let temp = TempDir::new().unwrap();
        let modules_dir = temp.path().join("modules");
        let customers_dir = temp.path().join("customers");
        fs::create_dir_all(modules_dir.join("fraud-detection")).unwrap();
        fs::create_dir_all(customers_dir.join("acme-bank")).unwrap();
        fs::write(
            modules_dir.join("fraud-detection").join("module.json"),
            json!({
                "name": "fraud-detection",
                "version": "1.0.0",
                "displayName": "Fraud Detection",
                "type": "premium",
                "backend": {"enabled": true, "routes": ["api"], "models": ["models"]},
                "config": {"case_number_prefix": "FRAUD"}
            })
            .to_string(),
        )
        .unwrap();
        fs::write(
            customers_dir.join("acme-bank").join("config.json"),
            json!({
                "modules": {
                    "enabled": ["fraud-detection"],
                    "config": {"fraud-detection": {"case_number_prefix": "ACME"}}
                }
            })
            .to_string(),
        )
        .unwrap();

        let db = Db::new(temp.path().join("api.db"));
        let migrations_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations");
        db.with_connection(move |conn| migrate::run_migrations(conn, &migrations_dir))
            .await
            .unwrap();

        let mut loader = ModuleLoader::new(&modules_dir, &customers_dir, PluginCatalog::builtin());
        let mode = match customer {
            Some(id) => LoadMode::Customer(id.to_string()),
            None => LoadMode::Development,
        };
        loader.load_all(&mode);
        let registry = loader.into_registry();
        let registry = db
            .with_connection(move |conn| Ok(registry.create_tables(conn)))
            .await
            .unwrap();

        let config = Config::from_toml_str(CONFIG).unwrap();
        let pagination = PaginationConfig {
            default_page_size: 50,
            max_page_size: 100,
        };
        let state = AppState::new(db, pagination, registry);
        let router = create_router(state, &config.server);

        Self { router, _temp: temp }
    }

    async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, None).await
    }

    async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(body)).await
    }

    async fn put(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, uri, Some(body)).await
    }

    async fn delete(&self, uri: &str) -> StatusCode {
        self.request(Method::DELETE, uri, None).await.0
    }

    async fn entity_type(&self, name: &str) -> i64 {
        let (status, body) = self
            .post(
                "/api/v1/entities/types",
                json!({"name": name, "display_name": name.to_uppercase(), "color": "#3b82f6"}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_i64().unwrap()
    }

    async fn relationship_type(&self, name: &str, forward: &str, reverse: &str) -> i64 {
        let (status, body) = self
            .post(
                "/api/v1/relationships/types",
                json!({
                    "name": name,
                    "display_name": name,
                    "forward_label": forward,
                    "reverse_label": reverse
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_i64().unwrap()
    }

    async fn entity(&self, type_id: i64, title: &str) -> i64 {
        let (status, body) = self
            .post(
                "/api/v1/entities",
                json!({"entity_type_id": type_id, "title": title, "properties": {"k": title}}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_i64().unwrap()
    }

    async fn relate(&self, type_id: i64, from: i64, to: i64) -> i64 {
        let (status, body) = self
            .post(
                "/api/v1/relationships",
                json!({"relationship_type_id": type_id, "from_entity_id": from, "to_entity_id": to}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_i64().unwrap()
    }
}

#[tokio::test]
async fn test_root_and_health() {
    let app = TestApp::new().await;
    let (status, body) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "healthy"}));

    let (status, body) = app.get("/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "ontograph");
}

#[tokio::test]
async fn test_entity_type_crud() {
    let app = TestApp::new().await;
    let id = app.entity_type("person").await;

    let (status, body) = app.get(&format!("/api/v1/entities/types/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "person");

    let (status, body) = app
        .put(&format!("/api/v1/entities/types/{id}"), json!({"display_name": "People"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["display_name"], "People");
    assert_eq!(body["color"], "#3b82f6");

    let (status, body) = app
        .post("/api/v1/entities/types", json!({"name": "person", "display_name": "Again"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Entity type already exists");

    assert_eq!(app.delete(&format!("/api/v1/entities/types/{id}")).await, StatusCode::NO_CONTENT);
    let (status, body) = app.get(&format!("/api/v1/entities/types/{id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Entity type not found");
}

#[tokio::test]
async fn test_entity_crud_and_filters() {
    let app = TestApp::new().await;
    let person = app.entity_type("person").await;
    let company = app.entity_type("company").await;
    let alice = app.entity(person, "Alice Johnson").await;
    app.entity(person, "Bob Smith").await;
    app.entity(company, "TechCorp").await;

    let (status, body) = app.get(&format!("/api/v1/entities/{alice}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Alice Johnson");
    assert_eq!(body["entity_type"]["name"], "person");

    let (_, body) = app.get(&format!("/api/v1/entities?entity_type_id={person}")).await;
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (_, body) = app.get("/api/v1/entities?search=alice").await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (_, body) = app.get("/api/v1/entities?skip=1&limit=1").await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, _) = app.get("/api/v1/entities?limit=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app.get("/api/v1/entities?limit=101").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .put(&format!("/api/v1/entities/{alice}"), json!({"title": "Alice J."}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Alice J.");
    assert_eq!(body["properties"]["k"], "Alice Johnson");
    assert!(!body["updated_at"].is_null());

    let (status, _) = app
        .post("/api/v1/entities", json!({"entity_type_id": 999, "title": "Ghost"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(app.delete(&format!("/api/v1/entities/{alice}")).await, StatusCode::NO_CONTENT);
    assert_eq!(app.delete(&format!("/api/v1/entities/{alice}")).await, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_relationships_and_cascade() {
    let app = TestApp::new().await;
    let person = app.entity_type("person").await;
    let company = app.entity_type("company").await;
    let works_for = app.relationship_type("works_for", "works for", "employs").await;
    let alice = app.entity(person, "Alice").await;
    let corp = app.entity(company, "TechCorp").await;
    let rel = app.relate(works_for, alice, corp).await;

    let (status, body) = app.get(&format!("/api/v1/relationships/{rel}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["relationship_type"]["forward_label"], "works for");
    assert_eq!(body["from_entity"]["title"], "Alice");
    assert_eq!(body["to_entity"]["title"], "TechCorp");

    let (status, body) = app
        .put(&format!("/api/v1/relationships/{rel}"), json!({"properties": {"since": "2020"}}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["properties"]["since"], "2020");

    let (_, body) = app.get(&format!("/api/v1/entities/{corp}/relationships")).await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, body) = app
        .post(
            "/api/v1/relationships",
            json!({"relationship_type_id": works_for, "from_entity_id": alice, "to_entity_id": 999}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "One or both entities not found");

    // The type is still referenced
    let (status, _) = app
        .request(Method::DELETE, &format!("/api/v1/relationships/types/{works_for}"), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Deleting an endpoint removes its relationships
    assert_eq!(app.delete(&format!("/api/v1/entities/{alice}")).await, StatusCode::NO_CONTENT);
    let (status, _) = app.get(&format!("/api/v1/relationships/{rel}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        app.delete(&format!("/api/v1/relationships/types/{works_for}")).await,
        StatusCode::NO_CONTENT
    );
}

#[tokio::test]
async fn test_graph_explore() {
    let app = TestApp::new().await;
    let person = app.entity_type("person").await;
    let company = app.entity_type("company").await;
    let location = app.entity_type("location").await;
    let works_for = app.relationship_type("works_for", "works for", "employs").await;
    let located_in = app.relationship_type("located_in", "located in", "contains").await;
    let alice = app.entity(person, "Alice").await;
    let corp = app.entity(company, "TechCorp").await;
    let sf = app.entity(location, "San Francisco").await;
    app.relate(works_for, alice, corp).await;
    app.relate(located_in, corp, sf).await;

    let (status, body) = app.get(&format!("/api/v1/graph/explore/{alice}?depth=2")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["nodes"].as_array().unwrap().len(), 3);
    let labels: Vec<&str> = body["edges"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["label"].as_str().unwrap())
        .collect();
    assert_eq!(labels, vec!["works for", "located in"]);
    assert_eq!(body["nodes"][0]["type"], "entity");
    assert_eq!(body["edges"][0]["type"], "relationship");

    let (_, body) = app.get(&format!("/api/v1/graph/explore/{alice}")).await;
    assert_eq!(body["nodes"].as_array().unwrap().len(), 2);

    let (status, _) = app.get(&format!("/api/v1/graph/explore/{alice}?depth=6")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app.get(&format!("/api/v1/graph/explore/{alice}?depth=0")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app.get("/api/v1/graph/explore/9999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_graph_subgraph_and_stats() {
    let app = TestApp::new().await;
    let person = app.entity_type("person").await;
    let knows = app.relationship_type("knows", "knows", "knows").await;
    let a = app.entity(person, "A").await;
    let b = app.entity(person, "B").await;
    let c = app.entity(person, "C").await;
    app.relate(knows, a, b).await;
    app.relate(knows, b, c).await;

    let (status, body) = app.get(&format!("/api/v1/graph/subgraph?entity_ids={a},{b},9999")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["nodes"].as_array().unwrap().len(), 2);
    assert_eq!(body["edges"].as_array().unwrap().len(), 1);

    let (status, body) = app.get("/api/v1/graph/subgraph?entity_ids=1,abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid entity IDs format");

    let (status, _) = app.get("/api/v1/graph/subgraph?entity_ids=9998,9999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app.get("/api/v1/graph/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_entities"], 3);
    assert_eq!(body["total_relationships"], 2);
    assert_eq!(body["entities_by_type"][0]["type"], "person");
    assert_eq!(body["entities_by_type"][0]["count"], 3);
}

#[tokio::test]
async fn test_modules_listing() {
    let app = TestApp::new().await;
    let (status, body) = app.get("/api/v1/modules").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["name"], "fraud-detection");
    assert_eq!(body[0]["type"], "premium");
    assert_eq!(body[0]["api_prefix"], "/api/v1/fraud-detection");

    let (status, body) = app.get("/api/v1/modules/fraud-detection").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["config"]["case_number_prefix"], "FRAUD");

    let (status, _) = app.get("/api/v1/modules/unknown").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_fraud_module_routes() {
    let app = TestApp::new().await;

    let (status, case) = app
        .post("/api/v1/fraud-detection/cases", json!({"title": "Card testing", "priority": "high"}))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(case["case_number"], "FRAUD-000001");
    assert_eq!(case["status"], "open");
    let case_id = case["id"].as_i64().unwrap();

    let (status, alert) = app
        .post(
            "/api/v1/fraud-detection/alerts",
            json!({"case_id": case_id, "alert_type": "velocity", "title": "Burst of small charges"}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(alert["status"], "new");

    let (status, closed) = app
        .put(&format!("/api/v1/fraud-detection/cases/{case_id}"), json!({"status": "closed"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(!closed["closed_at"].is_null());

    let (status, body) = app.get("/api/v1/fraud-detection/cases/9999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Fraud case not found");

    let (_, open) = app.get("/api/v1/fraud-detection/cases?status=open").await;
    assert!(open.as_array().unwrap().is_empty());

    let (status, _) = app
        .post(
            "/api/v1/fraud-detection/rules",
            json!({"name": "velocity_10", "display_name": "Velocity", "rule_type": "velocity", "priority": 200}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (_, rules) = app.get("/api/v1/fraud-detection/rules?enabled=true").await;
    assert_eq!(rules.as_array().unwrap().len(), 1);

    let (status, stats) = app.get("/api/v1/fraud-detection/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        stats,
        json!({"total_cases": 1, "open_cases": 0, "closed_cases": 1, "total_alerts": 1, "new_alerts": 1})
    );
}

#[tokio::test]
async fn test_customer_override_reaches_module() {
    let app = TestApp::with_customer(Some("acme-bank")).await;
    let (status, case) = app
        .post("/api/v1/fraud-detection/cases", json!({"title": "Account takeover"}))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(case["case_number"], "ACME-000001");
}

#[tokio::test]
async fn test_unknown_customer_mounts_nothing() {
    let app = TestApp::with_customer(Some("nobody")).await;
    let (_, body) = app.get("/api/v1/modules").await;
    assert!(body.as_array().unwrap().is_empty());
    let (status, _) = app.get("/api/v1/fraud-detection/stats").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
