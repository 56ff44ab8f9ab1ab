use actix_http::Request;
use actix_web::dev::{Service, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::http::StatusCode;
use actix_web::{test, web::Data, App};
use fake::faker::name::en::Name;
use fake::Fake;
use once_cell::sync::Lazy;
use secrecy::Secret;
use serde_json::{json, Value};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use smart_student_hub::core::config::UploadConfig;
use smart_student_hub::core::{get_subscriber, init_subscriber};
use smart_student_hub::core::jwt_auth::JwtKeys;
use smart_student_hub::core::realtime::EventHub;
use smart_student_hub::core::upload_signer::UploadSigner;
use smart_student_hub::hub_web_server::{json_config, query_config};
use smart_student_hub::routes::hub_routes;

pub const PASSWORD: &str = "s3cret-pass";

// TEST_LOG=1 prints request spans while debugging a failing test.
static TRACING: Lazy<()> = Lazy::new(|| {
    if std::env::var("TEST_LOG").is_ok() {
        init_subscriber(get_subscriber("test".into(), "debug".into(), std::io::stdout));
    } else {
        init_subscriber(get_subscriber("test".into(), "debug".into(), std::io::sink));
    }
});

pub struct TestState {
    pub pool: PgPool,
    pub keys: JwtKeys,
    pub hub: EventHub,
    pub signer: UploadSigner,
}

/// `None` when no test database is configured; callers return early.
pub async fn test_state() -> Option<TestState> {
    Lazy::force(&TRACING);

    let url = match std::env::var("TEST_DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("TEST_DATABASE_URL is not set, skipping database test");
            return None;
        }
    };

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .expect("failed to connect to the test database");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("failed to migrate the test database");

    Some(TestState {
        pool,
        keys: JwtKeys::new(Secret::new("integration-secret".to_string()), 1),
        hub: EventHub::new(),
        signer: UploadSigner::from_config(&UploadConfig {
            cloud_name: "demo".into(),
            api_key: "key".into(),
            api_secret: Secret::new("secret".into()),
            eager: None,
            root_folder: "hub".into(),
        }),
    })
}

pub fn hub_app(
    state: &TestState,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .configure(hub_routes)
        .app_data(json_config())
        .app_data(query_config())
        .app_data(Data::new(state.pool.clone()))
        .app_data(Data::new(state.keys.clone()))
        .app_data(Data::new(state.hub.clone()))
        .app_data(Data::new(state.signer.clone()))
}

pub async fn send<S>(
    app: &S,
    method: &str,
    path: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value)
where
    S: Service<Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    let mut request = match method {
        "GET" => test::TestRequest::get(),
        "PATCH" => test::TestRequest::patch(),
        "PUT" => test::TestRequest::put(),
        "DELETE" => test::TestRequest::delete(),
        _ => test::TestRequest::post(),
    }
    .uri(path);
    if let Some(token) = token {
        request = request.insert_header(("Authorization", format!("Bearer {token}")));
    }
    if let Some(body) = body {
        request = request.set_json(body);
    }

    let response = test::call_service(app, request.to_request()).await;
    let status = response.status();
    let body: Value = test::read_body_json(response).await;
    (status, body)
}

pub fn unique_email(prefix: &str) -> String {
    format!("{prefix}-{}@example.com", Uuid::new_v4().simple())
}

pub fn new_user(email: &str) -> Value {
    json!({
        "name": Name().fake::<String>(),
        "email": email,
        "password": PASSWORD,
        "gender": "female",
        "phone": "9876543210",
    })
}

pub struct Registered {
    pub token: String,
    pub user_id: Uuid,
    pub institute_id: Uuid,
}

pub fn id_at(body: &Value, pointer: &str) -> Uuid {
    body.pointer(pointer)
        .and_then(Value::as_str)
        .and_then(|id| id.parse().ok())
        .unwrap_or_else(|| panic!("no uuid at {pointer} in {body}"))
}

fn registered(body: &Value, institute_id: Uuid) -> Registered {
    Registered {
        token: body["data"]["token"]
            .as_str()
            .expect("token missing")
            .to_string(),
        user_id: id_at(body, "/data/user/id"),
        institute_id,
    }
}

pub async fn register_institute<S>(app: &S) -> Registered
where
    S: Service<Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    let body = json!({
        "institute": {
            "name": format!("{} College", Name().fake::<String>()),
            "institute_type": "private",
            "official_email": unique_email("office"),
            "official_phone": "0801234567",
            "address_line1": "1 Campus Road",
            "city": "Pune",
            "state": "Maharashtra",
            "pincode": "411001",
        },
        "admin": new_user(&unique_email("admin")),
    });
    let (status, body) = send(app, "POST", "/api/v1/auth/institute/register", None, Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let institute_id = id_at(&body, "/data/institute/id");
    registered(&body, institute_id)
}

pub async fn register_student<S>(app: &S, institute_id: Uuid) -> Registered
where
    S: Service<Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    let mut body = new_user(&unique_email("student"));
    body["roll_number"] = json!(format!("R-{}", &Uuid::new_v4().simple().to_string()[..8]));

    let path = format!("/api/v1/auth/student/register?institute_id={institute_id}");
    let (status, body) = send(app, "POST", &path, None, Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    registered(&body, institute_id)
}

pub async fn register_faculty<S>(app: &S, institute_id: Uuid) -> Registered
where
    S: Service<Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    let mut body = new_user(&unique_email("faculty"));
    body["employee_code"] = json!(format!("E-{}", &Uuid::new_v4().simple().to_string()[..8]));
    body["designation"] = json!("Assistant Professor");
    body["department"] = json!("Computer Science");

    let path = format!("/api/v1/auth/faculty/register?institute_id={institute_id}");
    let (status, body) = send(app, "POST", &path, None, Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    registered(&body, institute_id)
}

/// An approved type worth 2 to 5 credits with one required text field.
pub async fn create_activity_type<S>(app: &S, admin_token: &str) -> Uuid
where
    S: Service<Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    let body = json!({
        "name": format!("Hackathon {}", Uuid::new_v4().simple()),
        "category": "TECHNICAL",
        "form_schema": [
            { "key": "organizer", "label": "Organizer", "type": "text", "required": true }
        ],
        "min_credits": 2,
        "max_credits": 5,
    });
    let (status, body) = send(app, "POST", "/api/v1/activity-types", Some(admin_token), Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    id_at(&body, "/data/id")
}

pub async fn create_activity<S>(app: &S, student_token: &str, type_id: Uuid, is_public: bool) -> Uuid
where
    S: Service<Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    let body = json!({
        "activity_type_id": type_id,
        "title": "Smart India Hackathon",
        "details": { "organizer": "AICTE" },
        "is_public": is_public,
        "skills": ["rust"],
    });
    let (status, body) = send(app, "POST", "/api/v1/activities", Some(student_token), Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    id_at(&body, "/data/id")
}

/// Role profile id (`student_id`, `faculty_id`, `admin_id`) from the caller's fresh claims.
pub async fn profile_id<S>(app: &S, token: &str, claim: &str) -> Uuid
where
    S: Service<Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    let (status, body) = send(app, "GET", "/api/v1/auth/me", Some(token), None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    id_at(&body, &format!("/data/claims/{claim}"))
}

pub fn academic_path(program: &str, section: &str) -> Value {
    json!({
        "level": "UG",
        "program": program,
        "degree": "BTech",
        "branch": "CSE",
        "year": 1,
        "semester": 1,
        "section": section,
    })
}

/// Admin-created student placed in the section the path resolves to.
pub async fn create_enrolled_student<S>(app: &S, admin_token: &str, path: Value) -> Uuid
where
    S: Service<Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    let mut body = new_user(&unique_email("enrolled"));
    body["roll_number"] = json!(format!("R-{}", &Uuid::new_v4().simple().to_string()[..8]));
    body["academic"] = path;

    let (status, body) = send(app, "POST", "/api/v1/students", Some(admin_token), Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    id_at(&body, "/data/id")
}
