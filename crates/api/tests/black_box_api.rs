use std::sync::Arc;

use backoffice_api::app::services::AppServices;
use backoffice_authz::JwtClaims;
use backoffice_core::{EmployeeId, TenantId};
use backoffice_infra::catalog::{HQ_ADMIN, HR_LEAD, PROJECT_ACCOUNTANT, STAFF};
use backoffice_infra::{CachePolicy, DemoTenant};
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{Value, json};

const JWT_SECRET: &str = "test-secret";

struct TestServer {
    base_url: String,
    demo: DemoTenant,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod, in-memory services, ephemeral port.
        let services = Arc::new(AppServices::in_memory(CachePolicy::default()));
        let demo = services.seed_demo(TenantId::new());
        let app = backoffice_api::app::build_app(JWT_SECRET, services);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            demo,
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn token_for(&self, code: &str) -> String {
        let employee = self
            .demo
            .employee_holding(code)
            .unwrap_or_else(|| panic!("no demo employee holds {code}"));
        mint_jwt(self.demo.tenant_id, employee.id)
    }

    fn employee_id(&self, code: &str) -> EmployeeId {
        self.demo.employee_holding(code).unwrap().id
    }

    fn position_id(&self, code: &str) -> String {
        self.demo
            .positions
            .iter()
            .find(|p| p.code == code)
            .unwrap()
            .id
            .to_string()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(tenant_id: TenantId, employee_id: EmployeeId) -> String {
    let now = Utc::now();
    let claims = JwtClaims {
        sub: employee_id,
        tenant_id,
        issued_at: now - ChronoDuration::seconds(5),
        expires_at: now + ChronoDuration::minutes(10),
    };

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("failed to encode jwt")
}

async fn get_json(client: &reqwest::Client, url: String, token: &str) -> (StatusCode, Value) {
    let res = client.get(url).bearer_auth(token).send().await.unwrap();
    let status = res.status();
    (status, res.json().await.unwrap_or(Value::Null))
}

#[tokio::test]
async fn auth_required_for_protected_endpoints() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client.get(srv.url("/api/v2/my/permissions")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client
        .get(srv.url("/api/v2/my/permissions"))
        .bearer_auth("not-a-jwt")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client.get(srv.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn my_permissions_returns_resolved_context() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let (status, body) = get_json(
        &client,
        srv.url("/api/v2/my/permissions"),
        &srv.token_for(PROJECT_ACCOUNTANT),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["employeeId"], srv.employee_id(PROJECT_ACCOUNTANT).to_string());
    assert_eq!(body["position"]["code"], PROJECT_ACCOUNTANT);
    assert_eq!(body["dataScope"], "project");
    assert_eq!(body["canManageSubordinates"], false);
    assert_eq!(body["permissions"]["finance"]["flow"], json!(["create", "view"]));
    assert_eq!(body["allowedModules"], json!(["finance.*", "report.finance"]));
    assert_eq!(body["projectId"], srv.demo.project_id.to_string());
    assert!(body["orgDepartmentId"].is_string());
}

#[tokio::test]
async fn unknown_employee_gets_deny_all_context() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let stranger = mint_jwt(srv.demo.tenant_id, EmployeeId::new());

    let (status, body) = get_json(&client, srv.url("/api/v2/my/permissions"), &stranger).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["position"].is_null());
    assert_eq!(body["permissions"], json!({}));
    assert_eq!(body["allowedModules"], json!([]));
    assert_eq!(body["dataScope"], "self");

    let (status, _) = get_json(&client, srv.url("/api/v2/employees"), &stranger).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn employees_from_another_tenant_resolve_deny_all() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let foreign = mint_jwt(TenantId::new(), srv.employee_id(HQ_ADMIN));

    let (status, body) = get_json(&client, srv.url("/api/v2/my/permissions"), &foreign).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["position"].is_null());

    let (status, _) = get_json(&client, srv.url("/api/v2/positions"), &foreign).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn denial_is_generic_forbidden() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let (status, body) = get_json(&client, srv.url("/api/v2/positions"), &srv.token_for(STAFF)).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, json!({ "error": "forbidden", "message": "forbidden" }));
}

#[tokio::test]
async fn employee_list_is_scoped() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let names = |body: &Value| -> Vec<String> {
        body["items"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["name"].as_str().unwrap().to_string())
            .collect()
    };

    let (status, body) = get_json(&client, srv.url("/api/v2/employees"), &srv.token_for(HQ_ADMIN)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(names(&body).len(), 4);

    let (status, body) = get_json(&client, srv.url("/api/v2/employees"), &srv.token_for(HR_LEAD)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(names(&body), vec!["HR Lead", "Staff"]);
}

#[tokio::test]
async fn position_edit_applies_to_holders_immediately() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let staff = srv.token_for(STAFF);
    let admin = srv.token_for(HQ_ADMIN);

    // Warm the staff member's cached context.
    let (_, before) = get_json(&client, srv.url("/api/v2/my/permissions"), &staff).await;
    assert_eq!(before["allowedModules"], json!(["hr.leave"]));

    let res = client
        .put(srv.url(&format!("/api/v2/positions/{}", srv.position_id(STAFF))))
        .bearer_auth(&admin)
        .json(&json!({
            "permissions": { "hr": { "leave": ["view"] } },
            "allowedModules": ["hr.leave", "report"]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let (_, after) = get_json(&client, srv.url("/api/v2/my/permissions"), &staff).await;
    assert_eq!(after["allowedModules"], json!(["hr.leave", "report"]));
    assert_eq!(after["permissions"]["hr"]["leave"], json!(["view"]));
}

#[tokio::test]
async fn reassignment_changes_context_and_is_audited() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let staff = srv.token_for(STAFF);
    let lead = srv.token_for(HR_LEAD);

    let (_, before) = get_json(&client, srv.url("/api/v2/my/permissions"), &staff).await;
    assert_eq!(before["position"]["code"], STAFF);

    let res = client
        .put(srv.url(&format!("/api/v2/employees/{}/position", srv.employee_id(STAFF))))
        .bearer_auth(&lead)
        .header("x-forwarded-for", "198.51.100.4")
        .json(&json!({ "positionId": srv.position_id(HR_LEAD) }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let (_, after) = get_json(&client, srv.url("/api/v2/my/permissions"), &staff).await;
    assert_eq!(after["position"]["code"], HR_LEAD);
    assert_eq!(after["canManageSubordinates"], true);

    let (status, page) = get_json(
        &client,
        srv.url("/api/v2/audit-logs?entity=employee&action=update"),
        &srv.token_for(HQ_ADMIN),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 1);
    let entry = &page["entries"][0];
    assert_eq!(entry["actorId"], srv.employee_id(HR_LEAD).to_string());
    assert_eq!(entry["entityId"], srv.employee_id(STAFF).to_string());
    assert_eq!(entry["outcome"], "success");
    assert_eq!(entry["ip"], "198.51.100.4");
    assert_eq!(entry["detail"], format!("position: {STAFF} -> {HR_LEAD}"));
}

#[tokio::test]
async fn out_of_scope_targets_are_not_found() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    // The HR lead's subtree does not include the headquarters accountant.
    let res = client
        .put(srv.url(&format!(
            "/api/v2/employees/{}/position",
            srv.employee_id(PROJECT_ACCOUNTANT)
        )))
        .bearer_auth(srv.token_for(HR_LEAD))
        .json(&json!({ "positionId": null }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn positions_wider_than_the_caller_cannot_be_conferred() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let lead = srv.token_for(HR_LEAD);
    let lead_id = srv.employee_id(HR_LEAD);

    let res = client
        .put(srv.url(&format!("/api/v2/employees/{lead_id}/position")))
        .bearer_auth(&lead)
        .json(&json!({ "positionId": srv.position_id(HQ_ADMIN) }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let (_, ctx) = get_json(&client, srv.url("/api/v2/my/permissions"), &lead).await;
    assert_eq!(ctx["position"]["code"], HR_LEAD);
    assert_eq!(ctx["dataScope"], "group");

    // Same rule when hiring into the caller's own department.
    let department = srv.demo.employee_holding(HR_LEAD).unwrap().org_department_id;
    let res = client
        .post(srv.url("/api/v2/employees"))
        .bearer_auth(&lead)
        .json(&json!({
            "name": "New Hire",
            "email": "new.hire@example.com",
            "positionId": srv.position_id(HQ_ADMIN),
            "orgDepartmentId": department
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client
        .post(srv.url("/api/v2/employees"))
        .bearer_auth(&lead)
        .json(&json!({
            "name": "New Hire",
            "email": "new.hire@example.com",
            "positionId": srv.position_id(STAFF),
            "orgDepartmentId": department
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let (_, page) = get_json(
        &client,
        srv.url("/api/v2/audit-logs?entity=employee&action=update"),
        &srv.token_for(HQ_ADMIN),
    )
    .await;
    assert_eq!(page["total"], 1);
    assert_eq!(page["entries"][0]["outcome"], "denied");
    assert_eq!(page["entries"][0]["entityId"], lead_id.to_string());
}

#[tokio::test]
async fn denied_mutations_are_audited() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/api/v2/positions"))
        .bearer_auth(srv.token_for(STAFF))
        .json(&json!({
            "code": "ROGUE",
            "name": "Rogue",
            "level": 1,
            "dataScope": "all",
            "allowedModules": ["*"]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let (_, page) = get_json(
        &client,
        srv.url("/api/v2/audit-logs?entity=position"),
        &srv.token_for(HQ_ADMIN),
    )
    .await;
    assert_eq!(page["total"], 1);
    assert_eq!(page["entries"][0]["outcome"], "denied");
    assert_eq!(page["entries"][0]["entityId"], "ROGUE");
    assert_eq!(page["entries"][0]["actorId"], srv.employee_id(STAFF).to_string());
}

#[tokio::test]
async fn admin_creates_position_and_employee() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let admin = srv.token_for(HQ_ADMIN);

    let res = client
        .post(srv.url("/api/v2/positions"))
        .bearer_auth(&admin)
        .json(&json!({
            "code": "PRJ-CASHIER",
            "name": "Project cashier",
            "level": 2,
            "dataScope": "project",
            "permissions": { "finance": { "flow": ["view", "create"], "bogus": "x" } },
            "allowedModules": ["finance.*", "hr.employee", 7]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let position: Value = res.json().await.unwrap();
    // Malformed branches are dropped rather than rejected.
    assert_eq!(position["permissions"], json!({ "finance": { "flow": ["create", "view"] } }));
    assert_eq!(position["allowedModules"], json!(["finance.*", "hr.employee"]));

    let res = client
        .post(srv.url("/api/v2/positions"))
        .bearer_auth(&admin)
        .json(&json!({ "code": "prj-cashier", "name": "Dup", "level": 2, "dataScope": "project" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = client
        .post(srv.url("/api/v2/employees"))
        .bearer_auth(&admin)
        .json(&json!({
            "name": "Chen Jie",
            "email": "chen.jie@example.com",
            "positionId": position["id"],
            "projectId": srv.demo.project_id
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let employee: Value = res.json().await.unwrap();
    let id: EmployeeId = employee["id"].as_str().unwrap().parse().unwrap();

    let token = mint_jwt(srv.demo.tenant_id, id);
    let (_, ctx) = get_json(&client, srv.url("/api/v2/my/permissions"), &token).await;
    assert_eq!(ctx["position"]["code"], "PRJ-CASHIER");
    assert_eq!(ctx["dataScope"], "project");
}

#[tokio::test]
async fn cache_flush_requires_catalog_rights() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/api/v2/admin/permission-cache/flush"))
        .bearer_auth(srv.token_for(PROJECT_ACCOUNTANT))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client
        .post(srv.url("/api/v2/admin/permission-cache/flush"))
        .bearer_auth(srv.token_for(HQ_ADMIN))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["flushed"], true);
    assert_eq!(body["tenantId"], srv.demo.tenant_id.to_string());
}
