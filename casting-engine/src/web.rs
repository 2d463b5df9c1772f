use actix_web::{web, App, HttpServer, HttpResponse, Result, HttpRequest, middleware};
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard};
use crate::casting::{solve, AssignmentResult, CastingSnapshot, OverrideStore};
use crate::config::CastingConfig;
use crate::parser::{read_characters, read_roster};

pub struct AppState {
    pub snapshot: Mutex<CastingSnapshot>,
    pub last_result: Mutex<Option<AssignmentResult>>,
    pub overrides: Box<dyn OverrideStore>,
    pub config: CastingConfig,
    pub admin_password: String,
}

impl AppState {
    pub fn new(config: CastingConfig, overrides: Box<dyn OverrideStore>, admin_password: String) -> Self {
        Self {
            snapshot: Mutex::new(CastingSnapshot::default()),
            last_result: Mutex::new(None),
            overrides,
            config,
            admin_password,
        }
    }
}

#[derive(Deserialize)]
pub struct LoginRequest {
    password: String,
}

#[derive(Deserialize, Default)]
pub struct SolveRequest {
    /// Restrict the pass to these players; `None` keeps the roster's included flags
    #[serde(default)]
    players: Option<Vec<String>>,
}

#[derive(Serialize, Deserialize)]
pub struct ToggleRequest {
    player_id: String,
    character_id: String,
}

#[derive(Serialize, Deserialize)]
pub struct ToggleResponse {
    player_id: String,
    character_id: String,
    excluded: bool,
}

#[derive(Serialize)]
pub struct OverridePair {
    player_id: String,
    character_id: String,
}

fn locked<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| actix_web::error::ErrorInternalServerError("state lock poisoned"))
}

fn is_admin(req: &HttpRequest, state: &AppState) -> bool {
    req.headers()
        .get("X-Admin-Password")
        .and_then(|v| v.to_str().ok())
        .map(|p| p == state.admin_password)
        .unwrap_or(false)
}

fn unauthorized() -> HttpResponse {
    HttpResponse::Unauthorized().json(serde_json::json!({"success": false, "error": "Unauthorized"}))
}

fn bad_request(message: String) -> HttpResponse {
    HttpResponse::BadRequest().json(serde_json::json!({"success": false, "error": message}))
}

async fn admin_login(
    req: web::Json<LoginRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    if req.password == state.admin_password {
        Ok(HttpResponse::Ok().json(serde_json::json!({"success": true})))
    } else {
        Ok(HttpResponse::Unauthorized().json(serde_json::json!({"success": false, "error": "Invalid password"})))
    }
}

// Roster CSV upload
async fn upload_roster(
    req: HttpRequest,
    body: web::Bytes,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    if !is_admin(&req, &state) {
        return Ok(unauthorized());
    }

    match read_roster(&body[..], state.config.max_preferences) {
        Ok(roster) => {
            let players = roster.players.len();
            let mut snapshot = locked(&state.snapshot)?;
            snapshot.players = roster.players;
            snapshot.preferences = roster.preferences;
            snapshot.avoid_pairs = roster.avoid_pairs;
            *locked(&state.last_result)? = None;
            Ok(HttpResponse::Ok().json(serde_json::json!({"success": true, "players": players})))
        }
        Err(e) => Ok(bad_request(format!("Failed to process roster CSV: {}", e))),
    }
}

// Character CSV upload
async fn upload_characters(
    req: HttpRequest,
    body: web::Bytes,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    if !is_admin(&req, &state) {
        return Ok(unauthorized());
    }

    match read_characters(&body[..]) {
        Ok(table) => {
            let characters = table.characters.len();
            let mut snapshot = locked(&state.snapshot)?;
            snapshot.characters = table.characters;
            snapshot.fixed = table.fixed;
            *locked(&state.last_result)? = None;
            Ok(HttpResponse::Ok().json(serde_json::json!({"success": true, "characters": characters})))
        }
        Err(e) => Ok(bad_request(format!("Failed to process character CSV: {}", e))),
    }
}

// Runs one solve pass on a private copy of the snapshot with freshly loaded overrides
async fn run_solve(
    req: HttpRequest,
    body: Option<web::Json<SolveRequest>>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    if !is_admin(&req, &state) {
        return Ok(unauthorized());
    }

    let mut snapshot = locked(&state.snapshot)?.clone();
    snapshot.overrides = state
        .overrides
        .load()
        .map_err(actix_web::error::ErrorInternalServerError)?;
    if let Some(players) = body.and_then(|b| b.into_inner().players) {
        let ids: Vec<&str> = players.iter().map(String::as_str).collect();
        snapshot.include_only(&ids);
    }

    match solve(&snapshot, &state.config) {
        Ok(result) => {
            *locked(&state.last_result)? = Some(result.clone());
            Ok(HttpResponse::Ok().json(result))
        }
        Err(e) => Ok(bad_request(e.to_string())),
    }
}

async fn get_result(state: web::Data<AppState>) -> Result<HttpResponse> {
    match &*locked(&state.last_result)? {
        Some(result) => Ok(HttpResponse::Ok().json(result)),
        None => Ok(HttpResponse::NotFound().json(serde_json::json!({"error": "No result available"}))),
    }
}

async fn toggle_override(
    req: HttpRequest,
    body: web::Json<ToggleRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    if !is_admin(&req, &state) {
        return Ok(unauthorized());
    }

    let excluded = state
        .overrides
        .toggle(&body.player_id, &body.character_id)
        .map_err(actix_web::error::ErrorInternalServerError)?;
    let body = body.into_inner();
    Ok(HttpResponse::Ok().json(ToggleResponse {
        player_id: body.player_id,
        character_id: body.character_id,
        excluded,
    }))
}

async fn list_overrides(state: web::Data<AppState>) -> Result<HttpResponse> {
    let overrides = state
        .overrides
        .load()
        .map_err(actix_web::error::ErrorInternalServerError)?;
    let pairs: Vec<OverridePair> = overrides
        .excluded_pairs()
        .map(|(p, c)| OverridePair {
            player_id: p.to_string(),
            character_id: c.to_string(),
        })
        .collect();
    Ok(HttpResponse::Ok().json(pairs))
}

// Commits the last result; infeasible results are refused
async fn commit_result(req: HttpRequest, state: web::Data<AppState>) -> Result<HttpResponse> {
    if !is_admin(&req, &state) {
        return Ok(unauthorized());
    }

    let last = locked(&state.last_result)?.clone();
    let Some(result) = last else {
        return Ok(HttpResponse::NotFound().json(serde_json::json!({"error": "No result available"})));
    };
    let mut snapshot = locked(&state.snapshot)?;
    match snapshot.commit(&result) {
        Ok(()) => Ok(HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "committed": snapshot.fixed.len()
        }))),
        Err(e) => Ok(HttpResponse::Conflict().json(serde_json::json!({"success": false, "error": e.to_string()}))),
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/login", web::post().to(admin_login))
        .route("/api/roster", web::post().to(upload_roster))
        .route("/api/characters", web::post().to(upload_characters))
        .route("/api/solve", web::post().to(run_solve))
        .route("/api/result", web::get().to(get_result))
        .route("/api/toggle", web::post().to(toggle_override))
        .route("/api/overrides", web::get().to(list_overrides))
        .route("/api/commit", web::post().to(commit_result));
}

pub async fn start_server(port: u16, state: AppState) -> std::io::Result<()> {
    let app_state = web::Data::new(state);

    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .wrap(middleware::Logger::default())
            .configure(configure)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test;
    use crate::casting::MemoryOverrideStore;

    const ROSTER: &str = "player_id,name,choice_1,choice_2\na,Ann,c1,c2\nb,Ben,c1,c2\n";
    const CHARACTERS: &str = "character_id,name\nc1,First\nc2,Second\n";

    fn state() -> web::Data<AppState> {
        web::Data::new(AppState::new(
            CastingConfig::default(),
            Box::new(MemoryOverrideStore::default()),
            "pw".to_string(),
        ))
    }

    #[actix_web::test]
    async fn test_upload_toggle_solve_commit() {
        let app = test::init_service(App::new().app_data(state()).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/api/roster")
            .insert_header(("X-Admin-Password", "pw"))
            .set_payload(ROSTER)
            .to_request();
        assert!(test::call_service(&app, req).await.status().is_success());

        let req = test::TestRequest::post()
            .uri("/api/characters")
            .insert_header(("X-Admin-Password", "pw"))
            .set_payload(CHARACTERS)
            .to_request();
        assert!(test::call_service(&app, req).await.status().is_success());

        let req = test::TestRequest::post()
            .uri("/api/toggle")
            .insert_header(("X-Admin-Password", "pw"))
            .set_json(ToggleRequest { player_id: "a".to_string(), character_id: "c1".to_string() })
            .to_request();
        let toggled: ToggleResponse = test::call_and_read_body_json(&app, req).await;
        assert!(toggled.excluded);

        let req = test::TestRequest::post()
            .uri("/api/solve")
            .insert_header(("X-Admin-Password", "pw"))
            .to_request();
        let result: AssignmentResult = test::call_and_read_body_json(&app, req).await;
        assert!(result.feasible);
        assert_eq!(result.player_for("c1").map(String::as_str), Some("b"));
        assert_eq!(result.player_for("c2").map(String::as_str), Some("a"));

        let req = test::TestRequest::post()
            .uri("/api/commit")
            .insert_header(("X-Admin-Password", "pw"))
            .to_request();
        assert!(test::call_service(&app, req).await.status().is_success());
    }

    #[actix_web::test]
    async fn test_infeasible_commit_is_refused() {
        let app = test::init_service(App::new().app_data(state()).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/api/roster")
            .insert_header(("X-Admin-Password", "pw"))
            .set_payload(ROSTER)
            .to_request();
        test::call_service(&app, req).await;
        let req = test::TestRequest::post()
            .uri("/api/characters")
            .insert_header(("X-Admin-Password", "pw"))
            .set_payload("character_id\nc1\n")
            .to_request();
        test::call_service(&app, req).await;

        let req = test::TestRequest::post()
            .uri("/api/solve")
            .insert_header(("X-Admin-Password", "pw"))
            .to_request();
        let result: AssignmentResult = test::call_and_read_body_json(&app, req).await;
        assert!(!result.feasible);

        let req = test::TestRequest::post()
            .uri("/api/commit")
            .insert_header(("X-Admin-Password", "pw"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::CONFLICT);
    }

    #[actix_web::test]
    async fn test_mutations_require_password() {
        let app = test::init_service(App::new().app_data(state()).configure(configure)).await;
        let req = test::TestRequest::post()
            .uri("/api/toggle")
            .set_json(ToggleRequest { player_id: "a".to_string(), character_id: "c1".to_string() })
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::UNAUTHORIZED);
    }
}
