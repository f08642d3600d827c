use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::info;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CellState {
    Free,
    Occupied,
    NotPicked,
}

#[derive(Clone, Debug)]
pub struct Cell {
    pub code: String,
    pub locker_number: i32,
    pub state: CellState,
}

#[derive(Debug)]
pub struct Postamat {
    pub id: i32,
    pub code: String,
    pub cells: Vec<Cell>,
}

impl Postamat {
    /// Cells are numbered from 1 in layout order.
    pub fn new(id: i32, code: &str, cell_codes: &[&str]) -> Self {
        let cells = cell_codes
            .iter()
            .zip(1..)
            .map(|(code, locker_number)| Cell {
                code: code.to_string(),
                locker_number,
                state: CellState::Free,
            })
            .collect();
        Self {
            id,
            code: code.to_string(),
            cells,
        }
    }

    fn cell_mut(&mut self, code: &str) -> Option<&mut Cell> {
        self.cells.iter_mut().find(|c| c.code == code)
    }

    fn free_cells(&self) -> Vec<String> {
        self.cells
            .iter()
            .filter(|c| c.state == CellState::Free)
            .map(|c| c.code.clone())
            .collect()
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertOrder {
    pub postamat_id: i32,
    pub postamat_code: String,
    pub open_by_cell_codes: Option<OpenByCellCodes>,
    pub open_by_locker: Option<OpenByLocker>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenByCellCodes {
    #[serde(default)]
    pub cell_codes: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenByLocker {
    pub open_type: i32,
    pub locker_number: i32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrieveExpiredOrder {
    pub postamat_id: i32,
    pub delivery_date: NaiveDate,
    pub parcel_size: ParcelSize,
}

#[derive(Deserialize)]
pub struct ParcelSize {
    pub length: i32,
    pub width: i32,
    pub height: i32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrdWereNotPicked {
    pub postamat_id: i32,
    pub postamat_code: String,
    #[serde(default)]
    pub cell_codes: Vec<String>,
}

#[derive(Serialize, Deserialize)]
pub struct FreeCells {
    pub cells: Vec<String>,
}

#[derive(Clone)]
pub struct AppState {
    pub token: Arc<str>,
    pub postamat: Arc<RwLock<Postamat>>,
}

pub const DEFAULT_POSTAMAT_ID: i32 = 1;
pub const DEFAULT_POSTAMAT_CODE: &str = "PST-001";
pub const DEFAULT_CELLS: &[&str] = &["a100", "a101", "a102", "b200"];

impl AppState {
    pub fn new(token: &str, postamat: Postamat) -> Self {
        Self {
            token: Arc::from(token),
            postamat: Arc::new(RwLock::new(postamat)),
        }
    }

    pub fn with_defaults(token: &str) -> Self {
        Self::new(
            token,
            Postamat::new(DEFAULT_POSTAMAT_ID, DEFAULT_POSTAMAT_CODE, DEFAULT_CELLS),
        )
    }
}

/// Serves the typed routes and the `/auth/postamat/*` raw-text routes over
/// the same postamat.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/insertOrder", post(insert_order))
        .route("/retrieveExpiredOrder", post(retrieve_expired_order))
        .route("/getFreeCells", get(free_cells))
        .route("/ordWereNotPicked", post(ord_were_not_picked))
        .route("/auth/postamat/insert", post(insert_order))
        .route("/auth/postamat/retrieve", post(retrieve_expired_order))
        .route("/auth/postamat/available", get(free_cells))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_bearer))
        .with_state(state)
}

pub async fn run(listener: TcpListener, state: AppState) -> Result<(), std::io::Error> {
    axum::serve(listener, app(state)).await
}

fn authorize(headers: &HeaderMap, state: &AppState) -> Result<(), StatusCode> {
    let expected = format!("Bearer {}", state.token);
    match headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        Some(value) if value == expected => Ok(()),
        _ => Err(StatusCode::UNAUTHORIZED),
    }
}

/// Runs before any body extractor, so a bad credential is always a 401.
async fn require_bearer(State(state): State<AppState>, request: Request, next: Next) -> Result<Response, StatusCode> {
    authorize(request.headers(), &state)?;
    Ok(next.run(request).await)
}

fn check_postamat(postamat: &Postamat, id: i32, code: Option<&str>) -> Result<(), StatusCode> {
    if postamat.id != id || code.is_some_and(|c| c != postamat.code) {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(())
}

async fn insert_order(State(state): State<AppState>, Json(input): Json<InsertOrder>) -> StatusCode {
    match try_insert_order(&state, input).await {
        Ok(()) => StatusCode::OK,
        Err(status) => status,
    }
}

async fn try_insert_order(state: &AppState, input: InsertOrder) -> Result<(), StatusCode> {
    let mut postamat = state.postamat.write().await;
    check_postamat(&postamat, input.postamat_id, Some(&input.postamat_code))?;

    let codes: Vec<String> = match (input.open_by_cell_codes, input.open_by_locker) {
        (Some(by_codes), None) if !by_codes.cell_codes.is_empty() => by_codes.cell_codes,
        (None, Some(by_locker)) => {
            let cell = postamat
                .cells
                .iter()
                .find(|c| c.locker_number == by_locker.locker_number)
                .ok_or(StatusCode::NOT_FOUND)?;
            info!(open_type = by_locker.open_type, locker = by_locker.locker_number, "opening by locker number");
            vec![cell.code.clone()]
        }
        _ => return Err(StatusCode::BAD_REQUEST),
    };

    for code in &codes {
        let cell = postamat.cells.iter().find(|c| &c.code == code).ok_or(StatusCode::NOT_FOUND)?;
        if cell.state != CellState::Free {
            return Err(StatusCode::CONFLICT);
        }
    }
    for code in &codes {
        if let Some(cell) = postamat.cell_mut(code) {
            cell.state = CellState::Occupied;
        }
    }
    info!(cells = ?codes, "order inserted");
    Ok(())
}

async fn retrieve_expired_order(
    State(state): State<AppState>,
    Json(input): Json<RetrieveExpiredOrder>,
) -> StatusCode {
    match try_retrieve_expired_order(&state, input).await {
        Ok(()) => StatusCode::OK,
        Err(status) => status,
    }
}

async fn try_retrieve_expired_order(state: &AppState, input: RetrieveExpiredOrder) -> Result<(), StatusCode> {
    let size = &input.parcel_size;
    if size.length <= 0 || size.width <= 0 || size.height <= 0 {
        return Err(StatusCode::BAD_REQUEST);
    }
    let mut postamat = state.postamat.write().await;
    check_postamat(&postamat, input.postamat_id, None)?;

    let cell = postamat
        .cells
        .iter_mut()
        .find(|c| c.state == CellState::NotPicked)
        .ok_or(StatusCode::NOT_FOUND)?;
    cell.state = CellState::Free;
    info!(cell = %cell.code, delivery_date = %input.delivery_date, "expired order retrieved");
    Ok(())
}

async fn free_cells(State(state): State<AppState>) -> Json<FreeCells> {
    let postamat = state.postamat.read().await;
    Json(FreeCells {
        cells: postamat.free_cells(),
    })
}

async fn ord_were_not_picked(State(state): State<AppState>, Json(input): Json<OrdWereNotPicked>) -> StatusCode {
    match try_ord_were_not_picked(&state, input).await {
        Ok(()) => StatusCode::OK,
        Err(status) => status,
    }
}

async fn try_ord_were_not_picked(state: &AppState, input: OrdWereNotPicked) -> Result<(), StatusCode> {
    let mut postamat = state.postamat.write().await;
    check_postamat(&postamat, input.postamat_id, Some(&input.postamat_code))?;

    for code in &input.cell_codes {
        let cell = postamat.cells.iter().find(|c| &c.code == code).ok_or(StatusCode::NOT_FOUND)?;
        if cell.state != CellState::Occupied {
            return Err(StatusCode::CONFLICT);
        }
    }
    for code in &input.cell_codes {
        if let Some(cell) = postamat.cell_mut(code) {
            cell.state = CellState::NotPicked;
        }
    }
    info!(cells = ?input.cell_codes, "orders marked not picked");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn postamat_numbers_cells_from_one() {
        let p = Postamat::new(1, "X", &["a", "b"]);
        assert_eq!(p.cells[0].locker_number, 1);
        assert_eq!(p.cells[1].locker_number, 2);
        assert_eq!(p.free_cells(), vec!["a", "b"]);
    }

    #[test]
    fn insert_order_accepts_either_strategy() {
        let by_codes: InsertOrder = serde_json::from_str(
            r#"{"postamatId":1,"postamatCode":"X","openByCellCodes":{"cellCodes":["a"]}}"#,
        )
        .unwrap();
        assert!(by_codes.open_by_cell_codes.is_some());
        assert!(by_codes.open_by_locker.is_none());

        let by_locker: InsertOrder = serde_json::from_str(
            r#"{"postamatId":1,"postamatCode":"X","openByLocker":{"openType":1,"lockerNumber":2}}"#,
        )
        .unwrap();
        assert_eq!(by_locker.open_by_locker.unwrap().locker_number, 2);
    }

    #[test]
    fn quoted_numbers_are_rejected() {
        let result: Result<InsertOrder, _> =
            serde_json::from_str(r#"{"postamatId":"1","postamatCode":"X"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn retrieve_requires_iso_date() {
        let ok: Result<RetrieveExpiredOrder, _> = serde_json::from_str(
            r#"{"postamatId":1,"deliveryDate":"2024-05-01","parcelSize":{"length":1,"width":1,"height":1}}"#,
        );
        assert!(ok.is_ok());
        let bad: Result<RetrieveExpiredOrder, _> = serde_json::from_str(
            r#"{"postamatId":1,"deliveryDate":"01.05.2024","parcelSize":{"length":1,"width":1,"height":1}}"#,
        );
        assert!(bad.is_err());
    }

    #[test]
    fn authorize_checks_bearer_token() {
        let state = AppState::with_defaults("tok");
        let mut headers = HeaderMap::new();
        assert_eq!(authorize(&headers, &state), Err(StatusCode::UNAUTHORIZED));
        headers.insert(header::AUTHORIZATION, "Bearer nope".parse().unwrap());
        assert_eq!(authorize(&headers, &state), Err(StatusCode::UNAUTHORIZED));
        headers.insert(header::AUTHORIZATION, "Bearer tok".parse().unwrap());
        assert_eq!(authorize(&headers, &state), Ok(()));
    }
}
