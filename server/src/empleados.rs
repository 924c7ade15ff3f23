use anyhow::anyhow;
use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use platform_api::{ApiError, ApiResult, Created};
use platform_db::{DbError, Repositorio};
use products_hr::{Empleado, EmpleadoRepositorio, consulta_con_compania, consulta_por_id};
use tracing::{info, instrument, warn};

use crate::http::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/empleados", get(listar).post(crear))
        .route("/empleados/{id}", get(obtener))
}

/// Each request gets its own repository, so staged changes never outlive it.
fn controlador(state: &AppState) -> EmpleadoController<EmpleadoRepositorio> {
    EmpleadoController::new(EmpleadoRepositorio::new(state.db.clone()))
}

async fn listar(State(state): State<AppState>) -> ApiResult<Json<Vec<Empleado>>> {
    controlador(&state).get_empleados().await.map(Json)
}

async fn obtener(State(state): State<AppState>, Path(id): Path<i32>) -> ApiResult<Json<Empleado>> {
    controlador(&state).get_empleado(id).await.map(Json)
}

async fn crear(
    State(state): State<AppState>,
    Json(empleado): Json<Empleado>,
) -> ApiResult<Created<Empleado>> {
    let mut controlador = controlador(&state);
    controlador.post_empleado(empleado).await
}

/// HTTP-facing adapter over an employee repository.
pub struct EmpleadoController<R> {
    repositorio: R,
}

impl<R: Repositorio<Empleado>> EmpleadoController<R> {
    pub fn new(repositorio: R) -> Self {
        Self { repositorio }
    }

    #[instrument(name = "empleados.listar", skip_all)]
    pub async fn get_empleados(&self) -> ApiResult<Vec<Empleado>> {
        let empleados = self
            .repositorio
            .obtener_todos(consulta_con_compania())
            .await?;
        info!(total = empleados.len(), "employees listed");
        Ok(empleados)
    }

    #[instrument(name = "empleados.obtener", skip(self))]
    pub async fn get_empleado(&self, id: i32) -> ApiResult<Empleado> {
        match self.repositorio.obtener_primero(consulta_por_id(id)).await? {
            Some(empleado) => Ok(empleado),
            None => {
                info!("employee not found");
                Err(ApiError::NotFound)
            }
        }
    }

    /// Commit failures come back as client or server errors, never as a panic.
    /// An id of 0 lets the store assign one.
    #[instrument(name = "empleados.crear", skip_all, fields(id = empleado.id))]
    pub async fn post_empleado(&mut self, empleado: Empleado) -> ApiResult<Created<Empleado>> {
        let id = empleado.id;
        if id < 0 {
            return Err(ApiError::InvalidInput(format!("id must not be negative, got {id}")));
        }
        let vacios = empleado.campos_vacios();
        if !vacios.is_empty() {
            return Err(ApiError::InvalidInput(format!(
                "required fields are blank: {}",
                vacios.join(", ")
            )));
        }

        self.repositorio.agregar(empleado);
        let guardado = self.repositorio.guardar().await.map_err(|err| {
            warn!(error = %err, "employee not saved");
            match err {
                DbError::Rejected(_) => {
                    ApiError::InvalidInput("employee requires an existing company".into())
                }
                DbError::Duplicate(_) => ApiError::Conflict(format!("employee {id} already exists")),
                other => ApiError::from(other),
            }
        })?;
        let creado = guardado
            .into_registros()
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::internal(anyhow!("commit stored no employee")))?;

        info!(id = creado.id, "employee created");
        Ok(Created::new(format!("/empleados/{}", creado.id), creado))
    }
}
