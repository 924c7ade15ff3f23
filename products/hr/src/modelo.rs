use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use entity::{compania, empleado};
use platform_db::Registro;
use sea_orm::{
    ActiveValue::{NotSet, Set},
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Compania {
    pub id: i32,
    pub nombre: String,
}

impl From<compania::Model> for Compania {
    fn from(model: compania::Model) -> Self {
        Self {
            id: model.id,
            nombre: model.nombre,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Empleado {
    /// `0` lets the store assign the id.
    #[serde(default)]
    pub id: i32,
    pub nombres: String,
    pub apellidos: String,
    pub cargo: String,
    #[serde(default)]
    pub compania_id: Option<i32>,
    /// Only populated when the query includes [`EmpleadoNavegacion::Compania`].
    #[serde(default, skip_deserializing)]
    pub compania: Option<Compania>,
}

impl Empleado {
    /// Names of required text fields that are blank.
    pub fn campos_vacios(&self) -> Vec<&'static str> {
        [
            ("nombres", &self.nombres),
            ("apellidos", &self.apellidos),
            ("cargo", &self.cargo),
        ]
        .into_iter()
        .filter(|(_, valor)| valor.trim().is_empty())
        .map(|(campo, _)| campo)
        .collect()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmpleadoNavegacion {
    Compania,
}

#[async_trait]
impl Registro for Empleado {
    type Entidad = empleado::Entity;
    type Activo = empleado::ActiveModel;
    type Navegacion = EmpleadoNavegacion;

    fn desde_modelo(modelo: empleado::Model) -> Self {
        Self {
            id: modelo.id,
            nombres: modelo.nombres,
            apellidos: modelo.apellidos,
            cargo: modelo.cargo,
            compania_id: modelo.compania_id,
            compania: None,
        }
    }

    fn en_modelo_activo(self) -> empleado::ActiveModel {
        empleado::ActiveModel {
            id: if self.id > 0 { Set(self.id) } else { NotSet },
            nombres: Set(self.nombres),
            apellidos: Set(self.apellidos),
            cargo: Set(self.cargo),
            compania_id: Set(self.compania_id),
        }
    }

    async fn cargar_navegacion(
        db: &DatabaseConnection,
        navegacion: EmpleadoNavegacion,
        registros: &mut [Self],
    ) -> Result<(), DbErr> {
        match navegacion {
            EmpleadoNavegacion::Compania => cargar_companias(db, registros).await,
        }
    }
}

/// One query for all referenced companies.
async fn cargar_companias(db: &DatabaseConnection, empleados: &mut [Empleado]) -> Result<(), DbErr> {
    let ids: BTreeSet<i32> = empleados.iter().filter_map(|e| e.compania_id).collect();
    if ids.is_empty() {
        return Ok(());
    }
    let companias: HashMap<i32, Compania> = compania::Entity::find()
        .filter(compania::Column::Id.is_in(ids))
        .all(db)
        .await?
        .into_iter()
        .map(|model| (model.id, Compania::from(model)))
        .collect();
    for empleado in empleados.iter_mut() {
        empleado.compania = empleado
            .compania_id
            .and_then(|id| companias.get(&id).cloned());
    }
    Ok(())
}
