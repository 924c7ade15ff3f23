use entity::compania;
use platform_db::DbResult;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};
use tracing::info;

use crate::modelo::Compania;

pub const COMPANIA_DEMO: &str = "Compania Demo";

/// Ensures the demo company exists and returns it.
pub async fn sembrar<C: ConnectionTrait>(db: &C) -> DbResult<Compania> {
    if let Some(existente) = compania::Entity::find()
        .filter(compania::Column::Nombre.eq(COMPANIA_DEMO))
        .one(db)
        .await?
    {
        return Ok(existente.into());
    }
    let creada = compania::ActiveModel {
        nombre: Set(COMPANIA_DEMO.into()),
        ..Default::default()
    }
    .insert(db)
    .await?;
    info!(id = creada.id, "demo company seeded");
    Ok(creada.into())
}
