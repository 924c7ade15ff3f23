use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "empleado")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub nombres: String,
    pub apellidos: String,
    pub cargo: String,
    /// Nullable here so a missing company reaches the store, which rejects it.
    pub compania_id: Option<i32>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::compania::Entity",
        from = "Column::CompaniaId",
        to = "super::compania::Column::Id"
    )]
    Compania,
}

impl Related<super::compania::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Compania.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
