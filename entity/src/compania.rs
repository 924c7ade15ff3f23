use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "compania")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub nombre: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::empleado::Entity")]
    Empleado,
}

impl Related<super::empleado::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Empleado.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
