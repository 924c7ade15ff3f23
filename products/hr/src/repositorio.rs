use entity::empleado;
use platform_db::{Consulta, RepositorioSeaOrm};
use sea_orm::ColumnTrait;

use crate::modelo::{Empleado, EmpleadoNavegacion};

/// Repository bound to [`Empleado`]; it adds no behaviour of its own.
pub type EmpleadoRepositorio = RepositorioSeaOrm<Empleado>;

/// Every employee with its company.
pub fn consulta_con_compania() -> Consulta<Empleado> {
    Consulta::todos().incluir(EmpleadoNavegacion::Compania)
}

/// The employee with `id`, with its company.
pub fn consulta_por_id(id: i32) -> Consulta<Empleado> {
    consulta_con_compania().filtrar(empleado::Column::Id.eq(id))
}
