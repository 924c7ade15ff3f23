//! HR module: employee records, their company navigation and the
//! repository bindings the HTTP layer talks to.

pub mod modelo;
pub mod repositorio;
pub mod semilla;

pub use modelo::{Compania, Empleado, EmpleadoNavegacion};
pub use repositorio::{EmpleadoRepositorio, consulta_con_compania, consulta_por_id};
