pub mod compania;
pub mod empleado;
