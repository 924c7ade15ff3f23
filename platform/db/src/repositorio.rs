use std::fmt;

use async_trait::async_trait;
use sea_orm::sea_query::IntoCondition;
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, Condition, ConnectionTrait, DatabaseConnection,
    DbBackend, DbErr, EntityTrait, IntoActiveModel, Iterable, Order, PrimaryKeyToColumn,
    QueryFilter, QueryOrder, QueryTrait, Select, TransactionTrait,
};
use tracing::{Level, debug};

use crate::DbResult;

pub type Entidad<R> = <R as Registro>::Entidad;
pub type Modelo<R> = <Entidad<R> as EntityTrait>::Model;
pub type ModeloActivo<R> = <R as Registro>::Activo;
pub type Columna<R> = <Entidad<R> as EntityTrait>::Column;

/// A domain record stored through a SeaORM entity.
#[async_trait]
pub trait Registro: Sized + Send + Sync + 'static {
    type Entidad: EntityTrait;
    type Activo: ActiveModelTrait<Entity = Self::Entidad> + Send + Sync;
    /// Related data that can be eager-loaded next to the record.
    type Navegacion: Copy + fmt::Debug + Send + Sync;

    fn desde_modelo(modelo: Modelo<Self>) -> Self;

    fn en_modelo_activo(self) -> ModeloActivo<Self>;

    /// Populates `navegacion` on records that were already fetched.
    async fn cargar_navegacion(
        db: &DatabaseConnection,
        navegacion: Self::Navegacion,
        registros: &mut [Self],
    ) -> Result<(), DbErr>;
}

/// Query options. The defaults match everything, order by primary key and
/// load no navigation.
pub struct Consulta<R: Registro> {
    filtro: Option<Condition>,
    orden: Vec<(Columna<R>, Order)>,
    incluir: Option<R::Navegacion>,
}

impl<R: Registro> Default for Consulta<R> {
    fn default() -> Self {
        Self {
            filtro: None,
            orden: Vec::new(),
            incluir: None,
        }
    }
}

impl<R: Registro> Consulta<R> {
    pub fn todos() -> Self {
        Self::default()
    }

    pub fn filtrar(mut self, filtro: impl IntoCondition) -> Self {
        self.filtro = Some(filtro.into_condition());
        self
    }

    pub fn ordenar(mut self, columna: Columna<R>, orden: Order) -> Self {
        self.orden.push((columna, orden));
        self
    }

    pub fn incluir(mut self, navegacion: R::Navegacion) -> Self {
        self.incluir = Some(navegacion);
        self
    }

    pub fn navegacion(&self) -> Option<R::Navegacion> {
        self.incluir
    }

    pub fn select(&self) -> Select<Entidad<R>> {
        let mut select = <Entidad<R> as EntityTrait>::find();
        if let Some(filtro) = &self.filtro {
            select = select.filter(filtro.clone());
        }
        if self.orden.is_empty() {
            for clave in <Entidad<R> as EntityTrait>::PrimaryKey::iter() {
                select = select.order_by_asc(clave.into_column());
            }
        } else {
            for (columna, orden) in &self.orden {
                select = select.order_by(*columna, orden.clone());
            }
        }
        select
    }

    /// Renders the statement with its values inlined.
    pub fn sql(&self, backend: DbBackend) -> String {
        self.select().build(backend).to_string()
    }
}

/// Outcome of a commit.
#[derive(Clone, Debug, PartialEq)]
pub struct Guardado<R> {
    registros: Vec<R>,
}

impl<R> Guardado<R> {
    pub fn new(registros: Vec<R>) -> Self {
        Self { registros }
    }

    /// Number of records written.
    pub fn afectados(&self) -> u64 {
        self.registros.len() as u64
    }

    /// Stored records, with the ids the store assigned.
    pub fn registros(&self) -> &[R] {
        &self.registros
    }

    pub fn into_registros(self) -> Vec<R> {
        self.registros
    }
}

/// Unit-of-work data access over one record type.
///
/// `agregar` only stages; nothing is visible to queries until `guardar`
/// commits. Absence is `None` or an empty `Vec`, never an error.
#[async_trait]
pub trait Repositorio<R: Registro>: Send + Sync {
    fn agregar(&mut self, registro: R);

    async fn guardar(&mut self) -> DbResult<Guardado<R>>;

    async fn obtener_primero(&self, consulta: Consulta<R>) -> DbResult<Option<R>>;

    async fn obtener_todos(&self, consulta: Consulta<R>) -> DbResult<Vec<R>>;
}

/// SeaORM-backed repository. Meant to live for a single request.
pub struct RepositorioSeaOrm<R: Registro> {
    db: DatabaseConnection,
    pendientes: Vec<ModeloActivo<R>>,
}

impl<R: Registro> RepositorioSeaOrm<R> {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            pendientes: Vec::new(),
        }
    }

    pub fn pendientes(&self) -> usize {
        self.pendientes.len()
    }

    fn trazar(&self, operacion: &'static str, consulta: &Consulta<R>) {
        if tracing::enabled!(Level::DEBUG) {
            let sql = consulta.sql(self.db.get_database_backend());
            debug!(operacion, %sql, incluir = ?consulta.navegacion(), "repository query");
        }
    }

    async fn incluir(&self, consulta: &Consulta<R>, registros: &mut [R]) -> DbResult<()> {
        if let Some(navegacion) = consulta.navegacion() {
            if !registros.is_empty() {
                R::cargar_navegacion(&self.db, navegacion, registros).await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl<R> Repositorio<R> for RepositorioSeaOrm<R>
where
    R: Registro,
    ModeloActivo<R>: ActiveModelTrait<Entity = Entidad<R>> + ActiveModelBehavior + Send + Sync,
    Modelo<R>: IntoActiveModel<ModeloActivo<R>> + Send + Sync,
{
    fn agregar(&mut self, registro: R) {
        self.pendientes.push(registro.en_modelo_activo());
    }

    async fn guardar(&mut self) -> DbResult<Guardado<R>> {
        let pendientes = std::mem::take(&mut self.pendientes);
        if pendientes.is_empty() {
            return Ok(Guardado::new(Vec::new()));
        }

        // Dropping the transaction on error rolls the whole batch back.
        let txn = self.db.begin().await?;
        let mut registros = Vec::with_capacity(pendientes.len());
        for activo in pendientes {
            let modelo = activo.insert(&txn).await?;
            registros.push(R::desde_modelo(modelo));
        }
        txn.commit().await?;

        debug!(afectados = registros.len(), "staged records committed");
        Ok(Guardado::new(registros))
    }

    async fn obtener_primero(&self, consulta: Consulta<R>) -> DbResult<Option<R>> {
        self.trazar("obtener_primero", &consulta);
        let Some(modelo) = consulta.select().one(&self.db).await? else {
            return Ok(None);
        };
        let mut registros = vec![R::desde_modelo(modelo)];
        self.incluir(&consulta, &mut registros).await?;
        Ok(registros.pop())
    }

    async fn obtener_todos(&self, consulta: Consulta<R>) -> DbResult<Vec<R>> {
        self.trazar("obtener_todos", &consulta);
        let modelos = consulta.select().all(&self.db).await?;
        let mut registros: Vec<R> = modelos.into_iter().map(R::desde_modelo).collect();
        self.incluir(&consulta, &mut registros).await?;
        Ok(registros)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DbError;
    use sea_orm::{ColumnTrait, Database, Schema, Set};

    mod nota {
        use sea_orm::entity::prelude::*;

        #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
        #[sea_orm(table_name = "nota")]
        pub struct Model {
            #[sea_orm(primary_key)]
            pub id: i32,
            pub texto: String,
        }

        #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
        pub enum Relation {}

        impl ActiveModelBehavior for ActiveModel {}
    }

    #[derive(Clone, Debug, PartialEq)]
    struct Nota {
        id: i32,
        texto: String,
        largo: Option<usize>,
    }

    impl Nota {
        fn new(id: i32, texto: &str) -> Self {
            Self {
                id,
                texto: texto.into(),
                largo: None,
            }
        }
    }

    #[derive(Clone, Copy, Debug)]
    enum NotaNavegacion {
        Largo,
    }

    #[async_trait]
    impl Registro for Nota {
        type Entidad = nota::Entity;
        type Activo = nota::ActiveModel;
        type Navegacion = NotaNavegacion;

        fn desde_modelo(modelo: nota::Model) -> Self {
            Self {
                id: modelo.id,
                texto: modelo.texto,
                largo: None,
            }
        }

        fn en_modelo_activo(self) -> nota::ActiveModel {
            nota::ActiveModel {
                id: Set(self.id),
                texto: Set(self.texto),
            }
        }

        async fn cargar_navegacion(
            _db: &DatabaseConnection,
            navegacion: NotaNavegacion,
            registros: &mut [Self],
        ) -> Result<(), DbErr> {
            match navegacion {
                NotaNavegacion::Largo => {
                    for registro in registros.iter_mut() {
                        registro.largo = Some(registro.texto.len());
                    }
                }
            }
            Ok(())
        }
    }

    async fn repositorio() -> RepositorioSeaOrm<Nota> {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        let backend = db.get_database_backend();
        let schema = Schema::new(backend);
        db.execute(backend.build(&schema.create_table_from_entity(nota::Entity)))
            .await
            .unwrap();
        RepositorioSeaOrm::new(db)
    }

    #[test]
    fn default_query_orders_by_primary_key() {
        let sql = Consulta::<Nota>::todos().sql(DbBackend::Sqlite);
        assert!(!sql.contains("WHERE"));
        assert!(sql.ends_with(r#"ORDER BY "nota"."id" ASC"#), "{sql}");
    }

    #[test]
    fn filter_and_explicit_order_are_rendered() {
        let sql = Consulta::<Nota>::todos()
            .filtrar(nota::Column::Id.eq(7))
            .ordenar(nota::Column::Texto, Order::Desc)
            .sql(DbBackend::Sqlite);
        assert!(sql.contains(r#"WHERE "nota"."id" = 7"#), "{sql}");
        assert!(sql.ends_with(r#"ORDER BY "nota"."texto" DESC"#), "{sql}");
    }

    #[tokio::test]
    async fn staged_records_are_invisible_until_saved() {
        let mut repo = repositorio().await;
        repo.agregar(Nota::new(1, "uno"));
        repo.agregar(Nota::new(2, "dos"));
        assert_eq!(repo.pendientes(), 2);
        assert!(repo.obtener_todos(Consulta::todos()).await.unwrap().is_empty());

        let guardado = repo.guardar().await.unwrap();
        assert_eq!(guardado.afectados(), 2);
        assert_eq!(repo.pendientes(), 0);

        let todos = repo.obtener_todos(Consulta::todos()).await.unwrap();
        assert_eq!(todos, vec![Nota::new(1, "uno"), Nota::new(2, "dos")]);
    }

    #[tokio::test]
    async fn saving_nothing_affects_nothing() {
        let mut repo = repositorio().await;
        assert_eq!(repo.guardar().await.unwrap().afectados(), 0);
    }

    #[tokio::test]
    async fn first_returns_none_without_match() {
        let repo = repositorio().await;
        let found = repo
            .obtener_primero(Consulta::todos().filtrar(nota::Column::Id.eq(-1)))
            .await
            .unwrap();
        assert_eq!(found, None);
    }

    #[tokio::test]
    async fn include_runs_only_when_requested() {
        let mut repo = repositorio().await;
        repo.agregar(Nota::new(1, "hola"));
        repo.guardar().await.unwrap();

        let plain = repo.obtener_primero(Consulta::todos()).await.unwrap().unwrap();
        assert_eq!(plain.largo, None);

        let loaded = repo
            .obtener_primero(Consulta::todos().incluir(NotaNavegacion::Largo))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.largo, Some(4));
    }

    #[tokio::test]
    async fn failed_batch_is_rolled_back() {
        let mut repo = repositorio().await;
        repo.agregar(Nota::new(1, "uno"));
        repo.guardar().await.unwrap();

        repo.agregar(Nota::new(2, "dos"));
        repo.agregar(Nota::new(1, "otra vez uno"));
        let err = repo.guardar().await.unwrap_err();
        assert!(matches!(err, DbError::Duplicate(_)), "{err:?}");
        assert_eq!(repo.pendientes(), 0);

        let todos = repo.obtener_todos(Consulta::todos()).await.unwrap();
        assert_eq!(todos, vec![Nota::new(1, "uno")]);
    }
}
