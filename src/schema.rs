use itertools::Itertools;

use crate::{
    db::{Database, COUNTER_TABLE},
    models::StreamKind,
    registry::RUN_TABLE,
};

/// Every table the store owns.
pub fn tables() -> impl Iterator<Item = &'static str> {
    [RUN_TABLE, COUNTER_TABLE]
        .into_iter()
        .chain(StreamKind::ALL.iter().map(|kind| kind.table()))
}

/// Schema statements: one table per stream plus a `(run_id, t_us)` index so
/// range scans within a run stay cheap.
pub fn definition() -> String {
    let tables = tables()
        .map(|table| format!("DEFINE TABLE IF NOT EXISTS {table} SCHEMALESS;"))
        .join("\n");
    let indexes = StreamKind::ALL
        .iter()
        .map(|kind| {
            let table = kind.table();
            format!("DEFINE INDEX IF NOT EXISTS {table}_run_id_t_us ON TABLE {table} FIELDS run_id, t_us;")
        })
        .join("\n");
    format!("{tables}\n{indexes}")
}

/// Idempotent; safe to run on every start.
pub async fn apply(db: &Database) -> Result<(), surrealdb::Error> {
    db.client().query(definition()).await?.check()?;
    Ok(())
}

/// Removes every table and the data in it.
pub async fn drop_all(db: &Database) -> Result<(), surrealdb::Error> {
    let statements = tables()
        .map(|table| format!("REMOVE TABLE IF EXISTS {table};"))
        .join("\n");
    db.client().query(statements).await?.check()?;
    Ok(())
}
