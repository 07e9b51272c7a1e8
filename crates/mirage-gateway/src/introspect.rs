//! Schema introspection for the configured Postgres store.

use crate::credentials::CredentialSource;
use crate::postgres::connect;
use mirage_core::{
    ColumnInfo, ForeignKey, ForeignKeyTarget, IndexInfo, SchemaSnapshot, StoreConfig, TableInfo,
};
use sqlx::postgres::PgConnection;
use sqlx::{Connection, Row};

/// Introspect a Postgres database into a schema snapshot.
/// Excludes system schemas (pg_catalog, information_schema, pg_toast).
pub async fn introspect_schema(
    store: &StoreConfig,
    credentials: &dyn CredentialSource,
) -> anyhow::Result<SchemaSnapshot> {
    let creds = credentials.resolve(store)?;
    let mut conn = connect(store, &creds).await?;

    let snapshot = snapshot_from(&mut conn).await;
    if let Err(e) = conn.close().await {
        tracing::debug!(error = %e, "Error closing connection");
    }
    snapshot
}

async fn snapshot_from(conn: &mut PgConnection) -> anyhow::Result<SchemaSnapshot> {
    let table_rows = sqlx::query(
        r#"
        select table_schema::text as table_schema, table_name::text as table_name
        from information_schema.tables
        where table_type = 'BASE TABLE'
          and table_schema not in ('pg_catalog', 'information_schema', 'pg_toast')
        order by table_schema, table_name
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;

    let mut snapshot = SchemaSnapshot::new();

    for row in table_rows {
        let table_schema: String = row.try_get("table_schema")?;
        let table_name: String = row.try_get("table_name")?;

        let info = TableInfo {
            columns: columns(conn, &table_schema, &table_name).await?,
            primary_keys: primary_keys(conn, &table_schema, &table_name).await?,
            foreign_keys: foreign_keys(conn, &table_schema, &table_name).await?,
            indexes: indexes(conn, &table_schema, &table_name).await?,
        };

        tracing::debug!(
            schema = %table_schema,
            table = %table_name,
            columns = info.columns.len(),
            "Introspected table"
        );
        snapshot.insert_table(table_schema, table_name, info);
    }

    Ok(snapshot)
}

async fn columns(
    conn: &mut PgConnection,
    table_schema: &str,
    table_name: &str,
) -> anyhow::Result<Vec<ColumnInfo>> {
    let rows = sqlx::query(
        r#"
        select column_name::text as column_name,
               data_type::text as data_type,
               is_nullable::text as is_nullable
        from information_schema.columns
        where table_schema = $1 and table_name = $2
        order by ordinal_position
        "#,
    )
    .bind(table_schema)
    .bind(table_name)
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter()
        .map(|c| {
            let is_nullable: String = c.try_get("is_nullable")?;
            Ok(ColumnInfo {
                name: c.try_get("column_name")?,
                data_type: c.try_get("data_type")?,
                nullable: is_nullable == "YES",
            })
        })
        .collect()
}

async fn primary_keys(
    conn: &mut PgConnection,
    table_schema: &str,
    table_name: &str,
) -> anyhow::Result<Vec<String>> {
    let rows = sqlx::query(
        r#"
        select kcu.column_name::text as column_name
        from information_schema.table_constraints tc
        join information_schema.key_column_usage kcu
          on tc.constraint_name = kcu.constraint_name
         and tc.table_schema = kcu.table_schema
        where tc.constraint_type = 'PRIMARY KEY'
          and tc.table_schema = $1
          and tc.table_name = $2
        order by kcu.ordinal_position
        "#,
    )
    .bind(table_schema)
    .bind(table_name)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| r.try_get::<String, _>("column_name"))
        .collect::<Result<_, _>>()?)
}

async fn foreign_keys(
    conn: &mut PgConnection,
    table_schema: &str,
    table_name: &str,
) -> anyhow::Result<Vec<ForeignKey>> {
    let rows = sqlx::query(
        r#"
        select
          kcu.column_name::text as column_name,
          ccu.table_schema::text as foreign_table_schema,
          ccu.table_name::text as foreign_table_name,
          ccu.column_name::text as foreign_column_name
        from information_schema.table_constraints tc
        join information_schema.key_column_usage kcu
          on tc.constraint_name = kcu.constraint_name
         and tc.table_schema = kcu.table_schema
        join information_schema.constraint_column_usage ccu
          on ccu.constraint_name = tc.constraint_name
         and ccu.table_schema = tc.table_schema
        where tc.constraint_type = 'FOREIGN KEY'
          and tc.table_schema = $1
          and tc.table_name = $2
        order by tc.constraint_name, kcu.ordinal_position
        "#,
    )
    .bind(table_schema)
    .bind(table_name)
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter()
        .map(|fk| {
            Ok(ForeignKey {
                column: fk.try_get("column_name")?,
                references: ForeignKeyTarget {
                    schema: fk.try_get("foreign_table_schema")?,
                    table: fk.try_get("foreign_table_name")?,
                    column: fk.try_get("foreign_column_name")?,
                },
            })
        })
        .collect()
}

async fn indexes(
    conn: &mut PgConnection,
    table_schema: &str,
    table_name: &str,
) -> anyhow::Result<Vec<IndexInfo>> {
    // Column order follows the index key order.
    let rows = sqlx::query(
        r#"
        select
          i.relname::text as index_name,
          array_agg(a.attname::text order by k.ord) as column_names
        from pg_class t
        join pg_namespace n on n.oid = t.relnamespace
        join pg_index ix on ix.indrelid = t.oid
        join pg_class i on i.oid = ix.indexrelid
        cross join lateral unnest(ix.indkey) with ordinality as k(attnum, ord)
        join pg_attribute a on a.attrelid = t.oid and a.attnum = k.attnum
        where n.nspname = $1
          and t.relname = $2
          and t.relkind = 'r'
        group by i.relname
        order by i.relname
        "#,
    )
    .bind(table_schema)
    .bind(table_name)
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter()
        .map(|r| {
            Ok(IndexInfo {
                name: r.try_get("index_name")?,
                columns: r.try_get("column_names")?,
            })
        })
        .collect()
}
