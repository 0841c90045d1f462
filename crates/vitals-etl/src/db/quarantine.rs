//! Batch insert of quarantined rows

use sqlx::{Connection, PgConnection, Postgres, QueryBuilder};
use vitals_common::types::{ErrorRecord, QUARANTINE_COLUMNS};

use super::schema::quote_ident;
use super::DbResult;
use crate::store::QUARANTINE_TABLE;

/// Rows per INSERT; 9 binds per row keeps well under the 65535 parameter limit.
const QUARANTINE_BATCH_ROWS: usize = 5_000;

/// Insert all rows in one transaction so a file's quarantine is all-or-nothing.
pub(crate) async fn insert_error_records(
    conn: &mut PgConnection,
    rows: &[ErrorRecord],
) -> DbResult<u64> {
    if rows.is_empty() {
        return Ok(0);
    }

    let mut tx = conn.begin().await?;
    let mut inserted = 0;

    for chunk in rows.chunks(QUARANTINE_BATCH_ROWS) {
        let mut query_builder = QueryBuilder::<Postgres>::new(format!(
            "INSERT INTO {} ({}) ",
            quote_ident(QUARANTINE_TABLE),
            QUARANTINE_COLUMNS.join(", ")
        ));

        query_builder.push_values(chunk.iter(), |mut b, row| {
            b.push_bind(&row.patient_id)
                .push_bind(row.heart_rate)
                .push_bind(row.weight.map(|w| w as f32))
                .push_bind(row.systolic)
                .push_bind(row.diastolic)
                .push_bind(row.record_date)
                .push_bind(row.ingested_at)
                .push_bind(&row.source_file)
                .push_bind(&row.error);
        });

        inserted += query_builder
            .build()
            .execute(&mut *tx)
            .await?
            .rows_affected();
    }

    tx.commit().await?;

    Ok(inserted)
}
