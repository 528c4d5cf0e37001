//! Integration tests for the import-session store: stage status
//! upserts, batch corrections, and session teardown.

use sqlx::PgPool;

use tabula_db::models::import::{CreateImportFile, CreateImportRow};
use tabula_db::repositories::{ImportFileRepo, ImportRowRepo, StageStatusRepo};

async fn seed_session(pool: &PgPool) -> i64 {
    let file = ImportFileRepo::create(
        pool,
        &CreateImportFile {
            file_name: "people.csv".into(),
            file_extension: "csv".into(),
            byte_size: 64,
            headers: serde_json::json!(["name", "city"]),
        },
    )
    .await
    .expect("create file");

    let rows: Vec<CreateImportRow> = [("Ada", "NY"), ("Bob", "LA"), ("Cid", "NY")]
        .iter()
        .enumerate()
        .map(|(i, (name, city))| CreateImportRow {
            row_index: i as i32,
            data: serde_json::json!({ "name": name, "city": city }),
            annotations: serde_json::json!([]),
            row_status: "Success".into(),
            raw_column_count: 2,
        })
        .collect();
    ImportRowRepo::batch_insert(pool, file.id, &rows)
        .await
        .expect("insert rows");

    file.id
}

#[sqlx::test(migrations = "./migrations")]
async fn stage_status_upsert_overwrites_the_previous_run(pool: PgPool) {
    let file_id = seed_session(&pool).await;

    StageStatusRepo::upsert(&pool, file_id, "DataValidation", "Error", 2, 1)
        .await
        .unwrap();
    let updated = StageStatusRepo::upsert(&pool, file_id, "DataValidation", "Success", 0, 0)
        .await
        .unwrap();

    assert_eq!(updated.status, "Success");
    assert_eq!(updated.critical_count, 0);

    // Still a single record per (file, stage).
    let all = StageStatusRepo::list_by_file(&pool, file_id).await.unwrap();
    assert_eq!(all.len(), 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn propagate_value_touches_only_matching_rows_in_order(pool: PgPool) {
    let file_id = seed_session(&pool).await;

    let touched = ImportRowRepo::propagate_value(&pool, file_id, "city", "NY", "New York")
        .await
        .unwrap();

    assert_eq!(touched.len(), 2);
    assert!(touched[0].row_index < touched[1].row_index);

    let rows = ImportRowRepo::list_by_file(&pool, file_id).await.unwrap();
    assert_eq!(rows[0].data["city"], "New York");
    assert_eq!(rows[1].data["city"], "LA");
    assert_eq!(rows[2].data["city"], "New York");
}

#[sqlx::test(migrations = "./migrations")]
async fn count_and_fetch_page_respect_the_status_filter(pool: PgPool) {
    let file_id = seed_session(&pool).await;

    let rows = ImportRowRepo::list_by_file(&pool, file_id).await.unwrap();
    ImportRowRepo::update_annotations(
        &pool,
        rows[1].id,
        &serde_json::json!([{ "city": { "Type": "Error", "Message": "bad" } }]),
        "Error",
    )
    .await
    .unwrap();

    assert_eq!(ImportRowRepo::count(&pool, file_id, None).await.unwrap(), 3);
    assert_eq!(
        ImportRowRepo::count(&pool, file_id, Some("Error")).await.unwrap(),
        1
    );

    let page = ImportRowRepo::fetch_page(&pool, file_id, Some("Error"), 0, 10)
        .await
        .unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].row_status, "Error");
}

#[sqlx::test(migrations = "./migrations")]
async fn deleting_a_session_cascades_to_its_rows(pool: PgPool) {
    let file_id = seed_session(&pool).await;
    StageStatusRepo::upsert(&pool, file_id, "FileUpload", "Success", 0, 0)
        .await
        .unwrap();

    assert!(ImportFileRepo::delete(&pool, file_id).await.unwrap());
    assert!(!ImportFileRepo::delete(&pool, file_id).await.unwrap());

    assert_eq!(ImportRowRepo::count(&pool, file_id, None).await.unwrap(), 0);
    assert!(StageStatusRepo::list_by_file(&pool, file_id)
        .await
        .unwrap()
        .is_empty());
}
