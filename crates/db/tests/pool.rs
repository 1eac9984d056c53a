//! Pool bootstrap against a fresh data directory.

#[tokio::test]
async fn create_pool_creates_missing_parent_directories() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("data").join("jobs.db");

    let pool = prodshot_db::create_pool(&format!("sqlite://{}", path.display()))
        .await
        .unwrap();
    prodshot_db::run_migrations(&pool).await.unwrap();
    prodshot_db::health_check(&pool).await.unwrap();

    assert!(path.exists());
}
