use anyhow::Result;
use spatial_db_tests::{connection, logging, DbConfig, FixtureDir};

fn main() -> Result<()> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?
        .block_on(async_main())
}

async fn async_main() -> Result<()> {
    logging::init();
    let config = DbConfig::from_env()?;

    println!("Testing PostgreSQL connection to {}...", config.redacted_url());
    let pool = connection::connect(&config, None).await?;
    println!("✓ Connected successfully!");

    let version: String = sqlx::query_scalar("SELECT version()").fetch_one(&pool).await?;
    println!("  Server: {}", version);

    match connection::postgis_version(&pool).await? {
        Some(postgis) => println!("✓ postgis extension is installed (v{})", postgis),
        None if config.require_postgis => {
            println!("✗ postgis extension is NOT installed; tests will try to create it")
        }
        None => println!("✗ postgis extension is NOT installed"),
    }

    match FixtureDir::discover(config.fixture_dir.as_deref()) {
        Ok(dir) => println!("✓ Fixtures directory: {}", dir.root().display()),
        Err(e) => println!("✗ {}", e),
    }

    pool.close().await;
    Ok(())
}
