//! Lists a drive folder.
//!
//! Needs `DRIVE_ACCESS_TOKEN`, or `DRIVE_REFRESH_TOKEN` with
//! `DRIVE_CLIENT_SECRET_PATH`. `DRIVE_FOLDER_ID` defaults to `sharedWithMe`.

use infra_io::{IoAdapterFactory, StorageConfig};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let mut config = StorageConfig::drive();
    for (var, option) in [
        ("DRIVE_ACCESS_TOKEN", "access_token"),
        ("DRIVE_REFRESH_TOKEN", "refresh_token"),
        ("DRIVE_CLIENT_SECRET_PATH", "client_secret_path"),
    ] {
        if let Ok(value) = std::env::var(var) {
            config = config.with_option(option, value);
        }
    }
    let folder_id = std::env::var("DRIVE_FOLDER_ID").unwrap_or_else(|_| "sharedWithMe".to_string());

    let adapter = IoAdapterFactory::from_config(config).unwrap();
    let contents = adapter.list_dir_contents(&folder_id).await.unwrap();

    println!("{} entries in {}", contents.len(), folder_id);
    for meta in contents.values() {
        println!("{:<40} {:?}", meta.id.as_deref().unwrap_or(""), meta.name);
    }
}
