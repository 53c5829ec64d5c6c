use infra_io::{FileMeta, IoAdapterFactory, StorageConfig};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let root = std::env::temp_dir().to_string_lossy().to_string();
    let adapter = IoAdapterFactory::from_config(StorageConfig::local()).unwrap();

    let folder = adapter
        .get_or_create_subfolder(&root, &FileMeta::named("infra_io_demo"))
        .await
        .unwrap();
    let folder_id = folder.id.unwrap();

    let written = adapter
        .overwrite_file_bytes(&folder_id, &FileMeta::named("hello.txt"), b"hello from infra-io")
        .await
        .unwrap();
    let bytes = adapter
        .get_file_bytes(written.id.as_deref().unwrap())
        .await
        .unwrap();
    println!("{}", String::from_utf8_lossy(&bytes));

    for (id, meta) in adapter.list_dir_contents(&folder_id).await.unwrap() {
        println!("{} -> {:?}", id, meta.name);
    }
}
