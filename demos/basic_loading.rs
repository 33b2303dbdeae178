//! Basic loading example for polyload
//!
//! ```text
//! cargo run --example basic_loading -- assets models/chair.obj textures/logo.png
//! ```

use polyload::{AssetLoader, FsEngine, LoadedAsset, LoaderConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let root = args.next().unwrap_or_else(|| "assets".to_string());
    let urls: Vec<String> = args.collect();

    println!("polyload v{}", polyload::VERSION);
    if urls.is_empty() {
        println!("usage: basic_loading <root> <file>...");
        return Ok(());
    }

    let config = LoaderConfig::default().with_cache(true);
    let loader = AssetLoader::new(FsEngine::new(root), config);

    let batch = loader.load_many(&urls).await;
    for (url, result) in urls.iter().zip(batch) {
        match result {
            Ok(LoadedAsset::Node(node)) => {
                println!("{url}: {} meshes", node.mesh_count());
            }
            Ok(LoadedAsset::Texture(texture)) => {
                println!("{url}: {}x{} image", texture.width, texture.height);
            }
            Err(err) => println!("{url}: {err}"),
        }
    }

    println!("Cache hit rate: {:.1}%", loader.metrics().cache_hit_rate());
    Ok(())
}
