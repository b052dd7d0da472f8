// admin/main.rs - scripts for initializing the database and running the photo pipeline

use clap::{Parser, Subcommand};
use database::{create_indexes, steps::model::PhotoRef};
use dotenvy::dotenv;
use media::{
    compress_batch, CompressedImage, CompressionOptions, ImageKitClient, MediaError,
    UploadAuthorization,
};
use mongodb::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[clap(name = "admin")]
struct Args {
    #[clap(subcommand)]
    subcommand: Subcommands,
    #[arg(short, long, env = "ENVIRONMENT", default_value = "local")]
    environment: String,
    #[arg(
        long,
        env = "DATABASE_URI",
        default_value = "mongodb://localhost:27017"
    )]
    database_uri: String,
    #[arg(long, env = "DATABASE_NAME", default_value = "build-tracker")]
    database_name: String,
    #[arg(long, default_value = "./crates/admin/config.toml")]
    config: PathBuf,
}

#[derive(Debug, Subcommand)]
enum Subcommands {
    /// Drop the database and recreate every index
    #[clap(name = "init-db")]
    InitDatabase,
    #[clap(name = "create-indexes")]
    CreateIndexes,
    /// Compress photos into <out-dir>/<stem>.jpg
    #[clap(name = "compress-photos")]
    CompressPhotos {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[arg(short, long)]
        out_dir: PathBuf,
        #[arg(short, long, default_value = "default")]
        profile: String,
    },
    /// Compress photos and upload them straight to ImageKit, printing photo refs
    #[clap(name = "upload-photos")]
    UploadPhotos {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[arg(long, env = "API_URL", default_value = "http://127.0.0.1:8081")]
        api_url: String,
        #[arg(long, env = "ACCESS_TOKEN", hide_env_values = true)]
        access_token: String,
        #[arg(long)]
        folder: Option<String>,
        #[arg(short, long, default_value = "default")]
        profile: String,
    },
}

// Compression profiles nested under an environment
// local -> default -> CompressionOptions
// production -> thumbnail -> CompressionOptions
#[derive(Debug, Deserialize)]
struct Config {
    compression: HashMap<String, HashMap<String, CompressionOptions>>,
}

impl Config {
    fn profile(&self, environment: &str, name: &str) -> Result<CompressionOptions, String> {
        let profiles = self
            .compression
            .get(environment)
            .ok_or_else(|| format!("No compression profiles for the {} environment", environment))?;

        let options = profiles
            .get(name)
            .cloned()
            .ok_or_else(|| format!("No compression profile named {}", name))?;

        options.validate().map_err(|e| e.to_string())?;
        Ok(options)
    }
}

fn parse_config(contents: &str) -> Result<Config, String> {
    toml::from_str(contents).map_err(|e| format!("Failed to parse config: {}", e))
}

fn load_config(path: &Path) -> Result<Config, String> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    parse_config(&contents)
}

fn output_name(input: &Path) -> String {
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "photo".to_string());
    format!("{}.jpg", stem)
}

fn read_photos(files: &[PathBuf]) -> Result<Vec<Vec<u8>>, String> {
    files
        .iter()
        .map(|file| {
            std::fs::read(file).map_err(|e| format!("Failed to read {}: {}", file.display(), e))
        })
        .collect()
}

async fn connect(args: &Args) -> Result<Client, String> {
    Client::with_uri_str(&args.database_uri)
        .await
        .map_err(|e| format!("Failed to connect to database: {}", e))
}

async fn fetch_upload_auth(
    http: &reqwest::Client,
    api_url: &str,
    access_token: &str,
) -> Result<UploadAuthorization, String> {
    let url = format!("{}/api/imagekit/auth", api_url.trim_end_matches('/'));
    debug!("Requesting upload authorization from {}", url);

    let response = http
        .get(&url)
        .bearer_auth(access_token)
        .send()
        .await
        .map_err(|e| format!("Upload auth request failed: {}", e))?;

    if !response.status().is_success() {
        return Err(format!("Upload auth rejected with status {}", response.status()));
    }

    response
        .json()
        .await
        .map_err(|e| format!("Unexpected upload auth response: {}", e))
}

// Uploads every photo that compressed, carrying on past failures so the refs of
// photos already on the CDN are never lost. Returns the refs and the failure count.
async fn upload_each<F, Fut>(
    files: &[PathBuf],
    results: Vec<Result<CompressedImage, MediaError>>,
    mut upload: F,
) -> (Vec<PhotoRef>, usize)
where
    F: FnMut(PathBuf, CompressedImage) -> Fut,
    Fut: Future<Output = Result<PhotoRef, String>>,
{
    let mut photos = Vec::new();
    let mut failures = 0;

    for (file, result) in files.iter().zip(results) {
        let image = match result {
            Ok(image) => image,
            Err(e) => {
                failures += 1;
                warn!("{} failed to compress: {}", file.display(), e);
                continue;
            }
        };

        match upload(file.clone(), image).await {
            Ok(photo) => {
                info!("{} -> {}", file.display(), photo.url);
                photos.push(photo);
            }
            Err(e) => {
                failures += 1;
                warn!("{}", e);
            }
        }
    }

    (photos, failures)
}

#[tokio::main]
async fn main() -> Result<(), String> {
    // Load environment variables from .env file
    dotenv().ok();

    // Parse CLI args, using ENV vars if not provided
    let args = Args::parse();

    let env_layer = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| e.to_string())?;
    tracing_subscriber::fmt()
        .with_env_filter(env_layer)
        .with_target(true)
        .init();

    match &args.subcommand {
        Subcommands::InitDatabase => {
            let db_client = connect(&args).await?;

            info!("Dropping database {}", args.database_name);
            db_client
                .database(&args.database_name)
                .drop(None)
                .await
                .map_err(|e| format!("Failed to drop database: {}", e))?;

            create_indexes(&db_client, &args.database_name)
                .await
                .map_err(|e| e.to_string())?;

            info!("Database initialized for {} environment.", args.environment);
        }
        Subcommands::CreateIndexes => {
            let db_client = connect(&args).await?;
            create_indexes(&db_client, &args.database_name)
                .await
                .map_err(|e| e.to_string())?;

            info!("Finished creating indexes.");
        }
        Subcommands::CompressPhotos {
            files,
            out_dir,
            profile,
        } => {
            let options = load_config(&args.config)?.profile(&args.environment, profile)?;
            info!("Compressing {} photos with the {} profile", files.len(), profile);

            std::fs::create_dir_all(out_dir)
                .map_err(|e| format!("Failed to create {}: {}", out_dir.display(), e))?;

            let results = compress_batch(read_photos(files)?, options).await;
            let mut failures = 0;
            for (file, result) in files.iter().zip(results) {
                match result {
                    Ok(image) => {
                        let target = out_dir.join(output_name(file));
                        std::fs::write(&target, &image.bytes)
                            .map_err(|e| format!("Failed to write {}: {}", target.display(), e))?;
                        info!(
                            "{} -> {} ({} bytes, {}x{}, quality {}, {} attempts)",
                            file.display(),
                            target.display(),
                            image.bytes.len(),
                            image.width,
                            image.height,
                            image.quality,
                            image.attempts
                        );
                        if !image.within_budget {
                            warn!("{} is still over the byte budget", file.display());
                        }
                    }
                    Err(e) => {
                        failures += 1;
                        warn!("{} failed: {}", file.display(), e);
                    }
                }
            }

            if failures > 0 {
                return Err(format!("{} of {} photos failed", failures, files.len()));
            }
        }
        Subcommands::UploadPhotos {
            files,
            api_url,
            access_token,
            folder,
            profile,
        } => {
            let options = load_config(&args.config)?.profile(&args.environment, profile)?;
            let results = compress_batch(read_photos(files)?, options).await;

            let http = reqwest::Client::new();
            let imagekit = ImageKitClient::default();

            let (http, imagekit, folder) = (&http, &imagekit, folder.as_deref());
            let (photos, failures) =
                upload_each(files, results, move |file: PathBuf, image: CompressedImage| async move {
                    // Upload tokens are single use, so each file gets its own authorization
                    let auth = fetch_upload_auth(http, api_url, access_token)
                        .await
                        .map_err(|e| format!("Failed to authorize {}: {}", file.display(), e))?;
                    let uploaded = imagekit
                        .upload(&output_name(&file), image.bytes, folder, &auth)
                        .await
                        .map_err(|e| format!("Failed to upload {}: {}", file.display(), e))?;

                    Ok::<_, String>(PhotoRef {
                        url: uploaded.url,
                        file_id: Some(uploaded.file_id),
                        thumbnail_url: uploaded.thumbnail_url,
                    })
                })
                .await;

            let output = serde_json::to_string_pretty(&photos).map_err(|e| e.to_string())?;
            println!("{}", output);

            if failures > 0 {
                return Err(format!("{} of {} photos failed", failures, files.len()));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const CONFIG: &str = r#"
[compression.local.default]
max_bytes = 1048576
max_dimension = 1920

[compression.local.thumbnail]
max_bytes = 65536
max_dimension = 320
initial_quality = 70

[compression.production.default]
max_bytes = 524288
"#;

    #[test]
    fn test_profiles_fill_missing_fields_with_defaults() {
        let config = parse_config(CONFIG).unwrap();
        let thumbnail = config.profile("local", "thumbnail").unwrap();

        assert_eq!(thumbnail.max_bytes, 65536);
        assert_eq!(thumbnail.max_dimension, 320);
        assert_eq!(thumbnail.initial_quality, 70);
        assert_eq!(thumbnail.min_quality, CompressionOptions::default().min_quality);
    }

    #[test]
    fn test_profiles_are_per_environment() {
        let config = parse_config(CONFIG).unwrap();

        assert_eq!(config.profile("production", "default").unwrap().max_bytes, 524288);
        assert!(config.profile("production", "thumbnail").is_err());
        assert!(config.profile("staging", "default").is_err());
    }

    #[test]
    fn test_invalid_profile_is_rejected() {
        let config = parse_config("[compression.local.default]\nscale_factor = 1.5\n").unwrap();
        assert!(config.profile("local", "default").is_err());
    }

    #[test]
    fn test_bundled_config_parses() {
        let config = parse_config(include_str!("../config.toml")).unwrap();
        assert!(config.profile("local", "default").is_ok());
    }

    #[test]
    fn test_output_name_replaces_extension() {
        assert_eq!(output_name(Path::new("/tmp/slab-pour.HEIC")), "slab-pour.jpg");
        assert_eq!(output_name(Path::new("framing.png")), "framing.jpg");
        assert_eq!(output_name(Path::new("roof")), "roof.jpg");
    }

    fn compressed(bytes: &[u8]) -> CompressedImage {
        CompressedImage {
            bytes: bytes.to_vec(),
            width: 1,
            height: 1,
            quality: 80,
            attempts: 1,
            within_budget: true,
        }
    }

    #[tokio::test]
    async fn test_upload_carries_on_past_failures() {
        let files = vec![
            PathBuf::from("slab.jpg"),
            PathBuf::from("framing.jpg"),
            PathBuf::from("corrupt.jpg"),
            PathBuf::from("roof.jpg"),
        ];
        let results = vec![
            Ok(compressed(b"slab")),
            Ok(compressed(b"framing")),
            Err(MediaError::Worker("decode failed".to_string())),
            Ok(compressed(b"roof")),
        ];

        let mut attempted = Vec::new();
        let (photos, failures) = upload_each(&files, results, |file: PathBuf, image: CompressedImage| {
            attempted.push(output_name(&file));
            async move {
                if image.bytes == b"framing" {
                    return Err(format!("Failed to upload {}", file.display()));
                }
                Ok(PhotoRef {
                    url: format!("https://ik.imagekit.io/demo/{}", output_name(&file)),
                    file_id: Some(format!("file_{}", image.bytes.len())),
                    thumbnail_url: None,
                })
            }
        })
        .await;

        assert_eq!(failures, 2);
        assert_eq!(attempted, vec!["slab.jpg", "framing.jpg", "roof.jpg"]);
        let urls: Vec<&str> = photos.iter().map(|photo| photo.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://ik.imagekit.io/demo/slab.jpg",
                "https://ik.imagekit.io/demo/roof.jpg"
            ]
        );
        assert_eq!(photos[1].file_id.as_deref(), Some("file_4"));
    }
}
