//! Suraksha CLI: command-line client for the signed upload flow.
//!
//! Set SURAKSHA_API_URL and either SURAKSHA_ACCESS_TOKEN or run `suraksha login`
//! to store a token. Uses `Authorization: Bearer` auth.

use anyhow::Context;
use clap::{Parser, Subcommand};
use suraksha_api_client::{ApiClient, SignedUploader};
use suraksha_cli::{
    clear_stored_token, format_size, init_tracing, load_session, print_json, token_store,
};
use suraksha_core::models::UploadFile;
use suraksha_core::{
    ClientConfig, ErrorMetadata, Session, UploadError, UploadFolder, UploadState,
};

#[derive(Parser)]
#[command(name = "suraksha", about = "Suraksha upload CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a file: signed URL, direct storage upload, verify-and-publish
    Upload {
        /// Path to the file to upload
        file: std::path::PathBuf,
        /// Target folder (e.g. institute-images, advertisements, class-images)
        #[arg(long)]
        folder: UploadFolder,
        /// Override the content type guessed from the extension
        #[arg(long)]
        content_type: Option<String>,
    },
    /// Upload several files into one folder concurrently
    UploadMany {
        /// Paths of the files to upload
        #[arg(required = true)]
        files: Vec<std::path::PathBuf>,
        /// Target folder
        #[arg(long)]
        folder: UploadFolder,
    },
    /// Request a signed upload ticket without uploading
    Ticket {
        /// Path to the file the ticket is for
        file: std::path::PathBuf,
        /// Target folder
        #[arg(long)]
        folder: UploadFolder,
    },
    /// Verify and publish an object that is already in storage
    Verify {
        /// Relative path returned with the upload ticket
        relative_path: String,
    },
    /// Print the public URL for a relative path (does not call the API)
    Resolve {
        /// Relative path of a published object
        relative_path: String,
    },
    /// List the folders known to this client
    Folders,
    /// Store an access token for later invocations
    Login {
        /// Access token issued by the backend
        token: String,
    },
    /// Remove the stored access token
    Logout,
}

/// Report an upload failure the way the console does: one message, no detail.
fn exit_with(err: UploadError) -> ! {
    tracing::error!(
        error_code = err.error_code(),
        stage = ?err.stage(),
        error = %err,
        "Upload failed"
    );
    eprintln!("{}", err.client_message());
    std::process::exit(1);
}

/// Client and uploader for the current session.
fn build_uploader(config: &ClientConfig) -> anyhow::Result<SignedUploader> {
    let session = load_session(config)?;
    let client = ApiClient::from_config(config, &session).context("Failed to create API client")?;
    if !client.is_authenticated() {
        tracing::warn!(
            api_url = client.base_url(),
            "No access token; requests are sent unauthenticated"
        );
    }
    Ok(SignedUploader::from_config(client, config))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let config = ClientConfig::from_env()
        .context("Invalid client configuration. Check SURAKSHA_* environment variables")?;

    match cli.command {
        Commands::Upload {
            file,
            folder,
            content_type,
        } => {
            let uploader = build_uploader(&config)?;
            let mut upload = UploadFile::from_path(&file).await.unwrap_or_else(|e| exit_with(e));
            if let Some(content_type) = content_type {
                upload = upload.with_content_type(content_type);
            }
            tracing::info!(
                file = %upload.file_name,
                size = %format_size(upload.size()),
                folder = %folder,
                "Uploading"
            );
            let outcome = uploader
                .upload(folder, &upload)
                .await
                .unwrap_or_else(|e| exit_with(e));
            print_json(&outcome)?;
        }
        Commands::UploadMany { files, folder } => {
            let uploader = build_uploader(&config)?;
            let mut items = Vec::with_capacity(files.len());
            for path in &files {
                let upload = UploadFile::from_path(path).await.unwrap_or_else(|e| exit_with(e));
                items.push((folder.clone(), upload));
            }

            let results = uploader.upload_many(&items).await;
            let report: Vec<serde_json::Value> = files
                .iter()
                .zip(results)
                .map(|(path, result)| match result {
                    Ok(outcome) => serde_json::json!({
                        "file": path.display().to_string(),
                        "success": true,
                        "outcome": outcome,
                    }),
                    Err(e) => serde_json::json!({
                        "file": path.display().to_string(),
                        "success": false,
                        "message": e.client_message(),
                        "errorCode": e.error_code(),
                    }),
                })
                .collect();
            let failed = report.iter().any(|r| r["success"] == false);
            print_json(&report)?;
            if failed {
                std::process::exit(1);
            }
        }
        Commands::Ticket { file, folder } => {
            let uploader = build_uploader(&config)?;
            let upload = UploadFile::from_path(&file).await.unwrap_or_else(|e| exit_with(e));
            let request = upload.signed_url_request(folder);
            request
                .validate_with_limit(config.max_upload_bytes)
                .unwrap_or_else(|e| exit_with(e));
            let ticket = uploader
                .client()
                .request_signed_url(&request)
                .await
                .unwrap_or_else(|e| exit_with(e));
            print_json(&ticket)?;
        }
        Commands::Verify { relative_path } => {
            let uploader = build_uploader(&config)?;
            let state = UploadState::resume_verification(relative_path);
            let outcome = uploader
                .run(state, None)
                .await
                .and_then(|state| state.into_result())
                .unwrap_or_else(|e| exit_with(e));
            print_json(&outcome)?;
        }
        Commands::Resolve { relative_path } => {
            let url = config.public_url_resolver().resolve(&relative_path);
            print_json(&serde_json::json!({ "relativePath": relative_path, "publicUrl": url }))?;
        }
        Commands::Folders => {
            let folders: Vec<String> = UploadFolder::KNOWN
                .iter()
                .map(|f| f.as_str().to_string())
                .collect();
            print_json(&folders)?;
        }
        Commands::Login { token } => {
            let store = token_store(&config).context("No token file configured")?;
            let mut session = Session::anonymous();
            session.sign_in(token, None);
            session.persist(&store)?;
            print_json(&serde_json::json!({
                "success": true,
                "tokenFile": store.path().display().to_string()
            }))?;
        }
        Commands::Logout => {
            let cleared = clear_stored_token(&config)?;
            print_json(&serde_json::json!({
                "success": true,
                "tokenFile": cleared.map(|p| p.display().to_string())
            }))?;
        }
    }

    Ok(())
}
