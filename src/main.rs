mod cli;

use album_client::client::QueryClient;
use album_client::config::{load_config, save_default_config, Config};
use album_client::constants::{CONFIG_PATH, SESSION_PATH};
use album_client::error::{ClientError, ClientResult};
use album_client::gateway::HttpGateway;
use album_client::logging::{init_logging, install_panic_hook, log_error};
use album_client::models::{
    ChangePasswordRequest, CreateAlbumRequest, ForgotPasswordRequest, LoginRequest, PageRequest,
    RegisterRequest, ResetPasswordRequest, SortOrder, UpdateAlbumRequest, UpdatePhotoRequest,
    UpdateProfileRequest,
};
use album_client::session::{FileStorage, SessionStore};
use album_client::upload::{FileOutcome, UploadFile, UploadMetadata, UploadOrchestrator};
use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use cli::{AlbumCommands, Cli, Commands, PageArgs, PhotoCommands, ProfileCommands};

type Client = QueryClient<HttpGateway>;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Commands::InitConfig = cli.command {
        match save_default_config(&CONFIG_PATH) {
            Ok(()) => println!("Wrote {}", CONFIG_PATH.display()),
            Err(e) => {
                eprintln!("Error: failed to write {}: {}", CONFIG_PATH.display(), e);
                std::process::exit(1);
            }
        }
        return;
    }

    init_logging(cli.verbose);
    install_panic_hook();

    let mut config = load_config(&CONFIG_PATH);
    if let Some(api_url) = &cli.api_url {
        config.api.base_url = api_url.clone();
    }

    let session = Arc::new(SessionStore::init(FileStorage::new(&*SESSION_PATH)));
    match session.hydrate() {
        Ok(status) => debug!("Session: {}", status),
        Err(e) => log_error("Failed to restore session", &e),
    }

    let code = match HttpGateway::new(&config.api, session.clone()) {
        Ok(gateway) => {
            let client = QueryClient::new(Arc::new(gateway), session.clone());
            match run(cli.command, &client, &config).await {
                Ok(code) => code,
                Err(e) => {
                    eprintln!("Error: {}", e.user_message());
                    1
                }
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    };

    if let Err(e) = session.teardown() {
        log_error("Failed to save session", &e);
    }
    std::process::exit(code);
}

/// Runs one command and returns the process exit code.
async fn run(command: Commands, client: &Client, config: &Config) -> ClientResult<i32> {
    match command {
        Commands::InitConfig => {}
        Commands::Login(args) => {
            let user = client
                .login(LoginRequest {
                    email: args.email,
                    password: args.password,
                })
                .await?;
            println!("Signed in as {} <{}>", user.name, user.email);
        }
        Commands::Register(args) => {
            let user = client
                .register(RegisterRequest {
                    name: args.name,
                    email: args.email,
                    password: args.password,
                })
                .await?;
            println!("Registered and signed in as {} <{}>", user.name, user.email);
        }
        Commands::Logout => {
            client.logout();
            println!("Signed out");
        }
        Commands::Whoami => {
            if !client.session().is_authenticated() {
                println!("Not signed in");
                return Ok(1);
            }
            print_json(&client.me().await?)?;
        }
        Commands::OauthUrl { provider } => {
            println!("{}", client.gateway().oauth_url(&provider)?);
        }
        Commands::OauthCallback { url } => {
            let user = client.complete_oauth(&url)?;
            println!("Signed in as {} <{}>", user.name, user.email);
        }
        Commands::ForgotPassword { email } => {
            let response = client
                .forgot_password(ForgotPasswordRequest { email })
                .await?;
            println!("{}", response.message);
        }
        Commands::ResetPassword { token, password } => {
            let response = client
                .reset_password(ResetPasswordRequest { token, password })
                .await?;
            println!("{}", response.message);
        }
        Commands::Albums(command) => run_albums(command, client).await?,
        Commands::Photos(command) => return run_photos(command, client, config).await,
        Commands::Search(args) => {
            let page = page_request(&args.page, config)?;
            print_json(&client.search_photos(&args.query, page).await?)?;
        }
        Commands::Profile(command) => run_profile(command, client).await?,
    }
    Ok(0)
}

async fn run_albums(command: AlbumCommands, client: &Client) -> ClientResult<()> {
    match command {
        AlbumCommands::List => print_json(&client.albums().await?)?,
        AlbumCommands::Show { id } => print_json(&client.album(&id).await?)?,
        AlbumCommands::Create { title, description } => {
            let album = client
                .create_album(CreateAlbumRequest { title, description })
                .await?;
            print_json(&album)?;
        }
        AlbumCommands::Update {
            id,
            title,
            description,
        } => {
            let album = client
                .update_album(&id, UpdateAlbumRequest { title, description })
                .await?;
            print_json(&album)?;
        }
        AlbumCommands::Share { id, private } => {
            let album = client.share_album(&id, !private).await?;
            match (album.is_public, &album.share_token) {
                (true, Some(token)) => println!("Album is public, share token: {}", token),
                (true, None) => println!("Album is public"),
                (false, _) => println!("Album is private"),
            }
        }
        AlbumCommands::Delete { id } => {
            client.delete_album(&id).await?;
            println!("Deleted album {}", id);
        }
        AlbumCommands::Shared { token } => print_json(&client.shared_album(&token).await?)?,
    }
    Ok(())
}

async fn run_photos(command: PhotoCommands, client: &Client, config: &Config) -> ClientResult<i32> {
    match command {
        PhotoCommands::List { album_id, page } => {
            let page = page_request(&page, config)?;
            print_json(&client.photos(&album_id, page).await?)?;
        }
        PhotoCommands::Show { album_id, photo_id } => {
            print_json(&client.photo(&album_id, &photo_id).await?)?;
        }
        PhotoCommands::Upload {
            album_id,
            files,
            title,
            description,
            date,
        } => {
            let metadata = UploadMetadata {
                title: title.unwrap_or_default(),
                description,
                acquisition_date: date,
            };
            return upload(client, config, &album_id, &files, &metadata).await;
        }
        PhotoCommands::Update {
            album_id,
            photo_id,
            title,
            description,
            date,
        } => {
            let request = UpdatePhotoRequest {
                title,
                description,
                acquisition_date: date,
            };
            print_json(&client.update_photo(&album_id, &photo_id, request).await?)?;
        }
        PhotoCommands::Delete { album_id, photo_id } => {
            client.delete_photo(&album_id, &photo_id).await?;
            println!("Deleted photo {}", photo_id);
        }
        PhotoCommands::DeleteBatch {
            album_id,
            photo_ids,
        } => {
            let count = photo_ids.len();
            client.delete_photos(&album_id, photo_ids).await?;
            println!("Deleted {} photo(s)", count);
        }
    }
    Ok(0)
}

async fn run_profile(command: ProfileCommands, client: &Client) -> ClientResult<()> {
    match command {
        ProfileCommands::Update { name, email } => {
            let user = client
                .update_profile(UpdateProfileRequest { name, email })
                .await?;
            print_json(&user)?;
        }
        ProfileCommands::Password { current, new } => {
            client
                .change_password(ChangePasswordRequest {
                    current_password: current,
                    new_password: new,
                })
                .await?;
            println!("Password changed");
        }
        ProfileCommands::Delete { yes } => {
            if !yes {
                return Err(ClientError::Validation(
                    "Pass --yes to delete the account".to_string(),
                ));
            }
            client.delete_account().await?;
            println!("Account deleted");
        }
    }
    Ok(())
}

async fn upload(
    client: &Client,
    config: &Config,
    album_id: &str,
    patterns: &[String],
    metadata: &UploadMetadata,
) -> ClientResult<i32> {
    let mut files = Vec::new();
    for path in expand_patterns(patterns)? {
        files.push(UploadFile::from_path(&path).await?);
    }
    info!("Uploading {} file(s) to album {}", files.len(), album_id);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Interrupted, stopping after the current request");
            on_interrupt.cancel();
        }
    });

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let progress = tokio::spawn(async move {
        while let Some(state) = rx.recv().await {
            eprintln!("[upload] {}", state);
        }
    });

    let mut orchestrator = UploadOrchestrator::new(client, config.upload.policy())
        .with_observer(tx)
        .with_cancellation(cancel);
    let report = orchestrator.run(album_id, files, metadata).await?;
    drop(orchestrator);
    let _ = progress.await;

    for (index, outcome) in report.outcomes().iter().enumerate() {
        match outcome {
            FileOutcome::Created(photo) => println!("#{} created {} ({})", index + 1, photo.title, photo.id),
            FileOutcome::Failed(message) => println!("#{} failed: {}", index + 1, message),
            FileOutcome::Skipped => println!("#{} skipped", index + 1),
        }
    }
    println!("Upload {}", report.state());

    Ok(if report.is_success() { 0 } else { 1 })
}

/// Expands glob patterns; plain paths are passed through untouched.
fn expand_patterns(patterns: &[String]) -> ClientResult<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for pattern in patterns {
        if !pattern.contains(['*', '?', '[']) {
            paths.push(PathBuf::from(pattern));
            continue;
        }

        let entries = glob::glob(pattern)
            .map_err(|e| ClientError::Validation(format!("Bad pattern {}: {}", pattern, e)))?;
        let before = paths.len();
        for entry in entries {
            match entry {
                Ok(path) if path.is_file() => paths.push(path),
                Ok(_) => {}
                Err(e) => debug!("Skipping unreadable path: {}", e),
            }
        }
        if paths.len() == before {
            return Err(ClientError::Validation(format!(
                "No files match {}",
                pattern
            )));
        }
    }
    Ok(paths)
}

fn page_request(args: &PageArgs, config: &Config) -> ClientResult<PageRequest> {
    let order = match &args.order {
        Some(order) => order.parse::<SortOrder>()?,
        None => config.pagination.order,
    };
    let limit = args.limit.unwrap_or(config.pagination.limit);
    Ok(PageRequest::new(order, args.page, limit))
}

fn print_json<T: Serialize>(value: &T) -> ClientResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
