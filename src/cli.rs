use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "album-client")]
#[command(about = "Manage photo albums on a remote album server")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// API base URL (overrides the config file)
    #[arg(long, global = true, env = "ALBUMS_API_URL")]
    pub api_url: Option<String>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write the default config file and exit
    InitConfig,
    /// Sign in with e-mail and password
    Login(LoginArgs),
    /// Create an account and sign in
    Register(RegisterArgs),
    /// Forget the stored session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Print the URL that starts an OAuth sign-in
    OauthUrl {
        #[arg(default_value = "google")]
        provider: String,
    },
    /// Finish an OAuth sign-in from the redirect URL
    OauthCallback { url: String },
    /// Ask for a password reset e-mail
    ForgotPassword { email: String },
    /// Set a new password with a reset token
    ResetPassword {
        token: String,
        #[arg(long, env = "ALBUMS_NEW_PASSWORD")]
        password: String,
    },
    /// Album management
    #[command(subcommand)]
    Albums(AlbumCommands),
    /// Photo management
    #[command(subcommand)]
    Photos(PhotoCommands),
    /// Search photos across albums
    Search(SearchArgs),
    /// Profile management
    #[command(subcommand)]
    Profile(ProfileCommands),
}

#[derive(Args)]
pub struct LoginArgs {
    pub email: String,
    #[arg(long, env = "ALBUMS_PASSWORD")]
    pub password: String,
}

#[derive(Args)]
pub struct RegisterArgs {
    pub name: String,
    pub email: String,
    #[arg(long, env = "ALBUMS_PASSWORD")]
    pub password: String,
}

#[derive(Subcommand)]
pub enum AlbumCommands {
    List,
    Show { id: String },
    Create {
        title: String,
        #[arg(short, long)]
        description: Option<String>,
    },
    Update {
        id: String,
        #[arg(short, long)]
        title: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
    },
    /// Make an album public (or private again with --private)
    Share {
        id: String,
        #[arg(long)]
        private: bool,
    },
    Delete { id: String },
    /// Open a public album by its share token
    Shared { token: String },
}

#[derive(Args)]
pub struct PageArgs {
    #[arg(long, default_value_t = 1)]
    pub page: u32,
    #[arg(long)]
    pub limit: Option<u32>,
    /// asc or desc
    #[arg(long)]
    pub order: Option<String>,
}

#[derive(Subcommand)]
pub enum PhotoCommands {
    List {
        album_id: String,
        #[command(flatten)]
        page: PageArgs,
    },
    Show { album_id: String, photo_id: String },
    /// Upload files one at a time, respecting the server's rate limit
    Upload {
        album_id: String,
        /// Files or glob patterns
        #[arg(required = true)]
        files: Vec<String>,
        /// Title, used only when uploading a single file
        #[arg(short, long)]
        title: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        /// Acquisition date (YYYY-MM-DD or RFC 3339)
        #[arg(long)]
        date: Option<String>,
    },
    Update {
        album_id: String,
        photo_id: String,
        #[arg(short, long)]
        title: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(long)]
        date: Option<String>,
    },
    Delete { album_id: String, photo_id: String },
    DeleteBatch {
        album_id: String,
        #[arg(required = true)]
        photo_ids: Vec<String>,
    },
}

#[derive(Args)]
pub struct SearchArgs {
    pub query: String,
    #[command(flatten)]
    pub page: PageArgs,
}

#[derive(Subcommand)]
pub enum ProfileCommands {
    Update {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
    },
    Password {
        #[arg(long, env = "ALBUMS_PASSWORD")]
        current: String,
        #[arg(long, env = "ALBUMS_NEW_PASSWORD")]
        new: String,
    },
    /// Delete the account and sign out
    Delete {
        #[arg(long)]
        yes: bool,
    },
}
