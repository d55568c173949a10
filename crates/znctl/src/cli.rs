//! Clap derive structures for the `znctl` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// znctl -- operator tools for Zero Networks segmentation
#[derive(Debug, Parser)]
#[command(
    name = "znctl",
    version,
    about = "Operate a Zero Networks tenant from the command line",
    long_about = "Operator tools for the Zero Networks segmentation platform.\n\n\
        Lists and filters assets, manages custom group membership in batches,\n\
        pins assets to deployment clusters behind validation checks, hunts\n\
        network activity for indicators, and runs break-glass commands.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Tenant profile to use
    #[arg(long, short = 'p', env = "ZN_PROFILE", global = true)]
    pub profile: Option<String>,

    /// API key (the tenant host is read from it unless --base-url is set)
    #[arg(long, env = "ZN_API_KEY", global = true, hide_env_values = true)]
    pub api_key: Option<String>,

    /// Portal host or URL (overrides profile and token)
    #[arg(long, env = "ZN_BASE_URL", global = true)]
    pub base_url: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "ZN_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "ZN_TIMEOUT", global = true)]
    pub timeout: Option<u64>,

    /// Also write logs to this file
    #[arg(long, env = "ZN_LOG_FILE", global = true)]
    pub log_file: Option<PathBuf>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Inspect the API token
    Token(TokenArgs),

    /// List and inspect assets
    #[command(alias = "a")]
    Assets(AssetsArgs),

    /// Manage custom groups and their members
    #[command(alias = "g")]
    Groups(GroupsArgs),

    /// Deployment clusters and asset pinning
    #[command(alias = "cl")]
    Clusters(ClustersArgs),

    /// Hunt network activity for indicators
    Hunt(HuntArgs),

    /// Run a command against many assets in parallel
    BreakGlass(BreakGlassArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Token ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct TokenArgs {
    #[command(subcommand)]
    pub command: TokenCommand,
}

#[derive(Debug, Subcommand)]
pub enum TokenCommand {
    /// Show the token's claims and the portal it routes to
    Decode {
        /// Token to decode (defaults to the configured API key)
        #[arg(long)]
        token: Option<String>,
    },
}

// ── Assets ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct AssetsArgs {
    #[command(subcommand)]
    pub command: AssetsCommand,
}

#[derive(Debug, Subcommand)]
pub enum AssetsCommand {
    /// List assets
    #[command(alias = "ls")]
    List(AssetListArgs),

    /// Show one asset
    Get {
        /// Asset id (a:...)
        id: String,
    },
}

#[derive(Debug, Args)]
pub struct AssetListArgs {
    /// Filter expression: JSON array of {id, includeValues, excludeValues}
    #[arg(long, short = 'f')]
    pub filter: Option<String>,

    /// Free-text search
    #[arg(long, short = 's')]
    pub search: Option<String>,

    /// Sort by name descending so servers come first
    #[arg(long)]
    pub servers_first: bool,

    /// Items per request (overrides profile)
    #[arg(long)]
    pub page_size: Option<usize>,
}

// ── Groups ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GroupsArgs {
    #[command(subcommand)]
    pub command: GroupsCommand,
}

#[derive(Debug, Subcommand)]
pub enum GroupsCommand {
    /// List custom groups
    #[command(alias = "ls")]
    List {
        /// Free-text search
        #[arg(long, short = 's')]
        search: Option<String>,
    },

    /// Show one custom group
    Get {
        /// Group id (g:c:...)
        id: String,
    },

    /// Create a custom group, or reuse the one with the same name
    Create {
        name: String,

        #[arg(long, short = 'd', default_value = "")]
        description: String,
    },

    /// List the members of a custom group
    Members {
        /// Group id (g:c:...)
        group: String,
    },

    /// Add members in batches
    AddMembers(MembersArgs),

    /// Remove members in batches
    RemoveMembers(MembersArgs),
}

#[derive(Debug, Args)]
#[command(group(ArgGroup::new("source").required(true).args(["ids", "csv"])))]
pub struct MembersArgs {
    /// Group id (g:c:...)
    pub group: String,

    /// Member ids
    pub ids: Vec<String>,

    /// CSV file with an AssetId column
    #[arg(long)]
    pub csv: Option<PathBuf>,

    /// Ids per request (overrides profile)
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Keep going after a batch fails
    #[arg(long)]
    pub continue_on_error: bool,
}

// ── Clusters ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ClustersArgs {
    #[command(subcommand)]
    pub command: ClustersCommand,
}

#[derive(Debug, Subcommand)]
pub enum ClustersCommand {
    /// List deployment clusters
    #[command(alias = "ls")]
    List,

    /// Pin assets to a deployment cluster
    Pin(PinArgs),

    /// Remove manual cluster assignments
    Unpin(UnpinArgs),

    /// Write an empty bulk input CSV
    Template {
        path: PathBuf,

        /// Template for unpin (AssetId only)
        #[arg(long)]
        unpin: bool,
    },
}

/// Options shared by pin and unpin.
#[derive(Debug, Args)]
pub struct PinFlags {
    /// Run every check without changing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Skip the validation checks
    #[arg(long)]
    pub skip_validation: bool,

    /// Stop at the first failing asset
    #[arg(long)]
    pub stop_on_error: bool,

    /// Monitoring method assets must have
    #[arg(long, default_value = "segment-server")]
    pub monitored_by: String,
}

#[derive(Debug, Args)]
#[command(group(ArgGroup::new("source").required(true).args(["asset", "csv"])))]
pub struct PinArgs {
    /// Asset id (a:...)
    pub asset: Option<String>,

    /// Deployment cluster id or name (default for CSV rows without one)
    #[arg(long, short = 'c')]
    pub cluster: Option<String>,

    /// CSV file with AssetId[,ClusterId] columns
    #[arg(long)]
    pub csv: Option<PathBuf>,

    #[command(flatten)]
    pub flags: PinFlags,
}

#[derive(Debug, Args)]
#[command(group(ArgGroup::new("source").required(true).args(["asset", "csv"])))]
pub struct UnpinArgs {
    /// Asset id (a:...)
    pub asset: Option<String>,

    /// CSV file with an AssetId column
    #[arg(long)]
    pub csv: Option<PathBuf>,

    #[command(flatten)]
    pub flags: PinFlags,
}

// ── Hunt ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct HuntArgs {
    #[command(subcommand)]
    pub command: HuntCommand,
}

#[derive(Debug, Subcommand)]
pub enum HuntCommand {
    /// Search network activity by domain, port, process or IP
    Activities(HuntActivitiesArgs),

    /// Hunt for every indicator set in a YAML file or directory
    Indicators(HuntIndicatorsArgs),
}

/// Public RMM catalog, used when `--catalog-repo` is given without a URL.
pub const DEFAULT_CATALOG_REPO: &str = "https://github.com/LivingInSyn/RMML.git";

/// Time window and paging for activity searches.
#[derive(Debug, Args)]
pub struct HuntWindow {
    /// Start time (ISO 8601, YYYY-MM-DD, or epoch ms)
    #[arg(long)]
    pub from: Option<String>,

    /// End time (ISO 8601, YYYY-MM-DD, or epoch ms)
    #[arg(long)]
    pub to: Option<String>,

    /// Free-text search
    #[arg(long)]
    pub search: Option<String>,

    /// Restrict to one entity's activity
    #[arg(long)]
    pub entity: Option<String>,

    /// Activities per request
    #[arg(long, default_value = "100")]
    pub limit: usize,

    #[arg(long, default_value = "desc")]
    pub order: HuntOrder,

    /// JSON file with extra filter value mappings
    #[arg(long)]
    pub filters_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum HuntOrder {
    Asc,
    Desc,
}

#[derive(Debug, Args)]
pub struct HuntActivitiesArgs {
    /// Destination domain (repeatable)
    #[arg(long = "domain")]
    pub domains: Vec<String>,

    /// Destination port (repeatable)
    #[arg(long = "port")]
    pub ports: Vec<String>,

    /// Source process path (repeatable)
    #[arg(long = "src-process")]
    pub src_processes: Vec<String>,

    /// Destination process path (repeatable)
    #[arg(long = "dst-process")]
    pub dst_processes: Vec<String>,

    /// Destination IP address (repeatable)
    #[arg(long = "ip")]
    pub ips: Vec<String>,

    #[command(flatten)]
    pub window: HuntWindow,

    /// Write results to a CSV file
    #[arg(long)]
    pub export: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct HuntIndicatorsArgs {
    /// YAML indicator sets: a file, a list file, or a directory
    #[arg(required_unless_present = "catalog_repo", conflicts_with = "catalog_repo")]
    pub file: Option<PathBuf>,

    /// Clone or update a catalog git repository and hunt its documents
    #[arg(
        long,
        num_args = 0..=1,
        default_missing_value = DEFAULT_CATALOG_REPO,
        value_name = "URL"
    )]
    pub catalog_repo: Option<String>,

    /// Directory the catalog checkout lives in
    #[arg(long, default_value = ".", requires = "catalog_repo")]
    pub catalog_dir: PathBuf,

    /// Branch to clone
    #[arg(long, requires = "catalog_repo")]
    pub catalog_branch: Option<String>,

    #[command(flatten)]
    pub window: HuntWindow,

    /// Concurrent indicator sets
    #[arg(long, default_value = "5")]
    pub workers: usize,

    /// CSV file for the results
    #[arg(long, default_value = "all_indicating_activities.csv")]
    pub export: PathBuf,
}

// ── Break glass ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
#[command(group(ArgGroup::new("targets").required(true).args(["assets", "csv", "group"])))]
pub struct BreakGlassArgs {
    /// Command to run per asset; {fqdn}, {name} and {id} are substituted
    #[arg(long)]
    pub command: String,

    /// Target asset id (repeatable)
    #[arg(long = "asset")]
    pub assets: Vec<String>,

    /// CSV file with an AssetId column
    #[arg(long)]
    pub csv: Option<PathBuf>,

    /// Every member of this custom group
    #[arg(long)]
    pub group: Option<String>,

    /// Commands running at once (overrides profile)
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Per-command time limit in seconds
    #[arg(long)]
    pub command_timeout: Option<u64>,

    /// Directory for the success and failure logs
    #[arg(long, default_value = ".")]
    pub log_dir: PathBuf,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Interactive setup wizard
    Init,

    /// Show the resolved configuration (secrets redacted)
    Show,

    /// Print the config file path
    Path,

    /// List configured profiles (* marks the default)
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name
        name: String,
    },
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
