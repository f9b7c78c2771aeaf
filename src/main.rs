//! modgraph command-line interface

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use modgraph::registry::{ManifestRepository, ManifestStore};
use modgraph::schema::RootConfig;
use modgraph::{Bootstrap, Composer, ModuleName, RegistrationPolicy, ValidationSummary};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Command-line arguments
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Manifest repository URL
    #[arg(short, long, env = "MODGRAPH_REPO", default_value = "")]
    repository: String,

    /// Git branch
    #[arg(short, long, default_value = "main")]
    branch: String,

    /// Working directory holding modgraph.yaml and the manifests
    #[arg(short, long, default_value = "./config")]
    work_dir: PathBuf,

    /// Re-registration policy, overriding modgraph.yaml
    #[arg(short, long, value_enum)]
    policy: Option<RegistrationPolicy>,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Subcommands
#[derive(Subcommand)]
enum Commands {
    /// Clone the manifest repository into the work directory
    Init,

    /// Pull the latest manifests
    Update,

    /// List declared modules
    List,

    /// Check that every declared module resolves
    Validate,

    /// Print the initialization order of a module
    Plan {
        /// Module name
        name: String,
    },

    /// Resolve modules (defaults to the roots in modgraph.yaml)
    Resolve {
        /// Module names
        names: Vec<String>,
    },

    /// Register a new module manifest
    Register {
        /// Module name
        #[arg(short, long)]
        name: String,

        /// Path to the manifest file
        #[arg(short, long)]
        config: PathBuf,
    },
}

/// Everything a command needs from the work directory
struct Workspace {
    config: RootConfig,
    store: ManifestStore,
}

impl Workspace {
    fn open(cli: &Cli) -> modgraph::Result<Self> {
        let mut config = RootConfig::load(&cli.work_dir)?;
        if let Some(policy) = cli.policy {
            config.global.policy = policy;
        }
        let store = ManifestStore::new(cli.work_dir.join(&config.global.manifest_dir))?;
        Ok(Self { config, store })
    }

    fn composer(&self) -> modgraph::Result<Composer> {
        let mut composer = Composer::new(self.config.global.policy);
        composer.registry_mut().register_manifests(&self.store)?;
        Ok(composer)
    }
}

fn repository(cli: &Cli) -> ManifestRepository {
    ManifestRepository::new(cli.repository.clone(), cli.branch.clone(), cli.work_dir.clone())
}

fn parse_name(name: &str) -> modgraph::Result<ModuleName> {
    Ok(ModuleName::new(name)?)
}

/// Display validation summary
fn display_validation_summary(summary: &ValidationSummary) {
    println!("Validation Summary:");
    println!("------------------");
    println!("Total modules: {}", summary.total_count());
    println!("Resolvable: {}", summary.successful_count());
    println!("Failed: {}", summary.failed_count());
    println!("Warnings: {}", summary.warning_count());
    println!("Timestamp: {}", summary.timestamp.format("%Y-%m-%d %H:%M:%S UTC"));

    if !summary.successful.is_empty() {
        println!("\nResolvable modules:");
        for module in &summary.successful {
            println!("  ✅ {}", module);
        }
    }

    if !summary.warnings.is_empty() {
        println!("\nWarnings:");
        for (module, warnings) in &summary.warnings {
            for warning in warnings {
                println!("  ⚠️  {}: {}", module, warning);
            }
        }
    }

    if !summary.failed.is_empty() {
        println!("\nFailed modules:");
        for (module, error) in &summary.failed {
            println!("  ❌ {}: {}", module, error);
        }
    }
}

/// Roots named on the command line replace the configured ones
fn resolve_bootstrap(config: &RootConfig, names: &[String]) -> modgraph::Result<Bootstrap> {
    if names.is_empty() {
        return Ok(Bootstrap::from_config(config));
    }
    let mut bootstrap = Bootstrap::new(config.global.policy);
    for name in names {
        bootstrap = bootstrap.root(parse_name(name)?);
    }
    Ok(bootstrap)
}

fn register_manifest(cli: &Cli, name: &str, config: &Path) -> modgraph::Result<()> {
    let workspace = Workspace::open(cli)?;

    let source = std::fs::read_to_string(config).map_err(|e| {
        error!("Failed to read manifest file: {}", e);
        modgraph::ModGraphError::Io(e)
    })?;
    let manifest = workspace.store.parse_manifest(&source, &config.display().to_string())?;
    if manifest.name != name {
        return Err(modgraph::ModGraphError::Manifest(format!(
            "Manifest declares module '{}', expected '{}'",
            manifest.name, name
        )));
    }

    // Registering against the existing manifests applies the policy
    let mut composer = workspace.composer()?;
    composer.register(manifest.clone().into_declaration())?;

    let path = workspace.store.save_manifest(&manifest)?;
    let mut repo = repository(cli);
    if repo.open()? {
        if let Ok(relative) = path.strip_prefix(&cli.work_dir) {
            repo.commit_file(relative, &format!("Register module {}", name))?;
        }
    }
    Ok(())
}

fn run(cli: &Cli) -> modgraph::Result<bool> {
    match &cli.command {
        Some(Commands::Init) => {
            info!("Initializing manifest repository...");
            repository(cli).clone_repo()?;
            info!("Manifest repository initialized successfully");
        }
        Some(Commands::Update) => {
            info!("Updating manifests...");
            repository(cli).pull()?;
            let workspace = Workspace::open(cli)?;
            workspace.composer()?;
            info!("Manifests updated successfully");
        }
        Some(Commands::List) => {
            let workspace = Workspace::open(cli)?;
            let composer = workspace.composer()?;
            for decl in composer.registry().declarations() {
                let deps: Vec<&str> = decl.dependencies().iter().map(ModuleName::as_str).collect();
                println!("{} -> [{}]", decl.name(), deps.join(", "));
            }
        }
        Some(Commands::Validate) => {
            info!("Validating module graph...");
            let workspace = Workspace::open(cli)?;
            let summary = workspace.composer()?.validate_all();
            display_validation_summary(&summary);
            return Ok(summary.is_successful());
        }
        Some(Commands::Plan { name }) => {
            let workspace = Workspace::open(cli)?;
            let order = workspace.composer()?.plan(&parse_name(name)?)?;
            for (step, module) in order.iter().enumerate() {
                println!("{:>3}. {}", step + 1, module);
            }
        }
        Some(Commands::Resolve { names }) => {
            let workspace = Workspace::open(cli)?;
            let app = resolve_bootstrap(&workspace.config, names)?
                .manifests(&workspace.store)?
                .start()?;
            for root in app.roots() {
                if let Some(aggregate) = app.aggregate(root.as_str()) {
                    let members: Vec<&str> =
                        aggregate.order().iter().map(ModuleName::as_str).collect();
                    println!("{}: {}", root, members.join(", "));
                }
            }
        }
        Some(Commands::Register { name, config }) => {
            info!("Registering module {}...", name);
            register_manifest(cli, name, config)?;
            info!("Module {} registered successfully", name);
        }
        None => {
            info!("No command specified, use --help for available commands");
        }
    }

    Ok(true)
}

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match run(&cli) {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(err) => {
            error!("{}", err);
            process::exit(1);
        }
    }
}
