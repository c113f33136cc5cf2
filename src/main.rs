use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

// Use library instead of local modules
use member_linkage::{logging, read_email_mapping, LinkageConfig, LinkageError, Pipeline};

#[derive(Debug, Parser)]
#[command(name = "member-linkage")]
#[command(about = "Link membership records to usage-tracking accounts and rank by visits")]
struct Cli {
    /// Debug-level logging for the linkage engine
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the full linkage (default)
    Run(RunArgs),

    /// Print the linked-email → member-email mapping from an exported CSV
    Mapping {
        /// Previously exported profiles CSV
        path: PathBuf,
    },
}

#[derive(Debug, Default, Args)]
struct RunArgs {
    /// JSON config file; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    members: Option<PathBuf>,

    #[arg(long)]
    accounts: Option<PathBuf>,

    #[arg(long)]
    bookings: Option<PathBuf>,

    /// Output CSV path
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Also write profiles and links to this SQLite database
    #[arg(long)]
    sqlite: Option<PathBuf>,

    /// Write the JSON run report here
    #[arg(long)]
    report: Option<PathBuf>,

    /// Add an email:provenance column to the CSV
    #[arg(long)]
    provenance: bool,

    /// Link members on all cores
    #[arg(long)]
    parallel: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_tracing(cli.verbose);

    match cli.command.unwrap_or(Commands::Run(RunArgs::default())) {
        Commands::Run(args) => run_linkage(args),
        Commands::Mapping { path } => print_mapping(path),
    }
}

fn build_config(args: RunArgs) -> Result<LinkageConfig> {
    let mut config = match &args.config {
        Some(path) => LinkageConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => LinkageConfig::default(),
    };

    if let Some(p) = args.members {
        config.sources.members = p;
    }
    if let Some(p) = args.accounts {
        config.sources.accounts = p;
    }
    if let Some(p) = args.bookings {
        config.sources.bookings = p;
    }
    if let Some(p) = args.output {
        config.output.csv_path = p;
    }
    if args.sqlite.is_some() {
        config.output.sqlite_path = args.sqlite;
    }
    if args.report.is_some() {
        config.output.report_path = args.report;
    }
    config.output.include_provenance |= args.provenance;
    config.parallel |= args.parallel;

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn run_linkage(args: RunArgs) -> Result<()> {
    println!("🔗 Member Linkage - membership × usage tracking × bookings");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let config = build_config(args)?;
    let pipeline = Pipeline::new(config);

    // 1. Load sources
    println!("\n📂 Loading files...");
    let tables = match pipeline.load() {
        Ok(tables) => tables,
        Err(err @ LinkageError::SourceUnavailable { .. }) => {
            eprintln!("❌ {}", err);
            eprintln!("   Make sure every export is present and named as configured.");
            std::process::exit(1);
        }
        Err(err) => return Err(err).context("Failed to load source tables"),
    };
    println!(
        "✓ {} members, {} accounts, {} bookings",
        tables.members.len(),
        tables.accounts.len(),
        tables.bookings.len()
    );

    // 2. Link + reconcile + rank
    println!("\n🔍 Linking profiles...");
    let mut run = pipeline.run(tables);
    println!("✓ {}", run.summary.summary());

    // 3. Export
    println!("\n💾 Writing output...");
    pipeline
        .export(&mut run)
        .context("Failed to write output")?;
    println!("✓ Saved to: {}", pipeline.config().output.csv_path.display());
    if let Some(digest) = &run.summary.output_digest {
        println!("✓ Digest: {}", digest);
    }

    // 4. Data quality
    let quality = &run.summary.quality;
    println!("\n✅ Data quality: {}", quality.summary());
    for issue in &quality.issues {
        println!("   [{:?}] {}", issue.severity, issue.issue);
    }

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("🎉 Total members processed: {}", run.profiles.len());

    Ok(())
}

fn print_mapping(path: PathBuf) -> Result<()> {
    let mapping = read_email_mapping(&path)
        .with_context(|| format!("Failed to read mapping from {}", path.display()))?;

    let mut pairs: Vec<(&String, &String)> = mapping.iter().collect();
    pairs.sort();
    for (linked, member) in pairs {
        println!("{} → {}", linked, member);
    }
    eprintln!("✓ {} email mappings", mapping.len());

    Ok(())
}
