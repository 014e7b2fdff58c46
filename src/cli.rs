use crate::identifier::CollisionPolicy;
use crate::toolchain::DEFAULT_TOOLS_DIR;
use anyhow::Result;
use clap::Parser;
use log::{debug, info, warn};
use std::path::PathBuf;

/// OpenAPI from traffic - Infer a multi-file OpenAPI document from recorded HTTP traffic
#[derive(Parser, Debug)]
#[command(name = "openapi-from-traffic")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Recorded traffic: a JSON array of records or JSON Lines
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Root directory of the document tree
    #[arg(
        short = 'o',
        long = "output",
        value_name = "DIR",
        env = "OAS_OUTPUT_DIR",
        default_value = ".build"
    )]
    pub output_dir: PathBuf,

    /// API title
    #[arg(long, env = "OAS_TITLE", default_value = "Inferred API")]
    pub title: String,

    /// API version
    #[arg(long = "api-version", env = "OAS_VERSION", default_value = "1.0.0")]
    pub api_version: String,

    /// API description
    #[arg(
        long,
        env = "OAS_DESCRIPTION",
        default_value = "API documentation inferred from recorded traffic"
    )]
    pub description: String,

    /// Server URL, repeatable
    #[arg(long = "server-url", value_name = "URL", env = "OAS_SERVER_URLS", value_delimiter = ',')]
    pub server_urls: Vec<String>,

    /// What to do when two operations derive the same identifier
    #[arg(long = "on-collision", value_enum, default_value = "reject")]
    pub on_collision: CollisionPolicy,

    /// Bundle, lint and render the document with the external toolchain
    #[arg(long)]
    pub bundle: bool,

    /// Directory holding swagger-cli, spectral and redoc-cli
    #[arg(
        long = "tools-dir",
        value_name = "DIR",
        env = "OAS_TOOLS_DIR",
        default_value = DEFAULT_TOOLS_DIR
    )]
    pub tools_dir: PathBuf,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

/// Validate and log already-parsed arguments
pub fn parse_args_from_parsed(args: CliArgs) -> Result<CliArgs> {
    debug!("Parsed arguments: {:?}", args);

    if !args.input.exists() {
        anyhow::bail!("Input file does not exist: {}", args.input.display());
    }

    if !args.input.is_file() {
        anyhow::bail!("Input path is not a file: {}", args.input.display());
    }

    if args.output_dir.exists() && !args.output_dir.is_dir() {
        anyhow::bail!(
            "Output path is not a directory: {}",
            args.output_dir.display()
        );
    }

    info!("Input: {}", args.input.display());
    info!("Output directory: {}", args.output_dir.display());
    info!("Collision policy: {:?}", args.on_collision);
    if args.bundle {
        info!("Toolchain: {}", args.tools_dir.display());
    }

    Ok(args)
}

/// Run the main workflow
pub fn run(args: CliArgs) -> Result<()> {
    use crate::assembler::Assembler;
    use crate::diagnostics::Diagnostics;
    use crate::openapi_builder::OpenApiBuilder;
    use crate::toolchain::Toolchain;
    use crate::traffic::{group_by_route, JsonFileSource, TrafficSource};

    let mut diagnostics = Diagnostics::new();

    // Step 1: Load recorded traffic
    info!("Loading traffic records...");
    let source = JsonFileSource::new(args.input.clone());
    let records = source.load(&mut diagnostics)?;
    info!("Loaded {} records", records.len());

    if records.is_empty() {
        warn!("No traffic records found in {}", source.path().display());
    }

    // Step 2: Decode samples and group them by route
    info!("Grouping samples by route...");
    let groups = group_by_route(records, &mut diagnostics);
    info!("Found {} route templates", groups.len());

    // Step 3: Load the existing document tree
    info!("Opening document tree...");
    let assembler = Assembler::open(args.output_dir.clone(), args.on_collision, &mut diagnostics)?;

    // Step 4: Write leaf fragments and per-route indexes
    info!("Writing fragments...");
    let mut builder = OpenApiBuilder::new(assembler)
        .with_info(args.title, args.api_version, args.description)
        .with_servers(args.server_urls);

    for group in &groups {
        debug!("Adding route group: {}", group.template);
        builder.add_route_group(group, &mut diagnostics)?;
    }

    // Step 5: Write the path index, schema index and root document
    let root_index = builder.assembler().layout().root_index();
    let summary = builder.build(&diagnostics)?;
    info!("Document tree written to {}", args.output_dir.display());

    // Step 6: Bundle, lint and render
    if args.bundle {
        info!("Running external toolchain...");
        let output = Toolchain::new(args.tools_dir).run_all(&root_index, &args.output_dir)?;
        info!("Bundle: {}", output.bundle.display());
    }

    // Step 7: Display summary
    for diagnostic in diagnostics.entries() {
        warn!("{}", diagnostic);
    }

    info!("Generation complete!");
    info!("Summary:");
    info!("  - Samples read: {}", summary.samples);
    info!("  - Distinct patterns: {}", summary.patterns);
    info!("  - Duplicates skipped: {}", summary.duplicates_skipped);
    info!("  - Routes: {}", summary.routes);
    info!("  - Operations: {}", summary.operations);
    info!("  - Schemas: {}", summary.schemas);
    info!("  - Diagnostics: {}", summary.diagnostics);

    Ok(())
}
