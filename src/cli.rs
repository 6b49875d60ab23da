use crate::context::PathSelectors;
use crate::documentation::{ApiInfo, DocumentationConfig, DocumentationScanner, DEFAULT_GROUP_NAME};
use crate::extractor::controller::ControllerExtractor;
use crate::extractor::HandlerExtractor;
use crate::naming::GenericNaming;
use crate::openapi_builder::OpenApiBuilder;
use crate::schema_generator::SchemaGenerator;
use crate::serializer::{serialize_json, serialize_yaml, write_to_file};
use crate::source::SourceSet;
use anyhow::Result;
use clap::{Parser, ValueEnum};
use log::{debug, info, warn};
use std::path::PathBuf;
use std::sync::Arc;

/// Generate OpenAPI documentation from the routed handler methods of a Rust project
#[derive(Parser, Debug)]
#[command(name = "openapi-from-handlers")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to the Rust project directory
    #[arg(value_name = "PROJECT_PATH")]
    pub project_path: PathBuf,

    /// Output format (yaml or json)
    #[arg(short = 'f', long = "format", value_enum, default_value = "yaml")]
    pub output_format: OutputFormat,

    /// Output file path (if not specified, outputs to stdout)
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output_path: Option<PathBuf>,

    /// Documentation group name
    #[arg(short = 'g', long = "group", default_value = DEFAULT_GROUP_NAME)]
    pub group: String,

    /// API title
    #[arg(long = "title")]
    pub title: Option<String>,

    /// API version
    #[arg(long = "api-version")]
    pub api_version: Option<String>,

    /// Only document paths starting with this prefix
    #[arg(short = 'p', long = "path-prefix")]
    pub path_prefix: Option<String>,

    /// How generic model names are rendered
    #[arg(short = 'n', long = "naming", value_enum, default_value = "default")]
    pub naming: Naming,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

/// Output format options
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// YAML format
    Yaml,
    /// JSON format
    Json,
}

/// Generic model naming strategies
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum Naming {
    /// `Page«Pet»`
    Default,
    /// `PageOfPet`, friendly to code generators
    Codegen,
}

impl From<Naming> for GenericNaming {
    fn from(naming: Naming) -> Self {
        match naming {
            Naming::Default => GenericNaming::standard(),
            Naming::Codegen => GenericNaming::codegen(),
        }
    }
}

impl CliArgs {
    /// Documentation settings described by the arguments
    pub fn documentation_config(&self) -> DocumentationConfig {
        let defaults = ApiInfo::default();
        let api_info = ApiInfo {
            title: self.title.clone().unwrap_or(defaults.title.clone()),
            version: self.api_version.clone().unwrap_or(defaults.version.clone()),
            ..defaults
        };

        let config = DocumentationConfig::default()
            .with_group_name(&self.group)
            .with_api_info(api_info)
            .with_naming(self.naming.into());
        match &self.path_prefix {
            Some(prefix) => config.with_selector(PathSelectors::prefix(prefix)),
            None => config,
        }
    }
}

/// Parse command line arguments
pub fn parse_args() -> Result<CliArgs> {
    let args = CliArgs::parse();
    parse_args_from_parsed(args)
}

/// Validate and log already-parsed arguments
pub fn parse_args_from_parsed(args: CliArgs) -> Result<CliArgs> {
    debug!("Parsed arguments: {:?}", args);

    if !args.project_path.exists() {
        anyhow::bail!(
            "Project path does not exist: {}",
            args.project_path.display()
        );
    }

    if !args.project_path.is_dir() {
        anyhow::bail!(
            "Project path is not a directory: {}",
            args.project_path.display()
        );
    }

    info!("Project path: {}", args.project_path.display());
    info!("Output format: {:?}", args.output_format);
    if let Some(ref output) = args.output_path {
        info!("Output file: {}", output.display());
    } else {
        info!("Output: stdout");
    }
    info!("Group: {}, naming: {:?}", args.group, args.naming);

    Ok(args)
}

/// Scan the project and render its documentation in the requested format
pub fn generate(args: &CliArgs) -> Result<String> {
    // Step 1: Load and parse sources
    info!("Loading project sources...");
    let sources = SourceSet::load(&args.project_path)?;
    info!(
        "Parsed {} Rust files ({} skipped)",
        sources.files.len(),
        sources.warnings.len()
    );
    if sources.files.is_empty() {
        anyhow::bail!("No Rust files could be parsed in the project directory");
    }

    // Step 2: Extract types and handler registrations
    info!("Extracting handlers...");
    let extracted = ControllerExtractor.extract(&sources.files);
    info!("Found {} routed handler(s)", extracted.registrations.len());
    if extracted.registrations.is_empty() {
        warn!("No routed handlers found in the project");
    }

    // Step 3: Scan the documentation group
    let registry = Arc::new(extracted.registry);
    let scanner = DocumentationScanner::new(Arc::clone(&registry));
    let config = args.documentation_config();
    let documentation = scanner.scan(&config, &extracted.registrations)?;

    // Step 4: Build the OpenAPI document
    info!("Building OpenAPI document...");
    let schema_gen = SchemaGenerator::new(registry, documentation.naming.clone());
    let document = OpenApiBuilder::from_documentation(&documentation, schema_gen);
    info!(
        "Documented {} path(s) and {} model(s)",
        document.paths.len(),
        documentation.models.len()
    );

    // Step 5: Serialize to requested format
    info!("Serializing to {:?} format...", args.output_format);
    match args.output_format {
        OutputFormat::Yaml => serialize_yaml(&document),
        OutputFormat::Json => serialize_json(&document),
    }
}

/// Run the main workflow
pub fn run(args: CliArgs) -> Result<()> {
    info!("Starting OpenAPI document generation...");
    let content = generate(&args)?;

    if let Some(output_path) = &args.output_path {
        info!("Writing output to: {}", output_path.display());
        write_to_file(&content, output_path)?;
        info!("Successfully wrote OpenAPI document to {}", output_path.display());
    } else {
        println!("{}", content);
    }

    Ok(())
}
