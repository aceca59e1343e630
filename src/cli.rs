use clap::Parser;

use crate::export::OutputFormat;

/// Default location list used when --locations is not given.
pub const DEFAULT_LOCATIONS: &str = "Casablanca,Rabat,Marrakech,Tangier,Fes";

#[derive(Parser, Debug)]
#[command(name = "mapreviews")]
#[command(about = "Collects customer reviews from map listing pages via headless Chrome")]
#[command(version)]
pub struct Cli {
    /// Create default configuration file at ./config/mapreviews.toml
    #[arg(long)]
    pub init: bool,

    /// Comma-separated list of organization names to search for
    #[arg(short = 'b', long, value_name = "NAMES")]
    pub organizations: Option<String>,

    /// Comma-separated list of location names
    #[arg(short = 'c', long, value_name = "NAMES", default_value = DEFAULT_LOCATIONS)]
    pub locations: String,

    /// Maximum number of reviews to collect per entity
    #[arg(short = 'm', long, default_value = "20")]
    pub max_reviews: usize,

    /// Number of parallel worker slots (one browser session each)
    #[arg(short = 'j', long, default_value = "4")]
    pub workers: usize,

    /// Run browsers in headless mode (overrides config)
    #[arg(long, conflicts_with = "no_headless")]
    pub headless: bool,

    /// Run browsers with a visible window (overrides config)
    #[arg(long, conflicts_with = "headless")]
    pub no_headless: bool,

    /// Output file path; the .json or .csv extension selects the format
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<String>,

    /// Verbose logging (use -v for detailed, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Append execution logs to a file (specify file path)
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<String>,
}

impl Cli {
    /// Validate arguments. All failures here are configuration errors,
    /// reported before any browser work starts.
    pub fn validate(&self) -> Result<(), String> {
        if self.init {
            return Ok(());
        }

        match &self.organizations {
            None => return Err("Organization list is required (use --organizations)".to_string()),
            Some(raw) if parse_list(raw).is_empty() => {
                return Err("Organization list cannot be empty".to_string())
            }
            _ => {}
        }

        if parse_list(&self.locations).is_empty() {
            return Err("Location list cannot be empty".to_string());
        }

        match &self.output {
            None => return Err("Output path is required (use --output)".to_string()),
            Some(path) if OutputFormat::from_path(std::path::Path::new(path)).is_none() => {
                return Err(format!(
                    "Unsupported output format (use .json or .csv): {}",
                    path
                ))
            }
            _ => {}
        }

        if self.max_reviews == 0 {
            return Err("Max reviews must be greater than 0".to_string());
        }

        if self.workers == 0 {
            return Err("Workers must be greater than 0".to_string());
        }

        if self.workers > 16 {
            return Err("Workers cannot exceed 16 to avoid overwhelming the remote system".to_string());
        }

        Ok(())
    }

    /// Effective headless flag: CLI override wins, otherwise the config
    /// value.
    pub fn effective_headless(&self, config_default: bool) -> bool {
        if self.headless {
            true
        } else if self.no_headless {
            false
        } else {
            config_default
        }
    }

    pub fn organization_list(&self) -> Vec<String> {
        self.organizations.as_deref().map(parse_list).unwrap_or_default()
    }

    pub fn location_list(&self) -> Vec<String> {
        parse_list(&self.locations)
    }
}

/// Split a comma-separated list, trimming whitespace and dropping empties.
pub fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
