//! Command-line argument definitions for the Prism CLI.
//!
//! This module defines the [`Args`] structure parsed from the command line
//! using [`clap`]. Arguments select the DTO sources and schema catalog,
//! override configuration values, and control logging verbosity.

use clap::Parser;

/// Command-line arguments for the Prism DTO compiler
#[derive(Parser, Debug, Default)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Directories containing DTO sources (overrides `compiler.dto_dirs`)
    #[arg(help = "Directories searched recursively for DTO sources")]
    pub dto_dirs: Vec<String>,

    /// Path to the schema catalog (TOML)
    #[arg(short, long)]
    pub schema: String,

    /// Directory for generated files (overrides `output.directory`)
    #[arg(short, long)]
    pub output: Option<String>,

    /// Path to configuration file (TOML)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Make DTO types mutable unless they request otherwise
    #[arg(long)]
    pub mutable: bool,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Compile only, without writing any files
    #[arg(long)]
    pub check: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_arguments() {
        let args = Args::parse_from([
            "prism",
            "src/dto",
            "more/dto",
            "--schema",
            "schema.toml",
            "-o",
            "out",
            "--mutable",
            "--check",
        ]);
        assert_eq!(args.dto_dirs, vec!["src/dto", "more/dto"]);
        assert_eq!(args.schema, "schema.toml");
        assert_eq!(args.output.as_deref(), Some("out"));
        assert!(args.mutable);
        assert!(args.check);
        assert_eq!(args.log_level, "info");
    }

    #[test]
    fn test_schema_is_required() {
        assert!(Args::try_parse_from(["prism", "src/dto"]).is_err());
    }
}
