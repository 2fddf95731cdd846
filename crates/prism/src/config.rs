//! Configuration types for the Prism compiler driver.
//!
//! All types implement [`serde::Deserialize`] and default every field, so a
//! partial (or empty) TOML document is a valid configuration.
//!
//! # Overview
//!
//! - [`AppConfig`] - Top-level configuration combining the sections below.
//! - [`CompilerConfig`] - Process-wide compilation defaults and source discovery.
//! - [`SchemaConfig`] - The inclusion policy applied to entities.
//! - [`OutputConfig`] - Where emitted files are written and what they import.
//!
//! # Example
//!
//! ```
//! # use prism::config::AppConfig;
//! let config: AppConfig = toml::from_str(
//!     r#"
//!     [compiler]
//!     mutable = true
//!
//!     [schema]
//!     exclude = ["com.example.internal"]
//!     "#,
//! )
//! .expect("valid configuration");
//!
//! assert!(config.compiler().mutable());
//! assert_eq!(config.compiler().extension(), "dto");
//! assert_eq!(config.schema().exclude(), ["com.example.internal"]);
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use prism_core::{dto::NullableInputStrategy, schema::InclusionPolicy};
use prism_parser::CompileConfig;

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Compiler section.
    #[serde(default)]
    compiler: CompilerConfig,

    /// Schema section.
    #[serde(default)]
    schema: SchemaConfig,

    /// Output section.
    #[serde(default)]
    output: OutputConfig,
}

impl AppConfig {
    /// Creates a new [`AppConfig`] from its sections.
    pub fn new(compiler: CompilerConfig, schema: SchemaConfig, output: OutputConfig) -> Self {
        Self {
            compiler,
            schema,
            output,
        }
    }

    /// Returns the compiler configuration.
    pub fn compiler(&self) -> &CompilerConfig {
        &self.compiler
    }

    /// Returns the compiler configuration for modification.
    pub fn compiler_mut(&mut self) -> &mut CompilerConfig {
        &mut self.compiler
    }

    /// Returns the schema configuration.
    pub fn schema(&self) -> &SchemaConfig {
        &self.schema
    }

    /// Returns the output configuration.
    pub fn output(&self) -> &OutputConfig {
        &self.output
    }

    /// Returns the output configuration for modification.
    pub fn output_mut(&mut self) -> &mut OutputConfig {
        &mut self.output
    }
}

/// Compilation defaults and source discovery.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Mutability of DTO types that do not request one.
    mutable: bool,

    /// Nullable-input stance of input DTOs that name none.
    default_nullable_input: NullableInputStrategy,

    /// Directories searched recursively for DTO sources.
    dto_dirs: Vec<PathBuf>,

    /// Extension of DTO source files, without the dot.
    extension: String,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            mutable: false,
            default_nullable_input: NullableInputStrategy::default(),
            dto_dirs: vec![PathBuf::from("src/main/dto")],
            extension: "dto".to_string(),
        }
    }
}

impl CompilerConfig {
    pub fn mutable(&self) -> bool {
        self.mutable
    }

    pub fn default_nullable_input(&self) -> NullableInputStrategy {
        self.default_nullable_input
    }

    pub fn dto_dirs(&self) -> &[PathBuf] {
        &self.dto_dirs
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Overrides the process-wide mutability default.
    pub fn set_mutable(&mut self, mutable: bool) {
        self.mutable = mutable;
    }

    /// Replaces the source directories.
    pub fn set_dto_dirs(&mut self, dto_dirs: Vec<PathBuf>) {
        self.dto_dirs = dto_dirs;
    }

    /// The defaults handed to the front end.
    pub fn compile_config(&self) -> CompileConfig {
        CompileConfig {
            mutable: self.mutable,
            nullable_input: self.default_nullable_input,
        }
    }
}

/// Entity inclusion policy, by qualified-name prefix.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SchemaConfig {
    include: Vec<String>,
    exclude: Vec<String>,
}

impl SchemaConfig {
    pub fn include(&self) -> &[String] {
        &self.include
    }

    pub fn exclude(&self) -> &[String] {
        &self.exclude
    }

    /// Builds the [`InclusionPolicy`] installed in the schema registry.
    pub fn policy(&self) -> InclusionPolicy {
        InclusionPolicy::new(self.include.clone(), self.exclude.clone())
    }
}

/// Output location of emitted files.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    directory: PathBuf,

    /// Rust module path the generated code imports entity types from.
    entity_module: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("generated"),
            entity_module: "crate::entities".to_string(),
        }
    }
}

impl OutputConfig {
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn entity_module(&self) -> &str {
        &self.entity_module
    }

    pub fn set_directory(&mut self, directory: impl Into<PathBuf>) {
        self.directory = directory.into();
    }
}
