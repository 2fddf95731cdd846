//! Prism CLI library
//!
//! This module contains the core CLI logic for the Prism DTO compiler.

pub mod error_adapter;

mod args;
mod config;

pub use args::Args;

use std::path::{Path, PathBuf};

use log::info;

use prism::{DtoProcessor, PrismError, catalog, emit::RustEmitter};

/// Run the Prism CLI application
///
/// Compiles every DTO source below the selected directories against the
/// schema catalog and, unless `--check` is given, writes the generated
/// files to the output directory.
///
/// Returns whether any DTO type was produced.
///
/// # Errors
///
/// Returns `PrismError` for:
/// - File I/O errors
/// - Configuration and schema loading errors
/// - Parse and compile errors in any DTO source
/// - Emit errors
pub fn run(args: &Args) -> Result<bool, PrismError> {
    let mut app_config = config::load_config(args.config.as_ref())?;

    if !args.dto_dirs.is_empty() {
        let dirs = args.dto_dirs.iter().map(PathBuf::from).collect();
        app_config.compiler_mut().set_dto_dirs(dirs);
    }
    if args.mutable {
        app_config.compiler_mut().set_mutable(true);
    }
    if let Some(output) = &args.output {
        app_config.output_mut().set_directory(output);
    }

    info!(schema = args.schema, check = args.check; "Compiling DTO sources");

    let registry = catalog::load(Path::new(&args.schema), app_config.schema().policy())?;
    let output = app_config.output().directory().to_path_buf();
    let entity_module = app_config.output().entity_module().to_string();

    let mut processor = DtoProcessor::new(app_config, registry);
    let produced = processor.process()?;

    if !produced {
        info!("No DTO types produced");
        return Ok(false);
    }
    if args.check {
        info!("Check passed, nothing written");
        return Ok(true);
    }

    let mut emitter = RustEmitter::new(&output).with_entity_module(entity_module);
    let emitted = processor.emit(&mut emitter)?;
    info!(types = emitted, output:? = output; "Generated DTO sources");

    Ok(true)
}
