//! Prism - a compiler for DTO projection declarations over ORM entity schemas.
//!
//! This crate is the compiler driver. It discovers DTO sources, runs the
//! two-phase compilation protocol against a [`SchemaProvider`], groups the
//! resulting DTO types by entity and hands them to an [`Emitter`].

pub mod catalog;
pub mod config;
pub mod discovery;
pub mod emit;

mod error;

pub use prism_core::{dto, identifier, schema};

pub use error::PrismError;

use std::{
    fs,
    path::{Path, PathBuf},
};

use indexmap::IndexMap;
use log::{debug, info, trace};

use prism_core::{
    dto::DtoType,
    identifier::Id,
    schema::{SchemaBarrier, SchemaProvider},
};
use prism_parser::DtoFile;

use config::AppConfig;
use emit::{DocContext, EmitError, Emitter};

/// A parsed source waiting for the barrier.
struct ParsedSource {
    path: PathBuf,
    src: String,
    file: DtoFile,
}

/// Drives one compilation run.
///
/// Phase one parses every source and checks the entity each one exports.
/// Nothing is compiled until the schema has passed its [`SchemaBarrier`];
/// phase two then compiles every declaration against the final schema. The
/// first error aborts the whole run.
///
/// # Examples
///
/// ```rust,no_run
/// use std::path::Path;
///
/// use prism::{DtoProcessor, catalog, config::AppConfig, emit::RustEmitter};
///
/// let config = AppConfig::default();
/// let registry = catalog::load(Path::new("schema.toml"), config.schema().policy())
///     .expect("Failed to load schema");
///
/// let mut processor = DtoProcessor::new(config, registry);
/// if processor.process().expect("Failed to compile") {
///     let mut emitter = RustEmitter::new("generated");
///     processor.emit(&mut emitter).expect("Failed to emit");
/// }
/// ```
pub struct DtoProcessor<P: SchemaProvider> {
    config: AppConfig,
    provider: P,
    docs: DocContext,
    types: IndexMap<Id, Vec<DtoType>>,
}

impl<P: SchemaProvider> DtoProcessor<P> {
    /// Create a processor over `provider`.
    ///
    /// The provider is finalized during [`process`](Self::process), so a
    /// processor runs once.
    pub fn new(config: AppConfig, provider: P) -> Self {
        Self {
            config,
            provider,
            docs: DocContext::default(),
            types: IndexMap::new(),
        }
    }

    /// Discover the configured sources and compile them.
    ///
    /// Returns whether any DTO type was produced.
    ///
    /// # Errors
    ///
    /// Returns the first [`PrismError`] of the run; no types are kept in
    /// that case.
    pub fn process(&mut self) -> Result<bool, PrismError> {
        let compiler = self.config.compiler();
        info!(dirs:? = compiler.dto_dirs(); "Discovering DTO sources");
        let sources = discovery::discover(compiler.dto_dirs(), compiler.extension())?;
        self.process_sources(&sources)
    }

    /// Compile the given sources.
    ///
    /// Returns whether any DTO type was produced.
    pub fn process_sources(&mut self, sources: &[PathBuf]) -> Result<bool, PrismError> {
        self.types.clear();
        self.docs = DocContext::new(sources.to_vec());

        // Phase 1: parse everything, resolve only entity names
        let barrier = SchemaBarrier::new(&mut self.provider);
        let mut parsed = Vec::with_capacity(sources.len());
        for path in sources {
            if let Some(source) = parse_source(path, &barrier)? {
                parsed.push(source);
            }
        }

        info!(sources = parsed.len(); "Resolving schema");
        let schema = barrier.resolve()?;

        // Phase 2: compile against the final schema
        let compile_config = self.config.compiler().compile_config();
        let mut types: IndexMap<Id, Vec<DtoType>> = IndexMap::new();
        for source in &parsed {
            let compiled = prism_parser::compile(&source.file, &schema, &compile_config)
                .map_err(|err| PrismError::Compile {
                    path: source.path.clone(),
                    err,
                    src: source.src.clone(),
                })?;
            debug!(path:? = source.path, types = compiled.len(); "Compiled DTO source");
            types
                .entry(*source.file.entity.inner())
                .or_default()
                .extend(compiled);
        }

        let count: usize = types.values().map(Vec::len).sum();
        info!(entities = types.len(), types = count; "Compilation finished");
        trace!(types:?; "Compiled DTO types");

        self.types = types;
        Ok(count > 0)
    }

    /// Compiled DTO types grouped by entity, in order of first appearance.
    pub fn types(&self) -> &IndexMap<Id, Vec<DtoType>> {
        &self.types
    }

    /// Hand every compiled DTO type to `emitter`.
    ///
    /// Returns the number of types emitted.
    pub fn emit(&self, emitter: &mut dyn Emitter) -> Result<usize, PrismError> {
        let mut emitted = 0;
        for (entity, types) in &self.types {
            let schema = self
                .provider
                .lookup(*entity)
                .ok_or(EmitError::UnknownEntity(*entity))?;
            for dto in types {
                emitter.generate(dto, schema, dto.is_mutable(), &self.docs)?;
                emitted += 1;
            }
        }
        info!(types = emitted; "Emitted DTO types");
        Ok(emitted)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }
}

/// Read and parse one source, then check the entity it exports.
///
/// Returns `None` for sources whose entity the inclusion policy excludes.
fn parse_source<P: SchemaProvider>(
    path: &Path,
    barrier: &SchemaBarrier<'_, P>,
) -> Result<Option<ParsedSource>, PrismError> {
    let src = fs::read_to_string(path).map_err(|source| PrismError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let file = match prism_parser::parse(&src) {
        Ok(file) => file,
        Err(err) => {
            return Err(PrismError::Parse {
                path: path.to_path_buf(),
                err,
                src,
            });
        }
    };

    let entity = *file.entity.inner();
    let Some(marker) = barrier.marker_of(entity) else {
        return Err(PrismError::UnknownEntity {
            path: path.to_path_buf(),
            entity,
        });
    };
    if !barrier.is_included(entity) {
        info!(path:? = path, entity:% = entity; "Entity excluded by policy, skipping");
        return Ok(None);
    }
    if !marker.is_recognized() {
        return Err(PrismError::IneligibleEntity {
            path: path.to_path_buf(),
            entity,
        });
    }

    debug!(path:? = path, entity:% = entity, marker:% = marker; "Parsed DTO source");
    Ok(Some(ParsedSource {
        path: path.to_path_buf(),
        src,
        file,
    }))
}
