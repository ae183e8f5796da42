/*!
 * # kwtrans - keyword translation job pipeline
 *
 * A Rust library for translating spreadsheets of SEO keywords with AI.
 *
 * ## Features
 *
 * - Durable SQLite job store with chunked, idempotent keyword submission
 * - Lease-based job claiming, safe with several workers on one database
 * - Two translated variants per keyword from various AI providers:
 *   - OpenAI API (and OpenAI-compatible servers such as LM Studio)
 *   - Anthropic API
 *   - Ollama (local LLM)
 * - Per-keyword retry with rate-limit aware backoff and fallback to the
 *   source keyword
 * - CSV and XLSX intake and export
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `database`: Job and item persistence
 * - `providers`: Client implementations for the LLM providers
 * - `translation`: The `Translator` trait, prompts, reply parsing, retry and pacing
 * - `worker`: Claiming and processing jobs
 * - `export`: Rendering and publishing the translated table
 * - `intake`: Reading keyword sheets
 * - `language_utils`: ISO language code utilities
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod database;
pub mod errors;
pub mod export;
pub mod intake;
pub mod language_utils;
pub mod providers;
pub mod translation;
pub mod worker;

// Re-export main types for easier usage
pub use app_config::{Config, WorkerConfig};
pub use database::{ItemRecord, JobRecord, JobStatus, JobStore, NewItem};
pub use errors::{AppError, JobError, ProviderError, TranslationError};
pub use export::{render_export, ExportFormat, ExportSink, FileSystemSink};
pub use intake::read_keyword_file;
pub use language_utils::resolve_language_name;
pub use translation::{ItemOutcome, LlmTranslator, TranslationRequest, Translator, VariantPair};
pub use worker::{DrainReport, JobOutcome, Worker};
