mod changes;
mod commands;
mod config;
mod declarator;
mod diagnostics;
mod error;
mod extractor;
mod fixtures;
mod format;
mod git;
mod grammar;
mod macros;
mod markers;
mod overload;
mod proto_resolver;
mod render;
mod resolver;
mod syntax;
mod types;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::commands::{ExtractArgs, RenderArgs};

#[derive(Parser)]
#[command(name = "snipref", about = "Extract named C/C++ and proto fragments into docs", version)]
struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    command: Commands,
    /// Raise log verbosity (-v info, -vv debug). `RUST_LOG` takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the change regions since a base, grouped by file
    Changes {
        /// Base ref, a `a..b` range, or `auto`
        #[arg(default_value = "auto")]
        base: String,
        /// Repository root
        #[arg(short, long, default_value = ".")]
        repo: PathBuf,
    },
    /// Extract one construct from a source file
    Extract(ExtractCli),
    /// List standalone marker directive lines in C/C++ files changed since a ref
    FindMarkers {
        /// Delete the listed lines in place
        #[arg(long)]
        remove: bool,
        /// Repository root
        #[arg(short, long, default_value = ".")]
        repo: PathBuf,
        /// Ref to compare against
        #[arg(long)]
        since: String,
    },
    /// List the markers of a source file
    Markers {
        /// Source file
        file: PathBuf,
    },
    /// Render `{{ code(...) }}` templates
    Render(RenderCli),
}

/// Flags of `snipref extract`.
#[derive(Args)]
struct ExtractCli {
    /// Macro argument filter `argN=value` (repeatable)
    #[arg(long = "arg", value_name = "argN=VALUE", requires = "function_macro")]
    args: Vec<String>,
    /// Proto enum, or C++ enum
    #[arg(long = "enum")]
    enum_name: Option<String>,
    /// Source file
    file: PathBuf,
    /// Function or method name, optionally qualified
    #[arg(long)]
    function: Option<String>,
    /// Function-like macro invocation name
    #[arg(long)]
    function_macro: Option<String>,
    /// Inclusive line range `A:B`
    #[arg(long)]
    lines: Option<String>,
    /// `#define` name
    #[arg(long)]
    macro_definition: Option<String>,
    /// Marker name; nested inside the selected construct when combined with another selector
    #[arg(long)]
    marker: Option<String>,
    /// Proto message name
    #[arg(long)]
    message: Option<String>,
    /// Print plain lines without numbers
    #[arg(long)]
    no_line_numbers: bool,
    /// Print only the extracted text
    #[arg(long)]
    raw: bool,
    /// Proto service name
    #[arg(long)]
    service: Option<String>,
    /// Parameter-list fragment to pick an overload
    #[arg(long, requires = "function")]
    signature: Option<String>,
    /// Struct, class, or union name
    #[arg(long = "struct")]
    struct_name: Option<String>,
    /// Variable name
    #[arg(long)]
    var: Option<String>,
}

/// Flags of `snipref render`.
#[derive(Args)]
struct RenderCli {
    /// Copy sources that fail to extract into the fixture directory
    #[arg(long)]
    collect_error_fixtures: bool,
    /// A `.j2` file, a directory of them, or `-` for stdin
    input: String,
    /// Output file, or `-` for stdout (single-template input only)
    output: Option<String>,
    /// Repository root that call paths are relative to
    #[arg(short, long, default_value = ".")]
    repo: PathBuf,
    /// Exit non-zero on any failure or uncovered change
    #[arg(long)]
    strict: bool,
    /// Report changes since BASE (or `auto`) not covered by any extraction
    #[arg(short = 'V', long = "verify-changes", value_name = "BASE")]
    verify_changes: Option<String>,
}

/// Install the stderr subscriber. `RUST_LOG` wins over `-v`.
fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| return EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).with_target(false).init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Changes { base, repo } => commands::changes(&repo, &base),
        Commands::Extract(a) => commands::extract(&ExtractArgs {
            args: a.args,
            enum_name: a.enum_name,
            file: a.file,
            function: a.function,
            function_macro: a.function_macro,
            lines: a.lines,
            line_numbers: !a.no_line_numbers,
            macro_definition: a.macro_definition,
            marker: a.marker,
            message: a.message,
            raw: a.raw,
            service: a.service,
            signature: a.signature,
            struct_name: a.struct_name,
            var: a.var,
        }),
        Commands::FindMarkers { remove, repo, since } => commands::find_markers(&repo, &since, remove),
        Commands::Markers { file } => commands::markers(&file),
        Commands::Render(a) => commands::render(&RenderArgs {
            collect_error_fixtures: a.collect_error_fixtures,
            input: a.input,
            output: a.output,
            repo: a.repo,
            strict: a.strict,
            verify_changes: a.verify_changes,
        }),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            diagnostics::print_error(&e);
            ExitCode::FAILURE
        },
    }
}
