use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pagedeck")]
#[command(author, version, about)]
#[command(long_about = "Mobile reading view for markdown slide decks.\n\n\
    Splits each slide into phone-sized pages, writes a self-contained HTML\n\
    page that swipes through them, and exports the same pages as an EPUB.\n\n\
    Examples:\n  \
    pagedeck talk.md                 Build talk.html next to the deck\n  \
    pagedeck build talk.md --watch   Rebuild on every save\n  \
    pagedeck pages talk.md           Show how the deck was paginated\n  \
    pagedeck export talk.md          Write talk.epub")]
#[command(propagate_version = true)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    /// Markdown deck to build
    pub file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build the mobile reading page for a deck
    Build {
        /// Markdown deck
        file: PathBuf,

        /// Output HTML file (defaults to the deck path with .html)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Rebuild whenever the deck changes
        #[arg(short, long)]
        watch: bool,

        /// URL of the wasm-pack `pagedeck.js` module. The page then ships the
        /// desktop slides and mounts the live mobile view in the browser.
        #[arg(long, value_name = "URL")]
        runtime: Option<String>,
    },

    /// Print the pages and headers a deck decomposes into
    Pages {
        /// Markdown deck
        file: PathBuf,

        /// Print the page model as JSON
        #[arg(long)]
        json: bool,
    },

    /// Export the reading pages as an EPUB book
    Export {
        /// Markdown deck
        file: PathBuf,

        /// Output EPUB file (defaults to the deck path with .epub)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// View and modify configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Target shell
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Show version information
    Version,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Display current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key (e.g. mobile.list_split, mobile.url_mode, mobile.history)
        key: String,

        /// Value to set
        value: String,
    },
}

#[derive(Clone, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    Powershell,
}

fn require_file(file: &std::path::Path) -> anyhow::Result<()> {
    if !file.exists() {
        anyhow::bail!("File not found: {}", file.display());
    }
    Ok(())
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        let quiet = self.quiet;
        match self.command {
            Some(Commands::Build {
                file,
                output,
                watch,
                runtime,
            }) => {
                require_file(&file)?;
                crate::commands::build::run(&file, output, watch, runtime, quiet)
            }
            Some(Commands::Pages { file, json }) => {
                require_file(&file)?;
                crate::commands::pages::run(&file, json)
            }
            Some(Commands::Export { file, output }) => {
                require_file(&file)?;
                crate::commands::export::run(&file, output, quiet)
            }
            Some(Commands::Config { command }) => crate::commands::config::run(command),
            Some(Commands::Completion { shell }) => {
                crate::commands::completion::run(shell);
                Ok(())
            }
            Some(Commands::Version) => {
                println!("pagedeck {}", env!("CARGO_PKG_VERSION"));
                Ok(())
            }
            None => {
                if let Some(file) = self.file {
                    require_file(&file)?;
                    crate::commands::build::run(&file, None, false, None, quiet)
                } else {
                    use clap::CommandFactory;
                    let mut cmd = Self::command();
                    cmd.print_help()?;
                    println!();
                    Ok(())
                }
            }
        }
    }
}
