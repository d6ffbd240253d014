//! Element Remover CLI
//!
//! CLI tool for managing a rules file in the synced-store format and
//! dry-running rule matching.

mod store_file;
#[cfg(feature = "e2e")]
mod e2e;

use clap::{Parser, Subcommand, ValueEnum};

use er_core::coordinator::{Coordinator, InjectError, Injector, Outcome};
use er_core::selector::split_selectors;
use er_core::store::RuleRepository;
use er_core::{InjectionRequest, NavigationEvent, Rule, TabStatus};

use store_file::FileStore;

#[derive(Parser)]
#[command(name = "er-cli")]
#[command(about = "Element Remover rule manager and tools")]
struct Cli {
    /// Rules file (same shape as the extension's synced store)
    #[arg(short, long, global = true, default_value = "element-remover.json")]
    store: String,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Switch {
    On,
    Off,
}

#[derive(Subcommand)]
enum Commands {
    /// List rules in order
    List,

    /// Append a rule
    Add {
        /// URL fragment matched against the page URL
        #[arg(short, long)]
        url: String,

        /// Comma-separated CSS selectors
        #[arg(short = 'c', long)]
        selector: String,
    },

    /// Overwrite a rule's fragment and selectors in place
    Edit {
        #[arg(short, long)]
        index: usize,

        #[arg(short, long)]
        url: String,

        #[arg(short = 'c', long)]
        selector: String,
    },

    /// Remove a rule
    Remove {
        #[arg(short, long)]
        index: usize,
    },

    /// Enable a rule
    Enable {
        #[arg(short, long)]
        index: usize,
    },

    /// Disable a rule
    Disable {
        #[arg(short, long)]
        index: usize,
    },

    /// Show or set the popup dark-mode preference
    DarkMode {
        value: Option<Switch>,
    },

    /// Show which rule a page URL would get
    Match {
        #[arg(short, long)]
        url: String,
    },

    /// Validate the rules file
    Check,

    /// Run browser checks against the unpacked extension
    #[cfg(feature = "e2e")]
    E2e {
        /// Unpacked extension directory
        #[arg(long, default_value = "extension")]
        extension: String,

        #[arg(long, default_value = "http://localhost:9515")]
        chromedriver: String,

        #[arg(long)]
        headless: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let mut repo = RuleRepository::new(FileStore::new(&cli.store));

    let result = match cli.command {
        Commands::List => cmd_list(&repo),
        Commands::Add { url, selector } => cmd_add(&mut repo, &url, &selector),
        Commands::Edit { index, url, selector } => cmd_edit(&mut repo, index, &url, &selector),
        Commands::Remove { index } => cmd_remove(&mut repo, index),
        Commands::Enable { index } => cmd_set_enabled(&mut repo, index, true),
        Commands::Disable { index } => cmd_set_enabled(&mut repo, index, false),
        Commands::DarkMode { value } => cmd_dark_mode(&mut repo, value),
        Commands::Match { url } => cmd_match(repo.into_inner(), &url),
        Commands::Check => cmd_check(&repo),
        #[cfg(feature = "e2e")]
        Commands::E2e {
            extension,
            chromedriver,
            headless,
        } => e2e::run_e2e(e2e::E2eOptions {
            chromedriver_url: chromedriver,
            extension_path: extension,
            headless,
        }),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn describe(index: usize, rule: &Rule) -> String {
    format!(
        "  [{}] {:<4} {} -> {}",
        index,
        if rule.enabled { "on" } else { "off" },
        rule.url,
        rule.selector
    )
}

fn cmd_list(repo: &RuleRepository<FileStore>) -> Result<(), String> {
    let rules = repo.load_rules().map_err(|e| e.to_string())?;
    if rules.is_empty() {
        println!("No rules in '{}'", repo.store().path().display());
        return Ok(());
    }
    println!("Rules in '{}':", repo.store().path().display());
    for (index, rule) in rules.iter().enumerate() {
        println!("{}", describe(index, rule));
    }
    Ok(())
}

fn cmd_add(repo: &mut RuleRepository<FileStore>, url: &str, selector: &str) -> Result<(), String> {
    let index = repo.add(url, selector).map_err(|e| e.to_string())?;
    println!("Added rule [{}]", index);
    Ok(())
}

fn cmd_edit(repo: &mut RuleRepository<FileStore>, index: usize, url: &str, selector: &str) -> Result<(), String> {
    repo.edit(index, url, selector).map_err(|e| e.to_string())?;
    println!("Updated rule [{}]", index);
    Ok(())
}

fn cmd_remove(repo: &mut RuleRepository<FileStore>, index: usize) -> Result<(), String> {
    let removed = repo.remove(index).map_err(|e| e.to_string())?;
    println!("Removed rule [{}] {} -> {}", index, removed.url, removed.selector);
    Ok(())
}

fn cmd_set_enabled(repo: &mut RuleRepository<FileStore>, index: usize, enabled: bool) -> Result<(), String> {
    repo.set_enabled(index, enabled).map_err(|e| e.to_string())?;
    println!("Rule [{}] turned {}", index, if enabled { "on" } else { "off" });
    Ok(())
}

fn cmd_dark_mode(repo: &mut RuleRepository<FileStore>, value: Option<Switch>) -> Result<(), String> {
    if let Some(value) = value {
        repo.set_dark_mode(matches!(value, Switch::On))
            .map_err(|e| e.to_string())?;
    }
    let enabled = repo.dark_mode().map_err(|e| e.to_string())?;
    println!("Dark mode: {}", if enabled { "on" } else { "off" });
    Ok(())
}

/// Injector that keeps the request instead of touching a browser.
#[derive(Default)]
struct DryRun {
    request: Option<InjectionRequest>,
}

impl Injector for DryRun {
    fn inject(&mut self, request: InjectionRequest) -> Result<(), InjectError> {
        self.request = Some(request);
        Ok(())
    }
}

fn cmd_match(store: FileStore, url: &str) -> Result<(), String> {
    let event = NavigationEvent::TabUpdated {
        tab_id: 0,
        status: Some(TabStatus::Complete),
        url: Some(url.to_string()),
    };
    let mut coordinator = Coordinator::new(store, DryRun::default());

    match coordinator.handle(&event) {
        Outcome::Ignored => println!("Not a web URL, rules are not applied: {}", url),
        Outcome::NoMatch => println!("No enabled rule matches {}", url),
        Outcome::Injected { rule_index } => {
            let selectors = coordinator
                .injector()
                .request
                .as_ref()
                .map(|r| r.selectors.clone())
                .unwrap_or_default();
            println!("Rule [{}] applies to {}", rule_index, url);
            for selector in split_selectors(&selectors) {
                println!("  remove: {}", selector);
            }
        }
        Outcome::Failed => return Err("Rule lookup failed (see log)".to_string()),
    }
    Ok(())
}

fn cmd_check(repo: &RuleRepository<FileStore>) -> Result<(), String> {
    let parsed = repo
        .load_rule_records()
        .map_err(|e| format!("Invalid rules file: {}", e))?;
    let rules = parsed.rules;
    let dark_mode = repo.dark_mode().map_err(|e| e.to_string())?;

    let enabled = rules.iter().filter(|r| r.enabled).count();
    let mut warnings = parsed.skipped;
    if parsed.skipped > 0 {
        println!(
            "  warning: {} unreadable rule record(s) are ignored and dropped on the next change",
            parsed.skipped
        );
    }
    for (index, rule) in rules.iter().enumerate() {
        if rule.url.trim().is_empty() {
            println!("  warning: rule [{}] has an empty URL fragment and never matches", index);
            warnings += 1;
        }
        if split_selectors(&rule.selector).is_empty() {
            println!("  warning: rule [{}] has no selectors", index);
            warnings += 1;
        }
    }

    println!("Rules file '{}' is valid", repo.store().path().display());
    println!("  Rules:       {} ({} enabled, {} skipped)", rules.len(), enabled, parsed.skipped);
    println!("  Dark mode:   {}", if dark_mode { "on" } else { "off" });
    println!("  Warnings:    {}", warnings);
    Ok(())
}
